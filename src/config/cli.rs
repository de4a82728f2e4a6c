use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use uuid::Uuid;

#[derive(Debug, Clone, Parser)]
#[command(name = "reservili")]
#[command(about = "Slot availability and booking ledger for service providers")]
pub struct CliConfig {
    /// Path to the TOML provider catalog
    #[arg(long, default_value = "catalog.toml")]
    pub catalog: String,

    /// Booking journal path, overrides settings.journal_path
    #[arg(long)]
    pub journal: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List a provider's slots for one day and service
    Slots {
        #[arg(long)]
        provider: String,
        /// Provider-local date, YYYY-MM-DD
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        service: String,
        /// Hide slots that are already booked
        #[arg(long)]
        free_only: bool,
    },
    /// Book the slot starting at --start
    Book {
        #[arg(long)]
        provider: String,
        #[arg(long)]
        service: String,
        #[arg(long)]
        worker: Option<String>,
        #[arg(long)]
        user: String,
        /// Slot start as an RFC 3339 instant
        #[arg(long)]
        start: DateTime<Utc>,
    },
    /// Cancel a confirmed booking
    Cancel {
        #[arg(long)]
        booking: Uuid,
    },
    /// A user's booking history, newest first
    Bookings {
        #[arg(long)]
        user: String,
    },
    /// All confirmed bookings of a provider on one day
    Schedule {
        #[arg(long)]
        provider: String,
        #[arg(long)]
        date: NaiveDate,
    },
}
