use anyhow::Context;
use chrono::Duration;
use clap::Parser;
use reservili::utils::error::ErrorSeverity;
use reservili::utils::{logger, validation::Validate};
use reservili::{
    AvailabilityService, CatalogConfig, CliConfig, Command, FileJournal, InMemoryCatalog, Ledger,
    NewBooking, ProviderCatalog, ReservationError, Slot,
};
use serde::Serialize;

type Service = AvailabilityService<InMemoryCatalog, Ledger<FileJournal>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    if config.log_json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting reservili CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    let service = build_service(&config).await?;

    if let Err(e) = run(&service, config.command).await {
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

async fn build_service(config: &CliConfig) -> anyhow::Result<Service> {
    tracing::info!("📁 Loading catalog from: {}", config.catalog);
    let catalog = CatalogConfig::from_file(&config.catalog)
        .with_context(|| format!("failed to load catalog '{}'", config.catalog))?;

    if let Err(e) = catalog.validate() {
        tracing::error!("❌ Catalog validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let providers = catalog.providers()?;
    tracing::info!("✅ Catalog loaded with {} providers", providers.len());

    let journal_path = match &config.journal {
        Some(path) => path.clone(),
        None => reservili::utils::validation::validate_required_field(
            "settings.journal_path",
            &catalog.settings.journal_path,
        )?
        .clone(),
    };

    let ledger = Ledger::restore(FileJournal::new(&journal_path))
        .await
        .with_context(|| format!("failed to replay journal '{}'", journal_path))?;

    Ok(AvailabilityService::new(InMemoryCatalog::new(providers), ledger)
        .with_alignment(catalog.slot_alignment()))
}

async fn run(service: &Service, command: Command) -> reservili::Result<()> {
    match command {
        Command::Slots {
            provider,
            date,
            service: service_id,
            free_only,
        } => {
            let mut slots = service.get_day_slots(&provider, date, &service_id).await?;
            if free_only {
                slots.retain(|s| !s.is_booked);
            }
            print_json(&slots)
        }
        Command::Book {
            provider,
            service: service_id,
            worker,
            user,
            start,
        } => {
            let profile = service.catalog().provider(&provider)?;
            let duration = profile
                .service(&service_id)
                .ok_or_else(|| ReservationError::not_found("service", service_id.as_str()))?
                .duration_minutes;
            let end = Duration::try_minutes(duration)
                .and_then(|length| start.checked_add_signed(length))
                .ok_or_else(|| {
                    ReservationError::config(format!(
                        "service {} lasts {} minutes, which is out of range",
                        service_id, duration
                    ))
                })?;
            let slot = Slot::free(start, end, worker.clone());

            let booking = service
                .request_booking(NewBooking {
                    provider_id: provider,
                    service_id,
                    worker_id: worker,
                    user_id: user,
                    slot,
                })
                .await?;
            tracing::info!("✅ Booking {} confirmed", booking.id);
            print_json(&booking)
        }
        Command::Cancel { booking } => {
            let cancelled = service.cancel_booking(booking).await?;
            print_json(&cancelled)
        }
        Command::Bookings { user } => print_json(&service.bookings_for_user(&user).await),
        Command::Schedule { provider, date } => {
            print_json(&service.day_schedule(&provider, date).await?)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> reservili::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
