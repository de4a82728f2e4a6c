pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command};

pub use adapters::{
    catalog::InMemoryCatalog,
    journal::{FileJournal, MemoryJournal},
};
pub use config::CatalogConfig;
pub use crate::core::{
    availability::AvailabilityService, ledger::Ledger, ratings::RatingBook, slots::SlotAlignment,
};
pub use domain::model::{Booking, BookingStatus, Interval, NewBooking, Provider, Slot};
pub use domain::ports::{BookingJournal, BookingLedger, ProviderCatalog};
pub use utils::error::{ReservationError, Result};
