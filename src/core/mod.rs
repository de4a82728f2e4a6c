pub mod availability;
pub mod calendar;
pub mod exceptions;
pub mod ledger;
pub mod ratings;
pub mod slots;

pub use crate::domain::model::{Booking, Interval, NewBooking, Provider, Slot};
pub use crate::domain::ports::{BookingJournal, BookingLedger, ProviderCatalog};
pub use crate::utils::error::Result;
