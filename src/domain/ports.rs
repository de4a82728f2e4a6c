use crate::domain::model::{Booking, Interval, JournalEntry, NewBooking, Provider, ResourceKey};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// Read-only view over provider profiles owned by the profile collaborator.
pub trait ProviderCatalog: Send + Sync {
    fn provider(&self, provider_id: &str) -> Result<Arc<Provider>>;
}

/// Durable append-only log behind the ledger.
pub trait BookingJournal: Send + Sync {
    fn append(&self, entry: &JournalEntry)
        -> impl std::future::Future<Output = Result<()>> + Send;
    fn load(&self) -> impl std::future::Future<Output = Result<Vec<JournalEntry>>> + Send;
}

#[async_trait]
pub trait BookingLedger: Send + Sync {
    /// Confirmed `[start, end)` ranges for one resource, from a consistent snapshot.
    async fn occupied_intervals(&self, provider_id: &str, worker_id: Option<&str>)
        -> Vec<Interval>;

    /// Confirmed bookings for one resource in chronological order.
    async fn confirmed_bookings(&self, key: &ResourceKey) -> Vec<Booking>;

    async fn create_booking(&self, request: NewBooking) -> Result<Booking>;
    async fn cancel_booking(&self, booking_id: Uuid) -> Result<Booking>;

    async fn booking(&self, booking_id: Uuid) -> Result<Booking>;
    async fn bookings_for_user(&self, user_id: &str) -> Vec<Booking>;
    async fn bookings_for_provider(&self, provider_id: &str, range: Interval) -> Vec<Booking>;
}
