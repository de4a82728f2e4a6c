use crate::domain::model::{
    Booking, BookingStatus, Interval, JournalEntry, NewBooking, ResourceKey,
};
use crate::domain::ports::{BookingJournal, BookingLedger};
use crate::utils::error::{ReservationError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Bookings of one resource, kept sorted by start.
type Track = Arc<Mutex<Vec<Booking>>>;

/// In-memory booking ledger backed by a durable journal.
///
/// Each resource key owns its own async mutex. A booking command holds only
/// that mutex while it re-checks for overlaps, appends to the journal and
/// records the booking, so unrelated workers and providers never contend.
pub struct Ledger<J: BookingJournal> {
    journal: J,
    tracks: RwLock<HashMap<ResourceKey, Track>>,
    index: RwLock<HashMap<Uuid, ResourceKey>>,
}

impl<J: BookingJournal> Ledger<J> {
    pub fn new(journal: J) -> Self {
        Self {
            journal,
            tracks: RwLock::new(HashMap::new()),
            index: RwLock::new(HashMap::new()),
        }
    }

    /// Rebuilds ledger state by replaying the journal.
    pub async fn restore(journal: J) -> Result<Self> {
        let entries = journal.load().await?;
        let ledger = Self::new(journal);

        let mut replayed: HashMap<ResourceKey, Vec<Booking>> = HashMap::new();
        let mut index: HashMap<Uuid, ResourceKey> = HashMap::new();

        for entry in entries {
            match entry {
                JournalEntry::Confirmed { booking } => {
                    if index.contains_key(&booking.id) {
                        tracing::warn!("Journal confirms booking {} twice, skipping", booking.id);
                        continue;
                    }
                    let key = booking.resource_key();
                    let track = replayed.entry(key.clone()).or_default();
                    if let Some(existing) = track
                        .iter()
                        .find(|b| b.is_confirmed() && b.interval().overlaps(&booking.interval()))
                    {
                        tracing::warn!(
                            "Journal booking {} on {} overlaps booking {}, skipping",
                            booking.id,
                            key,
                            existing.id
                        );
                        continue;
                    }
                    index.insert(booking.id, key);
                    track.push(booking);
                }
                JournalEntry::Cancelled { booking_id, .. } => {
                    let booking = index
                        .get(&booking_id)
                        .and_then(|key| replayed.get_mut(key))
                        .and_then(|track| track.iter_mut().find(|b| b.id == booking_id));
                    match booking {
                        Some(booking) => booking.status = BookingStatus::Cancelled,
                        None => tracing::warn!(
                            "Journal cancels unknown booking {}, skipping",
                            booking_id
                        ),
                    }
                }
            }
        }

        let count = index.len();
        {
            let mut tracks = ledger.tracks.write().unwrap_or_else(PoisonError::into_inner);
            for (key, mut bookings) in replayed {
                bookings.sort_by_key(|b| b.start);
                tracks.insert(key, Arc::new(Mutex::new(bookings)));
            }
        }
        *ledger.index.write().unwrap_or_else(PoisonError::into_inner) = index;

        tracing::info!("Restored {} bookings from journal", count);
        Ok(ledger)
    }

    pub fn journal(&self) -> &J {
        &self.journal
    }

    fn existing_track(&self, key: &ResourceKey) -> Option<Track> {
        self.tracks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn track(&self, key: &ResourceKey) -> Track {
        if let Some(track) = self.existing_track(key) {
            return track;
        }
        self.tracks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.clone())
            .or_default()
            .clone()
    }

    fn all_tracks(&self) -> Vec<(ResourceKey, Track)> {
        self.tracks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(key, track)| (key.clone(), track.clone()))
            .collect()
    }

    fn key_of(&self, booking_id: Uuid) -> Result<ResourceKey> {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&booking_id)
            .cloned()
            .ok_or_else(|| ReservationError::not_found("booking", booking_id.to_string()))
    }
}

#[async_trait]
impl<J: BookingJournal> BookingLedger for Ledger<J> {
    async fn occupied_intervals(
        &self,
        provider_id: &str,
        worker_id: Option<&str>,
    ) -> Vec<Interval> {
        let key = ResourceKey::new(provider_id, worker_id);
        self.confirmed_bookings(&key)
            .await
            .iter()
            .map(Booking::interval)
            .collect()
    }

    async fn confirmed_bookings(&self, key: &ResourceKey) -> Vec<Booking> {
        let Some(track) = self.existing_track(key) else {
            return Vec::new();
        };
        let bookings = track.lock().await;
        bookings.iter().filter(|b| b.is_confirmed()).cloned().collect()
    }

    async fn create_booking(&self, request: NewBooking) -> Result<Booking> {
        if request.slot.interval().is_empty() {
            return Err(ReservationError::validation(format!(
                "slot {} has no duration",
                request.slot
            )));
        }
        if request.slot.worker_id != request.worker_id {
            return Err(ReservationError::validation(format!(
                "slot {} belongs to a different worker",
                request.slot
            )));
        }

        let key = request.resource_key();
        let track = self.track(&key);
        let mut bookings = track.lock().await;

        let wanted = request.slot.interval();
        if let Some(existing) = bookings
            .iter()
            .find(|b| b.is_confirmed() && b.interval().overlaps(&wanted))
        {
            tracing::warn!(
                "Booking conflict on {}: {} overlaps booking {}",
                key,
                wanted,
                existing.id
            );
            return Err(ReservationError::ConflictError { slot: request.slot });
        }

        let booking = Booking {
            id: Uuid::new_v4(),
            provider_id: request.provider_id,
            worker_id: request.worker_id,
            service_id: request.service_id,
            user_id: request.user_id,
            start: wanted.start,
            end: wanted.end,
            status: BookingStatus::Confirmed,
            created_at: Utc::now(),
        };

        self.journal
            .append(&JournalEntry::Confirmed {
                booking: booking.clone(),
            })
            .await?;

        let position = bookings.partition_point(|b| b.start <= booking.start);
        bookings.insert(position, booking.clone());
        self.index
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(booking.id, key.clone());

        tracing::info!(
            "Booking {} confirmed on {} for user {} at {}",
            booking.id,
            key,
            booking.user_id,
            wanted
        );
        Ok(booking)
    }

    async fn cancel_booking(&self, booking_id: Uuid) -> Result<Booking> {
        let key = self.key_of(booking_id)?;
        let track = self.track(&key);
        let mut bookings = track.lock().await;

        let booking = bookings
            .iter_mut()
            .find(|b| b.id == booking_id)
            .ok_or_else(|| ReservationError::not_found("booking", booking_id.to_string()))?;

        if booking.status == BookingStatus::Cancelled {
            return Err(ReservationError::validation(format!(
                "booking {} is already cancelled",
                booking_id
            )));
        }

        self.journal
            .append(&JournalEntry::Cancelled {
                booking_id,
                at: Utc::now(),
            })
            .await?;
        booking.status = BookingStatus::Cancelled;

        tracing::info!("Booking {} cancelled on {}", booking_id, key);
        Ok(booking.clone())
    }

    async fn booking(&self, booking_id: Uuid) -> Result<Booking> {
        let key = self.key_of(booking_id)?;
        let track = self.track(&key);
        let bookings = track.lock().await;
        bookings
            .iter()
            .find(|b| b.id == booking_id)
            .cloned()
            .ok_or_else(|| ReservationError::not_found("booking", booking_id.to_string()))
    }

    async fn bookings_for_user(&self, user_id: &str) -> Vec<Booking> {
        let mut found = Vec::new();
        for (_, track) in self.all_tracks() {
            let bookings = track.lock().await;
            found.extend(bookings.iter().filter(|b| b.user_id == user_id).cloned());
        }
        found.sort_by(|a, b| b.start.cmp(&a.start));
        found
    }

    async fn bookings_for_provider(&self, provider_id: &str, range: Interval) -> Vec<Booking> {
        let mut found = Vec::new();
        for (key, track) in self.all_tracks() {
            if key.provider_id != provider_id {
                continue;
            }
            let bookings = track.lock().await;
            found.extend(
                bookings
                    .iter()
                    .filter(|b| b.is_confirmed() && b.interval().overlaps(&range))
                    .cloned(),
            );
        }
        found.sort_by(|a, b| a.start.cmp(&b.start).then(a.worker_id.cmp(&b.worker_id)));
        found
    }
}
