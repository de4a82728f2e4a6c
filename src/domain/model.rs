use chrono::{DateTime, Duration, FixedOffset, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

/// Half-open `[start, end)` range of absolute instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Touching or empty intervals do not overlap.
    pub fn overlaps(&self, other: &Interval) -> bool {
        !self.is_empty() && !other.is_empty() && self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, other: &Interval) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayTemplate {
    pub day_of_week: Weekday,
    pub open: NaiveTime,
    pub close: NaiveTime,
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeeklyTemplate {
    pub days: Vec<DayTemplate>,
}

impl WeeklyTemplate {
    pub fn new(days: Vec<DayTemplate>) -> Self {
        Self { days }
    }

    /// Same hours on every enabled weekday.
    pub fn uniform(open: NaiveTime, close: NaiveTime, enabled_days: &[Weekday]) -> Self {
        let days = ALL_WEEKDAYS
            .iter()
            .map(|day| DayTemplate {
                day_of_week: *day,
                open,
                close,
                enabled: enabled_days.contains(day),
            })
            .collect();
        Self { days }
    }
}

pub const ALL_WEEKDAYS: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedInterval {
    pub id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub reason: Option<String>,
}

impl BlockedInterval {
    pub fn interval(&self) -> Interval {
        Interval::new(self.start, self.end)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub duration_minutes: i64,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worker {
    pub id: String,
    pub name: String,
    pub eligible_service_ids: HashSet<String>,
}

impl Worker {
    pub fn can_perform(&self, service_id: &str) -> bool {
        self.eligible_service_ids.contains(service_id)
    }
}

/// Provider profile as handed over by the profile collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct Provider {
    pub id: String,
    pub name: String,
    pub utc_offset_minutes: i32,
    pub weekly: WeeklyTemplate,
    pub blocked: Vec<BlockedInterval>,
    pub services: Vec<Service>,
    pub workers: Vec<Worker>,
}

impl Provider {
    pub fn service(&self, service_id: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.id == service_id)
    }

    pub fn worker(&self, worker_id: &str) -> Option<&Worker> {
        self.workers.iter().find(|w| w.id == worker_id)
    }

    pub fn has_workers(&self) -> bool {
        !self.workers.is_empty()
    }

    pub fn offset(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes.checked_mul(60)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub worker_id: Option<String>,
    pub is_booked: bool,
    pub booking_id: Option<Uuid>,
}

impl Slot {
    pub fn free(start: DateTime<Utc>, end: DateTime<Utc>, worker_id: Option<String>) -> Self {
        Self {
            start,
            end,
            worker_id,
            is_booked: false,
            booking_id: None,
        }
    }

    pub fn interval(&self) -> Interval {
        Interval::new(self.start, self.end)
    }

    /// Same resource and same window, ignoring booked state.
    pub fn same_window(&self, other: &Slot) -> bool {
        self.start == other.start && self.end == other.end && self.worker_id == other.worker_id
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.worker_id {
            Some(worker) => write!(f, "{} (worker {})", self.interval(), worker),
            None => write!(f, "{}", self.interval()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub provider_id: String,
    pub worker_id: Option<String>,
    pub service_id: String,
    pub user_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn interval(&self) -> Interval {
        Interval::new(self.start, self.end)
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == BookingStatus::Confirmed
    }

    pub fn resource_key(&self) -> ResourceKey {
        ResourceKey::new(&self.provider_id, self.worker_id.as_deref())
    }
}

/// Command payload for the ledger; id, timestamp and status are assigned on commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
    pub provider_id: String,
    pub service_id: String,
    pub worker_id: Option<String>,
    pub user_id: String,
    pub slot: Slot,
}

impl NewBooking {
    pub fn resource_key(&self) -> ResourceKey {
        ResourceKey::new(&self.provider_id, self.worker_id.as_deref())
    }
}

/// The (provider, worker) pair booking commands are serialized on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKey {
    pub provider_id: String,
    pub worker_id: Option<String>,
}

impl ResourceKey {
    pub fn new(provider_id: &str, worker_id: Option<&str>) -> Self {
        Self {
            provider_id: provider_id.to_string(),
            worker_id: worker_id.map(str::to_string),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.worker_id {
            Some(worker) => write!(f, "{}/{}", self.provider_id, worker),
            None => write!(f, "{}/*", self.provider_id),
        }
    }
}

/// Durable ledger record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JournalEntry {
    Confirmed {
        booking: Booking,
    },
    Cancelled {
        booking_id: Uuid,
        at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub provider_id: String,
    pub worker_id: Option<String>,
    pub user_id: String,
    pub rating: u8,
    pub comment: String,
    pub date: DateTime<Utc>,
}
