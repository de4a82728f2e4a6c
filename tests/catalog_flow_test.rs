use chrono::{DateTime, NaiveDate, Utc};
use reservili::utils::validation::Validate;
use reservili::domain::model::Review;
use reservili::{
    AvailabilityService, BookingStatus, CatalogConfig, FileJournal, InMemoryCatalog, Ledger,
    NewBooking, RatingBook, ReservationError, SlotAlignment,
};
use std::path::Path;
use tempfile::TempDir;

type FileBackedService = AvailabilityService<InMemoryCatalog, Ledger<FileJournal>>;

const EXAMPLE: &str = include_str!("../catalog.example.toml");

fn at(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

fn load_example(data_dir: &Path) -> CatalogConfig {
    let content = EXAMPLE.replace("${RESERVILI_DATA_DIR}", data_dir.to_str().unwrap());
    let config = CatalogConfig::from_toml_str(&content).unwrap();
    config.validate().unwrap();
    config
}

async fn open_service(config: &CatalogConfig) -> FileBackedService {
    let journal = FileJournal::new(config.journal_path().unwrap());
    let ledger = Ledger::restore(journal).await.unwrap();
    AvailabilityService::new(InMemoryCatalog::new(config.providers().unwrap()), ledger)
        .with_alignment(config.slot_alignment())
}

#[test]
fn test_example_catalog_resolves_environment() {
    let temp_dir = TempDir::new().unwrap();
    std::env::set_var("RESERVILI_DATA_DIR", temp_dir.path());

    let config = CatalogConfig::from_toml_str(EXAMPLE).unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.slot_alignment(), SlotAlignment::IntervalStart);

    let expected = format!("{}/bookings.jsonl", temp_dir.path().display());
    assert_eq!(config.journal_path(), Some(expected.as_str()));
    assert_eq!(config.providers().unwrap().len(), 2);
}

#[tokio::test]
async fn test_booking_survives_restart() {
    let temp_dir = TempDir::new().unwrap();
    let config = load_example(temp_dir.path());

    let booking = {
        let svc = open_service(&config).await;
        let slots = svc.get_day_slots("sp1", monday(), "s1a").await.unwrap();

        // w1a and w1b both cut hair; lunch splits each track in two
        assert_eq!(slots.len(), 18);
        let slot = slots
            .iter()
            .find(|s| s.worker_id.as_deref() == Some("w1b") && s.start == at("2026-10-19T13:00:00Z"))
            .cloned()
            .unwrap();

        svc.request_booking(NewBooking {
            provider_id: "sp1".to_string(),
            service_id: "s1a".to_string(),
            worker_id: Some("w1b".to_string()),
            user_id: "cust1".to_string(),
            slot,
        })
        .await
        .unwrap()
    };

    let svc = open_service(&config).await;
    let slots = svc.get_day_slots("sp1", monday(), "s1a").await.unwrap();
    let booked: Vec<_> = slots.iter().filter(|s| s.is_booked).collect();
    assert_eq!(booked.len(), 1);
    assert_eq!(booked[0].booking_id, Some(booking.id));
    assert_eq!(booked[0].worker_id.as_deref(), Some("w1b"));

    // The 50-minute shave grid on w1b sees the same booking
    let shaves = svc.get_day_slots("sp1", monday(), "s1c").await.unwrap();
    assert!(shaves
        .iter()
        .filter(|s| s.worker_id.as_deref() == Some("w1b") && s.start == at("2026-10-19T13:00:00Z"))
        .all(|s| s.is_booked));

    let schedule = svc.day_schedule("sp1", monday()).await.unwrap();
    assert_eq!(schedule, vec![booking.clone()]);
}

#[tokio::test]
async fn test_cancellation_survives_restart() {
    let temp_dir = TempDir::new().unwrap();
    let config = load_example(temp_dir.path());

    let booking_id = {
        let svc = open_service(&config).await;
        let slots = svc.get_day_slots("sp1", monday(), "s1b").await.unwrap();
        let slot = slots[0].clone();
        let booking = svc
            .request_booking(NewBooking {
                provider_id: "sp1".to_string(),
                service_id: "s1b".to_string(),
                worker_id: slot.worker_id.clone(),
                user_id: "cust2".to_string(),
                slot,
            })
            .await
            .unwrap();
        let cancelled = svc.cancel_booking(booking.id).await.unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        booking.id
    };

    let svc = open_service(&config).await;
    assert_eq!(
        svc.booking(booking_id).await.unwrap().status,
        BookingStatus::Cancelled
    );
    let slots = svc.get_day_slots("sp1", monday(), "s1b").await.unwrap();
    assert!(slots.iter().all(|s| !s.is_booked));

    let err = svc.cancel_booking(booking_id).await.unwrap_err();
    assert!(matches!(err, ReservationError::ValidationError { .. }));
}

#[tokio::test]
async fn test_workerless_provider_uses_its_offset() {
    let temp_dir = TempDir::new().unwrap();
    let config = load_example(temp_dir.path());
    let svc = open_service(&config).await;

    let slots = svc.get_day_slots("sp2", monday(), "s2a").await.unwrap();

    // 08:00-22:00 at UTC+2
    assert_eq!(slots.len(), 14);
    assert_eq!(slots[0].start, at("2026-10-19T06:00:00Z"));
    assert_eq!(slots[13].end, at("2026-10-19T20:00:00Z"));
    assert!(slots.iter().all(|s| s.worker_id.is_none()));

    let err = svc.get_day_slots("sp2", monday(), "s1a").await.unwrap_err();
    assert!(matches!(err, ReservationError::NotFoundError { .. }));
}

#[tokio::test]
async fn test_reviews_of_served_bookings_roll_up() {
    let temp_dir = TempDir::new().unwrap();
    let config = load_example(temp_dir.path());
    let svc = open_service(&config).await;
    let ratings = RatingBook::new();

    let slots = svc.get_day_slots("sp1", monday(), "s1c").await.unwrap();
    for (n, (slot, stars)) in slots.iter().take(3).zip([5u8, 4, 3]).enumerate() {
        let booking = svc
            .request_booking(NewBooking {
                provider_id: "sp1".to_string(),
                service_id: "s1c".to_string(),
                worker_id: slot.worker_id.clone(),
                user_id: format!("cust{}", n),
                slot: slot.clone(),
            })
            .await
            .unwrap();

        ratings
            .record_review(&Review {
                id: format!("rv{}", n),
                provider_id: booking.provider_id.clone(),
                worker_id: booking.worker_id.clone(),
                user_id: booking.user_id.clone(),
                rating: stars,
                comment: String::new(),
                date: booking.end,
            })
            .unwrap();
    }

    // the first three shave slots all belong to w1b, listed first in the roster
    let provider = ratings.provider_rating("sp1");
    assert_eq!(provider.count, 3);
    assert_eq!(provider.average, 4.0);
    assert_eq!(ratings.worker_rating("w1b").count, 3);
    assert_eq!(ratings.worker_rating("w1c").count, 0);
}
