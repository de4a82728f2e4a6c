use crate::core::calendar::{local_date, resolve_window, to_instant};
use crate::core::exceptions::subtract_blocked;
use crate::core::slots::{generate_day_slots, SlotAlignment};
use crate::domain::model::{Booking, Interval, NewBooking, Provider, ResourceKey, Slot};
use crate::domain::ports::{BookingLedger, ProviderCatalog};
use crate::utils::error::{ReservationError, Result};
use chrono::{Days, NaiveDate, NaiveTime};
use std::collections::HashMap;
use uuid::Uuid;

/// Entry point for availability queries and booking commands.
///
/// Slot generation is pure and runs without locks; only the ledger
/// serializes, per resource key.
pub struct AvailabilityService<C, L> {
    catalog: C,
    ledger: L,
    alignment: SlotAlignment,
}

impl<C: ProviderCatalog, L: BookingLedger> AvailabilityService<C, L> {
    pub fn new(catalog: C, ledger: L) -> Self {
        Self {
            catalog,
            ledger,
            alignment: SlotAlignment::default(),
        }
    }

    pub fn with_alignment(mut self, alignment: SlotAlignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn resolve_window(&self, provider_id: &str, date: NaiveDate) -> Result<Option<Interval>> {
        let provider = self.catalog.provider(provider_id)?;
        resolve_window(&provider, date)
    }

    /// Unannotated slots of `provider` on `date` for one service.
    pub fn candidate_slots(
        &self,
        provider: &Provider,
        date: NaiveDate,
        service_id: &str,
    ) -> Result<Vec<Slot>> {
        let service = provider
            .service(service_id)
            .ok_or_else(|| ReservationError::not_found("service", service_id))?;

        let Some(window) = resolve_window(provider, date)? else {
            return Ok(Vec::new());
        };

        let free = subtract_blocked(window, &provider.blocked);
        let anchor = match self.alignment {
            SlotAlignment::IntervalStart => None,
            SlotAlignment::TemplateStart => Some(window.start),
        };
        generate_day_slots(provider, service, &free, anchor)
    }

    /// The day's slots for `service_id`, each marked with any confirmed booking
    /// overlapping it.
    pub async fn get_day_slots(
        &self,
        provider_id: &str,
        date: NaiveDate,
        service_id: &str,
    ) -> Result<Vec<Slot>> {
        let provider = self.catalog.provider(provider_id)?;
        self.annotated_slots(&provider, date, service_id).await
    }

    async fn annotated_slots(
        &self,
        provider: &Provider,
        date: NaiveDate,
        service_id: &str,
    ) -> Result<Vec<Slot>> {
        let mut slots = self.candidate_slots(provider, date, service_id)?;

        let mut snapshots: HashMap<Option<String>, Vec<Booking>> = HashMap::new();
        for slot in slots.iter_mut() {
            if !snapshots.contains_key(&slot.worker_id) {
                let key = ResourceKey::new(&provider.id, slot.worker_id.as_deref());
                let bookings = self.ledger.confirmed_bookings(&key).await;
                snapshots.insert(slot.worker_id.clone(), bookings);
            }

            let wanted = slot.interval();
            if let Some(booking) = snapshots
                .get(&slot.worker_id)
                .and_then(|bookings| bookings.iter().find(|b| b.interval().overlaps(&wanted)))
            {
                slot.is_booked = true;
                slot.booking_id = Some(booking.id);
            }
        }

        tracing::debug!(
            "Provider {} on {} for service {}: {} slots, {} booked",
            provider.id,
            date,
            service_id,
            slots.len(),
            slots.iter().filter(|s| s.is_booked).count()
        );
        Ok(slots)
    }

    /// Books `details.slot` after checking it is still a free slot of the
    /// provider's day for that service.
    pub async fn request_booking(&self, details: NewBooking) -> Result<Booking> {
        let provider = self.catalog.provider(&details.provider_id)?;
        if let Some(worker_id) = details.worker_id.as_deref() {
            provider
                .worker(worker_id)
                .ok_or_else(|| ReservationError::not_found("worker", worker_id))?;
        }

        let date = local_date(&provider, details.slot.start)?;
        let current = self
            .annotated_slots(&provider, date, &details.service_id)
            .await?;

        let matches_request = |slot: &Slot| {
            slot.same_window(&details.slot) && slot.worker_id == details.worker_id
        };
        let Some(slot) = current.into_iter().find(|s| matches_request(s) && !s.is_booked) else {
            tracing::warn!(
                "Rejecting booking of stale or unknown slot {} for provider {}",
                details.slot,
                provider.id
            );
            return Err(ReservationError::ConflictError { slot: details.slot });
        };

        self.ledger
            .create_booking(NewBooking { slot, ..details })
            .await
    }

    pub async fn occupied_intervals(
        &self,
        provider_id: &str,
        worker_id: Option<&str>,
    ) -> Result<Vec<Interval>> {
        let provider = self.catalog.provider(provider_id)?;
        if let Some(worker_id) = worker_id {
            provider
                .worker(worker_id)
                .ok_or_else(|| ReservationError::not_found("worker", worker_id))?;
        }
        Ok(self.ledger.occupied_intervals(provider_id, worker_id).await)
    }

    pub async fn cancel_booking(&self, booking_id: Uuid) -> Result<Booking> {
        self.ledger.cancel_booking(booking_id).await
    }

    pub async fn booking(&self, booking_id: Uuid) -> Result<Booking> {
        self.ledger.booking(booking_id).await
    }

    pub async fn bookings_for_user(&self, user_id: &str) -> Vec<Booking> {
        self.ledger.bookings_for_user(user_id).await
    }

    /// Every confirmed booking of the provider on its local `date`, across workers.
    pub async fn day_schedule(&self, provider_id: &str, date: NaiveDate) -> Result<Vec<Booking>> {
        let provider = self.catalog.provider(provider_id)?;
        let next_day = date
            .checked_add_days(Days::new(1))
            .ok_or_else(|| ReservationError::validation(format!("date {} out of range", date)))?;
        let day = Interval::new(
            to_instant(&provider, date, NaiveTime::MIN)?,
            to_instant(&provider, next_day, NaiveTime::MIN)?,
        );
        Ok(self.ledger.bookings_for_provider(provider_id, day).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::catalog::InMemoryCatalog;
    use crate::adapters::journal::MemoryJournal;
    use crate::core::ledger::Ledger;
    use crate::domain::model::{BlockedInterval, Service, WeeklyTemplate, Worker};
    use chrono::{DateTime, Utc, Weekday};

    fn at(hm: &str) -> DateTime<Utc> {
        format!("2026-10-19T{}:00Z", hm).parse().unwrap()
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn barber(workers: Vec<Worker>, blocked: Vec<BlockedInterval>) -> Provider {
        Provider {
            id: "sp1".to_string(),
            name: "The Dapper Cut".to_string(),
            utc_offset_minutes: 0,
            weekly: WeeklyTemplate::uniform(
                NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
                &[Weekday::Mon, Weekday::Tue],
            ),
            blocked,
            services: vec![
                Service {
                    id: "s1a".to_string(),
                    name: "Classic Haircut".to_string(),
                    duration_minutes: 45,
                    price: 35.0,
                },
                Service {
                    id: "s1b".to_string(),
                    name: "Beard Trim".to_string(),
                    duration_minutes: 20,
                    price: 20.0,
                },
            ],
            workers,
        }
    }

    fn worker(id: &str, services: &[&str]) -> Worker {
        Worker {
            id: id.to_string(),
            name: id.to_string(),
            eligible_service_ids: services.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn service_for(
        provider: Provider,
    ) -> AvailabilityService<InMemoryCatalog, Ledger<MemoryJournal>> {
        AvailabilityService::new(
            InMemoryCatalog::new(vec![provider]),
            Ledger::new(MemoryJournal::new()),
        )
    }

    #[tokio::test]
    async fn test_booked_slot_is_annotated() {
        let svc = service_for(barber(vec![worker("w1a", &["s1a"])], vec![]));
        let slots = svc.get_day_slots("sp1", monday(), "s1a").await.unwrap();
        let booking = svc
            .request_booking(NewBooking {
                provider_id: "sp1".to_string(),
                service_id: "s1a".to_string(),
                worker_id: Some("w1a".to_string()),
                user_id: "cust1".to_string(),
                slot: slots[1].clone(),
            })
            .await
            .unwrap();

        let after = svc.get_day_slots("sp1", monday(), "s1a").await.unwrap();
        assert_eq!(after.len(), slots.len());
        assert!(after[1].is_booked);
        assert_eq!(after[1].booking_id, Some(booking.id));
        assert_eq!(after.iter().filter(|s| s.is_booked).count(), 1);
    }

    #[tokio::test]
    async fn test_other_service_grid_sees_overlap() {
        let svc = service_for(barber(vec![], vec![]));
        let haircut = svc.get_day_slots("sp1", monday(), "s1a").await.unwrap();
        svc.request_booking(NewBooking {
            provider_id: "sp1".to_string(),
            service_id: "s1a".to_string(),
            worker_id: None,
            user_id: "cust1".to_string(),
            slot: haircut[0].clone(),
        })
        .await
        .unwrap();

        // 20-minute grid: 09:00, 09:20 and 09:40 all overlap 09:00-09:45
        let trims = svc.get_day_slots("sp1", monday(), "s1b").await.unwrap();
        let booked: Vec<_> = trims.iter().filter(|s| s.is_booked).map(|s| s.start).collect();
        assert_eq!(booked, vec![at("09:00"), at("09:20"), at("09:40")]);
    }

    #[tokio::test]
    async fn test_fabricated_slot_is_conflict() {
        let svc = service_for(barber(vec![], vec![]));
        let err = svc
            .request_booking(NewBooking {
                provider_id: "sp1".to_string(),
                service_id: "s1a".to_string(),
                worker_id: None,
                user_id: "cust1".to_string(),
                slot: Slot::free(at("09:10"), at("09:55"), None),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::ConflictError { .. }));
        assert!(svc.occupied_intervals("sp1", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_ids_are_not_found() {
        let svc = service_for(barber(vec![worker("w1a", &["s1a"])], vec![]));
        assert!(matches!(
            svc.get_day_slots("nope", monday(), "s1a").await,
            Err(ReservationError::NotFoundError { kind: "provider", .. })
        ));
        assert!(matches!(
            svc.get_day_slots("sp1", monday(), "s9").await,
            Err(ReservationError::NotFoundError { kind: "service", .. })
        ));
        assert!(matches!(
            svc.occupied_intervals("sp1", Some("w9")).await,
            Err(ReservationError::NotFoundError { kind: "worker", .. })
        ));
    }

    #[tokio::test]
    async fn test_template_alignment_skips_off_grid_start() {
        let lunch = BlockedInterval {
            id: "bt1".to_string(),
            start: at("12:00"),
            end: at("13:00"),
            reason: Some("Lunch".to_string()),
        };
        let svc = service_for(barber(vec![], vec![lunch])).with_alignment(SlotAlignment::TemplateStart);
        let slots = svc.get_day_slots("sp1", monday(), "s1a").await.unwrap();
        let afternoon: Vec<_> = slots.iter().filter(|s| s.start >= at("12:00")).collect();
        assert_eq!(afternoon[0].start, at("13:30"));
    }

    #[tokio::test]
    async fn test_day_schedule_spans_workers() {
        let svc = service_for(barber(
            vec![worker("w1a", &["s1a"]), worker("w1b", &["s1a"])],
            vec![],
        ));
        let slots = svc.get_day_slots("sp1", monday(), "s1a").await.unwrap();
        for slot in slots.iter().filter(|s| s.start == at("10:30")) {
            svc.request_booking(NewBooking {
                provider_id: "sp1".to_string(),
                service_id: "s1a".to_string(),
                worker_id: slot.worker_id.clone(),
                user_id: "cust1".to_string(),
                slot: slot.clone(),
            })
            .await
            .unwrap();
        }

        let schedule = svc.day_schedule("sp1", monday()).await.unwrap();
        assert_eq!(schedule.len(), 2);
        let tuesday = monday().succ_opt().unwrap();
        assert!(svc.day_schedule("sp1", tuesday).await.unwrap().is_empty());
    }
}
