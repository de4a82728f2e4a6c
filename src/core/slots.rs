use crate::domain::model::{Interval, Provider, Service, Slot};
use crate::utils::error::{ReservationError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Where the slot grid of an open sub-interval starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotAlignment {
    /// Every free sub-interval restarts the grid at its own start.
    #[default]
    IntervalStart,
    /// One grid per day anchored at the template opening time.
    TemplateStart,
}

/// Lazily walks free sub-intervals in fixed steps, one resource track.
pub struct SlotTrack<I> {
    intervals: I,
    current: Option<Interval>,
    cursor: DateTime<Utc>,
    step: Duration,
    anchor: Option<DateTime<Utc>>,
    worker_id: Option<String>,
}

impl<I: Iterator<Item = Interval>> SlotTrack<I> {
    /// `None` when the first grid point is not representable.
    fn first_start(&self, interval: &Interval) -> Option<DateTime<Utc>> {
        match self.anchor {
            None => Some(interval.start),
            Some(anchor) => {
                let step = self.step.num_seconds();
                let offset = (interval.start - anchor).num_seconds();
                let steps = -((-offset).div_euclid(step));
                let shift = Duration::try_seconds(steps.checked_mul(step)?)?;
                anchor.checked_add_signed(shift)
            }
        }
    }
}

impl<I: Iterator<Item = Interval>> Iterator for SlotTrack<I> {
    type Item = Slot;

    fn next(&mut self) -> Option<Slot> {
        loop {
            let interval = match self.current {
                Some(interval) => interval,
                None => {
                    let interval = self.intervals.next()?;
                    let Some(start) = self.first_start(&interval) else {
                        continue;
                    };
                    self.cursor = start;
                    self.current = Some(interval);
                    interval
                }
            };

            let end = self.cursor.checked_add_signed(self.step);
            if let Some(end) = end.filter(|end| *end <= interval.end) {
                let slot = Slot::free(self.cursor, end, self.worker_id.clone());
                self.cursor = end;
                return Some(slot);
            }

            // remainder shorter than one step is dropped
            self.current = None;
        }
    }
}

/// Partitions free sub-intervals into `[t, t + duration)` slots for one track.
///
/// With an `anchor`, slot starts stay on the grid `anchor + k * duration`.
pub fn generate_slots<I>(
    sub_intervals: I,
    duration_minutes: i64,
    worker_id: Option<&str>,
    anchor: Option<DateTime<Utc>>,
) -> Result<SlotTrack<I::IntoIter>>
where
    I: IntoIterator<Item = Interval>,
{
    if duration_minutes <= 0 {
        return Err(ReservationError::config(format!(
            "slot duration must be positive, got {} minutes",
            duration_minutes
        )));
    }
    let step = Duration::try_minutes(duration_minutes).ok_or_else(|| {
        ReservationError::config(format!(
            "slot duration of {} minutes is out of range",
            duration_minutes
        ))
    })?;

    Ok(SlotTrack {
        intervals: sub_intervals.into_iter(),
        current: None,
        cursor: DateTime::<Utc>::MIN_UTC,
        step,
        anchor,
        worker_id: worker_id.map(str::to_string),
    })
}

/// Candidate slots for every track of `provider` offering `service`.
///
/// Tracks are concatenated in roster order; a workerless provider has a single
/// shared track. Workers not eligible for the service are skipped, so the
/// result may be empty.
pub fn generate_day_slots<I>(
    provider: &Provider,
    service: &Service,
    sub_intervals: I,
    anchor: Option<DateTime<Utc>>,
) -> Result<Vec<Slot>>
where
    I: IntoIterator<Item = Interval> + Clone,
{
    let mut slots = Vec::new();
    if provider.has_workers() {
        for worker in provider.workers.iter().filter(|w| w.can_perform(&service.id)) {
            let track = generate_slots(
                sub_intervals.clone(),
                service.duration_minutes,
                Some(&worker.id),
                anchor,
            )?;
            slots.extend(track);
        }
    } else {
        slots.extend(generate_slots(sub_intervals, service.duration_minutes, None, anchor)?);
    }

    tracing::debug!(
        "Generated {} slots for provider {} service {} ({} min)",
        slots.len(),
        provider.id,
        service.id,
        service.duration_minutes
    );
    Ok(slots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{WeeklyTemplate, Worker};

    fn at(hm: &str) -> DateTime<Utc> {
        format!("2026-10-19T{}:00Z", hm).parse().unwrap()
    }

    fn starts(slots: &[Slot]) -> Vec<String> {
        slots.iter().map(|s| s.start.format("%H:%M").to_string()).collect()
    }

    #[test]
    fn test_trailing_remainder_is_discarded() {
        let window = vec![Interval::new(at("09:00"), at("17:00"))];
        let slots: Vec<Slot> = generate_slots(window, 45, None, None).unwrap().collect();

        // 16:30 + 45 would end at 17:15
        assert_eq!(slots.len(), 10);
        assert_eq!(slots.first().unwrap().start, at("09:00"));
        assert_eq!(slots.last().unwrap().start, at("15:45"));
        assert_eq!(slots.last().unwrap().end, at("16:30"));
        assert!(slots.iter().all(|s| !s.is_booked && s.booking_id.is_none()));
    }

    #[test]
    fn test_each_sub_interval_restarts_grid() {
        let free = vec![
            Interval::new(at("09:00"), at("12:00")),
            Interval::new(at("13:00"), at("14:40")),
        ];
        let slots: Vec<Slot> = generate_slots(free, 45, Some("w1"), None).unwrap().collect();
        assert_eq!(
            starts(&slots),
            vec!["09:00", "09:45", "10:30", "11:15", "13:00", "13:45"]
        );
        assert!(slots.iter().all(|s| s.worker_id.as_deref() == Some("w1")));
    }

    #[test]
    fn test_template_anchor_keeps_grid() {
        let free = vec![
            Interval::new(at("09:00"), at("12:00")),
            Interval::new(at("13:00"), at("15:00")),
        ];
        let slots: Vec<Slot> = generate_slots(free, 45, None, Some(at("09:00")))
            .unwrap()
            .collect();
        // 13:00 is off-grid; next grid point is 13:30
        assert_eq!(
            starts(&slots),
            vec!["09:00", "09:45", "10:30", "11:15", "13:30", "14:15"]
        );
    }

    #[test]
    fn test_non_positive_duration_rejected() {
        let free = vec![Interval::new(at("09:00"), at("10:00"))];
        assert!(generate_slots(free.clone(), 0, None, None).is_err());
        assert!(generate_slots(free, -15, None, None).is_err());
    }

    #[test]
    fn test_out_of_range_duration_is_config_error() {
        let free = vec![Interval::new(at("09:00"), at("17:00"))];
        let err = generate_slots(free, i64::MAX, None, None).err().unwrap();
        assert!(matches!(err, ReservationError::ConfigError { .. }));
    }

    #[test]
    fn test_step_past_max_instant_ends_track() {
        let free = vec![Interval::new(at("09:00"), at("17:00"))];
        let slots: Vec<Slot> = generate_slots(free.clone(), 1_000_000_000_000, None, None)
            .unwrap()
            .collect();
        assert!(slots.is_empty());

        let anchored: Vec<Slot> =
            generate_slots(free, 1_000_000_000_000, None, Some(at("08:00")))
                .unwrap()
                .collect();
        assert!(anchored.is_empty());
    }

    #[test]
    fn test_tracks_per_eligible_worker() {
        let worker = |id: &str, services: &[&str]| Worker {
            id: id.to_string(),
            name: id.to_string(),
            eligible_service_ids: services.iter().map(|s| s.to_string()).collect(),
        };
        let service = Service {
            id: "s1a".to_string(),
            name: "Classic Haircut".to_string(),
            duration_minutes: 60,
            price: 35.0,
        };
        let provider = Provider {
            id: "sp1".to_string(),
            name: "The Dapper Cut".to_string(),
            utc_offset_minutes: 0,
            weekly: WeeklyTemplate::default(),
            blocked: vec![],
            services: vec![service.clone()],
            workers: vec![
                worker("w1a", &["s1a", "s1b"]),
                worker("w1b", &["s1a"]),
                worker("w1c", &["s1b"]),
            ],
        };
        let free = vec![Interval::new(at("09:00"), at("11:00"))];

        let slots = generate_day_slots(&provider, &service, free, None).unwrap();
        let workers: Vec<_> = slots.iter().map(|s| s.worker_id.clone().unwrap()).collect();
        assert_eq!(workers, vec!["w1a", "w1a", "w1b", "w1b"]);
        assert_eq!(slots[0].start, slots[2].start);
    }
}
