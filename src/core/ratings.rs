use crate::domain::model::Review;
use crate::utils::error::{ReservationError, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Subject {
    Provider(String),
    Worker(String),
}

#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    sum: u64,
    count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rating {
    /// Mean rating rounded to one decimal; 0.0 without reviews.
    pub average: f64,
    pub count: u64,
}

/// Running rating totals per provider and per worker.
///
/// Reviews are folded in as they arrive; reads never rescan history.
#[derive(Debug, Default)]
pub struct RatingBook {
    tallies: RwLock<HashMap<Subject, Tally>>,
}

impl RatingBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_review(&self, review: &Review) -> Result<()> {
        if !(1..=5).contains(&review.rating) {
            return Err(ReservationError::validation(format!(
                "rating must be between 1 and 5, got {}",
                review.rating
            )));
        }

        let mut tallies = self.tallies.write().unwrap_or_else(PoisonError::into_inner);
        let mut subjects = vec![Subject::Provider(review.provider_id.clone())];
        if let Some(worker_id) = &review.worker_id {
            subjects.push(Subject::Worker(worker_id.clone()));
        }
        for subject in subjects {
            let tally = tallies.entry(subject).or_default();
            tally.sum += u64::from(review.rating);
            tally.count += 1;
        }

        tracing::debug!(
            "Recorded {}-star review {} for provider {}",
            review.rating,
            review.id,
            review.provider_id
        );
        Ok(())
    }

    pub fn provider_rating(&self, provider_id: &str) -> Rating {
        self.rating(&Subject::Provider(provider_id.to_string()))
    }

    pub fn worker_rating(&self, worker_id: &str) -> Rating {
        self.rating(&Subject::Worker(worker_id.to_string()))
    }

    fn rating(&self, subject: &Subject) -> Rating {
        let tally = self
            .tallies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(subject)
            .copied()
            .unwrap_or_default();

        let average = if tally.count == 0 {
            0.0
        } else {
            (tally.sum as f64 / tally.count as f64 * 10.0).round() / 10.0
        };
        Rating {
            average,
            count: tally.count,
        }
    }
}
