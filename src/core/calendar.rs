use crate::domain::model::{DayTemplate, Interval, Provider};
use crate::utils::error::{ReservationError, Result};
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Utc};

/// Looks up the single template entry for `date`'s weekday.
pub fn day_template<'a>(provider: &'a Provider, date: NaiveDate) -> Result<&'a DayTemplate> {
    let weekday = date.weekday();
    let mut matches = provider
        .weekly
        .days
        .iter()
        .filter(|d| d.day_of_week == weekday);

    let entry = matches.next().ok_or_else(|| {
        ReservationError::config(format!(
            "provider {} has no weekly template entry for {}",
            provider.id, weekday
        ))
    })?;

    if matches.next().is_some() {
        return Err(ReservationError::config(format!(
            "provider {} has more than one weekly template entry for {}",
            provider.id, weekday
        )));
    }

    Ok(entry)
}

/// Resolves the provider's open window on `date` as absolute instants.
///
/// `Ok(None)` means the weekday is disabled; a missing entry is a configuration error.
pub fn resolve_window(provider: &Provider, date: NaiveDate) -> Result<Option<Interval>> {
    let entry = day_template(provider, date)?;
    if !entry.enabled {
        tracing::debug!("Provider {} closed on {} ({})", provider.id, date, entry.day_of_week);
        return Ok(None);
    }

    if entry.open >= entry.close {
        return Err(ReservationError::config(format!(
            "provider {} opens at {} but closes at {} on {}",
            provider.id, entry.open, entry.close, entry.day_of_week
        )));
    }

    let open = to_instant(provider, date, entry.open)?;
    let close = to_instant(provider, date, entry.close)?;
    Ok(Some(Interval::new(open, close)))
}

/// Anchors a provider-local wall-clock time on `date`.
pub fn to_instant(provider: &Provider, date: NaiveDate, time: NaiveTime) -> Result<DateTime<Utc>> {
    let offset = provider.offset().ok_or_else(|| ReservationError::InvalidConfigValueError {
        field: "utc_offset_minutes".to_string(),
        value: provider.utc_offset_minutes.to_string(),
        reason: "offset must be within +/- 24 hours".to_string(),
    })?;

    offset
        .from_local_datetime(&date.and_time(time))
        .single()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| {
            ReservationError::config(format!(
                "{} {} is not a valid local time for provider {}",
                date, time, provider.id
            ))
        })
}

/// Provider-local calendar date of an instant.
pub fn local_date(provider: &Provider, instant: DateTime<Utc>) -> Result<NaiveDate> {
    let offset = provider.offset().ok_or_else(|| ReservationError::InvalidConfigValueError {
        field: "utc_offset_minutes".to_string(),
        value: provider.utc_offset_minutes.to_string(),
        reason: "offset must be within +/- 24 hours".to_string(),
    })?;
    Ok(instant.with_timezone(&offset).date_naive())
}
