use crate::domain::error::DomainError;
use crate::domain::models::{DayOfWeek, RecurringDay};

pub const SECONDS_PER_DAY: u32 = 24 * 3600;

/// Parses a wall-clock `HH:mm` string into seconds since midnight.
pub fn time_to_seconds(value: &str) -> Result<u32, DomainError> {
    let invalid = || DomainError::InvalidFormat(format!("expected HH:mm, got '{value}'"));

    let mut split = value.trim().split(':');
    let (Some(hour_str), Some(minute_str), None) = (split.next(), split.next(), split.next())
    else {
        return Err(invalid());
    };

    let hours = parse_component(hour_str).ok_or_else(invalid)?;
    let minutes = parse_component(minute_str).ok_or_else(invalid)?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }
    Ok(hours * 3600 + minutes * 60)
}

fn parse_component(raw: &str) -> Option<u32> {
    if raw.is_empty() || !raw.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// Length of the window from `start` to `end`. An `end` earlier than `start`
/// means the window crosses midnight.
pub fn seconds_between(start: &str, end: &str) -> Result<u32, DomainError> {
    let start_seconds = time_to_seconds(start)?;
    let end_seconds = time_to_seconds(end)?;

    if end_seconds < start_seconds {
        return Ok(SECONDS_PER_DAY - start_seconds + end_seconds);
    }
    Ok(end_seconds - start_seconds)
}

/// Forward distance in days from `today` to `target`, in `0..7`.
pub fn days_until(today: DayOfWeek, target: DayOfWeek) -> u8 {
    (target.index() + 7 - today.index()) % 7
}

/// Position of the entry whose weekday comes soonest, counting today as
/// distance 0. Equal distances keep the earlier position.
pub fn closest_recurring_day(
    days: &[RecurringDay],
    today: DayOfWeek,
) -> Result<usize, DomainError> {
    days.iter()
        .enumerate()
        .min_by_key(|(position, entry)| (days_until(today, entry.day), *position))
        .map(|(position, _)| position)
        .ok_or(DomainError::NoSchedule)
}

/// Position of today's entry, falling back to the nearest upcoming one.
pub fn resolve_day_entry(days: &[RecurringDay], today: DayOfWeek) -> Result<usize, DomainError> {
    if let Some(position) = days.iter().position(|entry| entry.day == today) {
        return Ok(position);
    }
    closest_recurring_day(days, today).map_err(|_| DomainError::NoMatchingDay)
}
