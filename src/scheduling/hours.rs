use time::{Date, OffsetDateTime, Time};

use crate::db::models::BusinessHours;

fn minutes_since_midnight(t: Time) -> u16 {
    u16::from(t.hour()) * 60 + u16::from(t.minute())
}

/// Whether `date` at `time_of_day` falls within the configured operating
/// hours: the weekday must be in the open set, the date must not be a holiday,
/// and the time must satisfy `opening <= t < closing` (half-open upper bound,
/// so a booking at the exact closing time is rejected).
///
/// A missing configuration is treated as always open. This is a deliberate
/// fail-open policy carried over from the original application, not an
/// oversight; callers wanting the standard fallback should pass
/// `Some(&BusinessHours::default())`.
pub fn is_open(hours: Option<&BusinessHours>, date: Date, time_of_day: Time) -> bool {
    let Some(hours) = hours else {
        return true;
    };
    if !hours.open_days.contains(&date.weekday()) {
        return false;
    }
    if hours.holidays.iter().any(|holiday| holiday.date == date) {
        return false;
    }
    let target = minutes_since_midnight(time_of_day);
    minutes_since_midnight(hours.opening) <= target
        && target < minutes_since_midnight(hours.closing)
}

/// Convenience form of [`is_open`] for a full instant.
pub fn is_open_at(hours: Option<&BusinessHours>, instant: OffsetDateTime) -> bool {
    is_open(hours, instant.date(), instant.time())
}
