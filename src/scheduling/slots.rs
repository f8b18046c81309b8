use time::macros::time;
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::db::models::{Appointment, BlockedTime};
use crate::error::SchedulingError;

use super::conflict::provider_is_free;
use super::interval::TimeSlot;

/// Candidate starts advance in 15-minute steps.
pub const SEARCH_QUANTUM_MINUTES: i64 = 15;

/// Past this hour the search gives up on the current day and resumes at the
/// next morning's opening.
const DAY_END_HOUR: u8 = 22;
const NEXT_DAY_START: time::Time = time!(8:00);

/// Find the earliest start at or after `preferred_start` for which
/// `[start, start + duration)` is free for the provider, considering the
/// provider's non-cancelled appointments and blocked times.
///
/// The client dimension and business hours are not consulted here; callers
/// that care must re-validate the suggestion with the full booking check.
///
/// The search never runs unbounded: once a candidate start would land
/// `horizon_days` days or more past `preferred_start`, the search stops and
/// `Ok(None)` is returned.
pub fn next_available_slot(
    provider_id: Uuid,
    preferred_start: OffsetDateTime,
    duration: Duration,
    appointments: &[Appointment],
    blocked_times: &[BlockedTime],
    horizon_days: u32,
) -> Result<Option<OffsetDateTime>, SchedulingError> {
    if duration <= Duration::ZERO {
        return Err(SchedulingError::InvalidInterval);
    }
    let horizon_end = preferred_start + Duration::days(i64::from(horizon_days));

    let mut candidate = preferred_start;
    loop {
        // Late-evening rollover: resume at the next morning's opening.
        if candidate.hour() >= DAY_END_HOUR {
            candidate = (candidate + Duration::days(1)).replace_time(NEXT_DAY_START);
            continue;
        }
        if candidate >= horizon_end {
            debug!(
                %provider_id,
                horizon_days,
                "slot search exhausted its horizon"
            );
            return Ok(None);
        }
        let slot = TimeSlot::from_duration(candidate, duration)?;
        if provider_is_free(provider_id, &slot, appointments, blocked_times) {
            return Ok(Some(candidate));
        }
        candidate += Duration::minutes(SEARCH_QUANTUM_MINUTES);
    }
}
