use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::db::models::{Appointment, BlockedTime};

use super::interval::TimeSlot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// The provider already holds a non-cancelled appointment in this range.
    ProviderConflict,
    /// The client already holds a non-cancelled appointment in this range.
    ClientConflict,
    /// An administrator blocked this range for the provider.
    BlockedTime,
}

/// A single detected conflict, tagged with the record that caused it so the
/// caller can explain the rejection ("this provider is already booked then"
/// vs. "this time is blocked").
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    pub kind: ConflictKind,
    pub source_id: Uuid,
}

/// Outcome of a booking check. Conflicts are ordered by the fixed priority
/// provider, then client, then blocked time; the first entry is the primary
/// reason reported to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingDecision {
    Accepted,
    Rejected(Vec<Conflict>),
}

impl BookingDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, BookingDecision::Accepted)
    }

    pub fn primary_conflict(&self) -> Option<&Conflict> {
        match self {
            BookingDecision::Accepted => None,
            BookingDecision::Rejected(conflicts) => conflicts.first(),
        }
    }
}

/// Whether a blocked-time record rules out the candidate slot.
///
/// All-day blocks match on the calendar date of the candidate's *start* only.
/// A candidate that begins the evening before and runs past midnight into the
/// blocked day is not caught by this rule; timed blocks should be used when
/// that matters.
fn blocks(slot: &TimeSlot, block: &BlockedTime) -> bool {
    if block.all_day {
        block.start_time.date() == slot.start().date()
    } else {
        slot.overlaps_range(block.start_time, block.end_time)
    }
}

/// Decide whether a candidate appointment for `provider_id`/`client_id` over
/// `slot` conflicts with the supplied snapshot of appointments and blocked
/// times. `exclude_id` removes the appointment being edited from the scan so a
/// reschedule never collides with its own prior slot.
///
/// All three checks run even after one fails, so the rejection carries the
/// complete diagnostic; the priority order of the returned conflicts is
/// provider, client, blocked time.
pub fn check_booking(
    provider_id: Uuid,
    client_id: Uuid,
    slot: TimeSlot,
    exclude_id: Option<Uuid>,
    appointments: &[Appointment],
    blocked_times: &[BlockedTime],
) -> BookingDecision {
    let relevant =
        |appt: &Appointment| appt.status.is_active() && Some(appt.id) != exclude_id;

    let mut conflicts: Vec<Conflict> = Vec::new();

    conflicts.extend(
        appointments
            .iter()
            .filter(|appt| relevant(appt))
            .filter(|appt| appt.provider_id == provider_id)
            .filter(|appt| slot.overlaps_range(appt.start_time, appt.end_time))
            .map(|appt| Conflict {
                kind: ConflictKind::ProviderConflict,
                source_id: appt.id,
            }),
    );

    conflicts.extend(
        appointments
            .iter()
            .filter(|appt| relevant(appt))
            .filter(|appt| appt.client_id == client_id)
            .filter(|appt| slot.overlaps_range(appt.start_time, appt.end_time))
            .map(|appt| Conflict {
                kind: ConflictKind::ClientConflict,
                source_id: appt.id,
            }),
    );

    conflicts.extend(
        blocked_times
            .iter()
            .filter(|block| block.provider_id == provider_id)
            .filter(|block| blocks(&slot, block))
            .map(|block| Conflict {
                kind: ConflictKind::BlockedTime,
                source_id: block.id,
            }),
    );

    if conflicts.is_empty() {
        BookingDecision::Accepted
    } else {
        debug!(
            %provider_id,
            %client_id,
            conflicts = conflicts.len(),
            primary = ?conflicts[0].kind,
            "booking candidate rejected"
        );
        BookingDecision::Rejected(conflicts)
    }
}

/// Provider-side availability used by the slot search: the provider's own
/// appointments plus blocked times, ignoring the client dimension.
pub(super) fn provider_is_free(
    provider_id: Uuid,
    slot: &TimeSlot,
    appointments: &[Appointment],
    blocked_times: &[BlockedTime],
) -> bool {
    let booked = appointments.iter().any(|appt| {
        appt.status.is_active()
            && appt.provider_id == provider_id
            && slot.overlaps_range(appt.start_time, appt.end_time)
    });
    if booked {
        return false;
    }
    !blocked_times
        .iter()
        .any(|block| block.provider_id == provider_id && blocks(slot, block))
}
