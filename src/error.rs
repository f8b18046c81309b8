use thiserror::Error;
use uuid::Uuid;

use crate::db::models::AppointmentStatus;
use crate::db::DatabaseError;

/// Hard failures of the scheduling core.
///
/// Conflict outcomes (provider double-booked, blocked time, outside business
/// hours) are not errors; they are normal decisions carried by
/// [`crate::scheduling::BookingDecision`] and [`crate::booking::BookingOutcome`].
#[derive(Debug, Error)]
pub enum SchedulingError {
    #[error("invalid interval: start must be strictly before end")]
    InvalidInterval,

    #[error("validation error: {0}")]
    Validation(String),

    #[error("invalid business hours configuration: {0}")]
    InvalidConfiguration(String),

    #[error("no available slot within {horizon_days} days")]
    NoSlotFound { horizon_days: u32 },

    #[error("invalid status transition from {from:?} to {to:?}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("appointment not found: {0}")]
    NotFound(Uuid),

    #[error("database error: {0}")]
    Database(#[from] DatabaseError),
}

pub type SchedulingResult<T> = Result<T, SchedulingError>;
