//! Scheduling conflict resolution core for the salon admin backend.
//!
//! The crate decides whether a proposed appointment time range for a provider
//! and client is permissible, given existing non-cancelled appointments,
//! administrator-defined blocked time ranges and the configured business hours.
//! The checks themselves are pure functions over in-memory snapshots; the
//! [`booking::BookingService`] wires them to a persistence gateway and handles
//! the fetch/check/write sequence.

pub mod booking;
pub mod config;
pub mod db;
pub mod error;
pub mod scheduling;

pub use booking::{BookingOutcome, BookingService, ScheduleStore};
pub use db::{
    Appointment, AppointmentStatus, BlockedTime, BusinessHours, DatabaseError, NewAppointment,
    NewBlockedTime,
};
pub use error::{SchedulingError, SchedulingResult};
pub use scheduling::{
    check_booking, is_open, next_available_slot, BookingDecision, Conflict, ConflictKind, TimeSlot,
};
