//! Pure scheduling decisions: interval overlap, blocked-time and
//! double-booking checks, business-hours evaluation and the
//! next-available-slot search. No function here performs I/O; callers supply
//! snapshots of the relevant records.

mod conflict;
mod hours;
mod interval;
mod slots;

pub use conflict::{check_booking, BookingDecision, Conflict, ConflictKind};
pub use hours::{is_open, is_open_at};
pub use interval::{overlaps, TimeSlot};
pub use slots::{next_available_slot, SEARCH_QUANTUM_MINUTES};
