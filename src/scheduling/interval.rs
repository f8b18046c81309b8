use time::{Duration, OffsetDateTime};

use crate::error::SchedulingError;

/// Half-open interval overlap: `[a_start, a_end)` intersects `[b_start, b_end)`
/// iff `a_start < b_end && b_start < a_end`. Zero-length intervals never
/// overlap anything, including themselves at the same instant.
pub fn overlaps(
    a_start: OffsetDateTime,
    a_end: OffsetDateTime,
    b_start: OffsetDateTime,
    b_end: OffsetDateTime,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// A validated half-open time range. Construction fails unless
/// `start < end`, so every `TimeSlot` has positive duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlot {
    start: OffsetDateTime,
    end: OffsetDateTime,
}

impl TimeSlot {
    pub fn new(start: OffsetDateTime, end: OffsetDateTime) -> Result<Self, SchedulingError> {
        if start >= end {
            return Err(SchedulingError::InvalidInterval);
        }
        Ok(Self { start, end })
    }

    pub fn from_duration(start: OffsetDateTime, duration: Duration) -> Result<Self, SchedulingError> {
        Self::new(start, start + duration)
    }

    pub fn start(&self) -> OffsetDateTime {
        self.start
    }

    pub fn end(&self) -> OffsetDateTime {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn overlaps_range(&self, other_start: OffsetDateTime, other_end: OffsetDateTime) -> bool {
        overlaps(self.start, self.end, other_start, other_end)
    }

    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.overlaps_range(other.start, other.end)
    }
}
