use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::OffsetDateTime;
use validator::Validate;

/// An administrator-declared interval during which a provider is unavailable.
///
/// When `all_day` is set the block covers the entire calendar day of
/// `start_time`; the time-of-day components are ignored by the conflict checks.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct BlockedTime {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub start_time: OffsetDateTime,
    pub end_time: OffsetDateTime,
    pub title: String,
    pub all_day: bool,
    pub created_by: Uuid,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewBlockedTime {
    pub provider_id: Uuid,
    pub start_time: OffsetDateTime,
    pub end_time: OffsetDateTime,
    #[validate(length(min = 1))]
    pub title: String,
    pub all_day: bool,
    pub created_by: Uuid,
}
