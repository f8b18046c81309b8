//! Orchestration around the pure checks: fetch a snapshot from the schedule
//! store, run the conflict checks against it, then write. Booking and
//! rescheduling for a given provider are serialized through a per-provider
//! async lock so two local booking attempts cannot both pass the check phase
//! against the same stale snapshot.

mod memory;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::config::SchedulingConfig;
use crate::db::models::{
    Appointment, AppointmentStatus, BlockedTime, BusinessHours, NewAppointment,
};
use crate::db::DatabaseError;
use crate::error::{SchedulingError, SchedulingResult};
use crate::scheduling::{check_booking, is_open_at, next_available_slot, BookingDecision, Conflict, TimeSlot};

pub use memory::InMemoryScheduleStore;

/// Read/write interface of the persistence gateway. The booking service only
/// ever sees either a valid snapshot or an explicit failure, never a partial
/// one.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Appointments whose interval intersects `[from, to)`, optionally scoped
    /// by provider and/or client. Cancelled appointments are included; the
    /// conflict checks filter them.
    async fn appointments_in_range(
        &self,
        provider_id: Option<Uuid>,
        client_id: Option<Uuid>,
        from: OffsetDateTime,
        to: OffsetDateTime,
    ) -> Result<Vec<Appointment>, DatabaseError>;

    async fn blocked_times(&self, provider_id: Uuid) -> Result<Vec<BlockedTime>, DatabaseError>;

    /// The tenant-wide singleton configuration, absent when never saved.
    async fn business_hours(&self) -> Result<Option<BusinessHours>, DatabaseError>;

    async fn insert_appointment(
        &self,
        appointment: &NewAppointment,
    ) -> Result<Appointment, DatabaseError>;

    async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>, DatabaseError>;

    async fn reschedule_appointment(
        &self,
        id: Uuid,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<Appointment, DatabaseError>;

    async fn update_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, DatabaseError>;
}

/// Result of a booking or reschedule attempt. Rejections keep the full
/// conflict diagnostic so the caller can tell the user which rule fired.
#[derive(Debug)]
pub enum BookingOutcome {
    Booked(Appointment),
    Rejected(Vec<Conflict>),
    OutsideBusinessHours,
}

impl BookingOutcome {
    pub fn is_booked(&self) -> bool {
        matches!(self, BookingOutcome::Booked(_))
    }
}

pub struct BookingService<S> {
    store: Arc<S>,
    config: SchedulingConfig,
    // One entry per provider ever booked through this service; entries are
    // never evicted, so the map is bounded by the tenant's provider count.
    provider_locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl<S: ScheduleStore> BookingService<S> {
    pub fn new(store: Arc<S>, config: SchedulingConfig) -> Self {
        Self {
            store,
            config,
            provider_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Book a new appointment. The conflict check and the insert run under the
    /// provider's lock, so concurrent local bookings for the same provider are
    /// serialized; writers in other processes are not covered by this lock.
    pub async fn book(&self, request: NewAppointment) -> SchedulingResult<BookingOutcome> {
        request
            .validate()
            .map_err(|e| SchedulingError::Validation(e.to_string()))?;
        let slot = TimeSlot::new(request.start_time, request.end_time())?;

        let lock = self.provider_lock(request.provider_id).await;
        let _guard = lock.lock().await;

        if self.config.enforce_business_hours {
            let hours = self.fetch_business_hours().await?;
            if !is_open_at(hours.as_ref(), slot.start()) {
                info!(provider_id = %request.provider_id, "booking outside business hours");
                return Ok(BookingOutcome::OutsideBusinessHours);
            }
        }

        let (appointments, blocked) = self.fetch_snapshot(request.provider_id, slot).await?;
        match check_booking(
            request.provider_id,
            request.client_id,
            slot,
            None,
            &appointments,
            &blocked,
        ) {
            BookingDecision::Accepted => {
                let appointment = self.store.insert_appointment(&request).await?;
                info!(appointment_id = %appointment.id, provider_id = %appointment.provider_id, "appointment booked");
                Ok(BookingOutcome::Booked(appointment))
            }
            BookingDecision::Rejected(conflicts) => Ok(BookingOutcome::Rejected(conflicts)),
        }
    }

    /// Move an existing appointment to a new time range, excluding the
    /// appointment itself from the conflict scan.
    pub async fn reschedule(
        &self,
        id: Uuid,
        new_start: OffsetDateTime,
        new_end: OffsetDateTime,
    ) -> SchedulingResult<BookingOutcome> {
        let slot = TimeSlot::new(new_start, new_end)?;
        let current = self
            .store
            .get_appointment(id)
            .await?
            .ok_or(SchedulingError::NotFound(id))?;

        let lock = self.provider_lock(current.provider_id).await;
        let _guard = lock.lock().await;

        if self.config.enforce_business_hours {
            let hours = self.fetch_business_hours().await?;
            if !is_open_at(hours.as_ref(), slot.start()) {
                return Ok(BookingOutcome::OutsideBusinessHours);
            }
        }

        let (appointments, blocked) = self.fetch_snapshot(current.provider_id, slot).await?;
        match check_booking(
            current.provider_id,
            current.client_id,
            slot,
            Some(id),
            &appointments,
            &blocked,
        ) {
            BookingDecision::Accepted => {
                let updated = self
                    .store
                    .reschedule_appointment(id, slot.start(), slot.end())
                    .await?;
                info!(appointment_id = %id, "appointment rescheduled");
                Ok(BookingOutcome::Booked(updated))
            }
            BookingDecision::Rejected(conflicts) => Ok(BookingOutcome::Rejected(conflicts)),
        }
    }

    pub async fn confirm(&self, id: Uuid) -> SchedulingResult<Appointment> {
        self.transition(id, AppointmentStatus::Confirmed).await
    }

    pub async fn complete(&self, id: Uuid) -> SchedulingResult<Appointment> {
        self.transition(id, AppointmentStatus::Completed).await
    }

    /// Cancellation is a status write; the row is never removed.
    pub async fn cancel(&self, id: Uuid) -> SchedulingResult<Appointment> {
        self.transition(id, AppointmentStatus::Cancelled).await
    }

    /// Earliest free start for the provider at or after `preferred_start`,
    /// within the configured day horizon. Exhausting the horizon is an
    /// explicit `NoSlotFound` error, not an endless loop.
    pub async fn suggest_slot(
        &self,
        provider_id: Uuid,
        preferred_start: OffsetDateTime,
        duration_minutes: i64,
    ) -> SchedulingResult<OffsetDateTime> {
        let duration = Duration::minutes(duration_minutes);
        let horizon_days = self.config.search_horizon_days;
        let search_end = preferred_start + Duration::days(i64::from(horizon_days)) + duration;
        let (appointments, blocked) = self
            .fetch_range(provider_id, preferred_start, search_end)
            .await?;
        next_available_slot(
            provider_id,
            preferred_start,
            duration,
            &appointments,
            &blocked,
            horizon_days,
        )?
        .ok_or(SchedulingError::NoSlotFound { horizon_days })
    }

    async fn transition(
        &self,
        id: Uuid,
        to: AppointmentStatus,
    ) -> SchedulingResult<Appointment> {
        let current = self
            .store
            .get_appointment(id)
            .await?
            .ok_or(SchedulingError::NotFound(id))?;
        if !transition_allowed(current.status, to) {
            return Err(SchedulingError::InvalidStatusTransition {
                from: current.status,
                to,
            });
        }
        let updated = self.store.update_status(id, to).await?;
        info!(appointment_id = %id, status = ?to, "appointment status updated");
        Ok(updated)
    }

    async fn provider_lock(&self, provider_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.provider_locks.lock().await;
        locks
            .entry(provider_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// The provider and client scans need the union of both scopes, so the
    /// range query is left unscoped by id and filtered by the pure checks.
    async fn fetch_snapshot(
        &self,
        provider_id: Uuid,
        slot: TimeSlot,
    ) -> SchedulingResult<(Vec<Appointment>, Vec<BlockedTime>)> {
        self.fetch_range(provider_id, slot.start(), slot.end()).await
    }

    async fn fetch_range(
        &self,
        provider_id: Uuid,
        from: OffsetDateTime,
        to: OffsetDateTime,
    ) -> SchedulingResult<(Vec<Appointment>, Vec<BlockedTime>)> {
        let appointments = self
            .with_retries(|| async {
                self.store
                    .appointments_in_range(None, None, from, to)
                    .await
            })
            .await?;
        let blocked = self
            .with_retries(|| async { self.store.blocked_times(provider_id).await })
            .await?;
        Ok((appointments, blocked))
    }

    async fn fetch_business_hours(&self) -> SchedulingResult<Option<BusinessHours>> {
        Ok(self
            .with_retries(|| async { self.store.business_hours().await })
            .await?)
    }

    async fn with_retries<T, F, Fut>(&self, operation: F) -> Result<T, DatabaseError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, DatabaseError>>,
    {
        operation
            .retry(
                &ExponentialBuilder::default()
                    .with_min_delay(StdDuration::from_millis(200))
                    .with_max_delay(StdDuration::from_secs(5))
                    .with_max_times(self.config.max_fetch_retries),
            )
            .when(DatabaseError::is_transient)
            .notify(|err, dur| {
                warn!(
                    "schedule fetch failed, retrying after {:.2}s: {}",
                    dur.as_secs_f64(),
                    err
                )
            })
            .await
    }
}

/// Allowed status moves: scheduled -> confirmed -> completed, and anything not
/// yet completed may be cancelled. Completed and cancelled are terminal.
fn transition_allowed(from: AppointmentStatus, to: AppointmentStatus) -> bool {
    use AppointmentStatus::*;
    match (from, to) {
        (Scheduled, Confirmed) => true,
        (Scheduled, Completed) | (Confirmed, Completed) => true,
        (Scheduled, Cancelled) | (Confirmed, Cancelled) => true,
        _ => false,
    }
}
