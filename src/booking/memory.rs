use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::models::{
    Appointment, AppointmentStatus, BlockedTime, BusinessHours, NewAppointment, NewBlockedTime,
};
use crate::db::DatabaseError;
use crate::scheduling::overlaps;

use super::ScheduleStore;

#[derive(Default)]
struct Inner {
    appointments: HashMap<Uuid, Appointment>,
    blocked_times: Vec<BlockedTime>,
    business_hours: Option<BusinessHours>,
}

/// In-memory schedule store used by the test suite and as the reference
/// implementation of the gateway contract.
#[derive(Default)]
pub struct InMemoryScheduleStore {
    inner: RwLock<Inner>,
}

impl InMemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_business_hours(&self, hours: BusinessHours) {
        self.inner.write().await.business_hours = Some(hours);
    }

    pub async fn add_blocked_time(&self, new: NewBlockedTime) -> BlockedTime {
        let block = BlockedTime {
            id: Uuid::new_v4(),
            provider_id: new.provider_id,
            start_time: new.start_time,
            end_time: new.end_time,
            title: new.title,
            all_day: new.all_day,
            created_by: new.created_by,
            created_at: OffsetDateTime::now_utc(),
        };
        self.inner.write().await.blocked_times.push(block.clone());
        block
    }
}

#[async_trait]
impl ScheduleStore for InMemoryScheduleStore {
    async fn appointments_in_range(
        &self,
        provider_id: Option<Uuid>,
        client_id: Option<Uuid>,
        from: OffsetDateTime,
        to: OffsetDateTime,
    ) -> Result<Vec<Appointment>, DatabaseError> {
        let inner = self.inner.read().await;
        Ok(inner
            .appointments
            .values()
            .filter(|appt| provider_id.map_or(true, |id| appt.provider_id == id))
            .filter(|appt| client_id.map_or(true, |id| appt.client_id == id))
            .filter(|appt| overlaps(appt.start_time, appt.end_time, from, to))
            .cloned()
            .collect())
    }

    async fn blocked_times(&self, provider_id: Uuid) -> Result<Vec<BlockedTime>, DatabaseError> {
        let inner = self.inner.read().await;
        Ok(inner
            .blocked_times
            .iter()
            .filter(|block| block.provider_id == provider_id)
            .cloned()
            .collect())
    }

    async fn business_hours(&self) -> Result<Option<BusinessHours>, DatabaseError> {
        Ok(self.inner.read().await.business_hours.clone())
    }

    async fn insert_appointment(
        &self,
        appointment: &NewAppointment,
    ) -> Result<Appointment, DatabaseError> {
        let now = OffsetDateTime::now_utc();
        let stored = Appointment {
            id: Uuid::new_v4(),
            provider_id: appointment.provider_id,
            client_id: appointment.client_id,
            service_id: appointment.service_id,
            status: AppointmentStatus::Scheduled,
            start_time: appointment.start_time,
            end_time: appointment.end_time(),
            notes: appointment.notes.clone(),
            created_at: now,
            updated_at: now,
        };
        self.inner
            .write()
            .await
            .appointments
            .insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>, DatabaseError> {
        Ok(self.inner.read().await.appointments.get(&id).cloned())
    }

    async fn reschedule_appointment(
        &self,
        id: Uuid,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<Appointment, DatabaseError> {
        let mut inner = self.inner.write().await;
        let appt = inner
            .appointments
            .get_mut(&id)
            .ok_or(DatabaseError::NotFound)?;
        appt.start_time = start;
        appt.end_time = end;
        appt.updated_at = OffsetDateTime::now_utc();
        Ok(appt.clone())
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, DatabaseError> {
        let mut inner = self.inner.write().await;
        let appt = inner
            .appointments
            .get_mut(&id)
            .ok_or(DatabaseError::NotFound)?;
        appt.status = status;
        appt.updated_at = OffsetDateTime::now_utc();
        Ok(appt.clone())
    }
}
