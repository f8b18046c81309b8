use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::booking::ScheduleStore;
use crate::db::models::{
    Appointment, AppointmentStatus, BlockedTime, BusinessHours, BusinessHoursConfig,
    NewAppointment, NewBlockedTime, BUSINESS_HOURS_SETTING_KEY,
};
use crate::db::DatabaseError;

/// Postgres-backed schedule store. Appointments are never deleted; every
/// lifecycle change, cancellation included, is a status update.
pub struct ScheduleRepository {
    pool: PgPool,
}

impl ScheduleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert_blocked_time(
        &self,
        new: &NewBlockedTime,
    ) -> Result<BlockedTime, DatabaseError> {
        let block = sqlx::query_as::<_, BlockedTime>(
            r#"
            INSERT INTO blocked_times (provider_id, start_time, end_time, title, all_day, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, provider_id, start_time, end_time, title, all_day, created_by, created_at
            "#,
        )
        .bind(new.provider_id)
        .bind(new.start_time)
        .bind(new.end_time)
        .bind(&new.title)
        .bind(new.all_day)
        .bind(new.created_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(block)
    }

    pub async fn delete_blocked_time(&self, id: Uuid) -> Result<(), DatabaseError> {
        sqlx::query("DELETE FROM blocked_times WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Replace the tenant-wide business hours document wholesale.
    pub async fn save_business_hours(
        &self,
        config: &BusinessHoursConfig,
    ) -> Result<(), DatabaseError> {
        let value = serde_json::to_value(config)
            .map_err(|e| DatabaseError::InvalidInput(e.to_string()))?;
        sqlx::query(
            r#"
            INSERT INTO system_settings (setting_key, setting_value)
            VALUES ($1, $2)
            ON CONFLICT (setting_key)
            DO UPDATE SET setting_value = EXCLUDED.setting_value, updated_at = NOW()
            "#,
        )
        .bind(BUSINESS_HOURS_SETTING_KEY)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ScheduleStore for ScheduleRepository {
    async fn appointments_in_range(
        &self,
        provider_id: Option<Uuid>,
        client_id: Option<Uuid>,
        from: OffsetDateTime,
        to: OffsetDateTime,
    ) -> Result<Vec<Appointment>, DatabaseError> {
        let appointments = sqlx::query_as::<_, Appointment>(
            r#"
            SELECT id, provider_id, client_id, service_id, status, start_time, end_time,
                   notes, created_at, updated_at
            FROM appointments
            WHERE ($1::uuid IS NULL OR provider_id = $1)
              AND ($2::uuid IS NULL OR client_id = $2)
              AND start_time < $4
              AND end_time > $3
            ORDER BY start_time ASC
            "#,
        )
        .bind(provider_id)
        .bind(client_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(appointments)
    }

    async fn blocked_times(&self, provider_id: Uuid) -> Result<Vec<BlockedTime>, DatabaseError> {
        let blocks = sqlx::query_as::<_, BlockedTime>(
            r#"
            SELECT id, provider_id, start_time, end_time, title, all_day, created_by, created_at
            FROM blocked_times
            WHERE provider_id = $1
            ORDER BY start_time ASC
            "#,
        )
        .bind(provider_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(blocks)
    }

    async fn business_hours(&self) -> Result<Option<BusinessHours>, DatabaseError> {
        let row: Option<(serde_json::Value,)> = sqlx::query_as(
            "SELECT setting_value FROM system_settings WHERE setting_key = $1",
        )
        .bind(BUSINESS_HOURS_SETTING_KEY)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            None => Ok(None),
            Some((value,)) => {
                let config: BusinessHoursConfig = serde_json::from_value(value)
                    .map_err(|e| DatabaseError::InvalidInput(e.to_string()))?;
                let hours = BusinessHours::try_from(config)
                    .map_err(|e| DatabaseError::InvalidInput(e.to_string()))?;
                Ok(Some(hours))
            }
        }
    }

    async fn insert_appointment(
        &self,
        appointment: &NewAppointment,
    ) -> Result<Appointment, DatabaseError> {
        let stored = sqlx::query_as::<_, Appointment>(
            r#"
            INSERT INTO appointments (provider_id, client_id, service_id, status, start_time, end_time, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, provider_id, client_id, service_id, status, start_time, end_time,
                      notes, created_at, updated_at
            "#,
        )
        .bind(appointment.provider_id)
        .bind(appointment.client_id)
        .bind(appointment.service_id)
        .bind(AppointmentStatus::Scheduled)
        .bind(appointment.start_time)
        .bind(appointment.end_time())
        .bind(&appointment.notes)
        .fetch_one(&self.pool)
        .await?;
        Ok(stored)
    }

    async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>, DatabaseError> {
        let appointment = sqlx::query_as::<_, Appointment>(
            r#"
            SELECT id, provider_id, client_id, service_id, status, start_time, end_time,
                   notes, created_at, updated_at
            FROM appointments
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(appointment)
    }

    async fn reschedule_appointment(
        &self,
        id: Uuid,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<Appointment, DatabaseError> {
        let appointment = sqlx::query_as::<_, Appointment>(
            r#"
            UPDATE appointments
            SET start_time = $1, end_time = $2, updated_at = NOW()
            WHERE id = $3
            RETURNING id, provider_id, client_id, service_id, status, start_time, end_time,
                      notes, created_at, updated_at
            "#,
        )
        .bind(start)
        .bind(end)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DatabaseError::NotFound)?;
        Ok(appointment)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, DatabaseError> {
        let appointment = sqlx::query_as::<_, Appointment>(
            r#"
            UPDATE appointments
            SET status = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING id, provider_id, client_id, service_id, status, start_time, end_time,
                      notes, created_at, updated_at
            "#,
        )
        .bind(status)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DatabaseError::NotFound)?;
        Ok(appointment)
    }
}
