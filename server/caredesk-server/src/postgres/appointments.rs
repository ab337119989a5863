use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use super::to_total;
use crate::error::{ApiError, ApiResult};
use crate::models::{find_conflict, Appointment, AppointmentFilter, AppointmentStatus};
use crate::repository::appointments::status_changed;
use crate::repository::AppointmentRepository;
use crate::utils::FilteredQuery;

const APPOINTMENT_COLUMNS: &str = "id, patient_id, doctor_id, scheduled_at, duration_minutes, reason, \
     notes, status, cancellation_reason, created_by, created_at, updated_at";

/// PostgreSQL appointment store (`appointments` table)
///
/// Booking and rescheduling run in a transaction that first takes
/// `pg_advisory_xact_lock` on the doctor and the patient, in ascending key
/// order, then checks for overlaps and writes.
#[derive(Clone)]
pub struct PgAppointmentRepository {
    pool: PgPool,
}

impl PgAppointmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn appointment_from_row(row: &PgRow) -> ApiResult<Appointment> {
    let status: String = row.try_get("status")?;
    Ok(Appointment {
        id: row.try_get("id")?,
        patient_id: row.try_get("patient_id")?,
        doctor_id: row.try_get("doctor_id")?,
        scheduled_at: row.try_get("scheduled_at")?,
        duration_minutes: row.try_get("duration_minutes")?,
        reason: row.try_get("reason")?,
        notes: row.try_get("notes")?,
        status: status.parse()?,
        cancellation_reason: row.try_get("cancellation_reason")?,
        created_by: row.try_get("created_by")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn push_filter(query: &mut FilteredQuery<'_>, filter: &AppointmentFilter) {
    query
        .filter_eq("doctor_id", filter.doctor_id)
        .filter_eq("patient_id", filter.patient_id)
        .filter_eq("status", filter.status.map(|s| s.as_str()))
        .filter_gte("scheduled_at", filter.from)
        .filter_lt("scheduled_at", filter.to);
}

/// Advisory lock key for a participant id
fn lock_key(id: Uuid) -> i64 {
    i64::from_ne_bytes(id.as_u64_pair().0.to_ne_bytes())
}

async fn lock_participants(tx: &mut Transaction<'_, Postgres>, appointment: &Appointment) -> ApiResult<()> {
    let mut keys = vec![lock_key(appointment.doctor_id), lock_key(appointment.patient_id)];
    keys.sort_unstable();
    keys.dedup();
    for key in keys {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(key)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

/// Error for a conditional write that matched no row
async fn missed_write<'e, E>(executor: E, id: Uuid) -> ApiError
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let stored = sqlx::query_scalar::<_, String>("SELECT status FROM appointments WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await;
    match stored {
        Ok(Some(status)) => match status.parse::<AppointmentStatus>() {
            Ok(status) => status_changed(status),
            Err(err) => err,
        },
        Ok(None) => ApiError::not_found("appointment"),
        Err(err) => err.into(),
    }
}

async fn check_conflicts(tx: &mut Transaction<'_, Postgres>, candidate: &Appointment) -> ApiResult<()> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {APPOINTMENT_COLUMNS} FROM appointments
        WHERE (doctor_id = $1 OR patient_id = $2)
          AND id <> $3
          AND status IN ('scheduled', 'confirmed')
          AND scheduled_at < $4
          AND scheduled_at + make_interval(mins => duration_minutes) > $5
        "#
    ))
    .bind(candidate.doctor_id)
    .bind(candidate.patient_id)
    .bind(candidate.id)
    .bind(candidate.ends_at())
    .bind(candidate.scheduled_at)
    .fetch_all(&mut **tx)
    .await?;

    let existing = rows.iter().map(appointment_from_row).collect::<ApiResult<Vec<_>>>()?;
    match find_conflict(existing.iter(), candidate) {
        Some(conflict) => Err(conflict.into()),
        None => Ok(()),
    }
}

#[async_trait]
impl AppointmentRepository for PgAppointmentRepository {
    async fn book(&self, appointment: &Appointment) -> ApiResult<Appointment> {
        let mut tx = self.pool.begin().await?;
        lock_participants(&mut tx, appointment).await?;
        check_conflicts(&mut tx, appointment).await?;

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO appointments (
                id, patient_id, doctor_id, scheduled_at, duration_minutes, reason, notes, status,
                cancellation_reason, created_by, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {APPOINTMENT_COLUMNS}
            "#
        ))
        .bind(appointment.id)
        .bind(appointment.patient_id)
        .bind(appointment.doctor_id)
        .bind(appointment.scheduled_at)
        .bind(appointment.duration_minutes)
        .bind(&appointment.reason)
        .bind(&appointment.notes)
        .bind(appointment.status.as_str())
        .bind(&appointment.cancellation_reason)
        .bind(appointment.created_by)
        .bind(appointment.created_at)
        .bind(appointment.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        appointment_from_row(&row)
    }

    async fn reschedule(&self, appointment: &Appointment, expected: AppointmentStatus) -> ApiResult<Appointment> {
        let mut tx = self.pool.begin().await?;
        lock_participants(&mut tx, appointment).await?;
        check_conflicts(&mut tx, appointment).await?;

        let row = sqlx::query(&format!(
            r#"
            UPDATE appointments
            SET scheduled_at = $2, duration_minutes = $3, status = $4, updated_at = $5
            WHERE id = $1 AND status = $6
            RETURNING {APPOINTMENT_COLUMNS}
            "#
        ))
        .bind(appointment.id)
        .bind(appointment.scheduled_at)
        .bind(appointment.duration_minutes)
        .bind(appointment.status.as_str())
        .bind(appointment.updated_at)
        .bind(expected.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Err(missed_write(&mut *tx, appointment.id).await);
        };
        tx.commit().await?;
        appointment_from_row(&row)
    }

    async fn find_by_id(&self, id: Uuid) -> ApiResult<Option<Appointment>> {
        let row = sqlx::query(&format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(appointment_from_row).transpose()
    }

    async fn update(&self, appointment: &Appointment, expected: AppointmentStatus) -> ApiResult<Appointment> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE appointments
            SET status = $2, notes = $3, cancellation_reason = $4, updated_at = $5
            WHERE id = $1 AND status = $6
            RETURNING {APPOINTMENT_COLUMNS}
            "#
        ))
        .bind(appointment.id)
        .bind(appointment.status.as_str())
        .bind(&appointment.notes)
        .bind(&appointment.cancellation_reason)
        .bind(appointment.updated_at)
        .bind(expected.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => appointment_from_row(&row),
            None => Err(missed_write(&self.pool, appointment.id).await),
        }
    }

    async fn delete(&self, id: Uuid) -> ApiResult<bool> {
        let result = sqlx::query("DELETE FROM appointments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, filter: &AppointmentFilter, limit: i64, offset: i64) -> ApiResult<(Vec<Appointment>, u64)> {
        let mut count = FilteredQuery::count("appointments");
        push_filter(&mut count, filter);
        let total = count.build_count().fetch_one(&self.pool).await?;

        let mut query = FilteredQuery::select(APPOINTMENT_COLUMNS, "appointments");
        push_filter(&mut query, filter);
        query.order_by("scheduled_at ASC, id").paginate(limit, offset);
        let rows = query.build().fetch_all(&self.pool).await?;

        let appointments = rows.iter().map(appointment_from_row).collect::<ApiResult<_>>()?;
        Ok((appointments, to_total(total)))
    }

    async fn list_all(&self, filter: &AppointmentFilter) -> ApiResult<Vec<Appointment>> {
        let mut query = FilteredQuery::select(APPOINTMENT_COLUMNS, "appointments");
        push_filter(&mut query, filter);
        query.order_by("scheduled_at ASC, id");
        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(appointment_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_key_is_stable_per_id() {
        let id = Uuid::new_v4();
        assert_eq!(lock_key(id), lock_key(id));
        let other = Uuid::from_u128(1);
        assert_eq!(lock_key(other), 0);
    }
}
