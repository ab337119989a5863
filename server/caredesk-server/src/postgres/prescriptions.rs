use async_trait::async_trait;
use sqlx::{postgres::PgRow, types::Json, PgPool, Row};
use uuid::Uuid;

use super::to_total;
use crate::error::ApiResult;
use crate::models::{Prescription, PrescriptionFilter, PrescriptionItem, PrescriptionStatus};
use crate::repository::PrescriptionRepository;
use crate::utils::FilteredQuery;

const PRESCRIPTION_COLUMNS: &str = "id, patient_id, doctor_id, appointment_id, diagnosis, notes, items, \
     status, issued_at, dispensed_at, dispensed_by, updated_at";

/// PostgreSQL prescription store; items are kept as JSONB
#[derive(Clone)]
pub struct PgPrescriptionRepository {
    pool: PgPool,
}

impl PgPrescriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn prescription_from_row(row: &PgRow) -> ApiResult<Prescription> {
    let items: Json<Vec<PrescriptionItem>> = row.try_get("items")?;
    let status: String = row.try_get("status")?;
    Ok(Prescription {
        id: row.try_get("id")?,
        patient_id: row.try_get("patient_id")?,
        doctor_id: row.try_get("doctor_id")?,
        appointment_id: row.try_get("appointment_id")?,
        diagnosis: row.try_get("diagnosis")?,
        notes: row.try_get("notes")?,
        items: items.0,
        status: status.parse()?,
        issued_at: row.try_get("issued_at")?,
        dispensed_at: row.try_get("dispensed_at")?,
        dispensed_by: row.try_get("dispensed_by")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn push_filter(query: &mut FilteredQuery<'_>, filter: &PrescriptionFilter) {
    query
        .filter_eq("patient_id", filter.patient_id)
        .filter_eq("doctor_id", filter.doctor_id)
        .filter_eq("status", filter.status.map(|s| s.as_str()));
}

#[async_trait]
impl PrescriptionRepository for PgPrescriptionRepository {
    async fn insert(&self, prescription: &Prescription) -> ApiResult<Prescription> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO prescriptions (
                id, patient_id, doctor_id, appointment_id, diagnosis, notes, items, status,
                issued_at, dispensed_at, dispensed_by, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {PRESCRIPTION_COLUMNS}
            "#
        ))
        .bind(prescription.id)
        .bind(prescription.patient_id)
        .bind(prescription.doctor_id)
        .bind(prescription.appointment_id)
        .bind(&prescription.diagnosis)
        .bind(&prescription.notes)
        .bind(Json(&prescription.items))
        .bind(prescription.status.as_str())
        .bind(prescription.issued_at)
        .bind(prescription.dispensed_at)
        .bind(prescription.dispensed_by)
        .bind(prescription.updated_at)
        .fetch_one(&self.pool)
        .await?;
        prescription_from_row(&row)
    }

    async fn find_by_id(&self, id: Uuid) -> ApiResult<Option<Prescription>> {
        let row = sqlx::query(&format!("SELECT {PRESCRIPTION_COLUMNS} FROM prescriptions WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(prescription_from_row).transpose()
    }

    async fn compare_and_update(
        &self,
        prescription: &Prescription,
        expected: PrescriptionStatus,
    ) -> ApiResult<Option<Prescription>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE prescriptions
            SET status = $2, notes = $3, dispensed_at = $4, dispensed_by = $5, updated_at = $6
            WHERE id = $1 AND status = $7
            RETURNING {PRESCRIPTION_COLUMNS}
            "#
        ))
        .bind(prescription.id)
        .bind(prescription.status.as_str())
        .bind(&prescription.notes)
        .bind(prescription.dispensed_at)
        .bind(prescription.dispensed_by)
        .bind(prescription.updated_at)
        .bind(expected.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(prescription_from_row).transpose()
    }

    async fn list(&self, filter: &PrescriptionFilter, limit: i64, offset: i64) -> ApiResult<(Vec<Prescription>, u64)> {
        let mut count = FilteredQuery::count("prescriptions");
        push_filter(&mut count, filter);
        let total = count.build_count().fetch_one(&self.pool).await?;

        let mut query = FilteredQuery::select(PRESCRIPTION_COLUMNS, "prescriptions");
        push_filter(&mut query, filter);
        query.order_by("issued_at DESC, id").paginate(limit, offset);
        let rows = query.build().fetch_all(&self.pool).await?;

        let prescriptions = rows.iter().map(prescription_from_row).collect::<ApiResult<_>>()?;
        Ok((prescriptions, to_total(total)))
    }

    async fn list_all(&self, filter: &PrescriptionFilter) -> ApiResult<Vec<Prescription>> {
        let mut query = FilteredQuery::select(PRESCRIPTION_COLUMNS, "prescriptions");
        push_filter(&mut query, filter);
        query.order_by("issued_at DESC, id");
        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(prescription_from_row).collect()
    }
}
