use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use super::to_total;
use crate::error::{ApiError, ApiResult};
use crate::models::{BloodGroup, Patient, PatientFilter};
use crate::repository::PatientRepository;
use crate::utils::FilteredQuery;

const PATIENT_COLUMNS: &str = "id, mrn, first_name, last_name, date_of_birth, gender, blood_group, \
     phone, email, address, emergency_contact_name, emergency_contact_phone, allergies, \
     medical_history, user_id, is_active, is_deleted, created_at, updated_at";

/// PostgreSQL patient store (`patients` table)
#[derive(Clone)]
pub struct PgPatientRepository {
    pool: PgPool,
}

impl PgPatientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn patient_from_row(row: &PgRow) -> ApiResult<Patient> {
    let gender: String = row.try_get("gender")?;
    let blood_group: Option<String> = row.try_get("blood_group")?;
    Ok(Patient {
        id: row.try_get("id")?,
        mrn: row.try_get("mrn")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        date_of_birth: row.try_get("date_of_birth")?,
        gender: gender.parse()?,
        blood_group: blood_group.map(|b| b.parse::<BloodGroup>()).transpose()?,
        phone: row.try_get("phone")?,
        email: row.try_get("email")?,
        address: row.try_get("address")?,
        emergency_contact_name: row.try_get("emergency_contact_name")?,
        emergency_contact_phone: row.try_get("emergency_contact_phone")?,
        allergies: row.try_get("allergies")?,
        medical_history: row.try_get("medical_history")?,
        user_id: row.try_get("user_id")?,
        is_active: row.try_get("is_active")?,
        is_deleted: row.try_get("is_deleted")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn push_filter(query: &mut FilteredQuery<'_>, filter: &PatientFilter) {
    query
        .filter_not_deleted()
        .filter_eq("gender", filter.gender.map(|g| g.as_str()))
        .filter_eq("blood_group", filter.blood_group.map(|b| b.as_str()))
        .filter_eq("is_active", filter.is_active)
        .search(
            &["first_name", "last_name", "mrn", "phone", "email"],
            filter.search.as_deref(),
        );
}

#[async_trait]
impl PatientRepository for PgPatientRepository {
    async fn insert(&self, patient: &Patient) -> ApiResult<Patient> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO patients (
                id, mrn, first_name, last_name, date_of_birth, gender, blood_group, phone, email,
                address, emergency_contact_name, emergency_contact_phone, allergies, medical_history,
                user_id, is_active, is_deleted, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, FALSE, $17, $18)
            RETURNING {PATIENT_COLUMNS}
            "#
        ))
        .bind(patient.id)
        .bind(&patient.mrn)
        .bind(&patient.first_name)
        .bind(&patient.last_name)
        .bind(patient.date_of_birth)
        .bind(patient.gender.as_str())
        .bind(patient.blood_group.map(|b| b.as_str()))
        .bind(&patient.phone)
        .bind(&patient.email)
        .bind(&patient.address)
        .bind(&patient.emergency_contact_name)
        .bind(&patient.emergency_contact_phone)
        .bind(&patient.allergies)
        .bind(&patient.medical_history)
        .bind(patient.user_id)
        .bind(patient.is_active)
        .bind(patient.created_at)
        .bind(patient.updated_at)
        .fetch_one(&self.pool)
        .await?;
        patient_from_row(&row)
    }

    async fn find_by_id(&self, id: Uuid) -> ApiResult<Option<Patient>> {
        let row = sqlx::query(&format!(
            "SELECT {PATIENT_COLUMNS} FROM patients WHERE id = $1 AND is_deleted = false"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(patient_from_row).transpose()
    }

    async fn find_by_user_id(&self, user_id: Uuid) -> ApiResult<Option<Patient>> {
        let row = sqlx::query(&format!(
            "SELECT {PATIENT_COLUMNS} FROM patients WHERE user_id = $1 AND is_deleted = false LIMIT 1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(patient_from_row).transpose()
    }

    async fn update(&self, patient: &Patient) -> ApiResult<Patient> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE patients
            SET first_name = $2, last_name = $3, date_of_birth = $4, gender = $5, blood_group = $6,
                phone = $7, email = $8, address = $9, emergency_contact_name = $10,
                emergency_contact_phone = $11, allergies = $12, medical_history = $13, user_id = $14,
                is_active = $15, updated_at = $16
            WHERE id = $1 AND is_deleted = false
            RETURNING {PATIENT_COLUMNS}
            "#
        ))
        .bind(patient.id)
        .bind(&patient.first_name)
        .bind(&patient.last_name)
        .bind(patient.date_of_birth)
        .bind(patient.gender.as_str())
        .bind(patient.blood_group.map(|b| b.as_str()))
        .bind(&patient.phone)
        .bind(&patient.email)
        .bind(&patient.address)
        .bind(&patient.emergency_contact_name)
        .bind(&patient.emergency_contact_phone)
        .bind(&patient.allergies)
        .bind(&patient.medical_history)
        .bind(patient.user_id)
        .bind(patient.is_active)
        .bind(patient.updated_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("patient"))?;
        patient_from_row(&row)
    }

    async fn soft_delete(&self, id: Uuid) -> ApiResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE patients
            SET is_deleted = true, is_active = false, updated_at = NOW()
            WHERE id = $1 AND is_deleted = false
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, filter: &PatientFilter, limit: i64, offset: i64) -> ApiResult<(Vec<Patient>, u64)> {
        let mut count = FilteredQuery::count("patients");
        push_filter(&mut count, filter);
        let total = count.build_count().fetch_one(&self.pool).await?;

        let mut query = FilteredQuery::select(PATIENT_COLUMNS, "patients");
        push_filter(&mut query, filter);
        query.order_by("created_at DESC, mrn DESC").paginate(limit, offset);
        let rows = query.build().fetch_all(&self.pool).await?;

        let patients = rows.iter().map(patient_from_row).collect::<ApiResult<_>>()?;
        Ok((patients, to_total(total)))
    }

    async fn list_all(&self, filter: &PatientFilter) -> ApiResult<Vec<Patient>> {
        let mut query = FilteredQuery::select(PATIENT_COLUMNS, "patients");
        push_filter(&mut query, filter);
        query.order_by("created_at DESC, mrn DESC");
        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(patient_from_row).collect()
    }
}
