use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use super::to_total;
use crate::error::{ApiError, ApiResult};
use crate::models::{Gender, Shift, StaffFilter, StaffKind, StaffMember};
use crate::repository::StaffRepository;
use crate::utils::FilteredQuery;

const STAFF_COLUMNS: &str = "id, kind, first_name, last_name, email, phone, gender, department, \
     specialization, qualification, license_number, experience_years, consultation_fee, shift, \
     user_id, is_active, joined_on, is_deleted, created_at, updated_at";

const STAFF_ORDER: &str = "last_name, first_name, id";

/// PostgreSQL staff store (`staff` table, one row per doctor, nurse or lab technician)
#[derive(Clone)]
pub struct PgStaffRepository {
    pool: PgPool,
}

impl PgStaffRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn member_from_row(row: &PgRow) -> ApiResult<StaffMember> {
    let kind: String = row.try_get("kind")?;
    let gender: Option<String> = row.try_get("gender")?;
    let shift: Option<String> = row.try_get("shift")?;
    Ok(StaffMember {
        id: row.try_get("id")?,
        kind: kind.parse()?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        gender: gender.map(|g| g.parse::<Gender>()).transpose()?,
        department: row.try_get("department")?,
        specialization: row.try_get("specialization")?,
        qualification: row.try_get("qualification")?,
        license_number: row.try_get("license_number")?,
        experience_years: row.try_get("experience_years")?,
        consultation_fee: row.try_get("consultation_fee")?,
        shift: shift.map(|s| s.parse::<Shift>()).transpose()?,
        user_id: row.try_get("user_id")?,
        is_active: row.try_get("is_active")?,
        joined_on: row.try_get("joined_on")?,
        is_deleted: row.try_get("is_deleted")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn push_filter(query: &mut FilteredQuery<'_>, kind: Option<StaffKind>, filter: &StaffFilter) {
    query
        .filter_not_deleted()
        .filter_eq("kind", kind.map(|k| k.as_str()))
        .filter_eq("lower(department)", filter.department.as_deref().map(str::to_lowercase))
        .filter_eq(
            "lower(specialization)",
            filter.specialization.as_deref().map(str::to_lowercase),
        )
        .filter_eq("is_active", filter.is_active)
        .search(&["first_name", "last_name", "email"], filter.search.as_deref());
}

#[async_trait]
impl StaffRepository for PgStaffRepository {
    async fn insert(&self, member: &StaffMember) -> ApiResult<StaffMember> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO staff (
                id, kind, first_name, last_name, email, phone, gender, department, specialization,
                qualification, license_number, experience_years, consultation_fee, shift, user_id,
                is_active, joined_on, is_deleted, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, FALSE, $18, $19)
            RETURNING {STAFF_COLUMNS}
            "#
        ))
        .bind(member.id)
        .bind(member.kind.as_str())
        .bind(&member.first_name)
        .bind(&member.last_name)
        .bind(&member.email)
        .bind(&member.phone)
        .bind(member.gender.map(|g| g.as_str()))
        .bind(&member.department)
        .bind(&member.specialization)
        .bind(&member.qualification)
        .bind(&member.license_number)
        .bind(member.experience_years)
        .bind(member.consultation_fee)
        .bind(member.shift.map(|s| s.as_str()))
        .bind(member.user_id)
        .bind(member.is_active)
        .bind(member.joined_on)
        .bind(member.created_at)
        .bind(member.updated_at)
        .fetch_one(&self.pool)
        .await?;
        member_from_row(&row)
    }

    async fn find_by_id(&self, id: Uuid) -> ApiResult<Option<StaffMember>> {
        let row = sqlx::query(&format!(
            "SELECT {STAFF_COLUMNS} FROM staff WHERE id = $1 AND is_deleted = false"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(member_from_row).transpose()
    }

    async fn find_by_user_id(&self, user_id: Uuid) -> ApiResult<Option<StaffMember>> {
        let row = sqlx::query(&format!(
            "SELECT {STAFF_COLUMNS} FROM staff WHERE user_id = $1 AND is_deleted = false LIMIT 1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(member_from_row).transpose()
    }

    async fn update(&self, member: &StaffMember) -> ApiResult<StaffMember> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE staff
            SET first_name = $2, last_name = $3, email = $4, phone = $5, gender = $6, department = $7,
                specialization = $8, qualification = $9, license_number = $10, experience_years = $11,
                consultation_fee = $12, shift = $13, user_id = $14, is_active = $15, joined_on = $16,
                updated_at = $17
            WHERE id = $1 AND is_deleted = false
            RETURNING {STAFF_COLUMNS}
            "#
        ))
        .bind(member.id)
        .bind(&member.first_name)
        .bind(&member.last_name)
        .bind(&member.email)
        .bind(&member.phone)
        .bind(member.gender.map(|g| g.as_str()))
        .bind(&member.department)
        .bind(&member.specialization)
        .bind(&member.qualification)
        .bind(&member.license_number)
        .bind(member.experience_years)
        .bind(member.consultation_fee)
        .bind(member.shift.map(|s| s.as_str()))
        .bind(member.user_id)
        .bind(member.is_active)
        .bind(member.joined_on)
        .bind(member.updated_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ApiError::not_found(member.kind.label()))?;
        member_from_row(&row)
    }

    async fn soft_delete(&self, id: Uuid) -> ApiResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE staff
            SET is_deleted = true, is_active = false, updated_at = NOW()
            WHERE id = $1 AND is_deleted = false
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(
        &self,
        kind: StaffKind,
        filter: &StaffFilter,
        limit: i64,
        offset: i64,
    ) -> ApiResult<(Vec<StaffMember>, u64)> {
        let mut count = FilteredQuery::count("staff");
        push_filter(&mut count, Some(kind), filter);
        let total = count.build_count().fetch_one(&self.pool).await?;

        let mut query = FilteredQuery::select(STAFF_COLUMNS, "staff");
        push_filter(&mut query, Some(kind), filter);
        query.order_by(STAFF_ORDER).paginate(limit, offset);
        let rows = query.build().fetch_all(&self.pool).await?;

        let members = rows.iter().map(member_from_row).collect::<ApiResult<_>>()?;
        Ok((members, to_total(total)))
    }

    async fn list_all(&self, kind: Option<StaffKind>, filter: &StaffFilter) -> ApiResult<Vec<StaffMember>> {
        let mut query = FilteredQuery::select(STAFF_COLUMNS, "staff");
        push_filter(&mut query, kind, filter);
        query.order_by(STAFF_ORDER);
        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(member_from_row).collect()
    }
}
