use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use super::to_total;
use crate::error::{ApiError, ApiResult};
use crate::models::{LabTest, LabTestFilter};
use crate::repository::LabTestRepository;
use crate::utils::FilteredQuery;

const LAB_TEST_COLUMNS: &str = "id, patient_id, ordered_by, technician_id, test_name, category, priority, \
     status, result, result_notes, price, ordered_at, completed_at, updated_at";

const WORK_QUEUE_ORDER: &str = "priority_rank, ordered_at, id";

/// PostgreSQL lab order store (`lab_tests` table)
#[derive(Clone)]
pub struct PgLabTestRepository {
    pool: PgPool,
}

impl PgLabTestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn lab_test_from_row(row: &PgRow) -> ApiResult<LabTest> {
    let priority: String = row.try_get("priority")?;
    let status: String = row.try_get("status")?;
    Ok(LabTest {
        id: row.try_get("id")?,
        patient_id: row.try_get("patient_id")?,
        ordered_by: row.try_get("ordered_by")?,
        technician_id: row.try_get("technician_id")?,
        test_name: row.try_get("test_name")?,
        category: row.try_get("category")?,
        priority: priority.parse()?,
        status: status.parse()?,
        result: row.try_get("result")?,
        result_notes: row.try_get("result_notes")?,
        price: row.try_get("price")?,
        ordered_at: row.try_get("ordered_at")?,
        completed_at: row.try_get("completed_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn push_filter(query: &mut FilteredQuery<'_>, filter: &LabTestFilter) {
    query
        .filter_eq("patient_id", filter.patient_id)
        .filter_eq("technician_id", filter.technician_id)
        .filter_eq("status", filter.status.map(|s| s.as_str()))
        .filter_eq("priority", filter.priority.map(|p| p.as_str()));
}

#[async_trait]
impl LabTestRepository for PgLabTestRepository {
    async fn insert(&self, test: &LabTest) -> ApiResult<LabTest> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO lab_tests (
                id, patient_id, ordered_by, technician_id, test_name, category, priority, priority_rank,
                status, result, result_notes, price, ordered_at, completed_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING {LAB_TEST_COLUMNS}
            "#
        ))
        .bind(test.id)
        .bind(test.patient_id)
        .bind(test.ordered_by)
        .bind(test.technician_id)
        .bind(&test.test_name)
        .bind(&test.category)
        .bind(test.priority.as_str())
        .bind(i16::from(test.priority.rank()))
        .bind(test.status.as_str())
        .bind(&test.result)
        .bind(&test.result_notes)
        .bind(test.price)
        .bind(test.ordered_at)
        .bind(test.completed_at)
        .bind(test.updated_at)
        .fetch_one(&self.pool)
        .await?;
        lab_test_from_row(&row)
    }

    async fn find_by_id(&self, id: Uuid) -> ApiResult<Option<LabTest>> {
        let row = sqlx::query(&format!("SELECT {LAB_TEST_COLUMNS} FROM lab_tests WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(lab_test_from_row).transpose()
    }

    async fn update(&self, test: &LabTest) -> ApiResult<LabTest> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE lab_tests
            SET technician_id = $2, status = $3, result = $4, result_notes = $5,
                completed_at = $6, updated_at = $7
            WHERE id = $1
            RETURNING {LAB_TEST_COLUMNS}
            "#
        ))
        .bind(test.id)
        .bind(test.technician_id)
        .bind(test.status.as_str())
        .bind(&test.result)
        .bind(&test.result_notes)
        .bind(test.completed_at)
        .bind(test.updated_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("lab test"))?;
        lab_test_from_row(&row)
    }

    async fn list(&self, filter: &LabTestFilter, limit: i64, offset: i64) -> ApiResult<(Vec<LabTest>, u64)> {
        let mut count = FilteredQuery::count("lab_tests");
        push_filter(&mut count, filter);
        let total = count.build_count().fetch_one(&self.pool).await?;

        let mut query = FilteredQuery::select(LAB_TEST_COLUMNS, "lab_tests");
        push_filter(&mut query, filter);
        query.order_by(WORK_QUEUE_ORDER).paginate(limit, offset);
        let rows = query.build().fetch_all(&self.pool).await?;

        let tests = rows.iter().map(lab_test_from_row).collect::<ApiResult<_>>()?;
        Ok((tests, to_total(total)))
    }

    async fn list_all(&self, filter: &LabTestFilter) -> ApiResult<Vec<LabTest>> {
        let mut query = FilteredQuery::select(LAB_TEST_COLUMNS, "lab_tests");
        push_filter(&mut query, filter);
        query.order_by(WORK_QUEUE_ORDER);
        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(lab_test_from_row).collect()
    }
}
