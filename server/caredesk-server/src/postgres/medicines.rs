use async_trait::async_trait;
use chrono::Utc;
use itertools::Itertools;
use sqlx::{postgres::PgRow, PgPool, Row};
use std::collections::HashMap;
use uuid::Uuid;

use super::to_total;
use crate::error::{ApiError, ApiResult};
use crate::models::{plan_stock_changes, Medicine, MedicineFilter, StockChange, StockMovement};
use crate::repository::MedicineRepository;
use crate::utils::FilteredQuery;

const MEDICINE_COLUMNS: &str = "id, name, generic_name, category, manufacturer, unit, unit_price, \
     stock_quantity, reorder_level, batch_number, expiry_date, is_active, created_at, updated_at";

const MOVEMENT_COLUMNS: &str =
    "id, medicine_id, kind, quantity_change, quantity_after, reason, reference_id, performed_by, created_at";

/// PostgreSQL pharmacy store (`medicines`, `stock_movements` tables)
#[derive(Clone)]
pub struct PgMedicineRepository {
    pool: PgPool,
}

impl PgMedicineRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn medicine_from_row(row: &PgRow) -> ApiResult<Medicine> {
    Ok(Medicine {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        generic_name: row.try_get("generic_name")?,
        category: row.try_get("category")?,
        manufacturer: row.try_get("manufacturer")?,
        unit: row.try_get("unit")?,
        unit_price: row.try_get("unit_price")?,
        stock_quantity: row.try_get("stock_quantity")?,
        reorder_level: row.try_get("reorder_level")?,
        batch_number: row.try_get("batch_number")?,
        expiry_date: row.try_get("expiry_date")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn movement_from_row(row: &PgRow) -> ApiResult<StockMovement> {
    let kind: String = row.try_get("kind")?;
    Ok(StockMovement {
        id: row.try_get("id")?,
        medicine_id: row.try_get("medicine_id")?,
        kind: kind.parse()?,
        quantity_change: row.try_get("quantity_change")?,
        quantity_after: row.try_get("quantity_after")?,
        reason: row.try_get("reason")?,
        reference_id: row.try_get("reference_id")?,
        performed_by: row.try_get("performed_by")?,
        created_at: row.try_get("created_at")?,
    })
}

fn push_filter(query: &mut FilteredQuery<'_>, filter: &MedicineFilter) {
    query
        .filter_eq("lower(category)", filter.category.as_deref().map(str::to_lowercase))
        .filter_eq("is_active", filter.is_active)
        .search(&["name", "generic_name"], filter.search.as_deref());
    if filter.low_stock == Some(true) {
        query.filter_raw("stock_quantity <= reorder_level");
    }
}

#[async_trait]
impl MedicineRepository for PgMedicineRepository {
    async fn insert(&self, medicine: &Medicine) -> ApiResult<Medicine> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO medicines (
                id, name, generic_name, category, manufacturer, unit, unit_price, stock_quantity,
                reorder_level, batch_number, expiry_date, is_active, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING {MEDICINE_COLUMNS}
            "#
        ))
        .bind(medicine.id)
        .bind(&medicine.name)
        .bind(&medicine.generic_name)
        .bind(&medicine.category)
        .bind(&medicine.manufacturer)
        .bind(&medicine.unit)
        .bind(medicine.unit_price)
        .bind(medicine.stock_quantity)
        .bind(medicine.reorder_level)
        .bind(&medicine.batch_number)
        .bind(medicine.expiry_date)
        .bind(medicine.is_active)
        .bind(medicine.created_at)
        .bind(medicine.updated_at)
        .fetch_one(&self.pool)
        .await?;
        medicine_from_row(&row)
    }

    async fn find_by_id(&self, id: Uuid) -> ApiResult<Option<Medicine>> {
        let row = sqlx::query(&format!("SELECT {MEDICINE_COLUMNS} FROM medicines WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(medicine_from_row).transpose()
    }

    async fn update(&self, medicine: &Medicine) -> ApiResult<Medicine> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE medicines
            SET name = $2, generic_name = $3, category = $4, manufacturer = $5, unit = $6,
                unit_price = $7, reorder_level = $8, is_active = $9, updated_at = $10
            WHERE id = $1
            RETURNING {MEDICINE_COLUMNS}
            "#
        ))
        .bind(medicine.id)
        .bind(&medicine.name)
        .bind(&medicine.generic_name)
        .bind(&medicine.category)
        .bind(&medicine.manufacturer)
        .bind(&medicine.unit)
        .bind(medicine.unit_price)
        .bind(medicine.reorder_level)
        .bind(medicine.is_active)
        .bind(medicine.updated_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("medicine"))?;
        medicine_from_row(&row)
    }

    async fn list(&self, filter: &MedicineFilter, limit: i64, offset: i64) -> ApiResult<(Vec<Medicine>, u64)> {
        let mut count = FilteredQuery::count("medicines");
        push_filter(&mut count, filter);
        let total = count.build_count().fetch_one(&self.pool).await?;

        let mut query = FilteredQuery::select(MEDICINE_COLUMNS, "medicines");
        push_filter(&mut query, filter);
        query.order_by("lower(name), id").paginate(limit, offset);
        let rows = query.build().fetch_all(&self.pool).await?;

        let medicines = rows.iter().map(medicine_from_row).collect::<ApiResult<_>>()?;
        Ok((medicines, to_total(total)))
    }

    async fn list_all(&self, filter: &MedicineFilter) -> ApiResult<Vec<Medicine>> {
        let mut query = FilteredQuery::select(MEDICINE_COLUMNS, "medicines");
        push_filter(&mut query, filter);
        query.order_by("lower(name), id");
        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(medicine_from_row).collect()
    }

    async fn apply_stock_changes(&self, changes: &[StockChange]) -> ApiResult<Vec<StockMovement>> {
        let ids: Vec<Uuid> = changes.iter().map(|c| c.medicine_id).unique().collect();
        let mut tx = self.pool.begin().await?;

        // Row locks in id order so concurrent batches cannot deadlock
        let rows = sqlx::query(&format!(
            "SELECT {MEDICINE_COLUMNS} FROM medicines WHERE id = ANY($1) ORDER BY id FOR UPDATE"
        ))
        .bind(&ids)
        .fetch_all(&mut *tx)
        .await?;
        let current: HashMap<Uuid, Medicine> = rows
            .iter()
            .map(|row| medicine_from_row(row).map(|m| (m.id, m)))
            .collect::<ApiResult<_>>()?;

        let planned = plan_stock_changes(changes, |id| current.get(&id).cloned(), Utc::now())?;

        let mut movements = Vec::with_capacity(planned.len());
        for (medicine, movement) in planned {
            sqlx::query(
                r#"
                UPDATE medicines
                SET stock_quantity = $2, batch_number = $3, expiry_date = $4, updated_at = $5
                WHERE id = $1
                "#,
            )
            .bind(medicine.id)
            .bind(medicine.stock_quantity)
            .bind(&medicine.batch_number)
            .bind(medicine.expiry_date)
            .bind(medicine.updated_at)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                INSERT INTO stock_movements (
                    id, medicine_id, kind, quantity_change, quantity_after, reason, reference_id,
                    performed_by, created_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(movement.id)
            .bind(movement.medicine_id)
            .bind(movement.kind.as_str())
            .bind(movement.quantity_change)
            .bind(movement.quantity_after)
            .bind(&movement.reason)
            .bind(movement.reference_id)
            .bind(movement.performed_by)
            .bind(movement.created_at)
            .execute(&mut *tx)
            .await?;

            movements.push(movement);
        }

        tx.commit().await?;
        Ok(movements)
    }

    async fn movements_for(&self, medicine_id: Uuid) -> ApiResult<Vec<StockMovement>> {
        let rows = sqlx::query(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements WHERE medicine_id = $1 ORDER BY created_at DESC, id"
        ))
        .bind(medicine_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(movement_from_row).collect()
    }
}
