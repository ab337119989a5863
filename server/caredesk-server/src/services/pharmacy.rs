use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{
    AdjustStockRequest, CreateMedicineRequest, InventorySummary, Medicine, MedicineFilter, MovementKind,
    RestockRequest, StockChange, StockMovement, UpdateMedicineRequest,
};
use crate::repository::MedicineRepository;
use crate::validation::{non_blank, FieldErrors, RequestValidation};

const MAX_EXPIRY_WINDOW_DAYS: i64 = 3650;

/// Medicine catalogue and the stock ledger
pub struct PharmacyService {
    medicines: Arc<dyn MedicineRepository>,
    expiry_warning_days: i64,
}

impl PharmacyService {
    pub fn new(medicines: Arc<dyn MedicineRepository>, expiry_warning_days: i64) -> Self {
        Self {
            medicines,
            expiry_warning_days,
        }
    }

    /// Add a medicine. Opening stock is booked as a restock movement.
    pub async fn create(&self, request: CreateMedicineRequest, performed_by: Uuid) -> ApiResult<Medicine> {
        request.validate()?;
        let now = Utc::now();
        let medicine = Medicine {
            id: Uuid::new_v4(),
            name: request.name.trim().to_string(),
            generic_name: non_blank(request.generic_name),
            category: request.category.trim().to_string(),
            manufacturer: non_blank(request.manufacturer),
            unit: request.unit.trim().to_string(),
            unit_price: request.unit_price,
            stock_quantity: 0,
            reorder_level: request.reorder_level,
            batch_number: non_blank(request.batch_number),
            expiry_date: request.expiry_date,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let created = self.medicines.insert(&medicine).await?;
        info!(medicine_id = %created.id, name = %created.name, "Medicine added");

        if request.stock_quantity > 0 {
            let mut opening = StockChange::new(created.id, MovementKind::Restock, request.stock_quantity, performed_by);
            opening.reason = Some("opening stock".to_string());
            self.medicines.apply_stock_changes(&[opening]).await?;
            return self.get(created.id).await;
        }
        Ok(created)
    }

    pub async fn get(&self, id: Uuid) -> ApiResult<Medicine> {
        self.medicines
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::not_found("medicine"))
    }

    pub async fn update(&self, id: Uuid, request: UpdateMedicineRequest) -> ApiResult<Medicine> {
        request.validate()?;
        let mut medicine = self.get(id).await?;

        if let Some(name) = request.name {
            medicine.name = name.trim().to_string();
        }
        if request.generic_name.is_some() {
            medicine.generic_name = non_blank(request.generic_name);
        }
        if let Some(category) = request.category {
            medicine.category = category.trim().to_string();
        }
        if request.manufacturer.is_some() {
            medicine.manufacturer = non_blank(request.manufacturer);
        }
        if let Some(unit) = request.unit {
            medicine.unit = unit.trim().to_string();
        }
        if let Some(price) = request.unit_price {
            medicine.unit_price = price;
        }
        if let Some(level) = request.reorder_level {
            medicine.reorder_level = level;
        }
        if let Some(is_active) = request.is_active {
            medicine.is_active = is_active;
        }
        medicine.updated_at = Utc::now();

        let updated = self.medicines.update(&medicine).await?;
        info!(medicine_id = %id, "Medicine updated");
        Ok(updated)
    }

    pub async fn list(&self, filter: &MedicineFilter, limit: i64, offset: i64) -> ApiResult<(Vec<Medicine>, u64)> {
        self.medicines.list(filter, limit, offset).await
    }

    pub async fn all(&self, filter: &MedicineFilter) -> ApiResult<Vec<Medicine>> {
        self.medicines.list_all(filter).await
    }

    pub async fn restock(&self, id: Uuid, request: RestockRequest, performed_by: Uuid) -> ApiResult<Medicine> {
        let mut errors = FieldErrors::new();
        errors.check("quantity", request.quantity > 0, "must be greater than zero");
        errors.into_result()?;
        self.get(id).await?;

        let mut change = StockChange::new(id, MovementKind::Restock, request.quantity, performed_by);
        change.batch_number = non_blank(request.batch_number);
        change.expiry_date = request.expiry_date;
        self.apply(&[change]).await?;
        self.get(id).await
    }

    /// Manual correction; never takes stock below zero
    pub async fn adjust(&self, id: Uuid, request: AdjustStockRequest, performed_by: Uuid) -> ApiResult<Medicine> {
        let mut errors = FieldErrors::new();
        errors.check("quantity_change", request.quantity_change != 0, "must not be zero");
        errors.check("reason", !request.reason.trim().is_empty(), "is required");
        errors.into_result()?;
        self.get(id).await?;

        let mut change = StockChange::new(id, MovementKind::Adjustment, request.quantity_change, performed_by);
        change.reason = Some(request.reason.trim().to_string());
        self.apply(&[change]).await?;
        self.get(id).await
    }

    /// Zero the stock of an expired medicine
    pub async fn write_off_expired(&self, id: Uuid, performed_by: Uuid) -> ApiResult<Medicine> {
        let medicine = self.get(id).await?;
        if !medicine.is_expired(Utc::now().date_naive()) {
            return Err(ApiError::invalid_state(format!("{} has not expired", medicine.name)));
        }
        if medicine.stock_quantity == 0 {
            return Err(ApiError::invalid_state(format!("{} has no stock to write off", medicine.name)));
        }

        let mut change = StockChange::new(id, MovementKind::Expired, -medicine.stock_quantity, performed_by);
        change.reason = medicine.expiry_date.map(|d| format!("expired on {d}"));
        self.apply(&[change]).await?;
        self.get(id).await
    }

    /// Apply a batch of stock changes atomically
    pub async fn apply(&self, changes: &[StockChange]) -> ApiResult<Vec<StockMovement>> {
        let movements = self.medicines.apply_stock_changes(changes).await?;
        for movement in &movements {
            info!(
                medicine_id = %movement.medicine_id,
                kind = movement.kind.as_str(),
                change = movement.quantity_change,
                after = movement.quantity_after,
                "Stock moved"
            );
        }
        Ok(movements)
    }

    /// Active medicines at or below their reorder level, most depleted first
    pub async fn low_stock(&self) -> ApiResult<Vec<Medicine>> {
        let filter = MedicineFilter {
            low_stock: Some(true),
            is_active: Some(true),
            ..Default::default()
        };
        let mut medicines = self.medicines.list_all(&filter).await?;
        medicines.sort_by(|a, b| {
            let a_margin = i64::from(a.stock_quantity) - i64::from(a.reorder_level);
            let b_margin = i64::from(b.stock_quantity) - i64::from(b.reorder_level);
            a_margin
                .cmp(&b_margin)
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });
        Ok(medicines)
    }

    /// Medicines expiring within `days` (config default), expired ones included, soonest first
    pub async fn expiring(&self, days: Option<i64>) -> ApiResult<Vec<Medicine>> {
        let days = days.unwrap_or(self.expiry_warning_days);
        let mut errors = FieldErrors::new();
        errors.check(
            "days",
            (0..=MAX_EXPIRY_WINDOW_DAYS).contains(&days),
            format!("must be between 0 and {MAX_EXPIRY_WINDOW_DAYS}"),
        );
        errors.into_result()?;

        let today = Utc::now().date_naive();
        let mut medicines: Vec<Medicine> = self
            .medicines
            .list_all(&MedicineFilter::default())
            .await?
            .into_iter()
            .filter(|m| m.expires_within(today, days))
            .collect();
        medicines.sort_by_key(|m| m.expiry_date);
        Ok(medicines)
    }

    pub async fn movements(&self, id: Uuid) -> ApiResult<Vec<StockMovement>> {
        self.get(id).await?;
        self.medicines.movements_for(id).await
    }

    /// Totals over active medicines
    pub async fn summary(&self) -> ApiResult<InventorySummary> {
        let filter = MedicineFilter {
            is_active: Some(true),
            ..Default::default()
        };
        let medicines = self.medicines.list_all(&filter).await?;
        let today = Utc::now().date_naive();
        Ok(InventorySummary {
            medicine_count: medicines.len() as u64,
            total_stock_value: medicines.iter().map(Medicine::stock_value).sum::<Decimal>(),
            low_stock_count: medicines.iter().filter(|m| m.is_low_stock()).count() as u64,
            expired_count: medicines.iter().filter(|m| m.is_expired(today)).count() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryMedicineRepository;
    use chrono::Duration;
    use error_common::codes;

    fn service() -> PharmacyService {
        PharmacyService::new(Arc::new(InMemoryMedicineRepository::new()), 60)
    }

    fn request(name: &str, stock: i32, reorder: i32) -> CreateMedicineRequest {
        CreateMedicineRequest {
            name: name.to_string(),
            generic_name: None,
            category: "analgesic".to_string(),
            manufacturer: None,
            unit: "tablet".to_string(),
            unit_price: Decimal::new(250, 2),
            stock_quantity: stock,
            reorder_level: reorder,
            batch_number: None,
            expiry_date: None,
        }
    }

    #[tokio::test]
    async fn test_opening_stock_is_one_movement() {
        let service = service();
        let user = Uuid::new_v4();
        let medicine = service.create(request("Paracetamol", 40, 10), user).await.unwrap();
        assert_eq!(medicine.stock_quantity, 40);

        let movements = service.movements(medicine.id).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].kind, MovementKind::Restock);
        assert_eq!(movements[0].quantity_after, 40);
    }

    #[tokio::test]
    async fn test_adjust_rules() {
        let service = service();
        let user = Uuid::new_v4();
        let medicine = service.create(request("Ibuprofen", 5, 2), user).await.unwrap();

        let zero = AdjustStockRequest {
            quantity_change: 0,
            reason: "count".to_string(),
        };
        assert!(matches!(
            service.adjust(medicine.id, zero, user).await,
            Err(ApiError::Validation { .. })
        ));

        let overdraw = AdjustStockRequest {
            quantity_change: -6,
            reason: "breakage".to_string(),
        };
        let err = service.adjust(medicine.id, overdraw, user).await.unwrap_err();
        assert_eq!(err.code(), codes::pharmacy::INSUFFICIENT_STOCK);
        assert_eq!(service.get(medicine.id).await.unwrap().stock_quantity, 5);
    }

    #[tokio::test]
    async fn test_write_off_requires_expiry() {
        let service = service();
        let user = Uuid::new_v4();
        let mut fresh = request("Insulin", 8, 2);
        fresh.expiry_date = Some(Utc::now().date_naive() + Duration::days(30));
        let fresh = service.create(fresh, user).await.unwrap();
        assert!(service.write_off_expired(fresh.id, user).await.is_err());

        let mut old = request("Amoxicillin", 12, 2);
        old.expiry_date = Some(Utc::now().date_naive() - Duration::days(1));
        let old = service.create(old, user).await.unwrap();
        let written_off = service.write_off_expired(old.id, user).await.unwrap();
        assert_eq!(written_off.stock_quantity, 0);

        let movements = service.movements(old.id).await.unwrap();
        assert_eq!(movements[0].kind, MovementKind::Expired);
        assert_eq!(movements[0].quantity_change, -12);

        let expiring = service.expiring(None).await.unwrap();
        let names: Vec<_> = expiring.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Amoxicillin", "Insulin"]);
    }

    #[tokio::test]
    async fn test_low_stock_most_depleted_first() {
        let service = service();
        let user = Uuid::new_v4();
        service.create(request("Cetirizine", 9, 10), user).await.unwrap();
        service.create(request("Metformin", 0, 50), user).await.unwrap();
        service.create(request("Omeprazole", 100, 10), user).await.unwrap();

        let low = service.low_stock().await.unwrap();
        let names: Vec<_> = low.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Metformin", "Cetirizine"]);

        let summary = service.summary().await.unwrap();
        assert_eq!(summary.medicine_count, 3);
        assert_eq!(summary.low_stock_count, 2);
        assert_eq!(summary.total_stock_value, Decimal::new(27250, 2));
    }
}
