use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{plan_stock_changes, Medicine, MedicineFilter, StockChange, StockMovement};
use crate::types::pagination::page_of;

#[async_trait]
pub trait MedicineRepository: Send + Sync {
    async fn insert(&self, medicine: &Medicine) -> ApiResult<Medicine>;
    async fn find_by_id(&self, id: Uuid) -> ApiResult<Option<Medicine>>;
    /// Store catalogue fields; stock, batch and expiry are written only by
    /// `apply_stock_changes`
    async fn update(&self, medicine: &Medicine) -> ApiResult<Medicine>;
    /// Ordered by name
    async fn list(&self, filter: &MedicineFilter, limit: i64, offset: i64) -> ApiResult<(Vec<Medicine>, u64)>;
    async fn list_all(&self, filter: &MedicineFilter) -> ApiResult<Vec<Medicine>>;
    /// Apply every change and record one movement each, or nothing at all
    async fn apply_stock_changes(&self, changes: &[StockChange]) -> ApiResult<Vec<StockMovement>>;
    /// Newest first
    async fn movements_for(&self, medicine_id: Uuid) -> ApiResult<Vec<StockMovement>>;
}

/// In-memory implementation for development/testing
///
/// `stock_lock` is held for the whole plan-and-apply of a stock change.
#[derive(Default)]
pub struct InMemoryMedicineRepository {
    medicines: DashMap<Uuid, Medicine>,
    movements: DashMap<Uuid, Vec<StockMovement>>,
    stock_lock: Mutex<()>,
}

impl InMemoryMedicineRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted(&self, filter: &MedicineFilter) -> Vec<Medicine> {
        let mut medicines: Vec<Medicine> = self
            .medicines
            .iter()
            .filter(|m| filter.matches(m.value()))
            .map(|m| m.value().clone())
            .collect();
        medicines.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.id.cmp(&b.id))
        });
        medicines
    }
}

#[async_trait]
impl MedicineRepository for InMemoryMedicineRepository {
    async fn insert(&self, medicine: &Medicine) -> ApiResult<Medicine> {
        self.medicines.insert(medicine.id, medicine.clone());
        Ok(medicine.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> ApiResult<Option<Medicine>> {
        Ok(self.medicines.get(&id).map(|m| m.value().clone()))
    }

    async fn update(&self, medicine: &Medicine) -> ApiResult<Medicine> {
        let _guard = self.stock_lock.lock();
        match self.medicines.get_mut(&medicine.id) {
            Some(mut existing) => {
                existing.name = medicine.name.clone();
                existing.generic_name = medicine.generic_name.clone();
                existing.category = medicine.category.clone();
                existing.manufacturer = medicine.manufacturer.clone();
                existing.unit = medicine.unit.clone();
                existing.unit_price = medicine.unit_price;
                existing.reorder_level = medicine.reorder_level;
                existing.is_active = medicine.is_active;
                existing.updated_at = medicine.updated_at;
                Ok(existing.value().clone())
            }
            None => Err(ApiError::not_found("medicine")),
        }
    }

    async fn list(&self, filter: &MedicineFilter, limit: i64, offset: i64) -> ApiResult<(Vec<Medicine>, u64)> {
        Ok(page_of(self.sorted(filter), limit, offset))
    }

    async fn list_all(&self, filter: &MedicineFilter) -> ApiResult<Vec<Medicine>> {
        Ok(self.sorted(filter))
    }

    async fn apply_stock_changes(&self, changes: &[StockChange]) -> ApiResult<Vec<StockMovement>> {
        let _guard = self.stock_lock.lock();
        let planned = plan_stock_changes(
            changes,
            |id| self.medicines.get(&id).map(|m| m.value().clone()),
            Utc::now(),
        )?;

        let mut movements = Vec::with_capacity(planned.len());
        for (medicine, movement) in planned {
            self.medicines.insert(medicine.id, medicine);
            self.movements
                .entry(movement.medicine_id)
                .or_default()
                .push(movement.clone());
            movements.push(movement);
        }
        Ok(movements)
    }

    async fn movements_for(&self, medicine_id: Uuid) -> ApiResult<Vec<StockMovement>> {
        let mut movements = self
            .movements
            .get(&medicine_id)
            .map(|m| m.value().clone())
            .unwrap_or_default();
        movements.reverse();
        Ok(movements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MovementKind;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn medicine(name: &str, stock: i32) -> Medicine {
        let now = Utc::now();
        Medicine {
            id: Uuid::new_v4(),
            name: name.to_string(),
            generic_name: None,
            category: "antibiotic".to_string(),
            manufacturer: None,
            unit: "capsule".to_string(),
            unit_price: Decimal::new(120, 2),
            stock_quantity: stock,
            reorder_level: 5,
            batch_number: None,
            expiry_date: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_failed_batch_changes_nothing() {
        let repo = InMemoryMedicineRepository::new();
        let plenty = repo.insert(&medicine("Amoxicillin", 50)).await.unwrap();
        let scarce = repo.insert(&medicine("Azithromycin", 1)).await.unwrap();
        let user = Uuid::new_v4();

        let result = repo
            .apply_stock_changes(&[
                StockChange::new(plenty.id, MovementKind::Dispense, -10, user),
                StockChange::new(scarce.id, MovementKind::Dispense, -2, user),
            ])
            .await;

        assert!(result.is_err());
        assert_eq!(repo.find_by_id(plenty.id).await.unwrap().unwrap().stock_quantity, 50);
        assert!(repo.movements_for(plenty.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_catalogue_update_keeps_stock_and_batch() {
        let repo = InMemoryMedicineRepository::new();
        let stored = repo.insert(&medicine("Cetirizine", 0)).await.unwrap();
        repo.apply_stock_changes(&[StockChange::new(stored.id, MovementKind::Restock, 40, Uuid::new_v4())])
            .await
            .unwrap();

        let mut edited = stored.clone();
        edited.unit_price = Decimal::new(99, 2);

        let mut restock = StockChange::new(stored.id, MovementKind::Restock, 10, Uuid::new_v4());
        restock.batch_number = Some("B-2031".to_string());
        restock.expiry_date = NaiveDate::from_ymd_opt(2031, 6, 30);
        repo.apply_stock_changes(&[restock]).await.unwrap();

        let updated = repo.update(&edited).await.unwrap();

        assert_eq!(updated.stock_quantity, 50);
        assert_eq!(updated.unit_price, Decimal::new(99, 2));
        assert_eq!(updated.batch_number.as_deref(), Some("B-2031"));
        assert_eq!(updated.expiry_date, NaiveDate::from_ymd_opt(2031, 6, 30));
    }
}
