use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::ApiError;
use crate::validation::{FieldErrors, RequestValidation};
use crate::{validate_field, validate_length, validate_required};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Medicine {
    pub id: Uuid,
    pub name: String,
    pub generic_name: Option<String>,
    pub category: String,
    pub manufacturer: Option<String>,
    /// Dispensing unit: tablet, ml, capsule, ...
    pub unit: String,
    pub unit_price: Decimal,
    pub stock_quantity: i32,
    pub reorder_level: i32,
    pub batch_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Medicine {
    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity <= self.reorder_level
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date.is_some_and(|d| d < today)
    }

    /// Expired already or expiring within `days`
    pub fn expires_within(&self, today: NaiveDate, days: i64) -> bool {
        self.expiry_date
            .is_some_and(|d| d <= today + Duration::days(days))
    }

    pub fn stock_value(&self) -> Decimal {
        self.unit_price * Decimal::from(self.stock_quantity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    Restock,
    Dispense,
    Adjustment,
    Expired,
}

impl MovementKind {
    pub const ALL: [MovementKind; 4] = [
        MovementKind::Restock,
        MovementKind::Dispense,
        MovementKind::Adjustment,
        MovementKind::Expired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Restock => "restock",
            MovementKind::Dispense => "dispense",
            MovementKind::Adjustment => "adjustment",
            MovementKind::Expired => "expired",
        }
    }
}

impl FromStr for MovementKind {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MovementKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ApiError::internal(format!("unknown stock movement kind '{s}'")))
    }
}

/// One entry of the stock ledger
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StockMovement {
    pub id: Uuid,
    pub medicine_id: Uuid,
    pub kind: MovementKind,
    /// Signed change applied to the stock
    pub quantity_change: i32,
    /// Stock right after this change
    pub quantity_after: i32,
    pub reason: Option<String>,
    /// Prescription for dispense movements
    pub reference_id: Option<Uuid>,
    pub performed_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A requested stock change, applied together with its siblings or not at all
#[derive(Debug, Clone)]
pub struct StockChange {
    pub medicine_id: Uuid,
    pub kind: MovementKind,
    pub quantity_change: i32,
    pub reason: Option<String>,
    pub reference_id: Option<Uuid>,
    pub performed_by: Uuid,
    /// Restock only: new batch details for the medicine
    pub batch_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
}

impl StockChange {
    pub fn new(medicine_id: Uuid, kind: MovementKind, quantity_change: i32, performed_by: Uuid) -> Self {
        Self {
            medicine_id,
            kind,
            quantity_change,
            reason: None,
            reference_id: None,
            performed_by,
            batch_number: None,
            expiry_date: None,
        }
    }
}

/// Validate `changes` against current stock and produce the ledger entries.
///
/// `lookup` returns the current medicine for an id. Several changes to the
/// same medicine accumulate. Nothing is returned unless every change fits.
pub fn plan_stock_changes<F>(
    changes: &[StockChange],
    mut lookup: F,
    now: DateTime<Utc>,
) -> Result<Vec<(Medicine, StockMovement)>, ApiError>
where
    F: FnMut(Uuid) -> Option<Medicine>,
{
    let mut planned: Vec<(Medicine, StockMovement)> = Vec::with_capacity(changes.len());

    for change in changes {
        let current = match planned.iter().rev().find(|(m, _)| m.id == change.medicine_id) {
            Some((medicine, _)) => medicine.clone(),
            None => lookup(change.medicine_id).ok_or_else(|| ApiError::not_found("medicine"))?,
        };

        let after = current
            .stock_quantity
            .checked_add(change.quantity_change)
            .ok_or_else(|| ApiError::validation("stock quantity out of range"))?;
        if after < 0 {
            return Err(ApiError::conflict_with_code(
                error_common::codes::pharmacy::INSUFFICIENT_STOCK,
                format!(
                    "insufficient stock for {}: {} in stock, {} requested",
                    current.name,
                    current.stock_quantity,
                    -change.quantity_change
                ),
            ));
        }

        let mut updated = current;
        updated.stock_quantity = after;
        updated.updated_at = now;
        if change.kind == MovementKind::Restock {
            if let Some(batch) = &change.batch_number {
                updated.batch_number = Some(batch.clone());
            }
            if let Some(expiry) = change.expiry_date {
                updated.expiry_date = Some(expiry);
            }
        }

        let movement = StockMovement {
            id: Uuid::new_v4(),
            medicine_id: change.medicine_id,
            kind: change.kind,
            quantity_change: change.quantity_change,
            quantity_after: after,
            reason: change.reason.clone(),
            reference_id: change.reference_id,
            performed_by: change.performed_by,
            created_at: now,
        };
        planned.push((updated, movement));
    }

    Ok(planned)
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateMedicineRequest {
    pub name: String,
    pub generic_name: Option<String>,
    pub category: String,
    pub manufacturer: Option<String>,
    pub unit: String,
    pub unit_price: Decimal,
    /// Opening stock, recorded as a restock movement
    #[serde(default)]
    pub stock_quantity: i32,
    #[serde(default)]
    pub reorder_level: i32,
    pub batch_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
}

/// Catalogue fields only; stock, batch and expiry change through the ledger endpoints
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateMedicineRequest {
    pub name: Option<String>,
    pub generic_name: Option<String>,
    pub category: Option<String>,
    pub manufacturer: Option<String>,
    pub unit: Option<String>,
    pub unit_price: Option<Decimal>,
    pub reorder_level: Option<i32>,
    pub is_active: Option<bool>,
}

impl RequestValidation for CreateMedicineRequest {
    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        validate_length!(errors, "name", self.name, 1, 200);
        validate_required!(errors, "category", self.category);
        validate_required!(errors, "unit", self.unit);
        validate_field!(errors, "unit_price", self.unit_price >= Decimal::ZERO, "must not be negative");
        validate_field!(errors, "stock_quantity", self.stock_quantity >= 0, "must not be negative");
        validate_field!(errors, "reorder_level", self.reorder_level >= 0, "must not be negative");
        errors.into_result()
    }
}

impl RequestValidation for UpdateMedicineRequest {
    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        if let Some(name) = &self.name {
            validate_length!(errors, "name", name, 1, 200);
        }
        if let Some(category) = &self.category {
            validate_required!(errors, "category", category);
        }
        if let Some(unit) = &self.unit {
            validate_required!(errors, "unit", unit);
        }
        if let Some(price) = self.unit_price {
            validate_field!(errors, "unit_price", price >= Decimal::ZERO, "must not be negative");
        }
        if let Some(level) = self.reorder_level {
            validate_field!(errors, "reorder_level", level >= 0, "must not be negative");
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MedicineFilter {
    /// Matches name or generic name
    pub search: Option<String>,
    pub category: Option<String>,
    pub low_stock: Option<bool>,
    pub is_active: Option<bool>,
}

impl MedicineFilter {
    pub fn matches(&self, medicine: &Medicine) -> bool {
        if let Some(category) = &self.category {
            if !medicine.category.eq_ignore_ascii_case(category) {
                return false;
            }
        }
        if self.low_stock == Some(true) && !medicine.is_low_stock() {
            return false;
        }
        if self.is_active.is_some_and(|a| a != medicine.is_active) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                medicine.name.to_lowercase().contains(&term)
                    || medicine
                        .generic_name
                        .as_deref()
                        .is_some_and(|g| g.to_lowercase().contains(&term))
            }
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RestockRequest {
    pub quantity: i32,
    pub batch_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AdjustStockRequest {
    pub quantity_change: i32,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExpiringQuery {
    /// Look-ahead window; defaults to the configured warning period
    pub days: Option<i64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InventorySummary {
    pub medicine_count: u64,
    pub total_stock_value: Decimal,
    pub low_stock_count: u64,
    pub expired_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn medicine(name: &str, stock: i32) -> Medicine {
        let now = Utc::now();
        Medicine {
            id: Uuid::new_v4(),
            name: name.to_string(),
            generic_name: None,
            category: "analgesic".to_string(),
            manufacturer: None,
            unit: "tablet".to_string(),
            unit_price: Decimal::new(50, 2),
            stock_quantity: stock,
            reorder_level: 10,
            batch_number: None,
            expiry_date: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_plan_accumulates_changes_to_same_medicine() {
        let med = medicine("Paracetamol", 10);
        let user = Uuid::new_v4();
        let changes = vec![
            StockChange::new(med.id, MovementKind::Dispense, -4, user),
            StockChange::new(med.id, MovementKind::Dispense, -6, user),
        ];
        let planned = plan_stock_changes(&changes, |_| Some(med.clone()), Utc::now()).unwrap();
        assert_eq!(planned.len(), 2);
        assert_eq!(planned[0].1.quantity_after, 6);
        assert_eq!(planned[1].1.quantity_after, 0);
    }

    #[test]
    fn test_plan_rejects_when_any_change_overdraws() {
        let med = medicine("Amoxicillin", 3);
        let changes = vec![
            StockChange::new(med.id, MovementKind::Dispense, -2, Uuid::new_v4()),
            StockChange::new(med.id, MovementKind::Dispense, -2, Uuid::new_v4()),
        ];
        let err = plan_stock_changes(&changes, |_| Some(med.clone()), Utc::now()).unwrap_err();
        assert_eq!(err.code(), error_common::codes::pharmacy::INSUFFICIENT_STOCK);
        assert!(err.to_string().contains("Amoxicillin"));
    }

    #[test]
    fn test_restock_updates_batch() {
        let med = medicine("Ibuprofen", 0);
        let mut change = StockChange::new(med.id, MovementKind::Restock, 100, Uuid::new_v4());
        change.batch_number = Some("B-77".to_string());
        let planned = plan_stock_changes(&[change], |_| Some(med.clone()), Utc::now()).unwrap();
        assert_eq!(planned[0].0.batch_number.as_deref(), Some("B-77"));
        assert_eq!(planned[0].0.stock_quantity, 100);
    }

    #[test]
    fn test_expiry_windows() {
        let today = NaiveDate::from_ymd_opt(2030, 3, 1).unwrap();
        let mut med = medicine("Insulin", 5);
        med.expiry_date = Some(NaiveDate::from_ymd_opt(2030, 2, 28).unwrap());
        assert!(med.is_expired(today));
        assert!(med.expires_within(today, 0));

        med.expiry_date = Some(NaiveDate::from_ymd_opt(2030, 4, 15).unwrap());
        assert!(!med.is_expired(today));
        assert!(med.expires_within(today, 60));
        assert!(!med.expires_within(today, 30));
    }
}
