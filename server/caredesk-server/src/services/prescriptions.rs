use std::sync::Arc;

use chrono::Utc;
use error_common::codes;
use tracing::{error, info};
use uuid::Uuid;

use super::{PatientService, PharmacyService, StaffService};
use crate::error::{ApiError, ApiResult};
use crate::models::{
    CreatePrescriptionRequest, MovementKind, Prescription, PrescriptionFilter, PrescriptionItem,
    PrescriptionStatus, StaffKind, StockChange,
};
use crate::repository::{AppointmentRepository, PrescriptionRepository};
use crate::validation::{non_blank, FieldErrors};

/// Prescribing, dispensing against pharmacy stock, and cancellation
pub struct PrescriptionService {
    prescriptions: Arc<dyn PrescriptionRepository>,
    appointments: Arc<dyn AppointmentRepository>,
    patients: Arc<PatientService>,
    staff: Arc<StaffService>,
    pharmacy: Arc<PharmacyService>,
}

fn check_items(request: &CreatePrescriptionRequest) -> ApiResult<()> {
    let mut errors = FieldErrors::new();
    errors.check("diagnosis", !request.diagnosis.trim().is_empty(), "is required");
    errors.check("items", !request.items.is_empty(), "at least one item is required");
    for (i, item) in request.items.iter().enumerate() {
        errors.check(&format!("items[{i}].quantity"), item.quantity >= 1, "must be at least 1");
        errors.check(&format!("items[{i}].duration_days"), item.duration_days >= 1, "must be at least 1");
        errors.check(&format!("items[{i}].dosage"), !item.dosage.trim().is_empty(), "is required");
        errors.check(&format!("items[{i}].frequency"), !item.frequency.trim().is_empty(), "is required");
    }
    errors.into_result()
}

impl PrescriptionService {
    pub fn new(
        prescriptions: Arc<dyn PrescriptionRepository>,
        appointments: Arc<dyn AppointmentRepository>,
        patients: Arc<PatientService>,
        staff: Arc<StaffService>,
        pharmacy: Arc<PharmacyService>,
    ) -> Self {
        Self {
            prescriptions,
            appointments,
            patients,
            staff,
            pharmacy,
        }
    }

    /// Issue a prescription. Without `doctor_id` the caller's own doctor
    /// profile is the prescriber.
    pub async fn create(&self, request: CreatePrescriptionRequest, acting_user: Uuid) -> ApiResult<Prescription> {
        check_items(&request)?;

        let doctor_id = match request.doctor_id {
            Some(id) => id,
            None => self
                .staff
                .find_by_user(acting_user)
                .await?
                .filter(|m| m.kind == StaffKind::Doctor)
                .map(|m| m.id)
                .ok_or_else(|| ApiError::validation("doctor_id is required when the caller has no doctor profile"))?,
        };
        self.patients.active(request.patient_id).await?;
        self.staff.active(StaffKind::Doctor, doctor_id).await?;

        if let Some(appointment_id) = request.appointment_id {
            let appointment = self
                .appointments
                .find_by_id(appointment_id)
                .await?
                .ok_or_else(|| ApiError::not_found("appointment"))?;
            if appointment.patient_id != request.patient_id || appointment.doctor_id != doctor_id {
                return Err(ApiError::validation(
                    "appointment belongs to a different patient or doctor",
                ));
            }
        }

        let mut items = Vec::with_capacity(request.items.len());
        for item in request.items {
            let medicine = self.pharmacy.get(item.medicine_id).await?;
            if !medicine.is_active {
                return Err(ApiError::unprocessable(
                    codes::pharmacy::MEDICINE_INACTIVE,
                    format!("{} is no longer stocked", medicine.name),
                ));
            }
            items.push(PrescriptionItem {
                medicine_id: medicine.id,
                medicine_name: medicine.name,
                dosage: item.dosage.trim().to_string(),
                frequency: item.frequency.trim().to_string(),
                duration_days: item.duration_days,
                quantity: item.quantity,
                instructions: non_blank(item.instructions),
            });
        }

        let now = Utc::now();
        let prescription = Prescription {
            id: Uuid::new_v4(),
            patient_id: request.patient_id,
            doctor_id,
            appointment_id: request.appointment_id,
            diagnosis: request.diagnosis.trim().to_string(),
            notes: non_blank(request.notes),
            items,
            status: PrescriptionStatus::Active,
            issued_at: now,
            dispensed_at: None,
            dispensed_by: None,
            updated_at: now,
        };

        let created = self.prescriptions.insert(&prescription).await?;
        info!(
            prescription_id = %created.id,
            doctor_id = %created.doctor_id,
            items = created.items.len(),
            "Prescription issued"
        );
        Ok(created)
    }

    pub async fn get(&self, id: Uuid) -> ApiResult<Prescription> {
        self.prescriptions
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::not_found("prescription"))
    }

    pub async fn list(
        &self,
        filter: &PrescriptionFilter,
        limit: i64,
        offset: i64,
    ) -> ApiResult<(Vec<Prescription>, u64)> {
        self.prescriptions.list(filter, limit, offset).await
    }

    pub async fn all(&self, filter: &PrescriptionFilter) -> ApiResult<Vec<Prescription>> {
        self.prescriptions.list_all(filter).await
    }

    /// Deduct every item from stock, all or nothing, and mark dispensed.
    ///
    /// The prescription is claimed first so two pharmacists cannot dispense
    /// it twice; the claim is released when the stock move fails.
    pub async fn dispense(&self, id: Uuid, dispensed_by: Uuid) -> ApiResult<Prescription> {
        let original = self.get(id).await?;
        if original.status != PrescriptionStatus::Active {
            return Err(ApiError::invalid_state(format!(
                "a {} prescription cannot be dispensed",
                original.status.as_str()
            )));
        }

        let now = Utc::now();
        let mut claimed = original.clone();
        claimed.status = PrescriptionStatus::Dispensed;
        claimed.dispensed_at = Some(now);
        claimed.dispensed_by = Some(dispensed_by);
        claimed.updated_at = now;
        let claimed = self
            .prescriptions
            .compare_and_update(&claimed, PrescriptionStatus::Active)
            .await?
            .ok_or_else(|| ApiError::invalid_state("prescription is no longer active"))?;

        let changes: Vec<StockChange> = claimed
            .items
            .iter()
            .map(|item| {
                let mut change = StockChange::new(item.medicine_id, MovementKind::Dispense, -item.quantity, dispensed_by);
                change.reference_id = Some(claimed.id);
                change.reason = Some(format!("prescription {}", claimed.id));
                change
            })
            .collect();

        if let Err(err) = self.pharmacy.apply(&changes).await {
            if let Err(revert) = self
                .prescriptions
                .compare_and_update(&original, PrescriptionStatus::Dispensed)
                .await
            {
                error!(prescription_id = %id, error = %revert, "Could not release dispense claim");
            }
            return Err(err);
        }

        info!(prescription_id = %id, dispensed_by = %dispensed_by, "Prescription dispensed");
        Ok(claimed)
    }

    pub async fn cancel(&self, id: Uuid) -> ApiResult<Prescription> {
        let mut prescription = self.get(id).await?;
        if prescription.status != PrescriptionStatus::Active {
            return Err(ApiError::invalid_state(format!(
                "a {} prescription cannot be cancelled",
                prescription.status.as_str()
            )));
        }
        prescription.status = PrescriptionStatus::Cancelled;
        prescription.updated_at = Utc::now();
        let cancelled = self
            .prescriptions
            .compare_and_update(&prescription, PrescriptionStatus::Active)
            .await?
            .ok_or_else(|| ApiError::invalid_state("prescription is no longer active"))?;
        info!(prescription_id = %id, "Prescription cancelled");
        Ok(cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewPrescriptionItem;

    fn item(quantity: i32, duration_days: i32) -> NewPrescriptionItem {
        NewPrescriptionItem {
            medicine_id: Uuid::new_v4(),
            dosage: "500mg".to_string(),
            frequency: "twice daily".to_string(),
            duration_days,
            quantity,
            instructions: None,
        }
    }

    fn request(items: Vec<NewPrescriptionItem>) -> CreatePrescriptionRequest {
        CreatePrescriptionRequest {
            patient_id: Uuid::new_v4(),
            doctor_id: None,
            appointment_id: None,
            diagnosis: "Bacterial sinusitis".to_string(),
            notes: None,
            items,
        }
    }

    #[test]
    fn test_empty_prescription_rejected() {
        assert!(matches!(check_items(&request(vec![])), Err(ApiError::Validation { .. })));
    }

    #[test]
    fn test_item_errors_are_indexed() {
        match check_items(&request(vec![item(10, 5), item(0, 0)])) {
            Err(ApiError::Validation {
                field_errors: Some(fields),
                ..
            }) => {
                assert!(fields.contains_key("items[1].quantity"));
                assert!(fields.contains_key("items[1].duration_days"));
                assert!(!fields.keys().any(|k| k.starts_with("items[0]")));
            }
            other => panic!("expected field errors, got {other:?}"),
        }
        assert!(check_items(&request(vec![item(1, 1)])).is_ok());
    }
}
