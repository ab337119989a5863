use std::sync::Arc;

use billing_service::{BillingService, CreateInvoiceRequest, Invoice, ItemCategory, NewInvoiceItem};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::{PatientService, PharmacyService, StaffService};
use crate::error::{ApiError, ApiResult};
use crate::models::{AppointmentStatus, PrescriptionStatus, StaffKind};
use crate::repository::{AppointmentRepository, PrescriptionRepository};
use crate::validation::FieldErrors;

/// Builds invoices from clinical records and hands them to the billing crate
pub struct InvoicingService {
    billing: Arc<BillingService>,
    appointments: Arc<dyn AppointmentRepository>,
    prescriptions: Arc<dyn PrescriptionRepository>,
    patients: Arc<PatientService>,
    staff: Arc<StaffService>,
    pharmacy: Arc<PharmacyService>,
}

impl InvoicingService {
    pub fn new(
        billing: Arc<BillingService>,
        appointments: Arc<dyn AppointmentRepository>,
        prescriptions: Arc<dyn PrescriptionRepository>,
        patients: Arc<PatientService>,
        staff: Arc<StaffService>,
        pharmacy: Arc<PharmacyService>,
    ) -> Self {
        Self {
            billing,
            appointments,
            prescriptions,
            patients,
            staff,
            pharmacy,
        }
    }

    pub fn billing(&self) -> &BillingService {
        &self.billing
    }

    /// Manual invoice for an existing patient
    ///
    /// Linked appointment and prescription must exist and belong to the same patient.
    pub async fn create(&self, request: CreateInvoiceRequest, created_by: Uuid) -> ApiResult<Invoice> {
        self.patients.get(request.patient_id).await?;

        let mut errors = FieldErrors::new();
        if let Some(appointment_id) = request.appointment_id {
            let appointment = self
                .appointments
                .find_by_id(appointment_id)
                .await?
                .ok_or_else(|| ApiError::not_found("appointment"))?;
            errors.check(
                "appointment_id",
                appointment.patient_id == request.patient_id,
                "appointment belongs to another patient",
            );
        }
        if let Some(prescription_id) = request.prescription_id {
            let prescription = self
                .prescriptions
                .find_by_id(prescription_id)
                .await?
                .ok_or_else(|| ApiError::not_found("prescription"))?;
            errors.check(
                "prescription_id",
                prescription.patient_id == request.patient_id,
                "prescription belongs to another patient",
            );
        }
        errors.into_result()?;

        Ok(self.billing.create_invoice(request, created_by).await?)
    }

    /// One consultation line at the doctor's fee, for a completed appointment
    pub async fn from_appointment(&self, appointment_id: Uuid, created_by: Uuid) -> ApiResult<Invoice> {
        let appointment = self
            .appointments
            .find_by_id(appointment_id)
            .await?
            .ok_or_else(|| ApiError::not_found("appointment"))?;
        if appointment.status != AppointmentStatus::Completed {
            return Err(ApiError::invalid_state(format!(
                "only completed appointments can be invoiced, this one is {}",
                appointment.status.as_str()
            )));
        }
        let doctor = self.staff.get(StaffKind::Doctor, appointment.doctor_id).await?;

        let request = CreateInvoiceRequest {
            patient_id: appointment.patient_id,
            appointment_id: Some(appointment.id),
            prescription_id: None,
            items: vec![NewInvoiceItem {
                description: format!("Consultation with Dr. {}", doctor.full_name()),
                category: ItemCategory::Consultation,
                quantity: 1,
                unit_price: doctor.consultation_fee.unwrap_or(Decimal::ZERO),
            }],
            discount: None,
            tax_rate_percent: None,
            due_date: None,
            notes: Some(format!("Appointment on {}", appointment.scheduled_at.format("%Y-%m-%d %H:%M UTC"))),
        };
        Ok(self.billing.create_invoice(request, created_by).await?)
    }

    /// One medication line per item at current unit prices, for a dispensed prescription
    pub async fn from_prescription(&self, prescription_id: Uuid, created_by: Uuid) -> ApiResult<Invoice> {
        let prescription = self
            .prescriptions
            .find_by_id(prescription_id)
            .await?
            .ok_or_else(|| ApiError::not_found("prescription"))?;
        if prescription.status != PrescriptionStatus::Dispensed {
            return Err(ApiError::invalid_state(format!(
                "only dispensed prescriptions can be invoiced, this one is {}",
                prescription.status.as_str()
            )));
        }

        let mut items = Vec::with_capacity(prescription.items.len());
        for item in &prescription.items {
            let medicine = self.pharmacy.get(item.medicine_id).await?;
            items.push(NewInvoiceItem {
                description: format!("{} ({} x {})", item.medicine_name, item.quantity, medicine.unit),
                category: ItemCategory::Medication,
                quantity: item.quantity,
                unit_price: medicine.unit_price,
            });
        }

        let request = CreateInvoiceRequest {
            patient_id: prescription.patient_id,
            appointment_id: None,
            prescription_id: Some(prescription.id),
            items,
            discount: None,
            tax_rate_percent: None,
            due_date: None,
            notes: Some(format!("Prescription: {}", prescription.diagnosis)),
        };
        Ok(self.billing.create_invoice(request, created_by).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Medicine, Prescription, PrescriptionItem};
    use crate::repository::{
        InMemoryAppointmentRepository, InMemoryMedicineRepository, InMemoryPatientRepository,
        InMemoryPrescriptionRepository, InMemoryStaffRepository, MedicineRepository,
    };
    use auth_identity::{IdentityConfig, IdentityService, InMemoryUserRepository};
    use billing_service::{BillingConfig, InMemoryInvoiceRepository, InvoiceStatus};
    use chrono::Utc;

    struct Fixture {
        invoicing: InvoicingService,
        prescriptions: Arc<InMemoryPrescriptionRepository>,
        medicines: Arc<InMemoryMedicineRepository>,
    }

    fn fixture() -> Fixture {
        let identity = Arc::new(
            IdentityService::new(Arc::new(InMemoryUserRepository::new()), IdentityConfig::for_tests()).unwrap(),
        );
        let appointments = Arc::new(InMemoryAppointmentRepository::new());
        let prescriptions = Arc::new(InMemoryPrescriptionRepository::new());
        let medicines = Arc::new(InMemoryMedicineRepository::new());
        let patients = Arc::new(PatientService::new(
            Arc::new(InMemoryPatientRepository::new()),
            identity.clone(),
        ));
        let staff = Arc::new(StaffService::new(
            Arc::new(InMemoryStaffRepository::new()),
            appointments.clone(),
            identity,
        ));
        let pharmacy = Arc::new(PharmacyService::new(medicines.clone(), 30));
        let billing = Arc::new(BillingService::new(
            Arc::new(InMemoryInvoiceRepository::new()),
            BillingConfig::default(),
        ));
        Fixture {
            invoicing: InvoicingService::new(billing, appointments, prescriptions.clone(), patients, staff, pharmacy),
            prescriptions,
            medicines,
        }
    }

    async fn medicine(repo: &InMemoryMedicineRepository, unit_price: Decimal) -> Medicine {
        let now = Utc::now();
        repo.insert(&Medicine {
            id: Uuid::new_v4(),
            name: "Amoxicillin".to_string(),
            generic_name: None,
            category: "Antibiotic".to_string(),
            manufacturer: None,
            unit: "capsule".to_string(),
            unit_price,
            stock_quantity: 0,
            reorder_level: 0,
            batch_number: None,
            expiry_date: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap()
    }

    async fn prescription(
        repo: &InMemoryPrescriptionRepository,
        medicine: &Medicine,
        status: PrescriptionStatus,
    ) -> Prescription {
        let now = Utc::now();
        repo.insert(&Prescription {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            appointment_id: None,
            diagnosis: "Otitis media".to_string(),
            notes: None,
            items: vec![PrescriptionItem {
                medicine_id: medicine.id,
                medicine_name: medicine.name.clone(),
                dosage: "250mg".to_string(),
                frequency: "three times daily".to_string(),
                duration_days: 7,
                quantity: 21,
                instructions: None,
            }],
            status,
            issued_at: now,
            dispensed_at: None,
            dispensed_by: None,
            updated_at: now,
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_only_dispensed_prescriptions_are_invoiced() {
        let f = fixture();
        let med = medicine(&f.medicines, Decimal::new(120, 2)).await;
        let active = prescription(&f.prescriptions, &med, PrescriptionStatus::Active).await;

        let err = f.invoicing.from_prescription(active.id, Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.code(), error_common::codes::resource::INVALID_STATE);

        let missing = f.invoicing.from_prescription(Uuid::new_v4(), Uuid::new_v4()).await.unwrap_err();
        assert_eq!(missing.status_code(), axum::http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_prescription_invoice_uses_catalogue_price() {
        let f = fixture();
        let med = medicine(&f.medicines, Decimal::new(120, 2)).await;
        let dispensed = prescription(&f.prescriptions, &med, PrescriptionStatus::Dispensed).await;

        let invoice = f.invoicing.from_prescription(dispensed.id, Uuid::new_v4()).await.unwrap();
        assert_eq!(invoice.prescription_id, Some(dispensed.id));
        assert_eq!(invoice.patient_id, dispensed.patient_id);
        assert_eq!(invoice.items.len(), 1);
        assert_eq!(invoice.items[0].category, ItemCategory::Medication);
        assert_eq!(invoice.items[0].description, "Amoxicillin (21 x capsule)");
        assert_eq!(invoice.total, Decimal::new(2520, 2));
        assert_eq!(invoice.status, InvoiceStatus::Unpaid);

        let again = f.invoicing.from_prescription(dispensed.id, Uuid::new_v4()).await.unwrap_err();
        assert!(again.is_conflict());
    }
}
