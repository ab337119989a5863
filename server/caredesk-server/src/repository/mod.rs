//! Storage seams for every aggregate the server owns.
//!
//! Each trait has an in-memory implementation here and a PostgreSQL one in
//! [`crate::postgres`]. [`Repositories`] bundles one of each kind so the
//! server can be built over either backend.

pub mod appointments;
pub mod lab_tests;
pub mod medicines;
pub mod patients;
pub mod prescriptions;
pub mod staff;

use std::sync::Arc;

use auth_identity::{InMemoryUserRepository, PgUserRepository, UserRepository};
use billing_service::{InMemoryInvoiceRepository, InvoiceRepository, PgInvoiceRepository};
use sqlx::PgPool;

pub use appointments::{AppointmentRepository, InMemoryAppointmentRepository};
pub use lab_tests::{InMemoryLabTestRepository, LabTestRepository};
pub use medicines::{InMemoryMedicineRepository, MedicineRepository};
pub use patients::{InMemoryPatientRepository, PatientRepository};
pub use prescriptions::{InMemoryPrescriptionRepository, PrescriptionRepository};
pub use staff::{InMemoryStaffRepository, StaffRepository};

#[cfg(test)]
pub use appointments::MockAppointmentRepository;

use crate::postgres::{
    PgAppointmentRepository, PgLabTestRepository, PgMedicineRepository, PgPatientRepository,
    PgPrescriptionRepository, PgStaffRepository,
};

#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub patients: Arc<dyn PatientRepository>,
    pub staff: Arc<dyn StaffRepository>,
    pub appointments: Arc<dyn AppointmentRepository>,
    pub prescriptions: Arc<dyn PrescriptionRepository>,
    pub medicines: Arc<dyn MedicineRepository>,
    pub lab_tests: Arc<dyn LabTestRepository>,
    pub invoices: Arc<dyn InvoiceRepository>,
}

impl Repositories {
    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(InMemoryUserRepository::new()),
            patients: Arc::new(InMemoryPatientRepository::new()),
            staff: Arc::new(InMemoryStaffRepository::new()),
            appointments: Arc::new(InMemoryAppointmentRepository::new()),
            prescriptions: Arc::new(InMemoryPrescriptionRepository::new()),
            medicines: Arc::new(InMemoryMedicineRepository::new()),
            lab_tests: Arc::new(InMemoryLabTestRepository::new()),
            invoices: Arc::new(InMemoryInvoiceRepository::new()),
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            patients: Arc::new(PgPatientRepository::new(pool.clone())),
            staff: Arc::new(PgStaffRepository::new(pool.clone())),
            appointments: Arc::new(PgAppointmentRepository::new(pool.clone())),
            prescriptions: Arc::new(PgPrescriptionRepository::new(pool.clone())),
            medicines: Arc::new(PgMedicineRepository::new(pool.clone())),
            lab_tests: Arc::new(PgLabTestRepository::new(pool.clone())),
            invoices: Arc::new(PgInvoiceRepository::new(pool)),
        }
    }
}
