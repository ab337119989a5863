//! PostgreSQL implementations of the repository traits
//!
//! Queries are built at runtime with [`crate::utils::FilteredQuery`] and rows
//! are mapped by hand, so the crate builds without a live database.

mod appointments;
mod lab_tests;
mod medicines;
mod patients;
mod prescriptions;
mod staff;

pub use appointments::PgAppointmentRepository;
pub use lab_tests::PgLabTestRepository;
pub use medicines::PgMedicineRepository;
pub use patients::PgPatientRepository;
pub use prescriptions::PgPrescriptionRepository;
pub use staff::PgStaffRepository;

/// Count rows returned by `COUNT(*)` as an unsigned total
pub(crate) fn to_total(count: i64) -> u64 {
    u64::try_from(count).unwrap_or_default()
}
