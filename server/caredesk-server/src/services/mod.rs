//! Business services for CareDesk
//!
//! Services own the rules (validation, state transitions, cross-aggregate
//! checks) and talk to storage only through the repository traits, so the
//! same code runs over PostgreSQL and the in-memory store.

pub mod analytics;
pub mod export;
pub mod invoicing;
pub mod lab;
pub mod patients;
pub mod pharmacy;
pub mod prescriptions;
pub mod scheduling;
pub mod staff;

pub use analytics::AnalyticsService;
pub use export::{ExportKind, ExportService};
pub use invoicing::InvoicingService;
pub use lab::LabService;
pub use patients::PatientService;
pub use pharmacy::PharmacyService;
pub use prescriptions::PrescriptionService;
pub use scheduling::SchedulingService;
pub use staff::StaffService;
