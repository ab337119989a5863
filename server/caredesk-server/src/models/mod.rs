//! Domain records, request bodies and list filters
//!
//! Invoices and payments live in `billing_service`; users in `auth_identity`.

pub mod appointment;
pub mod lab;
pub mod patient;
pub mod pharmacy;
pub mod prescription;
pub mod staff;

pub use appointment::*;
pub use lab::*;
pub use patient::*;
pub use pharmacy::*;
pub use prescription::*;
pub use staff::*;
