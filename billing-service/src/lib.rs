//! Billing Service for CareDesk
//!
//! Provides:
//! - Invoices with itemized lines and decimal totals
//! - Payment recording with overpayment protection
//! - Revenue summaries and monthly collection series
//! - In-memory and PostgreSQL invoice repositories

pub mod config;
pub mod error;
pub mod models;
pub mod payment;
pub mod postgres;
pub mod reporting;
pub mod repository;
pub mod service;
pub mod totals;

pub use config::*;
pub use error::*;
pub use models::*;
pub use postgres::PgInvoiceRepository;
pub use reporting::*;
pub use repository::*;
pub use service::*;
pub use totals::{round2, InvoiceTotals};
