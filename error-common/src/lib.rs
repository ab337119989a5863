//! Common error handling utilities for CareDesk
//!
//! This crate provides the process-level error type shared by the CareDesk
//! binaries and the structured error codes returned in API error bodies.
//!
//! # Error Categories
//!
//! - **validation**: Input validation and data format errors
//! - **authentication**: Credential and token errors
//! - **authorization**: Permission errors
//! - **resource**: Missing or duplicate records
//! - **scheduling**: Appointment booking rules
//! - **pharmacy**: Stock bookkeeping rules
//! - **billing**: Invoice and payment rules
//! - **database**: Storage failures
//!
//! # Example
//!
//! ```rust
//! use error_common::{codes, CareError};
//!
//! fn parse_port(raw: &str) -> error_common::Result<u16> {
//!     raw.parse()
//!         .map_err(|_| CareError::ConfigError(format!("invalid port: {raw}")))
//! }
//!
//! assert!(parse_port("8080").is_ok());
//! assert_eq!(codes::scheduling::DOCTOR_DOUBLE_BOOKED, "APPOINTMENT_DOCTOR_CONFLICT");
//! ```

pub mod codes;
pub mod types;

pub use types::*;
