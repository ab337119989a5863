//! Logging with automatic PII redaction for CareDesk
//!
//! Hospital logs routinely carry patient emails, phone numbers and medical
//! record numbers inside free text. This crate installs the `tracing`
//! subscriber used by CareDesk binaries and, when enabled, routes every
//! formatted event through [`PiiRedactor`] before it reaches stdout.
//!
//! # Detected Data Types
//!
//! - **Email Addresses**: user@example.com → u***@e***
//! - **Phone Numbers**: (555) 123-4567 → (***) ***-****
//! - **SSN**: 123-45-6789 → ***-**-****
//! - **Credit Cards**: 4111-1111-1111-1111 → ****-****-****-****
//! - **IP Addresses**: 192.168.1.1 → 192.***.***.1
//! - **Medical Record Numbers**: MRN-20240101-A1B2C3 → MRN-********-******
//!
//! # Example
//!
//! ```rust,no_run
//! use logger_redacted::{init_tracing, LogSettings};
//!
//! init_tracing(&LogSettings::default(), "caredesk_server").expect("logger");
//! tracing::info!("Patient jane@example.org checked in");
//! // Output: "Patient EMAIL[f1Yq0...] checked in"
//! ```

pub mod config;
pub mod redactor;
pub mod writer;

pub use config::*;
pub use redactor::*;
pub use writer::*;

use thiserror::Error;
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),

    #[error("Global subscriber already installed: {0}")]
    AlreadyInitialized(String),
}

/// Build the filter used when `RUST_LOG` is unset
pub fn default_filter(crate_target: &str, level: &str) -> String {
    format!("{crate_target}={level},tower_http=info,sqlx=warn,hyper=info")
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `settings.level` when present.
pub fn init_tracing(settings: &LogSettings, crate_target: &str) -> Result<(), LoggerError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter(crate_target, &settings.level))
            .map_err(|e| LoggerError::InvalidFilter(e.to_string()))?,
    };

    let redactor = if settings.redact_pii {
        PiiRedactor::default()
    } else {
        PiiRedactor::new(RedactionConfig::disabled())
    };
    let writer = RedactingMakeWriter::stdout(redactor);

    let result = if settings.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .with_writer(writer)
                    .json(),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .with_writer(writer),
            )
            .try_init()
    };

    result.map_err(|e| LoggerError::AlreadyInitialized(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        assert_eq!(
            default_filter("caredesk_server", "debug"),
            "caredesk_server=debug,tower_http=info,sqlx=warn,hyper=info"
        );
    }

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(default_filter("caredesk_server", "info")).is_ok());
    }
}
