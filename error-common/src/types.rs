use thiserror::Error;

/// Process-level error for CareDesk binaries and startup code
#[derive(Error, Debug)]
pub enum CareError {
    /// Network communication errors
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Server runtime errors
    #[error("Server error: {0}")]
    ServerError(String),

    /// Database connection or migration errors
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Internal system errors
    #[error("Internal error: {0}")]
    InternalError(String),

    /// Wrapped external errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CareError {
    /// Error code for this error (see [`crate::codes`])
    pub fn code(&self) -> &'static str {
        match self {
            CareError::DatabaseError(_) => crate::codes::database::CONNECTION_FAILED,
            CareError::ConfigError(_) => crate::codes::validation::INVALID_INPUT,
            _ => crate::codes::internal::UNEXPECTED,
        }
    }
}

/// Result type alias for CareDesk operations
pub type Result<T> = std::result::Result<T, CareError>;

/// Log an error with its context and code
pub fn log_error(context: &str, error: &CareError) {
    tracing::error!(
        context = context,
        code = error.code(),
        error = %error,
        "CareDesk error occurred"
    );
}
