use auth_identity::IdentityError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use billing_service::BillingError;
use error_common::codes;
use lazy_static::lazy_static;
use logger_redacted::PiiRedactor;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{error, warn};
use utoipa::ToSchema;
use uuid::Uuid;

lazy_static! {
    pub(crate) static ref REDACTOR: PiiRedactor = PiiRedactor::default();
}

/// Standard API error response structure
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorResponse {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Error category, e.g. `validation_error`
    pub error_type: String,
    /// Stable machine readable code from `error_common::codes`
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Field-specific validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_errors: Option<HashMap<String, Vec<String>>>,
    /// Timestamp when error occurred
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Suggested actions for resolving the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
}

/// Standard API success response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResponseMetadata>,
}

/// Response metadata for pagination
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResponseMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaginationInfo {
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_previous: bool,
}

/// Main API error enum
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field_errors: Option<HashMap<String, Vec<String>>>,
    },

    #[error("Authentication error: {message}")]
    Authentication { message: String, code: &'static str },

    #[error("Authorization error: {message}")]
    Authorization { message: String },

    #[error("Resource not found: {resource_type}")]
    NotFound { resource_type: String },

    #[error("Resource conflict: {message}")]
    Conflict { message: String, code: &'static str },

    #[error("Unprocessable entity: {message}")]
    UnprocessableEntity { message: String, code: &'static str },

    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl ApiError {
    /// Create a validation error with field-specific errors
    pub fn validation_with_fields(
        message: impl Into<String>,
        field_errors: HashMap<String, Vec<String>>,
    ) -> Self {
        Self::Validation {
            message: message.into(),
            field_errors: Some(field_errors),
        }
    }

    /// Create a simple validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field_errors: None,
        }
    }

    /// Create an authentication error
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
            code: codes::authentication::TOKEN_INVALID,
        }
    }

    /// Create an authorization error
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(resource_type: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
        }
    }

    /// Create a conflict error for a duplicate record
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::conflict_with_code(codes::resource::ALREADY_EXISTS, message)
    }

    pub fn conflict_with_code(code: &'static str, message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
            code,
        }
    }

    /// Request is well formed but breaks a state rule
    pub fn unprocessable(code: &'static str, message: impl Into<String>) -> Self {
        Self::UnprocessableEntity {
            message: message.into(),
            code,
        }
    }

    /// Create an invalid state transition error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::unprocessable(codes::resource::INVALID_STATE, message)
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Duplicate key, from either store
    pub fn is_conflict(&self) -> bool {
        match self {
            ApiError::Conflict { .. } => true,
            ApiError::Database(sqlx::Error::Database(db)) => db.is_unique_violation(),
            _ => false,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::Authentication { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Authorization { .. } => StatusCode::FORBIDDEN,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::UnprocessableEntity { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Database(db_err) => match db_err {
                sqlx::Error::RowNotFound => StatusCode::NOT_FOUND,
                sqlx::Error::Database(db) if db.is_unique_violation() => StatusCode::CONFLICT,
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error type string
    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "validation_error",
            ApiError::Authentication { .. } => "authentication_error",
            ApiError::Authorization { .. } => "authorization_error",
            ApiError::NotFound { .. } => "not_found",
            ApiError::Conflict { .. } => "conflict",
            ApiError::UnprocessableEntity { .. } => "unprocessable_entity",
            ApiError::BadRequest { .. } => "bad_request",
            ApiError::Database(_) => "database_error",
            ApiError::Internal { .. } => "internal_error",
        }
    }

    /// Error code from `error_common::codes`
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => codes::validation::INVALID_INPUT,
            ApiError::Authentication { code, .. } => *code,
            ApiError::Authorization { .. } => codes::authorization::INSUFFICIENT_PERMISSIONS,
            ApiError::NotFound { .. } => codes::resource::NOT_FOUND,
            ApiError::Conflict { code, .. } => *code,
            ApiError::UnprocessableEntity { code, .. } => *code,
            ApiError::BadRequest { .. } => codes::validation::MALFORMED_REQUEST,
            ApiError::Database(db_err) => match db_err {
                sqlx::Error::RowNotFound => codes::resource::NOT_FOUND,
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    codes::database::CONSTRAINT_VIOLATION
                }
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                    codes::database::CONNECTION_FAILED
                }
                _ => codes::database::QUERY_FAILED,
            },
            ApiError::Internal { .. } => codes::internal::UNEXPECTED,
        }
    }

    /// Get suggested actions for resolving the error
    pub fn suggestions(&self) -> Option<Vec<String>> {
        match self {
            ApiError::Validation { .. } => Some(vec![
                "Check the request payload for invalid fields".to_string(),
                "Ensure all required fields are provided".to_string(),
            ]),
            ApiError::Authentication { .. } => Some(vec![
                "Log in again to obtain a fresh token".to_string(),
                "Send the token as `Authorization: Bearer <token>`".to_string(),
            ]),
            ApiError::Authorization { .. } => Some(vec![
                "Check if your role allows this operation".to_string(),
                "Contact your administrator for access".to_string(),
            ]),
            ApiError::NotFound { .. } => Some(vec!["Verify the resource ID is correct".to_string()]),
            ApiError::Database(_) => Some(vec![
                "Try again in a few moments".to_string(),
                "Contact support if the issue persists".to_string(),
            ]),
            _ => None,
        }
    }

    /// Client-facing text for database failures. Driver messages are never echoed.
    pub fn format_database_error(db_error: &sqlx::Error) -> String {
        match db_error {
            sqlx::Error::RowNotFound => "Requested record not found.".to_string(),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                "A record with these details already exists.".to_string()
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                "Referenced record does not exist or has been deleted.".to_string()
            }
            sqlx::Error::Database(db) if db.is_check_violation() => {
                "The provided data does not meet validation requirements.".to_string()
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                "The database is temporarily unavailable.".to_string()
            }
            _ => "Database operation failed. Please try again.".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v4().to_string();
        let status_code = self.status_code();
        let logged = REDACTOR.redact(&self.to_string());

        // Log the error with correlation ID
        if status_code.is_server_error() {
            error!(
                error_id = %error_id,
                error_type = %self.error_type(),
                code = self.code(),
                status_code = %status_code.as_u16(),
                error = %logged,
                "API error occurred"
            );
        } else {
            warn!(
                error_id = %error_id,
                error_type = %self.error_type(),
                code = self.code(),
                status_code = %status_code.as_u16(),
                error = %logged,
                "API request rejected"
            );
        }

        let message = match &self {
            ApiError::Database(db_err) => ApiError::format_database_error(db_err),
            ApiError::Internal { .. } => "An unexpected error occurred.".to_string(),
            _ => self.to_string(),
        };

        let error_response = ApiErrorResponse {
            error_id,
            error_type: self.error_type().to_string(),
            code: self.code().to_string(),
            suggestions: self.suggestions(),
            field_errors: match self {
                ApiError::Validation { field_errors, .. } => field_errors,
                _ => None,
            },
            message,
            timestamp: chrono::Utc::now(),
        };

        (status_code, Json(error_response)).into_response()
    }
}

/// Helper function to create successful API responses
pub fn api_success<T>(data: T) -> ApiResponse<T> {
    ApiResponse {
        success: true,
        data,
        metadata: None,
    }
}

/// Helper function to create successful API responses with metadata
pub fn api_success_with_meta<T>(data: T, metadata: ResponseMetadata) -> ApiResponse<T> {
    ApiResponse {
        success: true,
        data,
        metadata: Some(metadata),
    }
}

impl From<IdentityError> for ApiError {
    fn from(error: IdentityError) -> Self {
        use codes::authentication as auth;
        match error {
            IdentityError::UserNotFound => ApiError::not_found("user"),
            IdentityError::InvalidCredentials => ApiError::Authentication {
                message: error.to_string(),
                code: auth::INVALID_CREDENTIALS,
            },
            IdentityError::TokenExpired => ApiError::Authentication {
                message: error.to_string(),
                code: auth::TOKEN_EXPIRED,
            },
            IdentityError::InvalidToken | IdentityError::JwtError(_) => ApiError::Authentication {
                message: "Invalid token".to_string(),
                code: auth::TOKEN_INVALID,
            },
            IdentityError::AccountDisabled => ApiError::Authentication {
                message: error.to_string(),
                code: auth::ACCOUNT_DISABLED,
            },
            IdentityError::EmailAlreadyInUse => ApiError::conflict(error.to_string()),
            IdentityError::InvalidEmail
            | IdentityError::WeakPassword(_)
            | IdentityError::InvalidRole(_) => ApiError::validation(error.to_string()),
            IdentityError::DatabaseError(db) => ApiError::Database(db),
            IdentityError::HashingError | IdentityError::InternalError(_) => {
                ApiError::internal(error.to_string())
            }
        }
    }
}

impl From<BillingError> for ApiError {
    fn from(error: BillingError) -> Self {
        let code = error.code();
        match error {
            BillingError::Validation(message) => ApiError::validation(message),
            BillingError::InvoiceNotFound(_) => ApiError::not_found("invoice"),
            BillingError::InvoiceClosed { .. } | BillingError::Overpayment { .. } => {
                ApiError::unprocessable(code, error.to_string())
            }
            BillingError::AlreadyInvoiced(_) => ApiError::conflict_with_code(code, error.to_string()),
            BillingError::Database(db) => ApiError::Database(db),
            BillingError::Unknown(err) => ApiError::internal(err.to_string()),
        }
    }
}

/// Convert anyhow errors to API errors
impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        ApiError::Internal {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for ApiError {
    fn from(error: csv::Error) -> Self {
        ApiError::internal(format!("CSV export failed: {error}"))
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_and_code_mapping() {
        let err = ApiError::conflict_with_code(codes::scheduling::DOCTOR_DOUBLE_BOOKED, "busy");
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "APPOINTMENT_DOCTOR_CONFLICT");

        assert_eq!(ApiError::not_found("patient").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::invalid_state("closed").status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(ApiError::Database(sqlx::Error::RowNotFound).status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_identity_errors_map_to_auth_codes() {
        let err = ApiError::from(IdentityError::InvalidCredentials);
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.code(), codes::authentication::INVALID_CREDENTIALS);

        let err = ApiError::from(IdentityError::EmailAlreadyInUse);
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_billing_overpayment_is_unprocessable() {
        let err = ApiError::from(BillingError::Overpayment {
            amount: "10.00".to_string(),
            balance_due: "5.00".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.code(), codes::billing::OVERPAYMENT);
    }

    #[test]
    fn test_database_message_is_generic() {
        let message = ApiError::format_database_error(&sqlx::Error::PoolClosed);
        assert!(!message.contains("pool"));
    }
}
