use error_common::codes;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum BillingError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invoice {0} not found")]
    InvoiceNotFound(Uuid),

    #[error("Invoice is {status}: {message}")]
    InvoiceClosed { status: String, message: String },

    #[error("Payment of {amount} exceeds balance due {balance_due}")]
    Overpayment { amount: String, balance_due: String },

    #[error("{0} already has an invoice")]
    AlreadyInvoiced(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Unknown error: {0}")]
    Unknown(#[from] anyhow::Error),
}

impl BillingError {
    pub fn code(&self) -> &'static str {
        match self {
            BillingError::Validation(_) => codes::validation::INVALID_INPUT,
            BillingError::InvoiceNotFound(_) => codes::resource::NOT_FOUND,
            BillingError::InvoiceClosed { .. } => codes::billing::INVOICE_CLOSED,
            BillingError::Overpayment { .. } => codes::billing::OVERPAYMENT,
            BillingError::AlreadyInvoiced(_) => codes::billing::ALREADY_INVOICED,
            BillingError::Database(_) => codes::database::QUERY_FAILED,
            BillingError::Unknown(_) => codes::internal::UNEXPECTED,
        }
    }
}

pub type BillingResult<T> = Result<T, BillingError>;
