use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::BillingError;

/// Hospital invoice
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Invoice {
    pub id: Uuid,
    /// `INV-YYYYMM-XXXXXX`
    pub invoice_number: String,
    pub patient_id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub prescription_id: Option<Uuid>,
    pub items: Vec<InvoiceItem>,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub tax_rate_percent: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
    pub amount_paid: Decimal,
    pub balance_due: Decimal,
    pub status: InvoiceStatus,
    pub due_date: NaiveDate,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Invoice line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct InvoiceItem {
    pub description: String,
    pub category: ItemCategory,
    pub quantity: i32,
    pub unit_price: Decimal,
    /// `quantity × unit_price`
    pub amount: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    Consultation,
    Medication,
    LabTest,
    Procedure,
    Room,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Unpaid,
    PartiallyPaid,
    Paid,
    Cancelled,
}

impl InvoiceStatus {
    pub const ALL: [InvoiceStatus; 4] = [
        InvoiceStatus::Unpaid,
        InvoiceStatus::PartiallyPaid,
        InvoiceStatus::Paid,
        InvoiceStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Unpaid => "unpaid",
            InvoiceStatus::PartiallyPaid => "partially_paid",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for InvoiceStatus {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InvoiceStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| BillingError::Validation(format!("unknown invoice status '{s}'")))
    }
}

/// Payment received against an invoice
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Payment {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub received_by: Uuid,
    pub paid_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Insurance,
    BankTransfer,
    MobileMoney,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 5] = [
        PaymentMethod::Cash,
        PaymentMethod::Card,
        PaymentMethod::Insurance,
        PaymentMethod::BankTransfer,
        PaymentMethod::MobileMoney,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Insurance => "insurance",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::MobileMoney => "mobile_money",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentMethod::ALL
            .into_iter()
            .find(|method| method.as_str() == s)
            .ok_or_else(|| BillingError::Validation(format!("unknown payment method '{s}'")))
    }
}

/// Line as submitted; `amount` is computed
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewInvoiceItem {
    pub description: String,
    pub category: ItemCategory,
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateInvoiceRequest {
    pub patient_id: Uuid,
    #[serde(default)]
    pub appointment_id: Option<Uuid>,
    #[serde(default)]
    pub prescription_id: Option<Uuid>,
    pub items: Vec<NewInvoiceItem>,
    #[serde(default)]
    pub discount: Option<Decimal>,
    /// Falls back to the configured rate
    #[serde(default)]
    pub tax_rate_percent: Option<Decimal>,
    /// Falls back to today plus the configured payment terms
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RecordPaymentRequest {
    pub amount: Decimal,
    pub method: PaymentMethod,
    #[serde(default)]
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct InvoiceFilter {
    pub patient_id: Option<Uuid>,
    pub status: Option<InvoiceStatus>,
    /// Inclusive lower bound on `created_at`
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`
    pub to: Option<DateTime<Utc>>,
}

impl InvoiceFilter {
    pub fn matches(&self, invoice: &Invoice) -> bool {
        self.patient_id.map_or(true, |id| invoice.patient_id == id)
            && self.status.map_or(true, |s| invoice.status == s)
            && self.from.map_or(true, |from| invoice.created_at >= from)
            && self.to.map_or(true, |to| invoice.created_at < to)
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InvoiceWithPayments {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub payments: Vec<Payment>,
}

/// One page of invoices plus the unpaginated count
#[derive(Debug, Clone)]
pub struct InvoicePage {
    pub items: Vec<Invoice>,
    pub total: u64,
}
