use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    /// Default tax rate applied when an invoice does not set one
    pub tax_rate_percent: Decimal,
    pub currency: String,
    pub payment_terms_days: i64,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            tax_rate_percent: Decimal::ZERO,
            currency: "USD".to_string(),
            payment_terms_days: 30,
        }
    }
}
