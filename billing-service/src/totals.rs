//! Invoice arithmetic.
//!
//! All money is `Decimal` rounded to cents, midpoint away from zero:
//!
//! ```text
//! amount     = quantity × unit_price
//! subtotal   = Σ amount
//! tax_amount = round2((subtotal − discount) × rate / 100)
//! total      = subtotal − discount + tax_amount
//! ```

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{BillingError, BillingResult};
use crate::models::{InvoiceItem, InvoiceStatus, NewInvoiceItem};

pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceTotals {
    pub items: Vec<InvoiceItem>,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub tax_rate_percent: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
}

impl InvoiceTotals {
    pub fn compute(
        items: &[NewInvoiceItem],
        discount: Decimal,
        tax_rate_percent: Decimal,
    ) -> BillingResult<Self> {
        if items.is_empty() {
            return Err(BillingError::Validation(
                "an invoice needs at least one item".to_string(),
            ));
        }
        if tax_rate_percent < Decimal::ZERO || tax_rate_percent > Decimal::ONE_HUNDRED {
            return Err(BillingError::Validation(
                "tax_rate_percent must be between 0 and 100".to_string(),
            ));
        }

        let mut lines = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            if item.description.trim().is_empty() {
                return Err(BillingError::Validation(format!(
                    "items[{index}].description is required"
                )));
            }
            if item.quantity < 1 {
                return Err(BillingError::Validation(format!(
                    "items[{index}].quantity must be at least 1"
                )));
            }
            if item.unit_price < Decimal::ZERO {
                return Err(BillingError::Validation(format!(
                    "items[{index}].unit_price must not be negative"
                )));
            }

            let unit_price = round2(item.unit_price);
            lines.push(InvoiceItem {
                description: item.description.trim().to_string(),
                category: item.category,
                quantity: item.quantity,
                unit_price,
                amount: round2(Decimal::from(item.quantity) * unit_price),
            });
        }

        let subtotal: Decimal = lines.iter().map(|line| line.amount).sum();
        let discount = round2(discount);
        if discount < Decimal::ZERO || discount > subtotal {
            return Err(BillingError::Validation(format!(
                "discount must be between 0 and the subtotal {subtotal}"
            )));
        }

        let taxable = subtotal - discount;
        let tax_amount = round2(taxable * tax_rate_percent / Decimal::ONE_HUNDRED);

        Ok(Self {
            items: lines,
            subtotal,
            discount,
            tax_rate_percent,
            tax_amount,
            total: taxable + tax_amount,
        })
    }
}

/// Status implied by the amount paid against `total`
pub fn status_for(total: Decimal, amount_paid: Decimal) -> InvoiceStatus {
    if amount_paid >= total {
        InvoiceStatus::Paid
    } else if amount_paid > Decimal::ZERO {
        InvoiceStatus::PartiallyPaid
    } else {
        InvoiceStatus::Unpaid
    }
}
