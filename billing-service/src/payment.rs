use chrono::Utc;
use rust_decimal::Decimal;

use crate::error::{BillingError, BillingResult};
use crate::models::{Invoice, InvoiceStatus, Payment};
use crate::totals::{round2, status_for};

/// Apply `payment` to `invoice` in place.
///
/// Repositories call this while holding whatever lock makes the
/// read-modify-write atomic.
pub fn apply_payment(invoice: &mut Invoice, payment: &Payment) -> BillingResult<()> {
    match invoice.status {
        InvoiceStatus::Cancelled | InvoiceStatus::Paid => {
            return Err(BillingError::InvoiceClosed {
                status: invoice.status.as_str().to_string(),
                message: "no further payments are accepted".to_string(),
            })
        }
        InvoiceStatus::Unpaid | InvoiceStatus::PartiallyPaid => {}
    }

    let amount = round2(payment.amount);
    if amount <= Decimal::ZERO {
        return Err(BillingError::Validation(
            "payment amount must be greater than zero".to_string(),
        ));
    }
    if amount > invoice.balance_due {
        return Err(BillingError::Overpayment {
            amount: amount.to_string(),
            balance_due: invoice.balance_due.to_string(),
        });
    }

    invoice.amount_paid += amount;
    invoice.balance_due = invoice.total - invoice.amount_paid;
    invoice.status = status_for(invoice.total, invoice.amount_paid);
    invoice.updated_at = Utc::now();
    Ok(())
}

/// Only an unpaid invoice with nothing collected can be cancelled
pub fn cancel(invoice: &mut Invoice) -> BillingResult<()> {
    if invoice.status != InvoiceStatus::Unpaid || !invoice.amount_paid.is_zero() {
        return Err(BillingError::InvoiceClosed {
            status: invoice.status.as_str().to_string(),
            message: "only unpaid invoices without payments can be cancelled".to_string(),
        });
    }

    invoice.status = InvoiceStatus::Cancelled;
    invoice.updated_at = Utc::now();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaymentMethod;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn invoice(total: i64) -> Invoice {
        let total = Decimal::new(total, 2);
        let now = Utc::now();
        Invoice {
            id: Uuid::new_v4(),
            invoice_number: "INV-202401-ABCDEF".to_string(),
            patient_id: Uuid::new_v4(),
            appointment_id: None,
            prescription_id: None,
            items: vec![],
            subtotal: total,
            discount: Decimal::ZERO,
            tax_rate_percent: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            total,
            amount_paid: Decimal::ZERO,
            balance_due: total,
            status: status_for(total, Decimal::ZERO),
            due_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            notes: None,
            created_by: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        }
    }

    fn payment(invoice: &Invoice, cents: i64) -> Payment {
        Payment {
            id: Uuid::new_v4(),
            invoice_id: invoice.id,
            amount: Decimal::new(cents, 2),
            method: PaymentMethod::Cash,
            reference: None,
            received_by: Uuid::new_v4(),
            paid_at: Utc::now(),
        }
    }

    #[test]
    fn test_partial_then_full_payment() {
        let mut inv = invoice(10_000);
        let first = payment(&inv, 4_000);
        apply_payment(&mut inv, &first).unwrap();
        assert_eq!(inv.status, InvoiceStatus::PartiallyPaid);
        assert_eq!(inv.balance_due, Decimal::new(6_000, 2));

        let second = payment(&inv, 6_000);
        apply_payment(&mut inv, &second).unwrap();
        assert_eq!(inv.status, InvoiceStatus::Paid);
        assert!(inv.balance_due.is_zero());

        let third = payment(&inv, 1);
        assert!(matches!(
            apply_payment(&mut inv, &third),
            Err(BillingError::InvoiceClosed { .. })
        ));
    }

    #[test]
    fn test_overpayment_leaves_invoice_untouched() {
        let mut inv = invoice(5_000);
        let too_much = payment(&inv, 5_001);
        assert!(matches!(
            apply_payment(&mut inv, &too_much),
            Err(BillingError::Overpayment { .. })
        ));
        assert!(inv.amount_paid.is_zero());
        assert_eq!(inv.status, InvoiceStatus::Unpaid);
    }

    #[test]
    fn test_zero_payment_rejected() {
        let mut inv = invoice(5_000);
        let zero = payment(&inv, 0);
        assert!(matches!(
            apply_payment(&mut inv, &zero),
            Err(BillingError::Validation(_))
        ));
    }

    #[test]
    fn test_cancel_rules() {
        let mut inv = invoice(5_000);
        let part = payment(&inv, 100);
        apply_payment(&mut inv, &part).unwrap();
        assert!(cancel(&mut inv).is_err());

        let mut fresh = invoice(5_000);
        cancel(&mut fresh).unwrap();
        assert_eq!(fresh.status, InvoiceStatus::Cancelled);
        let late = payment(&fresh, 100);
        assert!(apply_payment(&mut fresh, &late).is_err());
    }
}
