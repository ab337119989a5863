use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use utoipa::ToSchema;

use crate::models::{Invoice, InvoiceStatus, Payment, PaymentMethod};

/// Revenue figures for a period.
///
/// Invoice figures cover invoices created in the period; collections cover
/// payments received in it.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RevenueSummary {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub invoice_count: u64,
    /// Σ total of non-cancelled invoices
    pub total_invoiced: Decimal,
    pub total_collected: Decimal,
    /// Σ balance due of non-cancelled invoices
    pub total_outstanding: Decimal,
    pub by_status: BTreeMap<String, u64>,
    pub by_method: BTreeMap<String, Decimal>,
}

/// Collected amount for one calendar month
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MonthlyRevenue {
    /// `YYYY-MM`
    pub month: String,
    pub collected: Decimal,
    pub payment_count: u64,
}

fn in_range(at: DateTime<Utc>, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> bool {
    from.map_or(true, |f| at >= f) && to.map_or(true, |t| at < t)
}

pub fn revenue_summary(
    invoices: &[Invoice],
    payments: &[Payment],
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> RevenueSummary {
    let mut by_status: BTreeMap<String, u64> = InvoiceStatus::ALL
        .iter()
        .map(|s| (s.as_str().to_string(), 0))
        .collect();
    let mut by_method: BTreeMap<String, Decimal> = PaymentMethod::ALL
        .iter()
        .map(|m| (m.as_str().to_string(), Decimal::ZERO))
        .collect();

    let mut invoice_count = 0u64;
    let mut total_invoiced = Decimal::ZERO;
    let mut total_outstanding = Decimal::ZERO;

    for invoice in invoices.iter().filter(|i| in_range(i.created_at, from, to)) {
        invoice_count += 1;
        *by_status.entry(invoice.status.as_str().to_string()).or_default() += 1;
        if invoice.status != InvoiceStatus::Cancelled {
            total_invoiced += invoice.total;
            total_outstanding += invoice.balance_due;
        }
    }

    let mut total_collected = Decimal::ZERO;
    for payment in payments.iter().filter(|p| in_range(p.paid_at, from, to)) {
        total_collected += payment.amount;
        *by_method.entry(payment.method.as_str().to_string()).or_default() += payment.amount;
    }

    RevenueSummary {
        from,
        to,
        invoice_count,
        total_invoiced,
        total_collected,
        total_outstanding,
        by_status,
        by_method,
    }
}

fn month_index(date: NaiveDate) -> i32 {
    date.year() * 12 + date.month0() as i32
}

/// Zero-filled collections for the `months` calendar months ending with the
/// month of `today`, oldest first.
pub fn monthly_collected(payments: &[Payment], months: u32, today: NaiveDate) -> Vec<MonthlyRevenue> {
    let months = i32::try_from(months.max(1)).unwrap_or(1);
    let last = month_index(today);
    let first = last - months + 1;

    let mut buckets: BTreeMap<i32, (Decimal, u64)> = (first..=last).map(|m| (m, (Decimal::ZERO, 0))).collect();
    for payment in payments {
        if let Some(bucket) = buckets.get_mut(&month_index(payment.paid_at.date_naive())) {
            bucket.0 += payment.amount;
            bucket.1 += 1;
        }
    }

    buckets
        .into_iter()
        .map(|(index, (collected, payment_count))| MonthlyRevenue {
            month: format!("{:04}-{:02}", index.div_euclid(12), index.rem_euclid(12) + 1),
            collected,
            payment_count,
        })
        .collect()
}
