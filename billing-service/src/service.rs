use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::BillingConfig;
use crate::error::{BillingError, BillingResult};
use crate::models::*;
use crate::reporting::{self, MonthlyRevenue, RevenueSummary};
use crate::repository::InvoiceRepository;
use crate::totals::{status_for, InvoiceTotals};

/// `INV-YYYYMM-XXXXXX`
pub fn generate_invoice_number(at: DateTime<Utc>) -> String {
    let suffix: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(6)
        .collect::<String>()
        .to_uppercase();
    format!("INV-{}-{}", at.format("%Y%m"), suffix)
}

/// Billing service
pub struct BillingService {
    repo: Arc<dyn InvoiceRepository>,
    config: BillingConfig,
}

impl BillingService {
    pub fn new(repo: Arc<dyn InvoiceRepository>, config: BillingConfig) -> Self {
        Self { repo, config }
    }

    pub fn config(&self) -> &BillingConfig {
        &self.config
    }

    pub async fn create_invoice(
        &self,
        request: CreateInvoiceRequest,
        created_by: Uuid,
    ) -> BillingResult<Invoice> {
        let totals = InvoiceTotals::compute(
            &request.items,
            request.discount.unwrap_or(Decimal::ZERO),
            request.tax_rate_percent.unwrap_or(self.config.tax_rate_percent),
        )?;

        let now = Utc::now();
        let due_date = match request.due_date {
            Some(date) => date,
            None => (now + Duration::days(self.config.payment_terms_days)).date_naive(),
        };

        let invoice = Invoice {
            id: Uuid::new_v4(),
            invoice_number: generate_invoice_number(now),
            patient_id: request.patient_id,
            appointment_id: request.appointment_id,
            prescription_id: request.prescription_id,
            items: totals.items,
            subtotal: totals.subtotal,
            discount: totals.discount,
            tax_rate_percent: totals.tax_rate_percent,
            tax_amount: totals.tax_amount,
            total: totals.total,
            amount_paid: Decimal::ZERO,
            balance_due: totals.total,
            status: status_for(totals.total, Decimal::ZERO),
            due_date,
            notes: request.notes.filter(|n| !n.trim().is_empty()),
            created_by,
            created_at: now,
            updated_at: now,
        };

        let invoice = self.repo.insert(&invoice).await?;
        tracing::info!(
            invoice_id = %invoice.id,
            invoice_number = %invoice.invoice_number,
            total = %invoice.total,
            "Invoice created"
        );
        Ok(invoice)
    }

    pub async fn get_invoice(&self, id: Uuid) -> BillingResult<Invoice> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or(BillingError::InvoiceNotFound(id))
    }

    pub async fn get_invoice_with_payments(&self, id: Uuid) -> BillingResult<InvoiceWithPayments> {
        let invoice = self.get_invoice(id).await?;
        let payments = self.repo.payments_for(id).await?;
        Ok(InvoiceWithPayments { invoice, payments })
    }

    pub async fn list_invoices(
        &self,
        filter: &InvoiceFilter,
        limit: i64,
        offset: i64,
    ) -> BillingResult<InvoicePage> {
        self.repo.list(filter, limit, offset).await
    }

    pub async fn all_invoices(&self, filter: &InvoiceFilter) -> BillingResult<Vec<Invoice>> {
        self.repo.list_all(filter).await
    }

    pub async fn record_payment(
        &self,
        invoice_id: Uuid,
        request: RecordPaymentRequest,
        received_by: Uuid,
    ) -> BillingResult<(Invoice, Payment)> {
        if request.amount <= Decimal::ZERO {
            return Err(BillingError::Validation(
                "payment amount must be greater than zero".to_string(),
            ));
        }

        let payment = Payment {
            id: Uuid::new_v4(),
            invoice_id,
            amount: crate::totals::round2(request.amount),
            method: request.method,
            reference: request.reference.filter(|r| !r.trim().is_empty()),
            received_by,
            paid_at: Utc::now(),
        };

        let invoice = self.repo.record_payment(&payment).await?;
        tracing::info!(
            invoice_id = %invoice_id,
            amount = %payment.amount,
            method = payment.method.as_str(),
            status = invoice.status.as_str(),
            "Payment recorded"
        );
        Ok((invoice, payment))
    }

    pub async fn cancel_invoice(&self, id: Uuid) -> BillingResult<Invoice> {
        let invoice = self.repo.cancel(id).await?;
        tracing::info!(invoice_id = %id, "Invoice cancelled");
        Ok(invoice)
    }

    pub async fn payments_between(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> BillingResult<Vec<Payment>> {
        self.repo.list_payments(from, to).await
    }

    pub async fn revenue_summary(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> BillingResult<RevenueSummary> {
        let filter = InvoiceFilter {
            from,
            to,
            ..Default::default()
        };
        let invoices = self.repo.list_all(&filter).await?;
        let payments = self.repo.list_payments(from, to).await?;
        Ok(reporting::revenue_summary(&invoices, &payments, from, to))
    }

    pub async fn monthly_revenue(&self, months: u32) -> BillingResult<Vec<MonthlyRevenue>> {
        let payments = self.repo.list_payments(None, None).await?;
        Ok(reporting::monthly_collected(
            &payments,
            months,
            Utc::now().date_naive(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_invoice_number_format() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
        let number = generate_invoice_number(at);
        assert!(number.starts_with("INV-202403-"));
        let suffix = &number["INV-202403-".len()..];
        assert_eq!(suffix.len(), 6);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }
}
