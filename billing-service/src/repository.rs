use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::error::{BillingError, BillingResult};
use crate::models::*;
use crate::payment;

#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    /// Insert a new invoice; at most one invoice per appointment and per prescription
    async fn insert(&self, invoice: &Invoice) -> BillingResult<Invoice>;
    async fn find_by_id(&self, id: Uuid) -> BillingResult<Option<Invoice>>;
    /// Newest first
    async fn list(&self, filter: &InvoiceFilter, limit: i64, offset: i64) -> BillingResult<InvoicePage>;
    async fn list_all(&self, filter: &InvoiceFilter) -> BillingResult<Vec<Invoice>>;
    /// Store `payment` and apply it to its invoice atomically
    async fn record_payment(&self, payment: &Payment) -> BillingResult<Invoice>;
    async fn cancel(&self, id: Uuid) -> BillingResult<Invoice>;
    async fn payments_for(&self, invoice_id: Uuid) -> BillingResult<Vec<Payment>>;
    async fn list_payments(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> BillingResult<Vec<Payment>>;
}

/// In-memory implementation for development/testing
#[derive(Default)]
pub struct InMemoryInvoiceRepository {
    invoices: DashMap<Uuid, Invoice>,
    payments: DashMap<Uuid, Vec<Payment>>,
    insert_lock: Mutex<()>,
}

impl InMemoryInvoiceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted(&self, filter: &InvoiceFilter) -> Vec<Invoice> {
        let mut invoices: Vec<Invoice> = self
            .invoices
            .iter()
            .filter(|i| filter.matches(i.value()))
            .map(|i| i.value().clone())
            .collect();
        invoices.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.invoice_number.cmp(&a.invoice_number))
        });
        invoices
    }
}

#[async_trait]
impl InvoiceRepository for InMemoryInvoiceRepository {
    async fn insert(&self, invoice: &Invoice) -> BillingResult<Invoice> {
        let _guard = self.insert_lock.lock();

        for existing in self.invoices.iter() {
            if invoice.appointment_id.is_some() && existing.appointment_id == invoice.appointment_id {
                return Err(BillingError::AlreadyInvoiced("appointment".to_string()));
            }
            if invoice.prescription_id.is_some() && existing.prescription_id == invoice.prescription_id {
                return Err(BillingError::AlreadyInvoiced("prescription".to_string()));
            }
        }

        self.invoices.insert(invoice.id, invoice.clone());
        Ok(invoice.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> BillingResult<Option<Invoice>> {
        Ok(self.invoices.get(&id).map(|i| i.value().clone()))
    }

    async fn list(&self, filter: &InvoiceFilter, limit: i64, offset: i64) -> BillingResult<InvoicePage> {
        let all = self.sorted(filter);
        let total = all.len() as u64;
        let items = all
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .collect();
        Ok(InvoicePage { items, total })
    }

    async fn list_all(&self, filter: &InvoiceFilter) -> BillingResult<Vec<Invoice>> {
        Ok(self.sorted(filter))
    }

    async fn record_payment(&self, payment: &Payment) -> BillingResult<Invoice> {
        let mut invoice = self
            .invoices
            .get_mut(&payment.invoice_id)
            .ok_or(BillingError::InvoiceNotFound(payment.invoice_id))?;

        payment::apply_payment(&mut invoice, payment)?;
        self.payments
            .entry(payment.invoice_id)
            .or_default()
            .push(payment.clone());
        Ok(invoice.clone())
    }

    async fn cancel(&self, id: Uuid) -> BillingResult<Invoice> {
        let mut invoice = self
            .invoices
            .get_mut(&id)
            .ok_or(BillingError::InvoiceNotFound(id))?;
        payment::cancel(&mut invoice)?;
        Ok(invoice.clone())
    }

    async fn payments_for(&self, invoice_id: Uuid) -> BillingResult<Vec<Payment>> {
        Ok(self
            .payments
            .get(&invoice_id)
            .map(|p| p.value().clone())
            .unwrap_or_default())
    }

    async fn list_payments(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> BillingResult<Vec<Payment>> {
        let mut payments: Vec<Payment> = self
            .payments
            .iter()
            .flat_map(|p| p.value().clone())
            .filter(|p| from.map_or(true, |f| p.paid_at >= f) && to.map_or(true, |t| p.paid_at < t))
            .collect();
        payments.sort_by_key(|p| p.paid_at);
        Ok(payments)
    }
}
