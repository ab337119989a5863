use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, types::Json, PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use crate::error::{BillingError, BillingResult};
use crate::models::*;
use crate::payment;
use crate::repository::InvoiceRepository;

const INVOICE_COLUMNS: &str = "id, invoice_number, patient_id, appointment_id, prescription_id, items, \
     subtotal, discount, tax_rate_percent, tax_amount, total, amount_paid, balance_due, status, \
     due_date, notes, created_by, created_at, updated_at";

const PAYMENT_COLUMNS: &str = "id, invoice_id, amount, method, reference, received_by, paid_at";

/// PostgreSQL invoice store (`invoices`, `payments` tables)
#[derive(Clone)]
pub struct PgInvoiceRepository {
    pool: PgPool,
}

impl PgInvoiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn invoice_from_row(row: &PgRow) -> BillingResult<Invoice> {
    let items: Json<Vec<InvoiceItem>> = row.try_get("items")?;
    let status: String = row.try_get("status")?;
    Ok(Invoice {
        id: row.try_get("id")?,
        invoice_number: row.try_get("invoice_number")?,
        patient_id: row.try_get("patient_id")?,
        appointment_id: row.try_get("appointment_id")?,
        prescription_id: row.try_get("prescription_id")?,
        items: items.0,
        subtotal: row.try_get("subtotal")?,
        discount: row.try_get("discount")?,
        tax_rate_percent: row.try_get("tax_rate_percent")?,
        tax_amount: row.try_get("tax_amount")?,
        total: row.try_get("total")?,
        amount_paid: row.try_get("amount_paid")?,
        balance_due: row.try_get("balance_due")?,
        status: status.parse()?,
        due_date: row.try_get("due_date")?,
        notes: row.try_get("notes")?,
        created_by: row.try_get("created_by")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn payment_from_row(row: &PgRow) -> BillingResult<Payment> {
    let method: String = row.try_get("method")?;
    Ok(Payment {
        id: row.try_get("id")?,
        invoice_id: row.try_get("invoice_id")?,
        amount: row.try_get("amount")?,
        method: method.parse()?,
        reference: row.try_get("reference")?,
        received_by: row.try_get("received_by")?,
        paid_at: row.try_get("paid_at")?,
    })
}

fn push_filter(query: &mut QueryBuilder<'_, Postgres>, filter: &InvoiceFilter) {
    if let Some(patient_id) = filter.patient_id {
        query.push(" AND patient_id = ");
        query.push_bind(patient_id);
    }
    if let Some(status) = filter.status {
        query.push(" AND status = ");
        query.push_bind(status.as_str());
    }
    if let Some(from) = filter.from {
        query.push(" AND created_at >= ");
        query.push_bind(from);
    }
    if let Some(to) = filter.to {
        query.push(" AND created_at < ");
        query.push_bind(to);
    }
}

async fn store_invoice_state<'c, E>(executor: E, invoice: &Invoice) -> BillingResult<PgRow>
where
    E: sqlx::Executor<'c, Database = Postgres>,
{
    let row = sqlx::query(&format!(
        r#"
        UPDATE invoices
        SET amount_paid = $2, balance_due = $3, status = $4, updated_at = $5
        WHERE id = $1
        RETURNING {INVOICE_COLUMNS}
        "#
    ))
    .bind(invoice.id)
    .bind(invoice.amount_paid)
    .bind(invoice.balance_due)
    .bind(invoice.status.as_str())
    .bind(invoice.updated_at)
    .fetch_one(executor)
    .await?;
    Ok(row)
}

#[async_trait]
impl InvoiceRepository for PgInvoiceRepository {
    async fn insert(&self, invoice: &Invoice) -> BillingResult<Invoice> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO invoices (
                id, invoice_number, patient_id, appointment_id, prescription_id, items,
                subtotal, discount, tax_rate_percent, tax_amount, total, amount_paid, balance_due,
                status, due_date, notes, created_by, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            RETURNING {INVOICE_COLUMNS}
            "#
        ))
        .bind(invoice.id)
        .bind(&invoice.invoice_number)
        .bind(invoice.patient_id)
        .bind(invoice.appointment_id)
        .bind(invoice.prescription_id)
        .bind(Json(&invoice.items))
        .bind(invoice.subtotal)
        .bind(invoice.discount)
        .bind(invoice.tax_rate_percent)
        .bind(invoice.tax_amount)
        .bind(invoice.total)
        .bind(invoice.amount_paid)
        .bind(invoice.balance_due)
        .bind(invoice.status.as_str())
        .bind(invoice.due_date)
        .bind(&invoice.notes)
        .bind(invoice.created_by)
        .bind(invoice.created_at)
        .bind(invoice.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            let source = match &err {
                sqlx::Error::Database(db) if db.is_unique_violation() => match db.constraint() {
                    Some("invoices_appointment_id_key") => Some("appointment"),
                    Some("invoices_prescription_id_key") => Some("prescription"),
                    _ => None,
                },
                _ => None,
            };
            match source {
                Some(source) => BillingError::AlreadyInvoiced(source.to_string()),
                None => BillingError::Database(err),
            }
        })?;

        invoice_from_row(&row)
    }

    async fn find_by_id(&self, id: Uuid) -> BillingResult<Option<Invoice>> {
        let row = sqlx::query(&format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(invoice_from_row).transpose()
    }

    async fn list(&self, filter: &InvoiceFilter, limit: i64, offset: i64) -> BillingResult<InvoicePage> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM invoices WHERE 1=1");
        push_filter(&mut count, filter);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE 1=1"));
        push_filter(&mut query, filter);
        query.push(" ORDER BY created_at DESC, invoice_number DESC LIMIT ");
        query.push_bind(limit);
        query.push(" OFFSET ");
        query.push_bind(offset);

        let rows = query.build().fetch_all(&self.pool).await?;
        Ok(InvoicePage {
            items: rows.iter().map(invoice_from_row).collect::<BillingResult<_>>()?,
            total: u64::try_from(total).unwrap_or_default(),
        })
    }

    async fn list_all(&self, filter: &InvoiceFilter) -> BillingResult<Vec<Invoice>> {
        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE 1=1"));
        push_filter(&mut query, filter);
        query.push(" ORDER BY created_at DESC, invoice_number DESC");

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(invoice_from_row).collect()
    }

    async fn record_payment(&self, new_payment: &Payment) -> BillingResult<Invoice> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1 FOR UPDATE"
        ))
        .bind(new_payment.invoice_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(BillingError::InvoiceNotFound(new_payment.invoice_id))?;

        let mut invoice = invoice_from_row(&row)?;
        payment::apply_payment(&mut invoice, new_payment)?;

        sqlx::query(
            r#"
            INSERT INTO payments (id, invoice_id, amount, method, reference, received_by, paid_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(new_payment.id)
        .bind(new_payment.invoice_id)
        .bind(new_payment.amount)
        .bind(new_payment.method.as_str())
        .bind(&new_payment.reference)
        .bind(new_payment.received_by)
        .bind(new_payment.paid_at)
        .execute(&mut *tx)
        .await?;

        let row = store_invoice_state(&mut *tx, &invoice).await?;
        tx.commit().await?;

        invoice_from_row(&row)
    }

    async fn cancel(&self, id: Uuid) -> BillingResult<Invoice> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(BillingError::InvoiceNotFound(id))?;

        let mut invoice = invoice_from_row(&row)?;
        payment::cancel(&mut invoice)?;

        let row = store_invoice_state(&mut *tx, &invoice).await?;
        tx.commit().await?;

        invoice_from_row(&row)
    }

    async fn payments_for(&self, invoice_id: Uuid) -> BillingResult<Vec<Payment>> {
        let rows = sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE invoice_id = $1 ORDER BY paid_at"
        ))
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(payment_from_row).collect()
    }

    async fn list_payments(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> BillingResult<Vec<Payment>> {
        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE 1=1"));
        if let Some(from) = from {
            query.push(" AND paid_at >= ");
            query.push_bind(from);
        }
        if let Some(to) = to {
            query.push(" AND paid_at < ");
            query.push_bind(to);
        }
        query.push(" ORDER BY paid_at");

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(payment_from_row).collect()
    }
}
