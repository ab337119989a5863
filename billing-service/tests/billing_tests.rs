//! Front desk billing workflow against the in-memory invoice store
//!
//! 1. Consultation invoice with tax and discount
//! 2. Split payment across methods until paid
//! 3. One invoice per appointment
//! 4. Cancellation and revenue summary

use billing_service::*;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

fn create_test_service(tax: i64) -> BillingService {
    BillingService::new(
        Arc::new(InMemoryInvoiceRepository::new()),
        BillingConfig {
            tax_rate_percent: Decimal::new(tax, 0),
            ..Default::default()
        },
    )
}

fn consultation(fee_cents: i64) -> NewInvoiceItem {
    NewInvoiceItem {
        description: "Cardiology consultation".to_string(),
        category: ItemCategory::Consultation,
        quantity: 1,
        unit_price: Decimal::new(fee_cents, 2),
    }
}

fn request(items: Vec<NewInvoiceItem>) -> CreateInvoiceRequest {
    CreateInvoiceRequest {
        patient_id: Uuid::new_v4(),
        appointment_id: None,
        prescription_id: None,
        items,
        discount: None,
        tax_rate_percent: None,
        due_date: None,
        notes: None,
    }
}

fn pay(cents: i64, method: PaymentMethod) -> RecordPaymentRequest {
    RecordPaymentRequest {
        amount: Decimal::new(cents, 2),
        method,
        reference: None,
    }
}

// ============================================================================
// TEST 1: Totals
// ============================================================================

#[tokio::test]
async fn test_invoice_uses_configured_tax_and_terms() {
    let service = create_test_service(10);
    let mut req = request(vec![
        consultation(15_000),
        NewInvoiceItem {
            description: "Paracetamol 500mg".to_string(),
            category: ItemCategory::Medication,
            quantity: 20,
            unit_price: Decimal::new(25, 2),
        },
    ]);
    req.discount = Some(Decimal::new(1_500, 2));

    let invoice = service.create_invoice(req, Uuid::new_v4()).await.unwrap();

    // 150.00 + 5.00 - 15.00 = 140.00, tax 14.00
    assert_eq!(invoice.subtotal, Decimal::new(15_500, 2));
    assert_eq!(invoice.tax_amount, Decimal::new(1_400, 2));
    assert_eq!(invoice.total, Decimal::new(15_400, 2));
    assert_eq!(invoice.balance_due, invoice.total);
    assert_eq!(invoice.status, InvoiceStatus::Unpaid);
    assert!(invoice.invoice_number.starts_with("INV-"));
    assert_eq!(
        invoice.due_date,
        (invoice.created_at + chrono::Duration::days(30)).date_naive()
    );
}

#[tokio::test]
async fn test_zero_total_invoice_is_paid() {
    let service = create_test_service(0);
    let invoice = service
        .create_invoice(request(vec![consultation(0)]), Uuid::new_v4())
        .await
        .unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Paid);
}

// ============================================================================
// TEST 2: Payments
// ============================================================================

#[tokio::test]
async fn test_split_payment_until_paid() {
    let service = create_test_service(0);
    let invoice = service
        .create_invoice(request(vec![consultation(10_000)]), Uuid::new_v4())
        .await
        .unwrap();
    let cashier = Uuid::new_v4();

    let (after_first, _) = service
        .record_payment(invoice.id, pay(3_000, PaymentMethod::Cash), cashier)
        .await
        .unwrap();
    assert_eq!(after_first.status, InvoiceStatus::PartiallyPaid);

    let err = service
        .record_payment(invoice.id, pay(7_001, PaymentMethod::Card), cashier)
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::Overpayment { .. }));

    let (after_second, _) = service
        .record_payment(invoice.id, pay(7_000, PaymentMethod::Card), cashier)
        .await
        .unwrap();
    assert_eq!(after_second.status, InvoiceStatus::Paid);
    assert!(after_second.balance_due.is_zero());

    let detail = service.get_invoice_with_payments(invoice.id).await.unwrap();
    assert_eq!(detail.payments.len(), 2);

    let err = service
        .record_payment(invoice.id, pay(1, PaymentMethod::Cash), cashier)
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::InvoiceClosed { .. }));
}

#[tokio::test]
async fn test_payment_on_missing_invoice() {
    let service = create_test_service(0);
    let err = service
        .record_payment(Uuid::new_v4(), pay(100, PaymentMethod::Cash), Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::InvoiceNotFound(_)));
}

// ============================================================================
// TEST 3: One invoice per appointment
// ============================================================================

#[tokio::test]
async fn test_appointment_invoiced_once() {
    let service = create_test_service(0);
    let appointment_id = Uuid::new_v4();

    let mut first = request(vec![consultation(5_000)]);
    first.appointment_id = Some(appointment_id);
    service.create_invoice(first, Uuid::new_v4()).await.unwrap();

    let mut second = request(vec![consultation(5_000)]);
    second.appointment_id = Some(appointment_id);
    let err = service.create_invoice(second, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, BillingError::AlreadyInvoiced(_)));
}

// ============================================================================
// TEST 4: Cancellation and reporting
// ============================================================================

#[tokio::test]
async fn test_cancel_and_summary() {
    let service = create_test_service(0);
    let staff = Uuid::new_v4();

    let cancelled = service
        .create_invoice(request(vec![consultation(2_000)]), staff)
        .await
        .unwrap();
    service.cancel_invoice(cancelled.id).await.unwrap();

    let partial = service
        .create_invoice(request(vec![consultation(10_000)]), staff)
        .await
        .unwrap();
    service
        .record_payment(partial.id, pay(2_500, PaymentMethod::MobileMoney), staff)
        .await
        .unwrap();

    let err = service.cancel_invoice(partial.id).await.unwrap_err();
    assert!(matches!(err, BillingError::InvoiceClosed { .. }));

    let summary = service.revenue_summary(None, None).await.unwrap();
    assert_eq!(summary.invoice_count, 2);
    assert_eq!(summary.total_invoiced, Decimal::new(10_000, 2));
    assert_eq!(summary.total_collected, Decimal::new(2_500, 2));
    assert_eq!(summary.total_outstanding, Decimal::new(7_500, 2));
    assert_eq!(summary.by_status["cancelled"], 1);
    assert_eq!(summary.by_status["partially_paid"], 1);
    assert_eq!(summary.by_method["mobile_money"], Decimal::new(2_500, 2));

    let months = service.monthly_revenue(3).await.unwrap();
    assert_eq!(months.len(), 3);
    assert_eq!(months[2].collected, Decimal::new(2_500, 2));

    let page = service
        .list_invoices(
            &InvoiceFilter {
                status: Some(InvoiceStatus::Cancelled),
                ..Default::default()
            },
            20,
            0,
        )
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].id, cancelled.id);
}
