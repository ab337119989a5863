use auth_identity::Permission;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use billing_service::{
    CreateInvoiceRequest, Invoice, InvoiceFilter, InvoiceWithPayments, Payment, RecordPaymentRequest, RevenueSummary,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{api_success, ApiError, ApiResponse};
use crate::middleware::AuthContext;
use crate::server::CareDeskServer;
use crate::services::analytics::PeriodQuery;
use crate::types::PaginationParams;

/// Invoice state after a payment, with the payment itself
#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentReceipt {
    pub invoice: Invoice,
    pub payment: Payment,
}

// ============================================================================
// INVOICES
// ============================================================================

#[utoipa::path(
    get,
    path = "/api/v1/billing/invoices",
    params(PaginationParams, InvoiceFilter),
    responses((status = 200, description = "Invoices, newest first; patients see only their own", body = Vec<Invoice>)),
    tag = "billing",
    security(("bearer_auth" = []))
)]
pub async fn list_invoices(
    State(server): State<CareDeskServer>,
    Query(pagination): Query<PaginationParams>,
    Query(mut filter): Query<InvoiceFilter>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<Vec<Invoice>>>, ApiError> {
    auth.require(Permission::ViewBilling)?;
    if let Some(own) = auth.patient_scope(&server).await? {
        filter.patient_id = Some(own);
    }
    let page = server
        .invoicing
        .billing()
        .list_invoices(&filter, pagination.limit(), pagination.offset())
        .await?;
    Ok(Json(pagination.wrap_response(page.items, page.total)))
}

#[utoipa::path(
    post,
    path = "/api/v1/billing/invoices",
    request_body = CreateInvoiceRequest,
    responses(
        (status = 201, description = "Invoice created with computed totals", body = Invoice),
        (status = 400, description = "Invalid items or discount"),
        (status = 404, description = "Patient not found")
    ),
    tag = "billing",
    security(("bearer_auth" = []))
)]
pub async fn create_invoice(
    State(server): State<CareDeskServer>,
    auth: AuthContext,
    Json(request): Json<CreateInvoiceRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Invoice>>), ApiError> {
    auth.require(Permission::ManageBilling)?;
    let invoice = server.invoicing.create(request, auth.user_id).await?;
    Ok((StatusCode::CREATED, Json(api_success(invoice))))
}

#[utoipa::path(
    post,
    path = "/api/v1/billing/invoices/from-appointment/{appointment_id}",
    params(("appointment_id" = Uuid, Path, description = "Completed appointment")),
    responses(
        (status = 201, description = "Consultation invoice", body = Invoice),
        (status = 409, description = "Appointment already invoiced"),
        (status = 422, description = "Appointment is not completed")
    ),
    tag = "billing",
    security(("bearer_auth" = []))
)]
pub async fn invoice_from_appointment(
    State(server): State<CareDeskServer>,
    Path(appointment_id): Path<Uuid>,
    auth: AuthContext,
) -> Result<(StatusCode, Json<ApiResponse<Invoice>>), ApiError> {
    auth.require(Permission::ManageBilling)?;
    let invoice = server.invoicing.from_appointment(appointment_id, auth.user_id).await?;
    Ok((StatusCode::CREATED, Json(api_success(invoice))))
}

#[utoipa::path(
    post,
    path = "/api/v1/billing/invoices/from-prescription/{prescription_id}",
    params(("prescription_id" = Uuid, Path, description = "Dispensed prescription")),
    responses(
        (status = 201, description = "Medication invoice", body = Invoice),
        (status = 409, description = "Prescription already invoiced"),
        (status = 422, description = "Prescription is not dispensed")
    ),
    tag = "billing",
    security(("bearer_auth" = []))
)]
pub async fn invoice_from_prescription(
    State(server): State<CareDeskServer>,
    Path(prescription_id): Path<Uuid>,
    auth: AuthContext,
) -> Result<(StatusCode, Json<ApiResponse<Invoice>>), ApiError> {
    auth.require(Permission::ManageBilling)?;
    let invoice = server.invoicing.from_prescription(prescription_id, auth.user_id).await?;
    Ok((StatusCode::CREATED, Json(api_success(invoice))))
}

#[utoipa::path(
    get,
    path = "/api/v1/billing/invoices/{id}",
    params(("id" = Uuid, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Invoice with its payments", body = InvoiceWithPayments),
        (status = 404, description = "Invoice not found")
    ),
    tag = "billing",
    security(("bearer_auth" = []))
)]
pub async fn get_invoice(
    State(server): State<CareDeskServer>,
    Path(id): Path<Uuid>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<InvoiceWithPayments>>, ApiError> {
    auth.require(Permission::ViewBilling)?;
    let invoice = server.invoicing.billing().get_invoice_with_payments(id).await?;
    auth.ensure_patient_access(&server, invoice.invoice.patient_id).await?;
    Ok(Json(api_success(invoice)))
}

#[utoipa::path(
    post,
    path = "/api/v1/billing/invoices/{id}/payments",
    params(("id" = Uuid, Path, description = "Invoice ID")),
    request_body = RecordPaymentRequest,
    responses(
        (status = 201, description = "Payment recorded", body = PaymentReceipt),
        (status = 422, description = "Overpayment, or invoice paid or cancelled")
    ),
    tag = "billing",
    security(("bearer_auth" = []))
)]
pub async fn record_payment(
    State(server): State<CareDeskServer>,
    Path(id): Path<Uuid>,
    auth: AuthContext,
    Json(request): Json<RecordPaymentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PaymentReceipt>>), ApiError> {
    auth.require(Permission::ManageBilling)?;
    let (invoice, payment) = server
        .invoicing
        .billing()
        .record_payment(id, request, auth.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(api_success(PaymentReceipt { invoice, payment }))))
}

#[utoipa::path(
    post,
    path = "/api/v1/billing/invoices/{id}/cancel",
    params(("id" = Uuid, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Invoice cancelled", body = Invoice),
        (status = 422, description = "Invoice already has payments")
    ),
    tag = "billing",
    security(("bearer_auth" = []))
)]
pub async fn cancel_invoice(
    State(server): State<CareDeskServer>,
    Path(id): Path<Uuid>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<Invoice>>, ApiError> {
    auth.require(Permission::ManageBilling)?;
    Ok(Json(api_success(server.invoicing.billing().cancel_invoice(id).await?)))
}

// ============================================================================
// REPORTING
// ============================================================================

#[utoipa::path(
    get,
    path = "/api/v1/billing/summary",
    params(PeriodQuery),
    responses((status = 200, description = "Invoiced, collected and outstanding totals", body = RevenueSummary)),
    tag = "billing",
    security(("bearer_auth" = []))
)]
pub async fn revenue_summary(
    State(server): State<CareDeskServer>,
    Query(period): Query<PeriodQuery>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<RevenueSummary>>, ApiError> {
    auth.require(Permission::ManageBilling)?;
    let summary = server
        .invoicing
        .billing()
        .revenue_summary(period.from, period.to)
        .await?;
    Ok(Json(api_success(summary)))
}
