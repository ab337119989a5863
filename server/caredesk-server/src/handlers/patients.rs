use auth_identity::Permission;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use billing_service::{Invoice, InvoiceFilter};
use uuid::Uuid;

use crate::error::{api_success, ApiError, ApiResponse};
use crate::middleware::AuthContext;
use crate::models::{
    Appointment, AppointmentFilter, CreatePatientRequest, LabTest, LabTestFilter, PatientFilter, PatientView,
    Prescription, PrescriptionFilter, UpdatePatientRequest,
};
use crate::server::CareDeskServer;
use crate::types::PaginationParams;

// ============================================================================
// CRUD
// ============================================================================

#[utoipa::path(
    get,
    path = "/api/v1/patients",
    params(PaginationParams, PatientFilter),
    responses(
        (status = 200, description = "Patients, newest first", body = Vec<PatientView>),
        (status = 403, description = "Forbidden")
    ),
    tag = "patients",
    security(("bearer_auth" = []))
)]
pub async fn list_patients(
    State(server): State<CareDeskServer>,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<PatientFilter>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<Vec<PatientView>>>, ApiError> {
    auth.require(Permission::ViewPatients)?;
    let (patients, total) = server
        .patients
        .list(&filter, pagination.limit(), pagination.offset())
        .await?;
    let views = patients.into_iter().map(PatientView::from).collect();
    Ok(Json(pagination.wrap_response(views, total)))
}

#[utoipa::path(
    post,
    path = "/api/v1/patients",
    request_body = CreatePatientRequest,
    responses(
        (status = 201, description = "Patient registered", body = PatientView),
        (status = 400, description = "Invalid patient data"),
        (status = 409, description = "Account email already in use")
    ),
    tag = "patients",
    security(("bearer_auth" = []))
)]
pub async fn create_patient(
    State(server): State<CareDeskServer>,
    auth: AuthContext,
    Json(request): Json<CreatePatientRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PatientView>>), ApiError> {
    auth.require(Permission::ManagePatients)?;
    let patient = server.patients.create(request).await?;
    Ok((StatusCode::CREATED, Json(api_success(PatientView::from(patient)))))
}

#[utoipa::path(
    get,
    path = "/api/v1/patients/{id}",
    params(("id" = Uuid, Path, description = "Patient ID")),
    responses(
        (status = 200, description = "Patient", body = PatientView),
        (status = 404, description = "Patient not found")
    ),
    tag = "patients",
    security(("bearer_auth" = []))
)]
pub async fn get_patient(
    State(server): State<CareDeskServer>,
    Path(id): Path<Uuid>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<PatientView>>, ApiError> {
    auth.require(Permission::ViewPatients)?;
    let patient = server.patients.get(id).await?;
    Ok(Json(api_success(PatientView::from(patient))))
}

#[utoipa::path(
    put,
    path = "/api/v1/patients/{id}",
    params(("id" = Uuid, Path, description = "Patient ID")),
    request_body = UpdatePatientRequest,
    responses(
        (status = 200, description = "Patient updated", body = PatientView),
        (status = 400, description = "Invalid patient data"),
        (status = 404, description = "Patient not found")
    ),
    tag = "patients",
    security(("bearer_auth" = []))
)]
pub async fn update_patient(
    State(server): State<CareDeskServer>,
    Path(id): Path<Uuid>,
    auth: AuthContext,
    Json(request): Json<UpdatePatientRequest>,
) -> Result<Json<ApiResponse<PatientView>>, ApiError> {
    auth.require(Permission::ManagePatients)?;
    let patient = server.patients.update(id, request).await?;
    Ok(Json(api_success(PatientView::from(patient))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/patients/{id}",
    params(("id" = Uuid, Path, description = "Patient ID")),
    responses(
        (status = 204, description = "Patient removed"),
        (status = 404, description = "Patient not found")
    ),
    tag = "patients",
    security(("bearer_auth" = []))
)]
pub async fn delete_patient(
    State(server): State<CareDeskServer>,
    Path(id): Path<Uuid>,
    auth: AuthContext,
) -> Result<StatusCode, ApiError> {
    auth.require(Permission::ManagePatients)?;
    server.patients.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// PATIENT RECORDS
// ============================================================================

#[utoipa::path(
    get,
    path = "/api/v1/patients/{id}/appointments",
    params(("id" = Uuid, Path, description = "Patient ID"), PaginationParams),
    responses((status = 200, description = "Patient's appointments", body = Vec<Appointment>)),
    tag = "patients",
    security(("bearer_auth" = []))
)]
pub async fn patient_appointments(
    State(server): State<CareDeskServer>,
    Path(id): Path<Uuid>,
    Query(pagination): Query<PaginationParams>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<Vec<Appointment>>>, ApiError> {
    auth.require(Permission::ViewAppointments)?;
    auth.ensure_patient_access(&server, id).await?;
    server.patients.get(id).await?;

    let filter = AppointmentFilter {
        patient_id: Some(id),
        ..Default::default()
    };
    let (items, total) = server
        .scheduling
        .list(&filter, pagination.limit(), pagination.offset())
        .await?;
    Ok(Json(pagination.wrap_response(items, total)))
}

#[utoipa::path(
    get,
    path = "/api/v1/patients/{id}/prescriptions",
    params(("id" = Uuid, Path, description = "Patient ID"), PaginationParams),
    responses((status = 200, description = "Patient's prescriptions", body = Vec<Prescription>)),
    tag = "patients",
    security(("bearer_auth" = []))
)]
pub async fn patient_prescriptions(
    State(server): State<CareDeskServer>,
    Path(id): Path<Uuid>,
    Query(pagination): Query<PaginationParams>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<Vec<Prescription>>>, ApiError> {
    auth.require(Permission::ViewPrescriptions)?;
    auth.ensure_patient_access(&server, id).await?;
    server.patients.get(id).await?;

    let filter = PrescriptionFilter {
        patient_id: Some(id),
        ..Default::default()
    };
    let (items, total) = server
        .prescriptions
        .list(&filter, pagination.limit(), pagination.offset())
        .await?;
    Ok(Json(pagination.wrap_response(items, total)))
}

#[utoipa::path(
    get,
    path = "/api/v1/patients/{id}/lab-tests",
    params(("id" = Uuid, Path, description = "Patient ID"), PaginationParams),
    responses((status = 200, description = "Patient's lab tests", body = Vec<LabTest>)),
    tag = "patients",
    security(("bearer_auth" = []))
)]
pub async fn patient_lab_tests(
    State(server): State<CareDeskServer>,
    Path(id): Path<Uuid>,
    Query(pagination): Query<PaginationParams>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<Vec<LabTest>>>, ApiError> {
    auth.require(Permission::ViewLabTests)?;
    auth.ensure_patient_access(&server, id).await?;
    server.patients.get(id).await?;

    let filter = LabTestFilter {
        patient_id: Some(id),
        ..Default::default()
    };
    let (items, total) = server
        .lab
        .list(&filter, pagination.limit(), pagination.offset())
        .await?;
    Ok(Json(pagination.wrap_response(items, total)))
}

#[utoipa::path(
    get,
    path = "/api/v1/patients/{id}/invoices",
    params(("id" = Uuid, Path, description = "Patient ID"), PaginationParams),
    responses((status = 200, description = "Patient's invoices", body = Vec<Invoice>)),
    tag = "patients",
    security(("bearer_auth" = []))
)]
pub async fn patient_invoices(
    State(server): State<CareDeskServer>,
    Path(id): Path<Uuid>,
    Query(pagination): Query<PaginationParams>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<Vec<Invoice>>>, ApiError> {
    auth.require(Permission::ViewBilling)?;
    auth.ensure_patient_access(&server, id).await?;
    server.patients.get(id).await?;

    let filter = InvoiceFilter {
        patient_id: Some(id),
        ..Default::default()
    };
    let page = server
        .invoicing
        .billing()
        .list_invoices(&filter, pagination.limit(), pagination.offset())
        .await?;
    Ok(Json(pagination.wrap_response(page.items, page.total)))
}
