use auth_identity::Permission;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::{api_success, ApiError, ApiResponse};
use crate::middleware::AuthContext;
use crate::models::{CreatePrescriptionRequest, Prescription, PrescriptionFilter};
use crate::server::CareDeskServer;
use crate::types::PaginationParams;

#[utoipa::path(
    get,
    path = "/api/v1/prescriptions",
    params(PaginationParams, PrescriptionFilter),
    responses((status = 200, description = "Prescriptions, newest first", body = Vec<Prescription>)),
    tag = "prescriptions",
    security(("bearer_auth" = []))
)]
pub async fn list_prescriptions(
    State(server): State<CareDeskServer>,
    Query(pagination): Query<PaginationParams>,
    Query(mut filter): Query<PrescriptionFilter>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<Vec<Prescription>>>, ApiError> {
    auth.require(Permission::ViewPrescriptions)?;
    if let Some(own) = auth.patient_scope(&server).await? {
        filter.patient_id = Some(own);
    }
    let (items, total) = server
        .prescriptions
        .list(&filter, pagination.limit(), pagination.offset())
        .await?;
    Ok(Json(pagination.wrap_response(items, total)))
}

#[utoipa::path(
    post,
    path = "/api/v1/prescriptions",
    request_body = CreatePrescriptionRequest,
    responses(
        (status = 201, description = "Prescription issued", body = Prescription),
        (status = 400, description = "Invalid items or appointment mismatch"),
        (status = 422, description = "Medicine no longer stocked, or patient/doctor inactive")
    ),
    tag = "prescriptions",
    security(("bearer_auth" = []))
)]
pub async fn create_prescription(
    State(server): State<CareDeskServer>,
    auth: AuthContext,
    Json(request): Json<CreatePrescriptionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Prescription>>), ApiError> {
    auth.require(Permission::Prescribe)?;
    let prescription = server.prescriptions.create(request, auth.user_id).await?;
    Ok((StatusCode::CREATED, Json(api_success(prescription))))
}

#[utoipa::path(
    get,
    path = "/api/v1/prescriptions/{id}",
    params(("id" = Uuid, Path, description = "Prescription ID")),
    responses(
        (status = 200, description = "Prescription", body = Prescription),
        (status = 404, description = "Prescription not found")
    ),
    tag = "prescriptions",
    security(("bearer_auth" = []))
)]
pub async fn get_prescription(
    State(server): State<CareDeskServer>,
    Path(id): Path<Uuid>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<Prescription>>, ApiError> {
    auth.require(Permission::ViewPrescriptions)?;
    let prescription = server.prescriptions.get(id).await?;
    auth.ensure_patient_access(&server, prescription.patient_id).await?;
    Ok(Json(api_success(prescription)))
}

#[utoipa::path(
    post,
    path = "/api/v1/prescriptions/{id}/dispense",
    params(("id" = Uuid, Path, description = "Prescription ID")),
    responses(
        (status = 200, description = "Stock deducted for every item", body = Prescription),
        (status = 409, description = "Insufficient stock; nothing was deducted"),
        (status = 422, description = "Prescription is not active")
    ),
    tag = "prescriptions",
    security(("bearer_auth" = []))
)]
pub async fn dispense(
    State(server): State<CareDeskServer>,
    Path(id): Path<Uuid>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<Prescription>>, ApiError> {
    auth.require(Permission::Dispense)?;
    Ok(Json(api_success(server.prescriptions.dispense(id, auth.user_id).await?)))
}

#[utoipa::path(
    post,
    path = "/api/v1/prescriptions/{id}/cancel",
    params(("id" = Uuid, Path, description = "Prescription ID")),
    responses(
        (status = 200, description = "Prescription cancelled", body = Prescription),
        (status = 422, description = "Prescription is not active")
    ),
    tag = "prescriptions",
    security(("bearer_auth" = []))
)]
pub async fn cancel(
    State(server): State<CareDeskServer>,
    Path(id): Path<Uuid>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<Prescription>>, ApiError> {
    auth.require(Permission::Prescribe)?;
    Ok(Json(api_success(server.prescriptions.cancel(id).await?)))
}
