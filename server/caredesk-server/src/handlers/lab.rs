use auth_identity::Permission;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::{api_success, ApiError, ApiResponse};
use crate::middleware::AuthContext;
use crate::models::{
    AssignTechnicianRequest, LabResultRequest, LabTest, LabTestFilter, OrderLabTestRequest, UpdateLabStatusRequest,
};
use crate::server::CareDeskServer;
use crate::types::PaginationParams;

#[utoipa::path(
    get,
    path = "/api/v1/lab-tests",
    params(PaginationParams, LabTestFilter),
    responses((status = 200, description = "Work queue: stat, urgent, routine; oldest first", body = Vec<LabTest>)),
    tag = "lab",
    security(("bearer_auth" = []))
)]
pub async fn list_lab_tests(
    State(server): State<CareDeskServer>,
    Query(pagination): Query<PaginationParams>,
    Query(mut filter): Query<LabTestFilter>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<Vec<LabTest>>>, ApiError> {
    auth.require(Permission::ViewLabTests)?;
    if let Some(own) = auth.patient_scope(&server).await? {
        filter.patient_id = Some(own);
    }
    let (items, total) = server
        .lab
        .list(&filter, pagination.limit(), pagination.offset())
        .await?;
    Ok(Json(pagination.wrap_response(items, total)))
}

#[utoipa::path(
    post,
    path = "/api/v1/lab-tests",
    request_body = OrderLabTestRequest,
    responses(
        (status = 201, description = "Lab test ordered", body = LabTest),
        (status = 400, description = "Invalid order")
    ),
    tag = "lab",
    security(("bearer_auth" = []))
)]
pub async fn order_lab_test(
    State(server): State<CareDeskServer>,
    auth: AuthContext,
    Json(request): Json<OrderLabTestRequest>,
) -> Result<(StatusCode, Json<ApiResponse<LabTest>>), ApiError> {
    auth.require(Permission::OrderLabTests)?;
    let test = server.lab.order(request, auth.user_id).await?;
    Ok((StatusCode::CREATED, Json(api_success(test))))
}

#[utoipa::path(
    get,
    path = "/api/v1/lab-tests/{id}",
    params(("id" = Uuid, Path, description = "Lab test ID")),
    responses(
        (status = 200, description = "Lab test", body = LabTest),
        (status = 404, description = "Lab test not found")
    ),
    tag = "lab",
    security(("bearer_auth" = []))
)]
pub async fn get_lab_test(
    State(server): State<CareDeskServer>,
    Path(id): Path<Uuid>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<LabTest>>, ApiError> {
    auth.require(Permission::ViewLabTests)?;
    let test = server.lab.get(id).await?;
    auth.ensure_patient_access(&server, test.patient_id).await?;
    Ok(Json(api_success(test)))
}

#[utoipa::path(
    put,
    path = "/api/v1/lab-tests/{id}/assign",
    params(("id" = Uuid, Path, description = "Lab test ID")),
    request_body = AssignTechnicianRequest,
    responses(
        (status = 200, description = "Technician assigned", body = LabTest),
        (status = 422, description = "Test is closed or technician inactive")
    ),
    tag = "lab",
    security(("bearer_auth" = []))
)]
pub async fn assign_technician(
    State(server): State<CareDeskServer>,
    Path(id): Path<Uuid>,
    auth: AuthContext,
    Json(request): Json<AssignTechnicianRequest>,
) -> Result<Json<ApiResponse<LabTest>>, ApiError> {
    auth.require(Permission::ProcessLabTests)?;
    Ok(Json(api_success(server.lab.assign(id, request.technician_id).await?)))
}

#[utoipa::path(
    put,
    path = "/api/v1/lab-tests/{id}/status",
    params(("id" = Uuid, Path, description = "Lab test ID")),
    request_body = UpdateLabStatusRequest,
    responses(
        (status = 200, description = "Status advanced", body = LabTest),
        (status = 422, description = "Transition not allowed or result missing")
    ),
    tag = "lab",
    security(("bearer_auth" = []))
)]
pub async fn update_lab_status(
    State(server): State<CareDeskServer>,
    Path(id): Path<Uuid>,
    auth: AuthContext,
    Json(request): Json<UpdateLabStatusRequest>,
) -> Result<Json<ApiResponse<LabTest>>, ApiError> {
    auth.require(Permission::ProcessLabTests)?;
    Ok(Json(api_success(server.lab.update_status(id, request.status).await?)))
}

#[utoipa::path(
    put,
    path = "/api/v1/lab-tests/{id}/result",
    params(("id" = Uuid, Path, description = "Lab test ID")),
    request_body = LabResultRequest,
    responses(
        (status = 200, description = "Result recorded", body = LabTest),
        (status = 422, description = "Test is closed")
    ),
    tag = "lab",
    security(("bearer_auth" = []))
)]
pub async fn record_result(
    State(server): State<CareDeskServer>,
    Path(id): Path<Uuid>,
    auth: AuthContext,
    Json(request): Json<LabResultRequest>,
) -> Result<Json<ApiResponse<LabTest>>, ApiError> {
    auth.require(Permission::ProcessLabTests)?;
    Ok(Json(api_success(server.lab.record_result(id, request).await?)))
}
