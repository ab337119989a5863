//! Doctors, nurses and lab technicians share these handlers.
//!
//! Each kind's router carries its [`StaffKind`] as an extension, so
//! `/doctors/{id}` never resolves a nurse's record.

use auth_identity::Permission;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;

use crate::error::{api_success, ApiError, ApiResponse};
use crate::middleware::AuthContext;
use crate::models::{
    Appointment, CreateStaffRequest, ScheduleQuery, StaffFilter, StaffKind, StaffMember, UpdateStaffRequest,
};
use crate::server::CareDeskServer;
use crate::types::PaginationParams;

#[utoipa::path(
    get,
    path = "/api/v1/{staff_kind}",
    params(
        ("staff_kind" = String, Path, description = "doctors, nurses or lab-technicians"),
        PaginationParams,
        StaffFilter
    ),
    responses(
        (status = 200, description = "Staff of one kind", body = Vec<StaffMember>),
        (status = 403, description = "Forbidden")
    ),
    tag = "staff",
    security(("bearer_auth" = []))
)]
pub async fn list_staff(
    State(server): State<CareDeskServer>,
    Extension(kind): Extension<StaffKind>,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<StaffFilter>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<Vec<StaffMember>>>, ApiError> {
    auth.require(Permission::ViewStaff)?;
    let (members, total) = server
        .staff
        .list(kind, &filter, pagination.limit(), pagination.offset())
        .await?;
    Ok(Json(pagination.wrap_response(members, total)))
}

#[utoipa::path(
    post,
    path = "/api/v1/{staff_kind}",
    params(("staff_kind" = String, Path, description = "doctors, nurses or lab-technicians")),
    request_body = CreateStaffRequest,
    responses(
        (status = 201, description = "Staff member created", body = StaffMember),
        (status = 400, description = "Missing fields for this kind of staff"),
        (status = 409, description = "Email already in use")
    ),
    tag = "staff",
    security(("bearer_auth" = []))
)]
pub async fn create_staff(
    State(server): State<CareDeskServer>,
    Extension(kind): Extension<StaffKind>,
    auth: AuthContext,
    Json(request): Json<CreateStaffRequest>,
) -> Result<(StatusCode, Json<ApiResponse<StaffMember>>), ApiError> {
    auth.require(Permission::ManageStaff)?;
    let member = server.staff.create(kind, request).await?;
    Ok((StatusCode::CREATED, Json(api_success(member))))
}

#[utoipa::path(
    get,
    path = "/api/v1/{staff_kind}/{id}",
    params(
        ("staff_kind" = String, Path, description = "doctors, nurses or lab-technicians"),
        ("id" = Uuid, Path, description = "Staff member ID")
    ),
    responses(
        (status = 200, description = "Staff member", body = StaffMember),
        (status = 404, description = "No staff member of this kind with that ID")
    ),
    tag = "staff",
    security(("bearer_auth" = []))
)]
pub async fn get_staff(
    State(server): State<CareDeskServer>,
    Extension(kind): Extension<StaffKind>,
    Path(id): Path<Uuid>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<StaffMember>>, ApiError> {
    auth.require(Permission::ViewStaff)?;
    Ok(Json(api_success(server.staff.get(kind, id).await?)))
}

#[utoipa::path(
    put,
    path = "/api/v1/{staff_kind}/{id}",
    params(
        ("staff_kind" = String, Path, description = "doctors, nurses or lab-technicians"),
        ("id" = Uuid, Path, description = "Staff member ID")
    ),
    request_body = UpdateStaffRequest,
    responses(
        (status = 200, description = "Staff member updated", body = StaffMember),
        (status = 404, description = "No staff member of this kind with that ID")
    ),
    tag = "staff",
    security(("bearer_auth" = []))
)]
pub async fn update_staff(
    State(server): State<CareDeskServer>,
    Extension(kind): Extension<StaffKind>,
    Path(id): Path<Uuid>,
    auth: AuthContext,
    Json(request): Json<UpdateStaffRequest>,
) -> Result<Json<ApiResponse<StaffMember>>, ApiError> {
    auth.require(Permission::ManageStaff)?;
    Ok(Json(api_success(server.staff.update(kind, id, request).await?)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/{staff_kind}/{id}",
    params(
        ("staff_kind" = String, Path, description = "doctors, nurses or lab-technicians"),
        ("id" = Uuid, Path, description = "Staff member ID")
    ),
    responses(
        (status = 204, description = "Staff member removed"),
        (status = 404, description = "No staff member of this kind with that ID")
    ),
    tag = "staff",
    security(("bearer_auth" = []))
)]
pub async fn delete_staff(
    State(server): State<CareDeskServer>,
    Extension(kind): Extension<StaffKind>,
    Path(id): Path<Uuid>,
    auth: AuthContext,
) -> Result<StatusCode, ApiError> {
    auth.require(Permission::ManageStaff)?;
    server.staff.delete(kind, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/doctors/{id}/schedule",
    params(("id" = Uuid, Path, description = "Doctor ID"), ScheduleQuery),
    responses(
        (status = 200, description = "Active appointments that day, by start time", body = Vec<Appointment>),
        (status = 404, description = "Doctor not found")
    ),
    tag = "staff",
    security(("bearer_auth" = []))
)]
pub async fn doctor_schedule(
    State(server): State<CareDeskServer>,
    Path(id): Path<Uuid>,
    Query(query): Query<ScheduleQuery>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<Vec<Appointment>>>, ApiError> {
    auth.require(Permission::ViewStaff)?;
    auth.require(Permission::ViewAppointments)?;
    let schedule = server.staff.doctor_schedule(id, query.date).await?;
    Ok(Json(api_success(schedule)))
}
