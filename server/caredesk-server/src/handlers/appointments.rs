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
    Appointment, AppointmentFilter, Availability, AvailabilityQuery, CreateAppointmentRequest, RescheduleRequest,
    UpdateAppointmentStatusRequest,
};
use crate::server::CareDeskServer;
use crate::types::PaginationParams;

#[utoipa::path(
    get,
    path = "/api/v1/appointments",
    params(PaginationParams, AppointmentFilter),
    responses(
        (status = 200, description = "Appointments by start time; patients see only their own", body = Vec<Appointment>)
    ),
    tag = "appointments",
    security(("bearer_auth" = []))
)]
pub async fn list_appointments(
    State(server): State<CareDeskServer>,
    Query(pagination): Query<PaginationParams>,
    Query(mut filter): Query<AppointmentFilter>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<Vec<Appointment>>>, ApiError> {
    auth.require(Permission::ViewAppointments)?;
    if let Some(own) = auth.patient_scope(&server).await? {
        filter.patient_id = Some(own);
    }
    let (items, total) = server
        .scheduling
        .list(&filter, pagination.limit(), pagination.offset())
        .await?;
    Ok(Json(pagination.wrap_response(items, total)))
}

#[utoipa::path(
    post,
    path = "/api/v1/appointments",
    request_body = CreateAppointmentRequest,
    responses(
        (status = 201, description = "Appointment booked", body = Appointment),
        (status = 400, description = "Invalid duration or reason"),
        (status = 409, description = "Doctor or patient already booked in that interval"),
        (status = 422, description = "Time is in the past, or patient/doctor inactive")
    ),
    tag = "appointments",
    security(("bearer_auth" = []))
)]
pub async fn create_appointment(
    State(server): State<CareDeskServer>,
    auth: AuthContext,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Appointment>>), ApiError> {
    auth.require(Permission::ManageAppointments)?;
    let appointment = server.scheduling.book(request, auth.user_id).await?;
    Ok((StatusCode::CREATED, Json(api_success(appointment))))
}

#[utoipa::path(
    get,
    path = "/api/v1/appointments/availability",
    params(AvailabilityQuery),
    responses(
        (status = 200, description = "Free slots in the doctor's working window", body = Availability),
        (status = 404, description = "Doctor not found")
    ),
    tag = "appointments",
    security(("bearer_auth" = []))
)]
pub async fn availability(
    State(server): State<CareDeskServer>,
    Query(query): Query<AvailabilityQuery>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<Availability>>, ApiError> {
    auth.require(Permission::ViewAppointments)?;
    Ok(Json(api_success(server.scheduling.availability(query).await?)))
}

#[utoipa::path(
    get,
    path = "/api/v1/appointments/{id}",
    params(("id" = Uuid, Path, description = "Appointment ID")),
    responses(
        (status = 200, description = "Appointment", body = Appointment),
        (status = 404, description = "Appointment not found")
    ),
    tag = "appointments",
    security(("bearer_auth" = []))
)]
pub async fn get_appointment(
    State(server): State<CareDeskServer>,
    Path(id): Path<Uuid>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<Appointment>>, ApiError> {
    auth.require(Permission::ViewAppointments)?;
    let appointment = server.scheduling.get(id).await?;
    auth.ensure_patient_access(&server, appointment.patient_id).await?;
    Ok(Json(api_success(appointment)))
}

#[utoipa::path(
    put,
    path = "/api/v1/appointments/{id}/status",
    params(("id" = Uuid, Path, description = "Appointment ID")),
    request_body = UpdateAppointmentStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = Appointment),
        (status = 422, description = "Transition not allowed")
    ),
    tag = "appointments",
    security(("bearer_auth" = []))
)]
pub async fn update_status(
    State(server): State<CareDeskServer>,
    Path(id): Path<Uuid>,
    auth: AuthContext,
    Json(request): Json<UpdateAppointmentStatusRequest>,
) -> Result<Json<ApiResponse<Appointment>>, ApiError> {
    auth.require(Permission::ManageAppointments)?;
    Ok(Json(api_success(server.scheduling.update_status(id, request).await?)))
}

#[utoipa::path(
    put,
    path = "/api/v1/appointments/{id}/reschedule",
    params(("id" = Uuid, Path, description = "Appointment ID")),
    request_body = RescheduleRequest,
    responses(
        (status = 200, description = "Moved; status back to scheduled", body = Appointment),
        (status = 409, description = "New interval conflicts with another booking"),
        (status = 422, description = "Appointment is no longer active or time is in the past")
    ),
    tag = "appointments",
    security(("bearer_auth" = []))
)]
pub async fn reschedule(
    State(server): State<CareDeskServer>,
    Path(id): Path<Uuid>,
    auth: AuthContext,
    Json(request): Json<RescheduleRequest>,
) -> Result<Json<ApiResponse<Appointment>>, ApiError> {
    auth.require(Permission::ManageAppointments)?;
    Ok(Json(api_success(server.scheduling.reschedule(id, request).await?)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/appointments/{id}",
    params(("id" = Uuid, Path, description = "Appointment ID")),
    responses(
        (status = 204, description = "Appointment removed"),
        (status = 422, description = "Only cancelled appointments can be deleted")
    ),
    tag = "appointments",
    security(("bearer_auth" = []))
)]
pub async fn delete_appointment(
    State(server): State<CareDeskServer>,
    Path(id): Path<Uuid>,
    auth: AuthContext,
) -> Result<StatusCode, ApiError> {
    auth.require(Permission::ManageAppointments)?;
    server.scheduling.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
