use auth_identity::Permission;
use axum::{
    extract::{Query, State},
    Json,
};
use billing_service::MonthlyRevenue;

use crate::error::{api_success, ApiError, ApiResponse};
use crate::middleware::AuthContext;
use crate::server::CareDeskServer;
use crate::services::analytics::{
    AppointmentStats, DailyCount, DashboardStats, Demographics, DoctorWorkload, PeriodQuery, TrendQuery,
};

#[utoipa::path(
    get,
    path = "/api/v1/analytics/dashboard",
    responses((status = 200, description = "Headline figures", body = DashboardStats)),
    tag = "analytics",
    security(("bearer_auth" = []))
)]
pub async fn dashboard(
    State(server): State<CareDeskServer>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<DashboardStats>>, ApiError> {
    auth.require(Permission::ViewAnalytics)?;
    Ok(Json(api_success(server.analytics.dashboard().await?)))
}

#[utoipa::path(
    get,
    path = "/api/v1/analytics/appointments",
    params(PeriodQuery),
    responses((status = 200, description = "Status breakdown and rates", body = AppointmentStats)),
    tag = "analytics",
    security(("bearer_auth" = []))
)]
pub async fn appointment_stats(
    State(server): State<CareDeskServer>,
    Query(period): Query<PeriodQuery>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<AppointmentStats>>, ApiError> {
    auth.require(Permission::ViewAnalytics)?;
    Ok(Json(api_success(server.analytics.appointments(period).await?)))
}

#[utoipa::path(
    get,
    path = "/api/v1/analytics/appointments/trend",
    params(TrendQuery),
    responses(
        (status = 200, description = "Appointments per day, oldest first", body = Vec<DailyCount>),
        (status = 400, description = "days outside 1..=365")
    ),
    tag = "analytics",
    security(("bearer_auth" = []))
)]
pub async fn appointment_trend(
    State(server): State<CareDeskServer>,
    Query(query): Query<TrendQuery>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<Vec<DailyCount>>>, ApiError> {
    auth.require(Permission::ViewAnalytics)?;
    Ok(Json(api_success(server.analytics.appointment_trend(query.days).await?)))
}

#[utoipa::path(
    get,
    path = "/api/v1/analytics/revenue/trend",
    params(TrendQuery),
    responses(
        (status = 200, description = "Collected per calendar month, oldest first", body = Vec<MonthlyRevenue>),
        (status = 400, description = "months outside 1..=36")
    ),
    tag = "analytics",
    security(("bearer_auth" = []))
)]
pub async fn revenue_trend(
    State(server): State<CareDeskServer>,
    Query(query): Query<TrendQuery>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<Vec<MonthlyRevenue>>>, ApiError> {
    auth.require(Permission::ViewAnalytics)?;
    Ok(Json(api_success(server.analytics.revenue_trend(query.months).await?)))
}

#[utoipa::path(
    get,
    path = "/api/v1/analytics/doctors/workload",
    params(PeriodQuery),
    responses((status = 200, description = "Per doctor totals, busiest first", body = Vec<DoctorWorkload>)),
    tag = "analytics",
    security(("bearer_auth" = []))
)]
pub async fn doctor_workload(
    State(server): State<CareDeskServer>,
    Query(period): Query<PeriodQuery>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<Vec<DoctorWorkload>>>, ApiError> {
    auth.require(Permission::ViewAnalytics)?;
    Ok(Json(api_success(server.analytics.doctor_workload(period).await?)))
}

#[utoipa::path(
    get,
    path = "/api/v1/analytics/patients/demographics",
    responses((status = 200, description = "Gender, age group and blood group shares", body = Demographics)),
    tag = "analytics",
    security(("bearer_auth" = []))
)]
pub async fn demographics(
    State(server): State<CareDeskServer>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<Demographics>>, ApiError> {
    auth.require(Permission::ViewAnalytics)?;
    Ok(Json(api_success(server.analytics.demographics().await?)))
}
