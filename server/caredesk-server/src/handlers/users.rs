//! Account administration and the caller's own profile

use auth_identity::{CreateUserRequest, Permission, Role, User};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{api_success, ApiError, ApiResponse};
use crate::middleware::AuthContext;
use crate::models::{PatientView, StaffMember};
use crate::server::CareDeskServer;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserQuery {
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRoleRequest {
    pub role: Role,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub is_active: bool,
}

/// The account plus whichever profile is linked to it
#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staff: Option<StaffMember>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient: Option<PatientView>,
}

// ============================================================================
// USERS
// ============================================================================

#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Invalid email or weak password"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Email already in use")
    ),
    tag = "users",
    security(("bearer_auth" = []))
)]
pub async fn create_user(
    State(server): State<CareDeskServer>,
    auth: AuthContext,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<User>>), ApiError> {
    auth.require(Permission::ManageUsers)?;
    let user = server.identity.register(request).await?;
    tracing::info!(user_id = %user.id, role = user.role.as_str(), created_by = %auth.user_id, "User created");
    Ok((StatusCode::CREATED, Json(api_success(user))))
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(UserQuery),
    responses(
        (status = 200, description = "Users", body = Vec<User>),
        (status = 403, description = "Forbidden")
    ),
    tag = "users",
    security(("bearer_auth" = []))
)]
pub async fn list_users(
    State(server): State<CareDeskServer>,
    Query(query): Query<UserQuery>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<Vec<User>>>, ApiError> {
    auth.require(Permission::ManageUsers)?;
    let users = server.identity.list_users(query.role).await?;
    Ok(Json(api_success(users)))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User", body = User),
        (status = 404, description = "User not found")
    ),
    tag = "users",
    security(("bearer_auth" = []))
)]
pub async fn get_user(
    State(server): State<CareDeskServer>,
    Path(id): Path<Uuid>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    auth.require(Permission::ManageUsers)?;
    Ok(Json(api_success(server.identity.get_user(id).await?)))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/{id}/role",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Role changed", body = User),
        (status = 404, description = "User not found")
    ),
    tag = "users",
    security(("bearer_auth" = []))
)]
pub async fn set_role(
    State(server): State<CareDeskServer>,
    Path(id): Path<Uuid>,
    auth: AuthContext,
    Json(request): Json<UpdateRoleRequest>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    auth.require(Permission::ManageUsers)?;
    if id == auth.user_id && request.role != Role::Admin {
        return Err(ApiError::validation("admins cannot remove their own admin role"));
    }
    let user = server.identity.set_role(id, request.role).await?;
    tracing::info!(user_id = %id, role = user.role.as_str(), changed_by = %auth.user_id, "User role changed");
    Ok(Json(api_success(user)))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/{id}/status",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Account enabled or disabled", body = User),
        (status = 404, description = "User not found")
    ),
    tag = "users",
    security(("bearer_auth" = []))
)]
pub async fn set_status(
    State(server): State<CareDeskServer>,
    Path(id): Path<Uuid>,
    auth: AuthContext,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    auth.require(Permission::ManageUsers)?;
    if id == auth.user_id && !request.is_active {
        return Err(ApiError::validation("admins cannot disable their own account"));
    }
    let user = server.identity.set_active(id, request.is_active).await?;
    tracing::info!(user_id = %id, is_active = user.is_active, changed_by = %auth.user_id, "User status changed");
    Ok(Json(api_success(user)))
}

// ============================================================================
// PROFILE
// ============================================================================

#[utoipa::path(
    get,
    path = "/api/v1/profile",
    responses(
        (status = 200, description = "Caller's account and linked profile", body = ProfileResponse),
        (status = 404, description = "No profile is linked to this account")
    ),
    tag = "users",
    security(("bearer_auth" = []))
)]
pub async fn get_profile(
    State(server): State<CareDeskServer>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<ProfileResponse>>, ApiError> {
    let user = server.identity.get_user(auth.user_id).await?;
    let (staff, patient) = if user.role == Role::Patient {
        (None, server.patients.find_by_user(user.id).await?.map(PatientView::from))
    } else {
        (server.staff.find_by_user(user.id).await?, None)
    };

    if staff.is_none() && patient.is_none() {
        return Err(ApiError::not_found("profile"));
    }
    Ok(Json(api_success(ProfileResponse { user, staff, patient })))
}
