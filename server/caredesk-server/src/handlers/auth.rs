use auth_identity::{ChangePasswordRequest, LoginRequest, LoginResponse, User};
use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{api_success, ApiError, ApiResponse};
use crate::middleware::AuthContext;
use crate::server::CareDeskServer;

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated, access token issued", body = LoginResponse),
        (status = 401, description = "Invalid credentials or disabled account")
    ),
    tag = "auth"
)]
pub async fn login(
    State(server): State<CareDeskServer>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let response = server.identity.authenticate(&request.email, &request.password).await?;
    tracing::info!(user_id = %response.user.id, role = response.user.role.as_str(), "User logged in");
    Ok(Json(api_success(response)))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Unauthorized")
    ),
    tag = "auth",
    security(("bearer_auth" = []))
)]
pub async fn me(
    State(server): State<CareDeskServer>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let user = server.identity.get_user(auth.user_id).await?;
    Ok(Json(api_success(user)))
}

#[utoipa::path(
    put,
    path = "/api/v1/auth/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "New password does not meet the policy"),
        (status = 401, description = "Current password is wrong")
    ),
    tag = "auth",
    security(("bearer_auth" = []))
)]
pub async fn change_password(
    State(server): State<CareDeskServer>,
    auth: AuthContext,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    server
        .identity
        .change_password(auth.user_id, &request.current_password, &request.new_password)
        .await?;
    Ok(Json(api_success(MessageResponse {
        message: "Password changed".to_string(),
    })))
}
