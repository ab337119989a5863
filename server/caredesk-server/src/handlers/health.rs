use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::server::CareDeskServer;

/// Health check response
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `healthy` or `degraded`
    pub status: String,
    pub timestamp: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub storage: StorageHealth,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StorageHealth {
    pub backend: String,
    pub reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Version information response
#[derive(Debug, Serialize, ToSchema)]
pub struct VersionResponse {
    pub name: String,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service and storage are healthy", body = HealthResponse),
        (status = 503, description = "Storage is unreachable", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(server): State<CareDeskServer>) -> (StatusCode, Json<HealthResponse>) {
    let ping = server.storage.ping().await;
    if let Err(error) = &ping {
        tracing::error!(backend = server.storage.backend(), error = %error, "Storage health check failed");
    }

    let reachable = ping.is_ok();
    let response = HealthResponse {
        status: if reachable { "healthy" } else { "degraded" }.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: server.uptime_seconds(),
        storage: StorageHealth {
            backend: server.storage.backend().to_string(),
            reachable,
            error: ping.err(),
        },
    };

    let status = if reachable {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}

#[utoipa::path(
    get,
    path = "/version",
    responses((status = 200, description = "Build information", body = VersionResponse)),
    tag = "health"
)]
pub async fn version_info() -> Json<VersionResponse> {
    Json(VersionResponse {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
