//! Middleware for request processing

pub mod auth_context;

pub use auth_context::AuthContext;

use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::error::REDACTOR;
use crate::server::CareDeskServer;

/// CORS from `server.cors_origins`; any origin when the list is empty
pub fn create_cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_DISPOSITION]);

    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

/// Request timing middleware
pub async fn request_timing_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    tracing::info!(
        method = %method,
        uri = %uri,
        status = response.status().as_u16(),
        duration_ms = start.elapsed().as_millis(),
        "Request processed"
    );

    response
}

/// Audit trail of who touched which resource.
///
/// The subject comes from the bearer token when it verifies; the request is
/// never rejected here, the `AuthContext` extractor does that.
pub async fn audit_logging_middleware(
    State(server): State<CareDeskServer>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = REDACTOR.redact(request.uri().path());

    let subject = auth_context::bearer_token(request.headers())
        .ok()
        .and_then(|token| server.identity.verify_token(token).ok());

    let response = next.run(request).await;

    match subject {
        Some(claims) => tracing::info!(
            target: "audit",
            method = %method,
            path = %path,
            user_id = %claims.sub,
            role = claims.role.as_str(),
            status = response.status().as_u16(),
            "Audit: request handled"
        ),
        None => tracing::info!(
            target: "audit",
            method = %method,
            path = %path,
            user_id = "anonymous",
            status = response.status().as_u16(),
            "Audit: request handled"
        ),
    }

    response
}
