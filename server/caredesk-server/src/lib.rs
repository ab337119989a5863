//! CareDesk Server - hospital administration API
//!
//! Patients, staff, appointments, prescriptions, pharmacy stock, lab orders
//! and billing behind a role-checked REST API.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod openapi;
pub mod postgres;
pub mod repository;
pub mod routes;
pub mod server;
pub mod services;
pub mod types;
pub mod utils;
pub mod validation;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{ApiError, ApiResult};
pub use server::CareDeskServer;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Create the main application router with all routes and middleware
pub fn create_app(server: CareDeskServer) -> Router {
    routes::create_routes()
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::create_cors_layer(&server.config.server.cors_origins))
                .layer(from_fn(middleware::request_timing_middleware))
                .layer(from_fn_with_state(server.clone(), middleware::audit_logging_middleware)),
        )
        .with_state(server)
}
