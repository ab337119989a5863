use std::net::SocketAddr;

use clap::Parser;
use tracing::info;

use caredesk_server::{create_app, AppConfig, CareDeskServer};
use error_common::{CareError, Result};

/// CareDesk HTTP Server
#[derive(Parser, Debug)]
#[command(name = "caredesk-server")]
#[command(about = "Hospital administration HTTP API server")]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "caredesk.yaml")]
    config: String,

    /// Server bind address, overrides `server.host`
    #[arg(long)]
    host: Option<String>,

    /// Server port, overrides `server.port`
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config = AppConfig::load(&args.config)?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if args.verbose {
        config.logging.level = "debug".to_string();
    }

    logger_redacted::init_tracing(&config.logging, "caredesk_server")
        .map_err(|e| CareError::ConfigError(format!("Logging init failed: {e}")))?;

    info!("Starting CareDesk HTTP Server");
    info!(version = env!("CARGO_PKG_VERSION"), environment = %config.server.environment);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| CareError::ConfigError(format!("Invalid bind address: {e}")))?;

    let server = CareDeskServer::connect(config).await?;
    info!(storage = server.storage.backend(), "Storage ready");
    server.bootstrap_admin().await?;

    let app = create_app(server);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| CareError::NetworkError(format!("Failed to bind to {}: {}", addr, e)))?;

    info!("CareDesk server running on http://{}", addr);
    info!("Health check available at: http://{}/health", addr);
    info!("API v1 available at: http://{}/api/v1", addr);
    info!("OpenAPI document at: http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| CareError::ServerError(format!("HTTP server error: {}", e)))?;

    info!("CareDesk server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for the shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
