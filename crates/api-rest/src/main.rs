//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own.
//!
//! ## Intended use
//! This binary is useful for development and debugging when you only want the REST
//! server (with OpenAPI/Swagger UI). The workspace's main `careport-run` binary is
//! the deployment entry point and serves the same router.

use api_rest::{build_router, AppState};
use careport_core::CoreConfig;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the CarePort REST API server
///
/// Starts the REST API server on the configured address (default: 0.0.0.0:3000).
/// Provides HTTP endpoints for portal operations with OpenAPI/Swagger documentation.
///
/// # Environment Variables
/// - `CAREPORT_REST_ADDR`: Server address (default: "0.0.0.0:3000")
/// - `PORTAL_DATA_DIR`: Directory for portal data storage (default: "portal_data")
/// - `CAREPORT_NAMESPACE`: Namespace recorded on audit entries (default: "careport.dev.1")
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the portal data directory does not exist,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("CAREPORT_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    tracing::info!("-- Starting CarePort REST API on {}", addr);

    let portal_data_dir = std::env::var("PORTAL_DATA_DIR")
        .unwrap_or_else(|_| careport_core::DEFAULT_PORTAL_DATA_DIR.into());
    let portal_data_path = Path::new(&portal_data_dir);
    if !portal_data_path.exists() {
        anyhow::bail!(
            "Portal data directory does not exist: {}",
            portal_data_path.display()
        );
    }

    let portal_namespace =
        std::env::var("CAREPORT_NAMESPACE").unwrap_or_else(|_| "careport.dev.1".into());

    let cfg = Arc::new(CoreConfig::new(
        portal_data_path.to_path_buf(),
        portal_namespace,
    )?);

    let app = build_router(AppState { cfg });

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
