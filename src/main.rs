//! Main entry point for the CarePort application.
//!
//! Boots the REST API (built by the `api-rest` crate) against the configured
//! portal data directory.

use api_rest::{build_router, AppState};
use careport_core::CoreConfig;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the CarePort application
///
/// Starts the REST server on port 3000 (configurable via CAREPORT_REST_ADDR),
/// serving patient records, appointments, prescriptions, the pharmacy catalogue,
/// orders, deliveries, triage and analytics.
///
/// # Environment Variables
/// - `CAREPORT_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `PORTAL_DATA_DIR`: Directory for portal data storage (default: "portal_data")
/// - `CAREPORT_NAMESPACE`: Namespace recorded on audit entries (default: "careport.dev.1")
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If startup or runtime fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("careport=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("CAREPORT_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    tracing::info!("++ Starting CarePort REST on {}", rest_addr);

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

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
