//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own, with OpenAPI/Swagger UI. Useful for
//! development and debugging; deployments normally run the workspace's main
//! `cmr-run` binary.

use api_rest::{build_state, router};
use cmr_core::{CoreConfig, DEFAULT_CASE_DATA_DIR};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// # Environment Variables
/// - `CMR_REST_ADDR`: server address (default: "0.0.0.0:3000")
/// - `CASE_DATA_DIR`: case storage directory (default: "case_data"); must exist
/// - `CMR_ACCESS_CODE`: the authenticator-issued verification code (required)
/// - `CMR_NAMESPACE`: owning practice namespace (default: "cmr.dev.1")
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("CMR_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let case_data_dir =
        std::env::var("CASE_DATA_DIR").unwrap_or_else(|_| DEFAULT_CASE_DATA_DIR.into());
    if !Path::new(&case_data_dir).exists() {
        anyhow::bail!("Case data directory does not exist: {case_data_dir}");
    }

    let access_code = std::env::var("CMR_ACCESS_CODE").map_err(|_| {
        anyhow::anyhow!("CMR_ACCESS_CODE must be set to the authenticator-issued code")
    })?;
    let namespace = std::env::var("CMR_NAMESPACE").unwrap_or_else(|_| "cmr.dev.1".into());

    let cfg = Arc::new(CoreConfig::new(case_data_dir.into(), access_code, namespace)?);

    tracing::info!("-- Starting CMR REST API on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router(build_state(cfg))).await?;

    Ok(())
}
