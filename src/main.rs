use api_rest::{build_state, router};
use cmr_core::{CoreConfig, DEFAULT_CASE_DATA_DIR};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the CMR application
///
/// Starts the REST server with OpenAPI/Swagger documentation. Every request
/// is expected to arrive through the identity-provider gateway, which
/// installs the verified viewer role, identity and session headers.
///
/// # Environment Variables
/// - `CMR_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `CASE_DATA_DIR`: directory for case data storage (default: "case_data")
/// - `CMR_ACCESS_CODE`: verification code issued by the external
///   authenticator (required)
/// - `CMR_NAMESPACE`: owning practice namespace (default: "cmr.dev.1")
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If startup or runtime fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("cmr=info".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("CMR_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let case_data_dir =
        std::env::var("CASE_DATA_DIR").unwrap_or_else(|_| DEFAULT_CASE_DATA_DIR.into());
    let access_code = std::env::var("CMR_ACCESS_CODE").map_err(|_| {
        anyhow::anyhow!("CMR_ACCESS_CODE must be set to the authenticator-issued code")
    })?;
    let namespace = std::env::var("CMR_NAMESPACE").unwrap_or_else(|_| "cmr.dev.1".into());

    let cfg = Arc::new(CoreConfig::new(case_data_dir.into(), access_code, namespace)?);

    tracing::info!("++ Starting CMR REST on {}", rest_addr);

    let state = build_state(cfg);
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}
