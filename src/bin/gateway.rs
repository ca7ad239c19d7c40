use anyhow::{Context, Result};
use carwatch::{
    api, app_state::AppState, config::GatewayConfig, orchestrator::PipelineSettings, remote,
    telemetry,
};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing();

    let config = GatewayConfig::from_env().context("Failed to load configuration")?;
    info!("Loaded configuration: {:?}", config);

    let (scraper, store, notifier) =
        remote::peers(&config.peers).context("Failed to build HTTP client")?;
    let state = AppState::new(
        Arc::new(scraper),
        Arc::new(store),
        Arc::new(notifier),
        PipelineSettings::from(&config.server),
    );

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.bind_addr))?;
    api::serve(listener, state).await?;

    info!("Shutdown complete");
    Ok(())
}
