use anyhow::{Context, Result};
use carwatch::{
    api,
    app_state::AppState,
    config::{Config, StoreBackend},
    fetcher::Fetcher,
    notifier::SmtpNotifier,
    orchestrator::{PipelineSettings, SiteScraper},
    repositories::{DocumentStore, FirestoreStore, ListingRepository, MemoryStore},
    telemetry,
};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing();

    let config = Config::from_env().context("Failed to load configuration")?;
    info!("Loaded configuration: {:?}", config);

    let store: Arc<dyn DocumentStore> = match &config.store {
        StoreBackend::Firestore(settings) => Arc::new(
            FirestoreStore::from_settings(settings).context("Failed to initialize Firestore")?,
        ),
        StoreBackend::Memory => {
            warn!("Using in-memory document store; listings are lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let source = SiteScraper::new(
        Fetcher::new().context("Failed to build HTTP client")?,
        &config.server.listings_base_url,
    );
    let state = AppState::with_repository(
        Arc::new(source),
        ListingRepository::new(store),
        Arc::new(SmtpNotifier::new(config.smtp.clone())),
        PipelineSettings::from(&config.server),
    );

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.bind_addr))?;
    api::serve(listener, state).await?;

    info!("Shutdown complete");
    Ok(())
}
