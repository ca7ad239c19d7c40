use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, error, info, info_span, instrument};

use crate::config::ServerSettings;
use crate::entities::Listing;
use crate::fetcher::FetchError;
use crate::orchestrator::{ListingSource, ListingStore, Notifier, fanout::notify_all};
use crate::repositories::StoreError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("failed to fetch listings: {0}")]
    Fetch(#[from] FetchError),

    #[error("failed to save listings: {0}")]
    Store(#[from] StoreError),

    #[error("scrape deadline exceeded after {0:?}")]
    DeadlineExceeded(Duration),

    #[error("scrape cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Upper bound on concurrent notifications.
    pub notify_concurrency: usize,
    /// Wall-clock budget for one page.
    pub deadline: Duration,
    pub subject: String,
}

impl From<&ServerSettings> for PipelineSettings {
    fn from(server: &ServerSettings) -> Self {
        Self {
            notify_concurrency: server.notify_concurrency,
            deadline: server.deadline,
            subject: server.subject.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeSummary {
    pub page: u32,
    pub extracted: usize,
    /// Listings inserted by this invocation.
    pub processed: usize,
    pub notified: usize,
    pub notify_failures: usize,
    /// Notifications abandoned when the deadline passed.
    pub notify_dropped: usize,
}

/// Runs fetch, extract and dedup for one page, then fans out notifications.
#[derive(Clone)]
pub struct Pipeline {
    source: Arc<dyn ListingSource>,
    store: Arc<dyn ListingStore>,
    notifier: Arc<dyn Notifier>,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn ListingSource>,
        store: Arc<dyn ListingStore>,
        notifier: Arc<dyn Notifier>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            source,
            store,
            notifier,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Scrape one page, bounded by the configured deadline.
    ///
    /// Fetch and save must finish within the deadline or the scrape fails.
    /// Notifications get whatever time is left; those still pending when it
    /// runs out are dropped and the scrape still succeeds.
    pub async fn scrape(&self, page: u32) -> Result<ScrapeSummary, PipelineError> {
        let deadline = Instant::now() + self.settings.deadline;
        let (extracted, new_listings) =
            match tokio::time::timeout_at(deadline, self.collect(page)).await {
                Ok(result) => result?,
                Err(_) => return Err(PipelineError::DeadlineExceeded(self.settings.deadline)),
            };
        Ok(self.notify(page, extracted, new_listings, deadline).await)
    }

    /// Like [`Pipeline::scrape`], abandoning work once `cancel` fires.
    /// Writes already committed stay committed.
    pub async fn scrape_until(
        &self,
        page: u32,
        cancel: CancellationToken,
    ) -> Result<ScrapeSummary, PipelineError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(PipelineError::Cancelled),
            result = self.scrape(page) => result,
        }
    }

    /// Run the pipeline detached; the outcome is only logged.
    pub fn spawn_detached(&self, page: u32, tracker: &TaskTracker, cancel: CancellationToken) {
        let pipeline = self.clone();
        tracker.spawn(
            async move {
                match pipeline.scrape_until(page, cancel).await {
                    Ok(summary) => info!(
                        "Background scrape of page {} finished with {} new posts",
                        page, summary.processed
                    ),
                    Err(e) => error!("Background scrape of page {} failed: {}", page, e),
                }
            }
            .instrument(info_span!("background_scrape", page)),
        );
    }

    /// Fetch the page and store it, returning the extracted count and the
    /// listings that were not stored before.
    #[instrument(skip(self))]
    async fn collect(&self, page: u32) -> Result<(usize, Vec<Listing>), PipelineError> {
        info!("Calling scraper for page {}", page);
        let listings = self.source.scrape(page).await?;
        let extracted = listings.len();
        info!("Received {} posts for page {}", extracted, page);

        if listings.is_empty() {
            return Ok((0, Vec::new()));
        }

        let new_listings = self.store.save(&listings).await?;
        info!("Saved {} new posts from page {}", new_listings.len(), page);
        Ok((extracted, new_listings))
    }

    #[instrument(skip(self, new_listings, deadline), fields(new = new_listings.len()))]
    async fn notify(
        &self,
        page: u32,
        extracted: usize,
        new_listings: Vec<Listing>,
        deadline: Instant,
    ) -> ScrapeSummary {
        let processed = new_listings.len();
        let report = notify_all(
            self.notifier.clone(),
            &self.settings.subject,
            new_listings,
            self.settings.notify_concurrency,
            deadline,
        )
        .await;

        ScrapeSummary {
            page,
            extracted,
            processed,
            notified: report.sent,
            notify_failures: report.failed,
            notify_dropped: report.dropped,
        }
    }
}
