//! Per-page pipeline: fetch, extract, deduplicate, then notify.
//!
//! Collaborators sit behind the traits below so the same pipeline runs
//! against in-process components or against remote component services.

pub mod fanout;
pub mod pipeline;
pub mod source;

pub use fanout::{FanoutReport, notify_all};
pub use pipeline::{Pipeline, PipelineError, PipelineSettings, ScrapeSummary};
pub use source::SiteScraper;

use async_trait::async_trait;

use crate::entities::Listing;
use crate::fetcher::FetchError;
use crate::notifier::NotifyError;
use crate::repositories::StoreError;

/// Produces the listings found on one results page.
#[async_trait]
pub trait ListingSource: Send + Sync {
    async fn scrape(&self, page: u32) -> Result<Vec<Listing>, FetchError>;
}

/// Persists listings and reports which of them were not stored before.
#[async_trait]
pub trait ListingStore: Send + Sync {
    async fn save(&self, listings: &[Listing]) -> Result<Vec<Listing>, StoreError>;
}

/// Delivers a notification about one listing.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, subject: &str, listing: &Listing) -> Result<(), NotifyError>;
}
