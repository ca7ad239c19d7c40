use async_trait::async_trait;
use tracing::info;

use crate::entities::Listing;
use crate::extractor::extract_listings;
use crate::fetcher::{FetchError, Fetcher, listings_page_url};
use crate::orchestrator::ListingSource;

/// Fetches a results page from the listings site and extracts it in-process.
#[derive(Clone, Debug)]
pub struct SiteScraper {
    fetcher: Fetcher,
    base_url: String,
}

impl SiteScraper {
    pub fn new(fetcher: Fetcher, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
        }
    }

    pub fn page_url(&self, page: u32) -> String {
        listings_page_url(&self.base_url, page)
    }
}

#[async_trait]
impl ListingSource for SiteScraper {
    async fn scrape(&self, page: u32) -> Result<Vec<Listing>, FetchError> {
        let response = self.fetcher.fetch(&self.page_url(page)).await?;
        let listings = extract_listings(&response.body_utf8);
        info!("Extracted {} posts from page {}", listings.len(), page);
        Ok(listings)
    }
}
