use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::entities::{Listing, listing_id};
use crate::orchestrator::ListingStore;
use crate::repositories::document::{DocumentStore, StoreError};

pub const POSTS_COLLECTION: &str = "posts";

/// Deduplicating writer for listings.
///
/// Each listing is keyed by the MD5 of its link and written only when no
/// document exists under that key. The check and the write are separate
/// round trips, so two concurrent callers can both see a listing as new;
/// they write identical documents and the store converges.
#[derive(Clone)]
pub struct ListingRepository {
    store: Arc<dyn DocumentStore>,
}

impl ListingRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Insert every listing not yet stored and return those, in input order.
    ///
    /// Stops at the first store failure; listings written before it stay
    /// written.
    #[instrument(skip_all, fields(count = listings.len()))]
    pub async fn save(&self, listings: &[Listing]) -> Result<Vec<Listing>, StoreError> {
        let mut new_listings = Vec::new();
        let mut existing = 0usize;

        for listing in listings {
            if !listing.has_identity() {
                warn!(title = %listing.title, "Skipping listing without post_link");
                continue;
            }
            let id = listing_id(&listing.post_link);

            if self.store.get(POSTS_COLLECTION, &id).await?.is_some() {
                existing += 1;
                continue;
            }

            self.store
                .set(POSTS_COLLECTION, &id, listing.to_document())
                .await?;
            info!(id = %id, link = %listing.post_link, "Saved new listing");
            new_listings.push(listing.clone());
        }

        info!("New: {}, old: {}", new_listings.len(), existing);
        Ok(new_listings)
    }

    /// Stored listing for `id`, if any.
    pub async fn find(&self, id: &str) -> Result<Option<Listing>, StoreError> {
        Ok(self
            .store
            .get(POSTS_COLLECTION, id)
            .await?
            .map(|doc| Listing::from_document(&doc)))
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        self.store.ping().await
    }
}

#[async_trait]
impl ListingStore for ListingRepository {
    async fn save(&self, listings: &[Listing]) -> Result<Vec<Listing>, StoreError> {
        ListingRepository::save(self, listings).await
    }
}
