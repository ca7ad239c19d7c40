//! Clients for the component services of a split deployment.
//!
//! Each client implements the same trait as its in-process counterpart, so
//! the gateway drives an unchanged [`Pipeline`](crate::orchestrator::Pipeline).

use async_trait::async_trait;
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::{info, instrument};

use crate::api::dtos::{ErrorResponse, PostsResponse, SaveRequest, SaveResponse, SendEmailRequest};
use crate::config::PeerEndpoints;
use crate::entities::Listing;
use crate::fetcher::FetchError;
use crate::notifier::NotifyError;
use crate::orchestrator::{ListingSource, ListingStore, Notifier};
use crate::repositories::StoreError;

pub fn peer_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(60))
        .build()
}

/// `detail` of an error body, or the raw text when it is not one.
async fn error_detail(response: Response) -> String {
    let text = response.text().await.unwrap_or_default();
    serde_json::from_str::<ErrorResponse>(&text)
        .map(|e| e.detail)
        .unwrap_or(text)
}

/// `GET {base}/scrape?page=N`
#[derive(Clone, Debug)]
pub struct RemoteScraper {
    client: Client,
    base_url: String,
}

impl RemoteScraper {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ListingSource for RemoteScraper {
    #[instrument(skip(self))]
    async fn scrape(&self, page: u32) -> Result<Vec<Listing>, FetchError> {
        let url = format!("{}/scrape", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("page", page)])
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            let detail = error_detail(response).await;
            info!("Scraper service returned {}: {}", status, detail);
            return Err(FetchError::Http { status, url });
        }

        let body: PostsResponse = response.json().await.map_err(|e| FetchError::Malformed {
            url: url.clone(),
            reason: e.to_string(),
        })?;
        info!("Received {} posts from scraper service", body.posts.len());
        Ok(body.posts)
    }
}

/// `POST {base}/save`
#[derive(Clone, Debug)]
pub struct RemoteStore {
    client: Client,
    base_url: String,
}

impl RemoteStore {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ListingStore for RemoteStore {
    #[instrument(skip_all, fields(count = listings.len()))]
    async fn save(&self, listings: &[Listing]) -> Result<Vec<Listing>, StoreError> {
        let response = self
            .client
            .post(format!("{}/save", self.base_url))
            .json(&SaveRequest {
                posts: listings.to_vec(),
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
                body: error_detail(response).await,
            });
        }

        let body: SaveResponse = response.json().await?;
        info!("Database service saved {} new posts", body.new_posts.len());
        Ok(body.new_posts)
    }
}

/// `POST {base}/send_email`
#[derive(Clone, Debug)]
pub struct RemoteNotifier {
    client: Client,
    base_url: String,
}

impl RemoteNotifier {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl Notifier for RemoteNotifier {
    async fn notify(&self, subject: &str, listing: &Listing) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(format!("{}/send_email", self.base_url))
            .json(&SendEmailRequest {
                subject: subject.to_string(),
                car_info: listing.clone(),
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Remote {
                status: status.as_u16(),
                detail: error_detail(response).await,
            });
        }
        Ok(())
    }
}

/// All three peers from configuration, sharing one connection pool.
pub fn peers(
    endpoints: &PeerEndpoints,
) -> Result<(RemoteScraper, RemoteStore, RemoteNotifier), reqwest::Error> {
    let client = peer_client()?;
    Ok((
        RemoteScraper::new(client.clone(), &endpoints.scraper_url),
        RemoteStore::new(client.clone(), &endpoints.database_url),
        RemoteNotifier::new(client, &endpoints.email_url),
    ))
}
