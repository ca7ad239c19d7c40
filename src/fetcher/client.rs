use crate::fetcher::{decode::decode_body, errors::FetchError, types::PageResponse};
use chrono::Utc;
use reqwest::{
    Client, ClientBuilder,
    header::{ACCEPT_ENCODING, ACCEPT_LANGUAGE, CONNECTION, CONTENT_TYPE, HeaderMap, HeaderValue},
};
use std::time::Duration;
use tracing::{debug, info, instrument};

const MAX_BODY_SIZE: u64 = 5 * 1024 * 1024; // 5MB
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Listings search query, with `{page}` substituted by the page index.
const SEARCH_PATH: &str = "/auto-oglasi/pretraga?page={page}&sort=basic&brand=alfa-romeo\
                           &city_distance=0&showOldNew=all&without_price=1";

/// Build the listings URL for a 1-based page index.
pub fn listings_page_url(base_url: &str, page: u32) -> String {
    format!(
        "{}{}",
        base_url.trim_end_matches('/'),
        SEARCH_PATH.replace("{page}", &page.to_string())
    )
}

/// Issues one GET per call and returns the decoded body. No retries.
#[derive(Clone, Debug)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = ClientBuilder::new()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .default_headers(browser_headers())
            .build()
            .map_err(|e| FetchError::Transport {
                url: String::new(),
                source: e,
            })?;
        Ok(Self { client })
    }

    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch(&self, url: &str) -> Result<PageResponse, FetchError> {
        let parsed_url = url::Url::parse(url)?;

        let response = self
            .client
            .get(parsed_url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                status,
                url: url.to_string(),
            });
        }

        if let Some(content_length) = response.content_length()
            && content_length > MAX_BODY_SIZE
        {
            return Err(FetchError::BodyTooLarge(content_length));
        }

        let url_final = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|ct| ct.to_str().ok())
            .map(str::to_string);

        // reqwest has already undone any Content-Encoding at this point
        let body_bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest_error(url, e))?;

        if body_bytes.len() as u64 > MAX_BODY_SIZE {
            return Err(FetchError::BodyTooLarge(body_bytes.len() as u64));
        }

        let (body_utf8, charset) = decode_body(content_type.as_deref(), &body_bytes);
        debug!(preview = %body_utf8.chars().take(50).collect::<String>(), "body preview");
        info!(
            "Fetched {} (status: {}, charset: {}, {} bytes)",
            url_final,
            status,
            charset,
            body_utf8.len()
        );

        Ok(PageResponse {
            url_final,
            status,
            charset,
            body_utf8,
            fetched_at: Utc::now(),
        })
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip, deflate, br"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers
}
