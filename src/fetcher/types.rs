use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use url::Url;

/// A fetched listings page, already transport- and charset-decoded.
#[derive(Debug)]
pub struct PageResponse {
    pub url_final: Url,
    pub status: StatusCode,
    /// Label of the encoding the body was decoded from.
    pub charset: &'static str,
    pub body_utf8: String,
    pub fetched_at: DateTime<Utc>,
}
