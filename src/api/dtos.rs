use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::entities::Listing;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ScrapeQuery {
    /// 1-based results page.
    pub page: i64,
    /// Return immediately and run the pipeline detached.
    #[serde(default)]
    pub background: bool,
}

/// Check a requested page number, returning it as a 1-based `u32`.
pub fn validate_page(page: i64) -> Result<u32, String> {
    if page < 1 {
        return Err(format!("page must be at least 1, got {page}"));
    }
    u32::try_from(page).map_err(|_| format!("page {page} is out of range"))
}

impl ScrapeQuery {
    pub fn validate(&self) -> Result<u32, String> {
        validate_page(self.page)
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct PageQuery {
    pub page: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ScrapeResponse {
    pub message: String,
    pub new_posts: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ScheduledResponse {
    pub message: String,
    pub page: u32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PostsResponse {
    pub posts: Vec<Listing>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SaveRequest {
    pub posts: Vec<Listing>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SaveResponse {
    pub new_posts: Vec<Listing>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SendEmailRequest {
    pub subject: String,
    pub car_info: Listing,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub detail: String,
}
