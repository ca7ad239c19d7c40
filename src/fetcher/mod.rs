pub mod client;
pub mod decode;
pub mod errors;
pub mod types;

pub use client::{Fetcher, listings_page_url};
pub use errors::FetchError;
pub use types::PageResponse;
