//! Listing extraction from a search results page.
//!
//! The page is cut into `<article class="classified...">` blocks and each
//! block is matched against a fixed set of patterns. Extraction is total:
//! unmatched fields come back empty and malformed input yields fewer blocks,
//! never an error.

pub mod patterns;

#[cfg(test)]
mod tests;

use crate::entities::{Listing, SITE_ORIGIN};
use patterns::{BLOCK, BOTTOM, MILEAGE, POST_LINK, POWER, PRICE, TITLE, TOP, first_capture};
use tracing::info;

/// Extract every listing in `body`, in document order.
pub fn extract_listings(body: &str) -> Vec<Listing> {
    let listings: Vec<Listing> = BLOCK
        .captures_iter(body)
        .filter_map(|caps| caps.get(1))
        .map(|block| extract_block(block.as_str()))
        .collect();

    info!("Extracted {} listings", listings.len());
    listings
}

/// Same as [`extract_listings`] for raw bytes; invalid UTF-8 is replaced.
pub fn extract_listings_from_bytes(body: &[u8]) -> Vec<Listing> {
    extract_listings(&String::from_utf8_lossy(body))
}

fn extract_block(block: &str) -> Listing {
    let post_link = first_capture(&POST_LINK, block);
    Listing {
        title: first_capture(&TITLE, block),
        price: first_capture(&PRICE, block),
        year_body: first_capture(&TOP, block),
        engine: first_capture(&BOTTOM, block),
        mileage: first_capture(&MILEAGE, block),
        power: first_capture(&POWER, block),
        transmission: first_capture(&TOP, block),
        doors_seats: first_capture(&BOTTOM, block),
        post_link: if post_link.is_empty() {
            post_link
        } else {
            format!("{SITE_ORIGIN}{post_link}")
        },
    }
}
