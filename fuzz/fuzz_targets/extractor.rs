#![no_main]

use libfuzzer_sys::fuzz_target;

use carwatch::extractor::extract_listings_from_bytes;

fuzz_target!(|data: &[u8]| {
    // Any byte string yields a (possibly empty) list; never a panic.
    for listing in extract_listings_from_bytes(data) {
        assert!(listing.post_link.is_empty() || listing.post_link.starts_with("https://"));
    }
});
