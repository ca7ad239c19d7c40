use regex::Regex;
use std::sync::LazyLock;

/// One advertisement block. The capture is the block payload, exclusive of
/// the opening tag and the closing `</article>`.
pub static BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<article class="classified[^>]*>(.*?)</article>"#)
        .expect("Failed to compile block regex")
});

fn field(pattern: &str) -> Regex {
    Regex::new(&format!("(?s){pattern}")).expect("Failed to compile field regex")
}

pub static TITLE: LazyLock<Regex> = LazyLock::new(|| field(r#"title="([^"]+)""#));

pub static PRICE: LazyLock<Regex> =
    LazyLock::new(|| field(r#"<span>\s*([0-9.,]+\s*€)\s*</span>"#));

// year_body and transmission share a pattern, as do engine and doors_seats.
// Each field in a pair takes the first match in the block.
pub static TOP: LazyLock<Regex> = LazyLock::new(|| field(r#"<div class="top" title="([^"]+)">"#));

pub static BOTTOM: LazyLock<Regex> =
    LazyLock::new(|| field(r#"<div class="bottom" title="([^"]+)">"#));

pub static MILEAGE: LazyLock<Regex> =
    LazyLock::new(|| field(r#"<div class="top" title="(\d+\.?\d*)\s*km">"#));

pub static POWER: LazyLock<Regex> = LazyLock::new(|| {
    field(r#"<div class="bottom uk-hidden-medium uk-hidden-small" title="(\d+kW\s*\(\d+KS\))">"#)
});

pub static POST_LINK: LazyLock<Regex> =
    LazyLock::new(|| field(r#"href="(/auto-oglasi/\d+/[^"]+)""#));

/// First capture of `regex` in `haystack`, or the empty string.
pub fn first_capture(regex: &Regex, haystack: &str) -> String {
    regex
        .captures(haystack)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}
