use crate::entities::{Listing, listing_id};
use crate::extractor::{extract_listings, extract_listings_from_bytes};

const LISTINGS_PAGE: &str = include_str!("fixtures/listings.html");

#[test]
fn test_extract_fixture_page() {
    let listings = extract_listings(LISTINGS_PAGE);
    assert_eq!(listings.len(), 3);

    let giulia = &listings[0];
    assert_eq!(giulia.title, "Alfa Romeo Giulia 2.2 D");
    assert_eq!(giulia.price, "23.500 €");
    assert_eq!(giulia.year_body, "2017. Limuzina");
    assert_eq!(giulia.engine, "Dizel | 2143 cm3");
    assert_eq!(giulia.mileage, "98.000");
    assert_eq!(giulia.power, "132kW (180KS)");
    assert_eq!(
        giulia.post_link,
        "https://www.polovniautomobili.com/auto-oglasi/21234567/alfa-romeo-giulia-22-d"
    );
}

#[test]
fn test_shared_patterns_take_first_match() {
    let listings = extract_listings(LISTINGS_PAGE);
    for listing in &listings {
        assert_eq!(listing.transmission, listing.year_body);
        assert_eq!(listing.doors_seats, listing.engine);
    }
    // The later "Automatski menjač" div is never reached
    assert_eq!(listings[0].transmission, "2017. Limuzina");
}

#[test]
fn test_block_without_link_and_price() {
    let listings = extract_listings(LISTINGS_PAGE);
    let featured = &listings[1];

    // First title attribute in the block belongs to the year/body div
    assert_eq!(featured.title, "2010. Hečbek");
    assert_eq!(featured.price, "");
    assert_eq!(featured.post_link, "");
    assert!(featured.listing_id().is_none());
}

#[test]
fn test_power_requires_kw_ks_form() {
    let listings = extract_listings(LISTINGS_PAGE);
    let mito = &listings[2];

    assert_eq!(mito.power, "");
    assert_eq!(mito.price, "4.200,00 €");
    assert_eq!(mito.mileage, "160000");
}

#[test]
fn test_fields_scoped_to_block() {
    let listings = extract_listings(LISTINGS_PAGE);
    assert!(
        listings
            .iter()
            .all(|l| !l.post_link.contains("outside-any-block"))
    );
}

#[test]
fn test_empty_body() {
    assert!(extract_listings("").is_empty());
}

#[test]
fn test_single_well_formed_block() {
    let body = r#"<html><body>
<article class="classified">
  <a href="/auto-oglasi/123/foo-bar" title="Alfa Romeo 159">x</a>
  <span> 7.900 € </span>
  <div class="top" title="2009. Karavan">a</div>
  <div class="bottom" title="Dizel | 1910 cm3">b</div>
  <div class="top" title="210000 km">c</div>
  <div class="bottom uk-hidden-medium uk-hidden-small" title="110kW (150KS)">d</div>
</article>
</body></html>"#;

    let listings = extract_listings(body);
    assert_eq!(listings.len(), 1);

    let link = "https://www.polovniautomobili.com/auto-oglasi/123/foo-bar";
    assert_eq!(listings[0].post_link, link);
    assert_eq!(listings[0].listing_id(), Some(listing_id(link)));
    assert_eq!(listings[0].price, "7.900 €");
    assert_eq!(listings[0].power, "110kW (150KS)");
}

#[test]
fn test_two_blocks_same_link_both_returned() {
    let block = r#"<article class="classified"><a href="/auto-oglasi/7/dup" title="t">x</a></article>"#;
    let body = format!("{block}\n{block}");

    let listings = extract_listings(&body);
    assert_eq!(listings.len(), 2);
    assert_eq!(listings[0], listings[1]);
}

#[test]
fn test_unterminated_block_is_ignored() {
    let body = r#"<article class="classified"><a href="/auto-oglasi/1/a">never closed"#;
    assert!(extract_listings(body).is_empty());
}

#[test]
fn test_garbage_input_never_fails() {
    let inputs: [&[u8]; 5] = [
        b"\xff\xfe\x00\x01",
        b"<article class=\"classified\"></article>",
        b"<article class=\"classified\">\xc3\x28 title=\"\xff\"</article>",
        b"</article><article class=\"classified",
        b"title=\"\" href=\"/auto-oglasi//\"",
    ];
    for input in inputs {
        let _ = extract_listings_from_bytes(input);
    }

    let empty_block = extract_listings_from_bytes(inputs[1]);
    assert_eq!(empty_block, vec![Listing::default()]);
}

#[cfg(feature = "fuzz")]
mod fuzz {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_extract_never_panics(body in proptest::collection::vec(any::<u8>(), 0..4096)) {
            let _ = extract_listings_from_bytes(&body);
        }

        #[test]
        fn test_extract_block_count_bounded(
            inner in "[a-z <>=\"/]{0,200}",
            n in 0usize..8,
        ) {
            let body = format!("<article class=\"classified\">{inner}</article>").repeat(n);
            let listings = extract_listings(&body);
            prop_assert!(listings.len() <= n);
        }
    }
}
