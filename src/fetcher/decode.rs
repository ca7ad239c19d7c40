use encoding_rs::Encoding;
use regex::Regex;
use std::sync::LazyLock;

static CHARSET_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)charset\s*=\s*["']?([^"'\s;]+)"#).unwrap());

static META_CHARSET_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<meta\s+[^>]*?charset\s*=\s*["']?([^"'\s/>]+)"#).unwrap());

/// How far into the body we look for a `<meta charset>` declaration.
const SNIFF_LEN: usize = 4096;

/// Decode a response body to text.
///
/// The charset comes from the `Content-Type` header, then from a `<meta>`
/// declaration near the top of the document, then from byte heuristics.
/// Malformed sequences are replaced rather than rejected so a page with a
/// single bad byte still yields its listings.
pub fn decode_body(content_type: Option<&str>, body: &[u8]) -> (String, &'static str) {
    let encoding = detect_encoding(content_type, body);
    let (decoded, used, _had_errors) = encoding.decode(body);
    (decoded.into_owned(), used.name())
}

fn detect_encoding(content_type: Option<&str>, body: &[u8]) -> &'static Encoding {
    if let Some(encoding) = content_type.and_then(|ct| label_from(&CHARSET_REGEX, ct)) {
        return encoding;
    }

    let head = &body[..body.len().min(SNIFF_LEN)];
    let head_str = String::from_utf8_lossy(head);
    if let Some(encoding) = label_from(&META_CHARSET_REGEX, &head_str) {
        return encoding;
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(head, body.len() <= SNIFF_LEN);
    detector.guess(None, true)
}

fn label_from(regex: &Regex, haystack: &str) -> Option<&'static Encoding> {
    let label = regex.captures(haystack)?.get(1)?.as_str().to_lowercase();
    Encoding::for_label(label.as_bytes())
}
