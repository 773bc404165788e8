//! Photo URL construction and content-type checks.

use url::Url;

/// Longest edge requested from the photo endpoint.
pub const DEFAULT_MAX_WIDTH: u32 = 1600;

/// Build the photo fetch URL for a media reference.
///
/// Deterministic: the same inputs always produce the same string, with the
/// parameters in a fixed order and query values percent-encoded.
pub fn photo_url(base_url: &str, reference: &str, max_width: u32, api_key: &str) -> String {
    let endpoint = format!("{}/photo", base_url.trim_end_matches('/'));
    match Url::parse(&endpoint) {
        Ok(mut url) => {
            url.query_pairs_mut()
                .append_pair("maxwidth", &max_width.to_string())
                .append_pair("photo_reference", reference)
                .append_pair("key", api_key);
            url.to_string()
        }
        // Unparseable base: fall back to plain formatting so the probe step
        // reports the failure as an invalid URL.
        Err(_) => format!(
            "{}?maxwidth={}&photo_reference={}&key={}",
            endpoint, max_width, reference, api_key
        ),
    }
}

/// True for `image/*` content types, ignoring parameters and case.
pub fn is_image_content_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|mime| mime.trim().to_ascii_lowercase().starts_with("image/"))
        .unwrap_or(false)
}

/// Strip the `key` query parameter from a URL so it can be logged or stored.
pub fn redact_key(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            let pairs: Vec<(String, String)> = parsed
                .query_pairs()
                .filter(|(k, _)| k != "key")
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            if pairs.is_empty() {
                parsed.set_query(None);
            } else {
                parsed.query_pairs_mut().clear().extend_pairs(pairs);
            }
            parsed.to_string()
        }
        Err(_) => url.to_string(),
    }
}

#[cfg(test)]
#[path = "tests/media_tests.rs"]
mod tests;
