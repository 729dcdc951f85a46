//! HTTP cache control module
//!
//! Provides `ETag` generation, conditional request handling and edge
//! cache headers.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CACHE_CONTROL};
use hyper::Response;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Generate `ETag` using fast hashing
///
/// Returns a quoted `ETag` string, e.g., `"abc123def"`
pub fn generate_etag(content: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    let v = hasher.finish();
    format!("\"{v:x}\"")
}

/// Check if client's `If-None-Match` header matches the server's `ETag`
///
/// Supports a single `ETag`, a comma separated list, weak validators
/// (`W/"abc"`) and the `*` wildcard.
pub fn check_etag_match(if_none_match: Option<&str>, etag: &str) -> bool {
    if_none_match.is_some_and(|client_etag| {
        client_etag.split(',').any(|e| {
            let e = e.trim();
            e == "*" || e.trim_start_matches("W/") == etag
        })
    })
}

/// Overwrite `Cache-Control` on a response.
///
/// An unrepresentable value leaves the response untouched.
pub fn apply_cache_control(response: &mut Response<Full<Bytes>>, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(v) => {
            response.headers_mut().insert(CACHE_CONTROL, v);
        }
        Err(e) => {
            crate::logger::log_warning(&format!("Invalid Cache-Control value '{value}': {e}"));
        }
    }
}
