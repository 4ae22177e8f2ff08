use axum::http::header::COOKIE;
use axum::http::{HeaderMap, HeaderValue};

use super::quota::QuotaDecision;

pub const GUEST_COOKIE: &str = "guest_summary_used";

pub const GUEST_DENIED_MESSAGE: &str =
    "Guest users can only summarize once. Please log in for more free summaries.";

/// Value of the `Set-Cookie` header marking the guest allowance as spent (one year).
const GUEST_SET_COOKIE: &str = "guest_summary_used=true; Max-Age=31536000; Path=/";

/// Look up a cookie across every `Cookie` header on the request.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
}

/// Guests get one summary; the cookie says whether it has been used.
pub fn check_guest(headers: &HeaderMap) -> QuotaDecision {
    match cookie_value(headers, GUEST_COOKIE) {
        Some("true") => QuotaDecision::Denied,
        _ => QuotaDecision::Allowed,
    }
}

pub fn guest_used_cookie() -> HeaderValue {
    HeaderValue::from_static(GUEST_SET_COOKIE)
}
