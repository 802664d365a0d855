//! HTTP status vocabulary.
//!
//! Canonical phrases used as default envelope messages and error kinds.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Phrase returned for codes missing from the table.
pub const UNKNOWN_STATUS: &str = "Unknown Status";

const STATUS_PHRASES: &[(u16, &str)] = &[
    (200, "OK"),
    (201, "Created"),
    (202, "Accepted"),
    (204, "No Content"),
    (301, "Moved Permanently"),
    (302, "Found"),
    (304, "Not Modified"),
    (400, "Bad Request"),
    (401, "Unauthorized"),
    (403, "Forbidden"),
    (404, "Not Found"),
    (405, "Method Not Allowed"),
    (408, "Request Timeout"),
    (409, "Conflict"),
    (413, "Payload Too Large"),
    (415, "Unsupported Media Type"),
    (422, "Unprocessable Entity"),
    (429, "Too Many Requests"),
    (500, "Internal Server Error"),
    (501, "Not Implemented"),
    (502, "Bad Gateway"),
    (503, "Service Unavailable"),
    (504, "Gateway Timeout"),
];

static PHRASES: Lazy<HashMap<u16, &'static str>> =
    Lazy::new(|| STATUS_PHRASES.iter().copied().collect());

/// Canonical phrase for a numeric status code, or [`UNKNOWN_STATUS`].
#[must_use]
pub fn phrase_for(code: u16) -> &'static str {
    PHRASES.get(&code).copied().unwrap_or(UNKNOWN_STATUS)
}
