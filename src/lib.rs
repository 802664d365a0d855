//! # DocsBox
//!
//! A small blog API with email and password sessions.
//!
//! Every response body is one of three JSON envelopes (success, error,
//! paginated) sharing `success`, `statusCode`, `message` and `timestamp`.
//! Route logic raises [`api::ApiError`] and never writes error bodies itself;
//! the error normalizer maps every failure, panic and unmatched route to an
//! error envelope, hiding stack traces in production mode.
//!
//! Each request carries a [`api::RequestContext`] holding the shared storage
//! handle and, when a valid session token is presented as a bearer token or
//! the `docsbox_session` cookie, the caller's user and session.

pub mod api;
pub mod auth;
pub mod cli;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
    }
}
