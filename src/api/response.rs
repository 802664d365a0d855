//! Uniform JSON response envelopes.
//!
//! Every body the API writes is one of three shapes: [`SuccessEnvelope`],
//! [`ErrorEnvelope`] or [`PaginatedEnvelope`]. All of them carry the numeric
//! `statusCode` that is also written on the status line, a `message` that
//! defaults to the status phrase, and a `timestamp` taken when the envelope is
//! built.

use super::{status::phrase_for, RuntimeMode};
use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::error;
use utoipa::ToSchema;

/// Body written when an envelope cannot be serialized.
pub(crate) const FALLBACK_ERROR_BODY: &str = r#"{"success":false,"statusCode":500,"message":"Internal Server Error","error":"Internal Server Error"}"#;

/// Current UTC instant as ISO-8601 with millisecond precision, e.g. `2024-01-01T00:00:00.000Z`.
#[must_use]
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessEnvelope<T> {
    success: bool,
    status_code: u16,
    message: String,
    data: T,
    timestamp: String,
}

impl<T: Serialize> SuccessEnvelope<T> {
    /// Wrap `data`; `message` falls back to the phrase for `status`.
    pub fn new(status: StatusCode, data: T, message: Option<&str>) -> Self {
        Self {
            success: true,
            status_code: status.as_u16(),
            message: message.map_or_else(|| phrase_for(status.as_u16()).to_string(), str::to_string),
            data,
            timestamp: timestamp(),
        }
    }

    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn data(&self) -> &T {
        &self.data
    }
}

impl<T: Serialize> IntoResponse for SuccessEnvelope<T> {
    fn into_response(self) -> Response {
        json_response(self.status_code, &self)
    }
}

/// Shorthand for `SuccessEnvelope::new`.
pub fn success<T: Serialize>(status: StatusCode, data: T, message: Option<&str>) -> SuccessEnvelope<T> {
    SuccessEnvelope::new(status, data, message)
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    success: bool,
    status_code: u16,
    message: String,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stack: Option<String>,
    timestamp: String,
}

impl ErrorEnvelope {
    /// Error envelope whose `error` kind defaults to the phrase for `status`.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            status_code: status.as_u16(),
            message: message.into(),
            error: phrase_for(status.as_u16()).to_string(),
            details: None,
            stack: None,
            timestamp: timestamp(),
        }
    }

    #[must_use]
    pub fn with_kind(mut self, kind: Option<&str>) -> Self {
        if let Some(kind) = kind {
            self.error = kind.to_string();
        }
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: Option<Value>) -> Self {
        self.details = details;
        self
    }

    /// Attach a stack trace. Dropped when `mode` is production-like.
    #[must_use]
    pub fn with_stack(mut self, stack: Option<String>, mode: RuntimeMode) -> Self {
        self.stack = if mode.is_production() { None } else { stack };
        self
    }

    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    #[must_use]
    pub fn error(&self) -> &str {
        &self.error
    }

    #[must_use]
    pub fn stack(&self) -> Option<&str> {
        self.stack.as_deref()
    }
}

impl IntoResponse for ErrorEnvelope {
    fn into_response(self) -> Response {
        json_response(self.status_code, &self)
    }
}

/// Build an error envelope in one call.
pub fn error(
    mode: RuntimeMode,
    status: StatusCode,
    message: impl Into<String>,
    kind: Option<&str>,
    details: Option<Value>,
    stack: Option<String>,
) -> ErrorEnvelope {
    ErrorEnvelope::new(status, message)
        .with_kind(kind)
        .with_details(details)
        .with_stack(stack, mode)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

impl Pagination {
    /// Derive page counters. A zero `limit` yields zero pages.
    #[must_use]
    pub fn new(page: u64, limit: u64, total: u64) -> Self {
        let total_pages = if limit == 0 { 0 } else { total.div_ceil(limit) };
        Self {
            page,
            limit,
            total,
            total_pages,
            has_next_page: page < total_pages,
            has_previous_page: page > 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedEnvelope<T> {
    success: bool,
    status_code: u16,
    message: String,
    data: Vec<T>,
    pagination: Pagination,
    timestamp: String,
}

impl<T: Serialize> PaginatedEnvelope<T> {
    /// `items` must already be the requested page window; nothing is sliced here.
    pub fn new(
        status: StatusCode,
        items: Vec<T>,
        page: u64,
        limit: u64,
        total: u64,
        message: Option<&str>,
    ) -> Self {
        Self {
            success: true,
            status_code: status.as_u16(),
            message: message.map_or_else(|| phrase_for(status.as_u16()).to_string(), str::to_string),
            data: items,
            pagination: Pagination::new(page, limit, total),
            timestamp: timestamp(),
        }
    }

    #[must_use]
    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }
}

impl<T: Serialize> IntoResponse for PaginatedEnvelope<T> {
    fn into_response(self) -> Response {
        json_response(self.status_code, &self)
    }
}

/// Shorthand for `PaginatedEnvelope::new`.
pub fn paginated<T: Serialize>(
    status: StatusCode,
    items: Vec<T>,
    page: u64,
    limit: u64,
    total: u64,
    message: Option<&str>,
) -> PaginatedEnvelope<T> {
    PaginatedEnvelope::new(status, items, page, limit, total, message)
}

/// Minimal 500 body used when normalization itself fails.
pub(crate) fn fallback_error_response() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        FALLBACK_ERROR_BODY,
    )
        .into_response()
}

fn json_response<B: Serialize>(status_code: u16, body: &B) -> Response {
    let Ok(status) = StatusCode::from_u16(status_code) else {
        error!("Invalid envelope status code: {status_code}");
        return fallback_error_response();
    };

    match serde_json::to_vec(body) {
        Ok(bytes) => (
            status,
            [(CONTENT_TYPE, HeaderValue::from_static("application/json"))],
            bytes,
        )
            .into_response(),
        Err(err) => {
            error!("Failed to serialize response envelope: {err}");
            fallback_error_response()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::json;

    fn to_value<T: Serialize>(value: &T) -> Value {
        serde_json::to_value(value).unwrap()
    }

    #[test]
    fn success_message_defaults_to_phrase() {
        let envelope = success(StatusCode::OK, json!({"id": 1}), None);
        let body = to_value(&envelope);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["statusCode"], json!(200));
        assert_eq!(body["message"], json!(phrase_for(200)));
        assert_eq!(body["data"], json!({"id": 1}));
    }

    #[test]
    fn success_keeps_custom_message() {
        let envelope = success(StatusCode::CREATED, "x", Some("Post created successfully"));
        assert_eq!(envelope.message(), "Post created successfully");
        assert_eq!(envelope.status_code(), 201);
    }

    #[test]
    fn timestamp_is_iso8601_utc() {
        let stamp = timestamp();
        assert!(stamp.ends_with('Z'), "{stamp}");
        assert!(chrono::DateTime::parse_from_rfc3339(&stamp).is_ok());
        // millisecond precision: 2024-01-01T00:00:00.000Z
        assert_eq!(stamp.len(), 24);
    }

    #[test]
    fn error_kind_defaults_to_phrase() {
        let envelope = error(
            RuntimeMode::Development,
            StatusCode::CONFLICT,
            "Conflict",
            None,
            None,
            None,
        );
        let body = to_value(&envelope);
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["statusCode"], json!(409));
        assert_eq!(body["error"], json!("Conflict"));
        assert!(body.get("details").is_none());
        assert!(body.get("stack").is_none());
    }

    #[test]
    fn error_includes_details_and_stack_in_development() {
        let envelope = error(
            RuntimeMode::Development,
            StatusCode::BAD_REQUEST,
            "Invalid input",
            Some("ValidationError"),
            Some(json!({"field": "title"})),
            Some("at handler".to_string()),
        );
        let body = to_value(&envelope);
        assert_eq!(body["error"], json!("ValidationError"));
        assert_eq!(body["details"], json!({"field": "title"}));
        assert_eq!(body["stack"], json!("at handler"));
    }

    #[test]
    fn error_never_has_stack_in_production() {
        let statuses = [
            StatusCode::BAD_REQUEST,
            StatusCode::NOT_FOUND,
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::BAD_GATEWAY,
        ];
        for status in statuses {
            for stack in [None, Some(String::new()), Some("boom".to_string())] {
                let envelope = error(
                    RuntimeMode::Production,
                    status,
                    "message",
                    Some("Error"),
                    Some(json!([1, 2])),
                    stack,
                );
                assert!(envelope.stack().is_none());
                assert!(to_value(&envelope).get("stack").is_none());
            }
        }
    }

    #[test]
    fn pagination_counters() {
        for (page, limit, total) in [
            (1, 10, 0),
            (1, 10, 3),
            (1, 10, 10),
            (1, 10, 11),
            (2, 10, 11),
            (3, 10, 11),
            (1, 1, 3),
            (3, 1, 3),
            (7, 3, 20),
        ] {
            let pagination = Pagination::new(page, limit, total);
            assert_eq!(pagination.total_pages, total.div_ceil(limit));
            assert_eq!(pagination.has_next_page, page < pagination.total_pages);
            assert_eq!(pagination.has_previous_page, page > 1);
        }
    }

    #[test]
    fn pagination_zero_limit_has_no_pages() {
        let pagination = Pagination::new(1, 0, 5);
        assert_eq!(pagination.total_pages, 0);
        assert!(!pagination.has_next_page);
    }

    #[test]
    fn paginated_serializes_camel_case() {
        let envelope = paginated(StatusCode::OK, vec![1, 2], 1, 2, 5, Some("Posts"));
        let body = to_value(&envelope);
        assert_eq!(body["data"], json!([1, 2]));
        assert_eq!(
            body["pagination"],
            json!({
                "page": 1,
                "limit": 2,
                "total": 5,
                "totalPages": 3,
                "hasNextPage": true,
                "hasPreviousPage": false
            })
        );
        assert_eq!(body["message"], json!("Posts"));
    }

    #[tokio::test]
    async fn envelope_response_uses_status_line() {
        let response = success(StatusCode::CREATED, json!({}), None).into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["statusCode"], json!(201));
    }

    #[tokio::test]
    async fn fallback_body_is_valid_json() {
        let response = fallback_error_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], json!(false));
    }
}
