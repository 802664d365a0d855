//! Failure type and the terminal handlers that turn failures into error envelopes.
//!
//! Route logic raises [`ApiError`]. Its `IntoResponse` resolves the status and
//! kind, writes a production-safe envelope and records the resolved
//! [`Failure`] in the response extensions. The [`normalize_errors`] middleware
//! knows the runtime mode and rewrites that response once, which is where the
//! stack trace gets attached outside production.

use super::{
    response::ErrorEnvelope,
    status::phrase_for,
    RuntimeMode,
};
use crate::store::StoreError;
use axum::{
    extract::{Request, State},
    http::{StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use std::{
    any::Any,
    backtrace::{Backtrace, BacktraceStatus},
};
use tower_http::catch_panic::ResponseForPanic;
use tracing::{debug, error};

/// Kind reported for failures that carry neither a status nor a name.
pub const DEFAULT_ERROR_KIND: &str = "Error";

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    status: Option<StatusCode>,
    message: String,
    kind: Option<String>,
    details: Option<Value>,
    stack: Option<String>,
}

impl ApiError {
    /// Unexpected failure without a status; normalized to 500.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
            kind: None,
            details: None,
            stack: capture_stack(),
        }
    }

    pub fn with_status(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
            kind: None,
            details: None,
            stack: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::CONFLICT, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            stack: capture_stack(),
            ..Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, message)
        }
    }

    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Resolve status and kind.
    ///
    /// A missing status, or a status of 200, becomes 500. Failures that carried
    /// a real status but no kind leave the kind to the status phrase; failures
    /// without a status fall back to [`DEFAULT_ERROR_KIND`].
    pub(crate) fn resolve(self) -> Failure {
        let carried = self.status.filter(|status| *status != StatusCode::OK);
        let status = carried.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let kind = match (self.kind, carried) {
            (Some(kind), _) => Some(kind),
            (None, Some(_)) => None,
            (None, None) => Some(DEFAULT_ERROR_KIND.to_string()),
        };

        Failure {
            status,
            message: self.message,
            kind,
            details: self.details,
            stack: self.stack,
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self {
            status: None,
            message: err.to_string(),
            kind: None,
            details: None,
            stack: Some(format!("{err:?}")),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(message) => Self::conflict(message),
            StoreError::Database(source) => Self {
                kind: Some("DatabaseError".to_string()),
                stack: Some(format!("{source:?}")),
                ..Self::internal("A database error occurred")
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let failure = self.resolve();
        failure.log();

        let mut response = failure.envelope(RuntimeMode::Production).into_response();
        response.extensions_mut().insert(failure);
        response
    }
}

/// A raised failure after status and kind resolution.
#[derive(Debug, Clone)]
pub(crate) struct Failure {
    status: StatusCode,
    message: String,
    kind: Option<String>,
    details: Option<Value>,
    stack: Option<String>,
}

impl Failure {
    fn envelope(&self, mode: RuntimeMode) -> ErrorEnvelope {
        ErrorEnvelope::new(self.status, self.message.clone())
            .with_kind(self.kind.as_deref())
            .with_details(self.details.clone())
            .with_stack(self.stack.clone(), mode)
    }

    fn log(&self) {
        if self.status.is_server_error() {
            error!(status = self.status.as_u16(), "{}", self.message);
        } else {
            debug!(status = self.status.as_u16(), "{}", self.message);
        }
    }
}

fn failure_response(failure: &Failure, mode: RuntimeMode) -> Response {
    failure.envelope(mode).into_response()
}

/// Middleware that rewrites responses produced by [`ApiError`] for the runtime mode.
pub async fn normalize_errors(
    State(mode): State<RuntimeMode>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    match response.extensions_mut().remove::<Failure>() {
        Some(failure) => failure_response(&failure, mode),
        None => response,
    }
}

/// Router fallback for requests that matched no route.
pub async fn not_found(uri: Uri) -> ErrorEnvelope {
    let phrase = phrase_for(StatusCode::NOT_FOUND.as_u16());
    debug!("No route for {}", uri.path());
    ErrorEnvelope::new(StatusCode::NOT_FOUND, format!("{phrase} - {}", uri.path()))
}

/// Turns a handler panic into a 500 error envelope.
#[derive(Debug, Clone, Copy)]
pub struct PanicResponder {
    mode: RuntimeMode,
}

impl PanicResponder {
    #[must_use]
    pub const fn new(mode: RuntimeMode) -> Self {
        Self { mode }
    }
}

impl ResponseForPanic for PanicResponder {
    type ResponseBody = axum::body::Body;

    fn response_for_panic(
        &mut self,
        err: Box<dyn Any + Send + 'static>,
    ) -> axum::http::Response<Self::ResponseBody> {
        let detail = if let Some(message) = err.downcast_ref::<String>() {
            message.clone()
        } else if let Some(message) = err.downcast_ref::<&str>() {
            (*message).to_string()
        } else {
            "unknown panic payload".to_string()
        };
        error!("Handler panicked: {detail}");

        let status = StatusCode::INTERNAL_SERVER_ERROR;
        let envelope = ErrorEnvelope::new(status, phrase_for(status.as_u16()))
            .with_kind(Some(DEFAULT_ERROR_KIND))
            .with_stack(Some(detail), self.mode);
        envelope.into_response()
    }
}

fn capture_stack() -> Option<String> {
    let backtrace = Backtrace::capture();
    (backtrace.status() == BacktraceStatus::Captured).then(|| backtrace.to_string())
}
