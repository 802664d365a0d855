use crate::{auth::SharedAuthenticator, store::Database};
use anyhow::{anyhow, Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{
        header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Extension, Router,
};
use std::{fmt, str::FromStr, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use url::Url;

pub mod context;
pub mod error;
pub mod extract;
pub(crate) mod handlers;
pub mod openapi;
mod pretty;
pub mod response;
pub mod status;

pub use self::context::RequestContext;
pub use self::error::ApiError;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Deployment mode. Only `Production` hides stack traces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RuntimeMode {
    #[default]
    Development,
    Test,
    Production,
}

impl RuntimeMode {
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Test => "test",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for RuntimeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuntimeMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "development" => Ok(Self::Development),
            "test" => Ok(Self::Test),
            "production" => Ok(Self::Production),
            other => Err(format!("unknown environment: {other}")),
        }
    }
}

/// Build the application router with every route and cross-cutting layer.
///
/// Layers, outermost first: request id, trace span, CORS, pretty JSON, panic
/// catcher, error normalizer, request context.
pub fn router(
    db: Database,
    authenticator: SharedAuthenticator,
    mode: RuntimeMode,
    cors: CorsLayer,
) -> Router {
    let context_state = context::ContextState::new(db, authenticator.clone());

    Router::new()
        .route("/", get(handlers::root::redirect).fallback(error::not_found))
        .route("/favicon.ico", get(handlers::root::favicon).fallback(error::not_found))
        .route("/health", get(handlers::health::health).fallback(error::not_found))
        .route("/api", get(handlers::root::index).fallback(error::not_found))
        .route("/api/openapi.json", get(openapi::document).fallback(error::not_found))
        .merge(handlers::auth::routes())
        .merge(handlers::blogs::routes())
        .fallback(error::not_found)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static(REQUEST_ID_HEADER),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    REQUEST_ID_HEADER,
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(from_fn(pretty::pretty_json))
                .layer(CatchPanicLayer::custom(error::PanicResponder::new(mode)))
                .layer(from_fn_with_state(mode, error::normalize_errors))
                .layer(Extension(authenticator))
                .layer(from_fn_with_state(context_state, context::attach_context)),
        )
}

/// CORS policy for the configured frontend origins.
/// # Errors
/// Returns an error if an origin is not a valid URL.
pub fn cors_layer<S: AsRef<str>>(origins: &[S]) -> Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|origin| origin_header(origin.as_ref()))
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .expose_headers([CONTENT_LENGTH])
        .max_age(Duration::from_secs(600))
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true))
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    db: Database,
    authenticator: SharedAuthenticator,
    mode: RuntimeMode,
    cors_origins: &[String],
) -> Result<()> {
    let cors = cors_layer(cors_origins)?;
    let app = router(db, authenticator, mode, cors);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{} ({mode})", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Gracefully shutdown");
    }
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

fn origin_header(origin: &str) -> Result<HeaderValue> {
    let parsed = Url::parse(origin.trim()).with_context(|| format!("Invalid CORS origin: {origin}"))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| anyhow!("CORS origin must include a valid host: {origin}"))?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build CORS origin header")
}
