use crate::{
    api::{
        response::{success, ErrorEnvelope},
        RequestContext,
    },
    GIT_COMMIT_HASH,
};
use axum::{
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, error};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Debug)]
pub struct Health {
    name: String,
    version: String,
    build: String,
    database: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Database is reachable", body = Health),
        (status = 503, description = "Database is unreachable", body = ErrorEnvelope)
    ),
    tag = "docsbox"
)]
// axum handler for health
pub async fn health(ctx: RequestContext) -> Response {
    let result = ctx.db().ping().await;

    let health = Health {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        build: GIT_COMMIT_HASH.to_string(),
        database: (if result.is_ok() { "ok" } else { "error" }).to_string(),
    };

    let headers = x_app_headers(&health);

    match result {
        Ok(()) => {
            debug!("Database connection is healthy");
            (headers, success(StatusCode::OK, health, None)).into_response()
        }
        Err(err) => {
            error!("Failed to ping database: {}", err);
            let envelope =
                ErrorEnvelope::new(StatusCode::SERVICE_UNAVAILABLE, "Database is unavailable")
                    .with_details(Some(json!({ "database": health.database })));
            (headers, envelope).into_response()
        }
    }
}

fn x_app_headers(health: &Health) -> HeaderMap {
    let short_hash = health.build.get(0..7).unwrap_or_default();

    let mut headers = HeaderMap::new();
    match format!("{}:{}:{}", health.name, health.version, short_hash).parse::<HeaderValue>() {
        Ok(value) => {
            headers.insert("X-App", value);
        }
        Err(err) => error!("Failed to parse X-App header: {}", err),
    }
    headers
}
