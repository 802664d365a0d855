use crate::{
    api::response::{success, SuccessEnvelope},
    GIT_COMMIT_HASH,
};
use axum::{
    http::{
        header::{CACHE_CONTROL, CONTENT_TYPE, LOCATION},
        StatusCode,
    },
    response::IntoResponse,
};
use serde::Serialize;
use utoipa::ToSchema;

const FAVICON_SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100"><text y=".9em" font-size="90">📦</text></svg>"#;

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiInfo {
    name: String,
    message: String,
    version: String,
    build: String,
}

#[utoipa::path(
    get,
    path = "/api",
    responses(
        (status = 200, description = "Service banner inside a success envelope", body = ApiInfo)
    ),
    tag = "docsbox"
)]
pub async fn index() -> SuccessEnvelope<ApiInfo> {
    success(
        StatusCode::OK,
        ApiInfo {
            name: env!("CARGO_PKG_NAME").to_string(),
            message: "Welcome to DocsBox API".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            build: GIT_COMMIT_HASH.to_string(),
        },
        None,
    )
}

pub async fn redirect() -> impl IntoResponse {
    (StatusCode::FOUND, [(LOCATION, "/api")])
}

pub async fn favicon() -> impl IntoResponse {
    (
        [
            (CONTENT_TYPE, "image/svg+xml"),
            (CACHE_CONTROL, "public, max-age=86400"),
        ],
        FAVICON_SVG,
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn index_banner() {
        let envelope = index().await;
        assert_eq!(envelope.status_code(), 200);
        assert_eq!(envelope.message(), "OK");
        assert_eq!(envelope.data().message, "Welcome to DocsBox API");
        assert_eq!(envelope.data().version, env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn root_redirects_to_api() {
        let response = redirect().await.into_response();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers().get(LOCATION).unwrap(), "/api");
    }

    #[tokio::test]
    async fn favicon_is_svg() {
        let response = favicon().await.into_response();
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "image/svg+xml"
        );
    }
}
