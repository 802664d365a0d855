use super::response::fallback_error_response;
use axum::{
    body::{to_bytes, Body, HttpBody},
    extract::Request,
    http::header::{CONTENT_LENGTH, CONTENT_TYPE},
    middleware::Next,
    response::Response,
};
use serde_json::Value;
use tracing::warn;

const MAX_PRETTY_BODY: usize = 4 * 1024 * 1024;

/// Re-indent JSON bodies when the query string asks for `?pretty`.
pub async fn pretty_json(request: Request, next: Next) -> Response {
    let wants_pretty = request.uri().query().is_some_and(|query| {
        query
            .split('&')
            .any(|pair| pair.split('=').next() == Some("pretty"))
    });

    let response = next.run(request).await;
    if !wants_pretty || !is_json(&response) || !fits_in_buffer(&response) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, MAX_PRETTY_BODY).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!("Failed to buffer response for pretty printing: {err}");
            return fallback_error_response();
        }
    };

    let pretty = serde_json::from_slice::<Value>(&bytes)
        .and_then(|value| serde_json::to_vec_pretty(&value));
    parts.headers.remove(CONTENT_LENGTH);
    match pretty {
        Ok(pretty) => Response::from_parts(parts, Body::from(pretty)),
        Err(_) => Response::from_parts(parts, Body::from(bytes)),
    }
}

/// Bodies without a known size within the limit are passed through compact.
fn fits_in_buffer(response: &Response) -> bool {
    response
        .body()
        .size_hint()
        .upper()
        .is_some_and(|upper| upper <= MAX_PRETTY_BODY as u64)
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::{middleware::from_fn, routing::get, Json, Router};
    use serde_json::json;
    use tower::ServiceExt;

    async fn body_text(app: Router, uri: &str) -> String {
        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn app() -> Router {
        Router::new()
            .route("/json", get(|| async { Json(json!({"a": 1})) }))
            .route("/text", get(|| async { "{\"a\":1}" }))
            .route(
                "/large",
                get(|| async { Json(json!({ "blob": "x".repeat(MAX_PRETTY_BODY + 1) })) }),
            )
            .layer(from_fn(pretty_json))
    }

    #[tokio::test]
    async fn compact_by_default() {
        assert_eq!(body_text(app(), "/json").await, r#"{"a":1}"#);
    }

    #[tokio::test]
    async fn indents_when_requested() {
        assert_eq!(body_text(app(), "/json?pretty").await, "{\n  \"a\": 1\n}");
        assert_eq!(body_text(app(), "/json?x=1&pretty=true").await, "{\n  \"a\": 1\n}");
    }

    #[tokio::test]
    async fn leaves_non_json_alone() {
        assert_eq!(body_text(app(), "/text?pretty").await, r#"{"a":1}"#);
    }

    #[tokio::test]
    async fn oversized_bodies_pass_through_compact() {
        let body = body_text(app(), "/large?pretty").await;
        assert_eq!(body.len(), MAX_PRETTY_BODY + 1 + r#"{"blob":""}"#.len());
        assert!(body.starts_with(r#"{"blob":"xxx"#));
    }
}
