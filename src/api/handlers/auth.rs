//! Auth passthrough routes. All credential logic lives in the [`Authenticator`].

use crate::{
    api::{
        context::SessionPayload,
        error::not_found,
        extract::ApiJson,
        response::{success, ErrorEnvelope, SuccessEnvelope},
        ApiError, RequestContext,
    },
    auth::{SharedAuthenticator, SignInRequest, SignUpRequest, SignedIn},
    store::User,
};
use axum::{
    http::{header::SET_COOKIE, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Router,
};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct SignedOut {
    success: bool,
}

pub fn routes() -> Router {
    Router::new()
        .route("/api/auth/sign-up/email", post(sign_up).fallback(not_found))
        .route("/api/auth/sign-in/email", post(sign_in).fallback(not_found))
        .route("/api/auth/sign-out", post(sign_out).fallback(not_found))
        .route("/api/auth/get-session", get(get_session).fallback(not_found))
}

#[utoipa::path(
    post,
    path = "/api/auth/sign-up/email",
    request_body = SignUpRequest,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Invalid name, email or password", body = ErrorEnvelope),
        (status = 409, description = "Email already registered", body = ErrorEnvelope)
    ),
    tag = "auth"
)]
pub async fn sign_up(
    Extension(auth): Extension<SharedAuthenticator>,
    ApiJson(request): ApiJson<SignUpRequest>,
) -> Result<SuccessEnvelope<User>, ApiError> {
    let user = auth.sign_up(request).await?;
    Ok(success(
        StatusCode::CREATED,
        user,
        Some("User created successfully"),
    ))
}

#[utoipa::path(
    post,
    path = "/api/auth/sign-in/email",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Session created; token also set as cookie", body = SignedIn),
        (status = 401, description = "Invalid email or password", body = ErrorEnvelope)
    ),
    tag = "auth"
)]
pub async fn sign_in(
    Extension(auth): Extension<SharedAuthenticator>,
    headers: HeaderMap,
    ApiJson(request): ApiJson<SignInRequest>,
) -> Result<Response, ApiError> {
    let signed_in = auth.sign_in(request, &headers).await?;
    let cookie = cookie_header(&auth.config().session_cookie(&signed_in.token))?;

    Ok((
        [(SET_COOKIE, cookie)],
        success(StatusCode::OK, signed_in, Some("Signed in successfully")),
    )
        .into_response())
}

#[utoipa::path(
    post,
    path = "/api/auth/sign-out",
    responses(
        (status = 200, description = "Session revoked and cookie cleared", body = SignedOut)
    ),
    tag = "auth"
)]
pub async fn sign_out(
    Extension(auth): Extension<SharedAuthenticator>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    auth.sign_out(&headers).await?;
    let cookie = cookie_header(&auth.config().expired_session_cookie())?;

    Ok((
        [(SET_COOKIE, cookie)],
        success(
            StatusCode::OK,
            SignedOut { success: true },
            Some("Signed out successfully"),
        ),
    )
        .into_response())
}

#[utoipa::path(
    get,
    path = "/api/auth/get-session",
    responses(
        (status = 200, description = "Current user and session, both null when anonymous", body = SessionPayload)
    ),
    tag = "auth"
)]
pub async fn get_session(ctx: RequestContext) -> SuccessEnvelope<SessionPayload> {
    success(StatusCode::OK, ctx.session_payload(), None)
}

fn cookie_header(cookie: &str) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(cookie).map_err(|err| ApiError::internal(format!("Invalid cookie: {err}")))
}
