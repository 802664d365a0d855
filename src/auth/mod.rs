//! Authentication collaborator.
//!
//! Sessions are opaque random tokens. The client receives the raw token (in the
//! sign-in response and as the `docsbox_session` cookie); only its SHA-256 hash
//! is stored. Passwords are hashed with Argon2id and peppered with the server
//! secret.

mod session;
pub mod utils;

pub use self::session::SessionAuthenticator;

use crate::{
    api::ApiError,
    store::{Identity, Session, User},
};
use async_trait::async_trait;
use axum::http::HeaderMap;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

pub const DEFAULT_SESSION_TTL_SECONDS: i64 = 3 * 24 * 60 * 60;
pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Shared handle to the authentication provider.
pub type SharedAuthenticator = Arc<dyn Authenticator>;

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Resolve the caller from request headers. `Ok(None)` means anonymous.
    async fn get_session(&self, headers: &HeaderMap) -> Result<Option<Identity>, ApiError>;

    async fn sign_up(&self, request: SignUpRequest) -> Result<User, ApiError>;

    async fn sign_in(
        &self,
        request: SignInRequest,
        headers: &HeaderMap,
    ) -> Result<SignedIn, ApiError>;

    /// Revoke the session carried by `headers`, if any.
    async fn sign_out(&self, headers: &HeaderMap) -> Result<(), ApiError>;

    fn config(&self) -> &AuthConfig;
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    secret: SecretString,
    session_ttl_seconds: i64,
    admin_emails: Vec<String>,
    secure_cookies: bool,
}

impl AuthConfig {
    #[must_use]
    pub fn new(secret: SecretString) -> Self {
        Self {
            secret,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            admin_emails: Vec::new(),
            secure_cookies: false,
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    /// Emails that receive the `admin` role on sign-up.
    #[must_use]
    pub fn with_admin_emails<I, S>(mut self, emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.admin_emails = emails
            .into_iter()
            .map(|email| utils::normalize_email(email.as_ref()))
            .filter(|email| !email.is_empty())
            .collect();
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.secure_cookies
    }

    #[must_use]
    pub fn is_admin_email(&self, email_normalized: &str) -> bool {
        self.admin_emails.iter().any(|admin| admin == email_normalized)
    }

    pub(crate) fn pepper(&self) -> Vec<u8> {
        self.secret.expose_secret().as_bytes().to_vec()
    }

    /// `Set-Cookie` value carrying a fresh session token.
    #[must_use]
    pub fn session_cookie(&self, token: &str) -> String {
        let mut cookie = format!(
            "{}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
            utils::SESSION_COOKIE_NAME,
            self.session_ttl_seconds
        );
        if self.secure_cookies {
            cookie.push_str("; Secure");
        }
        cookie
    }

    /// `Set-Cookie` value that removes the session cookie.
    #[must_use]
    pub fn expired_session_cookie(&self) -> String {
        let mut cookie = format!(
            "{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0",
            utils::SESSION_COOKIE_NAME
        );
        if self.secure_cookies {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

#[derive(Deserialize, ToSchema)]
pub struct SignUpRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SignedIn {
    pub token: String,
    pub user: User,
    pub session: Session,
}
