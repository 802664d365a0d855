use super::{
    utils::{
        extract_client_ip, extract_session_token, generate_session_token, hash_password,
        hash_session_token, normalize_email, valid_email, verify_password, DUMMY_PASSWORD_HASH,
    },
    AuthConfig, Authenticator, SignInRequest, SignUpRequest, SignedIn, MAX_PASSWORD_LENGTH,
    MIN_PASSWORD_LENGTH,
};
use crate::{
    api::ApiError,
    store::{Database, Identity, NewSession, NewUser, Role, User},
};
use anyhow::Context;
use async_trait::async_trait;
use axum::http::{header::USER_AGENT, HeaderMap};
use chrono::{Duration, Utc};
use tracing::{debug, info, instrument};

const INVALID_CREDENTIALS: &str = "Invalid email or password";
const VALIDATION_ERROR: &str = "ValidationError";

/// Email + password authenticator backed by the [`Store`](crate::store::Store).
pub struct SessionAuthenticator {
    db: Database,
    config: AuthConfig,
}

impl SessionAuthenticator {
    #[must_use]
    pub fn new(db: Database, config: AuthConfig) -> Self {
        Self { db, config }
    }
}

#[async_trait]
impl Authenticator for SessionAuthenticator {
    async fn get_session(&self, headers: &HeaderMap) -> Result<Option<Identity>, ApiError> {
        let Some(token) = extract_session_token(headers) else {
            return Ok(None);
        };
        let identity = self.db.find_session(&hash_session_token(&token)).await?;
        Ok(identity)
    }

    #[instrument(skip_all)]
    async fn sign_up(&self, request: SignUpRequest) -> Result<User, ApiError> {
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(ApiError::bad_request("Name is required").with_kind(VALIDATION_ERROR));
        }

        let email = normalize_email(&request.email);
        if !valid_email(&email) {
            return Err(ApiError::bad_request("Invalid email address").with_kind(VALIDATION_ERROR));
        }

        let length = request.password.chars().count();
        if !(MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&length) {
            return Err(ApiError::bad_request(format!(
                "Password must be between {MIN_PASSWORD_LENGTH} and {MAX_PASSWORD_LENGTH} characters"
            ))
            .with_kind(VALIDATION_ERROR));
        }

        let pepper = self.config.pepper();
        let password = request.password;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password, &pepper))
            .await
            .context("password hashing task failed")??;

        let role = if self.config.is_admin_email(&email) {
            Role::Admin
        } else {
            Role::User
        };

        let user = self
            .db
            .create_user(NewUser {
                name,
                email,
                password_hash,
                role,
            })
            .await?;

        info!(user_id = %user.id, role = %user.role, "User signed up");
        Ok(user)
    }

    #[instrument(skip_all)]
    async fn sign_in(
        &self,
        request: SignInRequest,
        headers: &HeaderMap,
    ) -> Result<SignedIn, ApiError> {
        let email = normalize_email(&request.email);
        let (user, stored_hash) = match self.db.find_credentials(&email).await? {
            Some((user, stored_hash)) => (Some(user), stored_hash),
            None => (None, DUMMY_PASSWORD_HASH.to_string()),
        };

        let pepper = self.config.pepper();
        let password = request.password;
        let verified =
            tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash, &pepper))
                .await
                .context("password verification task failed")??;
        let user = match user {
            Some(user) if verified => user,
            Some(user) => {
                debug!(user_id = %user.id, "Sign-in with wrong password");
                return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
            }
            None => {
                debug!("Sign-in for unknown email");
                return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
            }
        };

        let expires_at = Duration::try_seconds(self.config.session_ttl_seconds())
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .ok_or_else(|| ApiError::internal("Session TTL is out of range"))?;

        let token = generate_session_token()?;
        let session = self
            .db
            .create_session(NewSession {
                user_id: user.id,
                token_hash: hash_session_token(&token),
                expires_at,
                ip_address: extract_client_ip(headers),
                user_agent: headers
                    .get(USER_AGENT)
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_string),
            })
            .await?;

        info!(user_id = %user.id, session_id = %session.id, "User signed in");
        Ok(SignedIn {
            token,
            user,
            session,
        })
    }

    async fn sign_out(&self, headers: &HeaderMap) -> Result<(), ApiError> {
        if let Some(token) = extract_session_token(headers) {
            self.db.delete_session(&hash_session_token(&token)).await?;
        }
        Ok(())
    }

    fn config(&self) -> &AuthConfig {
        &self.config
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use axum::http::{
        header::{AUTHORIZATION, COOKIE},
        HeaderValue, StatusCode,
    };
    use secrecy::SecretString;
    use std::sync::Arc;

    fn authenticator() -> SessionAuthenticator {
        let config = AuthConfig::new(SecretString::from("pepper".to_string()))
            .with_admin_emails(["boss@example.com"]);
        SessionAuthenticator::new(Arc::new(MemoryStore::new()), config)
    }

    fn sign_up_request(email: &str, password: &str) -> SignUpRequest {
        SignUpRequest {
            name: "Alice".to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[tokio::test]
    async fn sign_up_normalizes_email_and_assigns_role() {
        let auth = authenticator();
        let user = auth
            .sign_up(sign_up_request(" Alice@Example.com", "password123"))
            .await
            .unwrap();
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.role, Role::User);

        let boss = auth
            .sign_up(sign_up_request("boss@example.com", "password123"))
            .await
            .unwrap();
        assert_eq!(boss.role, Role::Admin);
    }

    #[tokio::test]
    async fn sign_up_validates_input() {
        let auth = authenticator();
        for request in [
            sign_up_request("not-an-email", "password123"),
            sign_up_request("a@example.com", "short"),
            sign_up_request("a@example.com", &"x".repeat(129)),
            SignUpRequest {
                name: "  ".to_string(),
                ..sign_up_request("a@example.com", "password123")
            },
        ] {
            let err = auth.sign_up(request).await.unwrap_err();
            assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
        }
    }

    #[tokio::test]
    async fn duplicate_sign_up_conflicts() {
        let auth = authenticator();
        auth.sign_up(sign_up_request("a@example.com", "password123"))
            .await
            .unwrap();
        let err = auth
            .sign_up(sign_up_request("A@example.com", "password123"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::CONFLICT));
    }

    #[tokio::test]
    async fn sign_in_then_resolve_then_sign_out() {
        let auth = authenticator();
        let user = auth
            .sign_up(sign_up_request("a@example.com", "password123"))
            .await
            .unwrap();

        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7"));
        headers.insert(USER_AGENT, HeaderValue::from_static("test-agent"));
        let signed_in = auth
            .sign_in(
                SignInRequest {
                    email: "a@example.com".to_string(),
                    password: "password123".to_string(),
                },
                &headers,
            )
            .await
            .unwrap();
        assert_eq!(signed_in.user, user);
        assert_eq!(signed_in.session.ip_address.as_deref(), Some("203.0.113.7"));
        assert_eq!(signed_in.session.user_agent.as_deref(), Some("test-agent"));

        let identity = auth
            .get_session(&bearer(&signed_in.token))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(identity.user.id, user.id);

        let mut cookie = HeaderMap::new();
        cookie.insert(
            COOKIE,
            HeaderValue::from_str(&format!("docsbox_session={}", signed_in.token)).unwrap(),
        );
        assert!(auth.get_session(&cookie).await.unwrap().is_some());

        auth.sign_out(&cookie).await.unwrap();
        assert!(auth.get_session(&bearer(&signed_in.token)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn wrong_credentials_are_unauthorized() {
        let auth = authenticator();
        auth.sign_up(sign_up_request("a@example.com", "password123"))
            .await
            .unwrap();

        for (email, password) in [("a@example.com", "wrong-password"), ("b@example.com", "password123")] {
            let err = auth
                .sign_in(
                    SignInRequest {
                        email: email.to_string(),
                        password: password.to_string(),
                    },
                    &HeaderMap::new(),
                )
                .await
                .unwrap_err();
            assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
            assert_eq!(err.message(), INVALID_CREDENTIALS);
        }
    }

    #[tokio::test]
    async fn oversized_ttl_fails_without_panicking() {
        let config = AuthConfig::new(SecretString::from("pepper".to_string()))
            .with_session_ttl_seconds(i64::MAX);
        let auth = SessionAuthenticator::new(Arc::new(MemoryStore::new()), config);
        auth.sign_up(sign_up_request("a@example.com", "password123"))
            .await
            .unwrap();

        let err = auth
            .sign_in(
                SignInRequest {
                    email: "a@example.com".to_string(),
                    password: "password123".to_string(),
                },
                &HeaderMap::new(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(err.message(), "Session TTL is out of range");
    }

    #[tokio::test]
    async fn unknown_token_is_anonymous() {
        let auth = authenticator();
        assert!(auth.get_session(&HeaderMap::new()).await.unwrap().is_none());
        assert!(auth.get_session(&bearer("nope")).await.unwrap().is_none());
        auth.sign_out(&HeaderMap::new()).await.unwrap();
    }
}
