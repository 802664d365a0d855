//! Per-request context: the shared database handle plus the resolved identity.

use super::ApiError;
use crate::{
    auth::SharedAuthenticator,
    store::{Database, Identity, Session, User},
};
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use serde::Serialize;
use std::fmt;
use utoipa::ToSchema;

#[derive(Clone)]
pub struct ContextState {
    db: Database,
    authenticator: SharedAuthenticator,
}

impl ContextState {
    #[must_use]
    pub fn new(db: Database, authenticator: SharedAuthenticator) -> Self {
        Self { db, authenticator }
    }
}

#[derive(Clone)]
pub struct RequestContext {
    db: Database,
    identity: Option<Identity>,
}

impl RequestContext {
    #[must_use]
    pub fn new(db: Database, identity: Option<Identity>) -> Self {
        Self { db, identity }
    }

    #[must_use]
    pub fn db(&self) -> &Database {
        &self.db
    }

    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.identity.as_ref().map(|identity| &identity.user)
    }

    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.identity.as_ref().map(|identity| &identity.session)
    }

    /// The caller's identity, or a 401 failure for anonymous requests.
    /// # Errors
    /// Returns an unauthorized [`ApiError`] when no session was resolved.
    pub fn require_identity(&self) -> Result<&Identity, ApiError> {
        self.identity
            .as_ref()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }

    /// Client view of the identity; both fields are `null` when anonymous.
    #[must_use]
    pub fn session_payload(&self) -> SessionPayload {
        SessionPayload {
            user: self.user().cloned(),
            session: self.session().cloned(),
        }
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionPayload {
    pub user: Option<User>,
    pub session: Option<Session>,
}

/// Attach the database handle and the resolved identity to every request.
///
/// Authenticator failures are not swallowed; they short-circuit into an error
/// envelope.
pub async fn attach_context(
    State(state): State<ContextState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = state.authenticator.get_session(request.headers()).await?;
    request
        .extensions_mut()
        .insert(RequestContext::new(state.db.clone(), identity));

    Ok(next.run(request).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(|| ApiError::internal("Request context is missing"))
    }
}
