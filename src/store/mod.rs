//! Storage collaborator.
//!
//! Handlers never talk to a database directly: they receive a [`Database`]
//! handle through the request context and call the [`Store`] operations on it.
//! Two backends exist: [`PgStore`] over a `sqlx` Postgres pool and
//! [`MemoryStore`], a process-local store used for demos and tests.

pub mod memory;
pub mod models;
pub mod postgres;

pub use self::memory::MemoryStore;
pub use self::models::{
    Identity, NewPost, NewSession, NewUser, Post, PostPatch, Role, Session, User,
};
pub use self::postgres::PgStore;

use async_trait::async_trait;
use std::sync::Arc;

/// Shared, process-wide handle to the storage backend.
pub type Database = Arc<dyn Store>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Cheap connectivity check used by `/health`.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Insert a user; a duplicate email is a [`StoreError::Conflict`].
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    /// Look up a user and its password hash by normalized email.
    async fn find_credentials(&self, email: &str) -> Result<Option<(User, String)>, StoreError>;

    async fn create_session(&self, session: NewSession) -> Result<Session, StoreError>;

    /// Resolve an unexpired session by token hash.
    async fn find_session(&self, token_hash: &[u8]) -> Result<Option<Identity>, StoreError>;

    /// Remove a session; missing sessions are not an error.
    async fn delete_session(&self, token_hash: &[u8]) -> Result<(), StoreError>;

    /// One page of posts ordered by id, plus the total number of posts.
    async fn list_posts(&self, offset: u64, limit: u64) -> Result<(Vec<Post>, u64), StoreError>;

    async fn get_post(&self, id: i64) -> Result<Option<Post>, StoreError>;

    async fn create_post(&self, post: NewPost) -> Result<Post, StoreError>;

    async fn update_post(&self, id: i64, patch: PostPatch) -> Result<Option<Post>, StoreError>;

    async fn delete_post(&self, id: i64) -> Result<Option<Post>, StoreError>;
}
