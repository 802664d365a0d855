//! Process-local store.
//!
//! Used when no DSN is configured and by the test suites. State lives behind a
//! single `tokio` `RwLock`; nothing survives a restart.

use super::{
    Identity, NewPost, NewSession, NewUser, Post, PostPatch, Session, Store, StoreError, User,
};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
struct State {
    /// Users with their password hashes.
    users: Vec<(User, String)>,
    /// Sessions keyed by token hash.
    sessions: HashMap<Vec<u8>, Session>,
    posts: Vec<Post>,
    last_post_id: i64,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-populated with a few sample posts.
    #[must_use]
    pub fn with_demo_posts() -> Self {
        let posts = [
            (
                "Welcome to DocsBox",
                "DocsBox keeps your team's writing in one place. This first post walks through the API.",
                "DocsBox Team",
                1,
            ),
            (
                "Designing JSON Envelopes",
                "Every response shares one envelope so clients can branch on a single success flag.",
                "Ana Torres",
                2,
            ),
            (
                "Sessions Without Surprises",
                "Bearer tokens and cookies resolve to the same session record on every request.",
                "Lee Park",
                3,
            ),
        ];

        let posts: Vec<Post> = posts
            .into_iter()
            .zip(1_i64..)
            .map(|((title, content, author, day), id)| {
                let stamp = demo_timestamp(day);
                Post {
                    id,
                    title: title.to_string(),
                    content: content.to_string(),
                    author: author.to_string(),
                    author_id: None,
                    created_at: stamp,
                    updated_at: stamp,
                }
            })
            .collect();

        let last_post_id = posts.last().map_or(0, |post| post.id);
        Self {
            state: RwLock::new(State {
                posts,
                last_post_id,
                ..State::default()
            }),
        }
    }
}

fn demo_timestamp(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0)
        .earliest()
        .unwrap_or_default()
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut state = self.state.write().await;
        if state.users.iter().any(|(existing, _)| existing.email == user.email) {
            return Err(StoreError::Conflict("User already exists".to_string()));
        }

        let now = Utc::now();
        let record = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        state.users.push((record.clone(), user.password_hash));
        Ok(record)
    }

    async fn find_credentials(&self, email: &str) -> Result<Option<(User, String)>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .iter()
            .find(|(user, _)| user.email == email)
            .cloned())
    }

    async fn create_session(&self, session: NewSession) -> Result<Session, StoreError> {
        let mut state = self.state.write().await;
        let now = Utc::now();
        state.sessions.retain(|_, existing| existing.expires_at > now);
        if state.sessions.contains_key(&session.token_hash) {
            return Err(StoreError::Conflict("Session token collision".to_string()));
        }

        let record = Session {
            id: Uuid::new_v4(),
            user_id: session.user_id,
            expires_at: session.expires_at,
            created_at: now,
            ip_address: session.ip_address,
            user_agent: session.user_agent,
        };
        state.sessions.insert(session.token_hash, record.clone());
        Ok(record)
    }

    async fn find_session(&self, token_hash: &[u8]) -> Result<Option<Identity>, StoreError> {
        let state = self.state.read().await;
        let Some(session) = state.sessions.get(token_hash) else {
            return Ok(None);
        };
        if session.expires_at <= Utc::now() {
            return Ok(None);
        }

        Ok(state
            .users
            .iter()
            .find(|(user, _)| user.id == session.user_id)
            .map(|(user, _)| Identity {
                user: user.clone(),
                session: session.clone(),
            }))
    }

    async fn delete_session(&self, token_hash: &[u8]) -> Result<(), StoreError> {
        self.state.write().await.sessions.remove(token_hash);
        Ok(())
    }

    async fn list_posts(&self, offset: u64, limit: u64) -> Result<(Vec<Post>, u64), StoreError> {
        let state = self.state.read().await;
        let total = state.posts.len() as u64;
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        let page = state.posts.iter().skip(offset).take(limit).cloned().collect();
        Ok((page, total))
    }

    async fn get_post(&self, id: i64) -> Result<Option<Post>, StoreError> {
        let state = self.state.read().await;
        Ok(state.posts.iter().find(|post| post.id == id).cloned())
    }

    async fn create_post(&self, post: NewPost) -> Result<Post, StoreError> {
        let mut state = self.state.write().await;
        state.last_post_id += 1;

        let now = Utc::now();
        let record = Post {
            id: state.last_post_id,
            title: post.title,
            content: post.content,
            author: post.author,
            author_id: post.author_id,
            created_at: now,
            updated_at: now,
        };
        state.posts.push(record.clone());
        Ok(record)
    }

    async fn update_post(&self, id: i64, patch: PostPatch) -> Result<Option<Post>, StoreError> {
        let mut state = self.state.write().await;
        let Some(post) = state.posts.iter_mut().find(|post| post.id == id) else {
            return Ok(None);
        };

        if let Some(title) = patch.title {
            post.title = title;
        }
        if let Some(content) = patch.content {
            post.content = content;
        }
        if let Some(author) = patch.author {
            post.author = author;
        }
        post.updated_at = Utc::now();
        Ok(Some(post.clone()))
    }

    async fn delete_post(&self, id: i64) -> Result<Option<Post>, StoreError> {
        let mut state = self.state.write().await;
        let index = state.posts.iter().position(|post| post.id == id);
        Ok(index.map(|index| state.posts.remove(index)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::Role;
    use chrono::Duration;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Test User".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role: Role::User,
        }
    }

    #[tokio::test]
    async fn demo_posts_are_seeded_in_order() {
        let store = MemoryStore::with_demo_posts();
        let (posts, total) = store.list_posts(0, 10).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(posts.iter().map(|p| p.id).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn list_posts_beyond_end_is_empty() {
        let store = MemoryStore::with_demo_posts();
        let (posts, total) = store.list_posts(30, 10).await.unwrap();
        assert!(posts.is_empty());
        assert_eq!(total, 3);
    }

    #[tokio::test]
    async fn create_post_continues_ids() {
        let store = MemoryStore::with_demo_posts();
        let post = store
            .create_post(NewPost {
                title: "t".to_string(),
                content: "c".to_string(),
                author: "a".to_string(),
                author_id: None,
            })
            .await
            .unwrap();
        assert_eq!(post.id, 4);
        assert_eq!(store.get_post(4).await.unwrap(), Some(post));
    }

    #[tokio::test]
    async fn update_and_delete_post() {
        let store = MemoryStore::with_demo_posts();
        let patch = PostPatch {
            title: Some("Renamed".to_string()),
            ..PostPatch::default()
        };
        let updated = store.update_post(2, patch).await.unwrap().unwrap();
        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.author, "Ana Torres");
        assert!(updated.updated_at >= updated.created_at);

        let deleted = store.delete_post(2).await.unwrap().unwrap();
        assert_eq!(deleted.id, 2);
        assert!(store.get_post(2).await.unwrap().is_none());
        assert!(store.delete_post(2).await.unwrap().is_none());
        assert!(store.update_post(99, PostPatch::default()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let store = MemoryStore::new();
        store.create_user(new_user("a@example.com")).await.unwrap();
        let err = store.create_user(new_user("a@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn sessions_resolve_until_expiry() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("a@example.com")).await.unwrap();

        let session = store
            .create_session(NewSession {
                user_id: user.id,
                token_hash: vec![1, 2, 3],
                expires_at: Utc::now() + Duration::hours(1),
                ip_address: None,
                user_agent: None,
            })
            .await
            .unwrap();
        let identity = store.find_session(&[1, 2, 3]).await.unwrap().unwrap();
        assert_eq!(identity.user, user);
        assert_eq!(identity.session, session);

        store
            .create_session(NewSession {
                user_id: user.id,
                token_hash: vec![9],
                expires_at: Utc::now() - Duration::seconds(1),
                ip_address: None,
                user_agent: None,
            })
            .await
            .unwrap();
        assert!(store.find_session(&[9]).await.unwrap().is_none());

        store.delete_session(&[1, 2, 3]).await.unwrap();
        assert!(store.find_session(&[1, 2, 3]).await.unwrap().is_none());
        store.delete_session(&[1, 2, 3]).await.unwrap();
    }

    #[tokio::test]
    async fn expired_sessions_are_pruned_on_create() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("a@example.com")).await.unwrap();

        for (hash, offset) in [(vec![1], Duration::seconds(-5)), (vec![2], Duration::hours(1))] {
            store
                .create_session(NewSession {
                    user_id: user.id,
                    token_hash: hash,
                    expires_at: Utc::now() + offset,
                    ip_address: None,
                    user_agent: None,
                })
                .await
                .unwrap();
        }

        let state = store.state.read().await;
        assert_eq!(state.sessions.len(), 1);
        assert!(state.sessions.contains_key(&vec![2_u8]));
    }
}
