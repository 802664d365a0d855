//! Route handlers. Each module owns its routes and `utoipa` path docs.

pub mod auth;
pub mod blogs;
pub mod health;
pub mod root;
