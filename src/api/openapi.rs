use super::{
    context::SessionPayload,
    handlers::{auth, blogs, health, root},
    response::{ErrorEnvelope, Pagination},
};
use crate::{
    auth::{SignInRequest, SignUpRequest, SignedIn},
    store::{Post, Role, Session, User},
};
use axum::Json;
use utoipa::{
    openapi::{Contact, InfoBuilder, License, Tag},
    OpenApi,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        root::index,
        health::health,
        auth::sign_up,
        auth::sign_in,
        auth::sign_out,
        auth::get_session,
        blogs::list_posts,
        blogs::get_post,
        blogs::create_post,
        blogs::update_post,
        blogs::delete_post,
    ),
    components(schemas(
        ErrorEnvelope,
        Pagination,
        SessionPayload,
        SignUpRequest,
        SignInRequest,
        SignedIn,
        User,
        Session,
        Role,
        Post,
        root::ApiInfo,
        health::Health,
        auth::SignedOut,
        blogs::CreatePost,
        blogs::UpdatePost,
    ))
)]
struct ApiDoc;

/// The generated document, with `info` taken from Cargo metadata.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.info = cargo_info();
    doc.tags = Some(vec![
        tag("docsbox", "Service index and health"),
        tag("auth", "Email and password sessions"),
        tag("blogs", "Blog post CRUD"),
    ]);
    doc
}

/// `GET /api/openapi.json`
pub async fn document() -> Json<utoipa::openapi::OpenApi> {
    Json(openapi())
}

fn tag(name: &str, description: &str) -> Tag {
    let mut tag = Tag::new(name);
    tag.description = Some(description.to_string());
    tag
}

fn cargo_info() -> utoipa::openapi::Info {
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = cargo_license();
    info
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `:` separated and may include "Name <email>".
    let primary = env!("CARGO_PKG_AUTHORS").split(':').next().map(str::trim)?;
    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    fn non_empty(value: &str) -> Option<&str> {
        let value = value.trim();
        (!value.is_empty()).then_some(value)
    }

    match author.split_once('<') {
        Some((name, email)) => (non_empty(name), non_empty(email.trim_end_matches('>'))),
        None => (non_empty(author), None),
    }
}
