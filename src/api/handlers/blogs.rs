use crate::{
    api::{
        error::not_found,
        extract::{ApiJson, ApiPath, ApiQuery},
        response::{paginated, success, ErrorEnvelope, PaginatedEnvelope, SuccessEnvelope},
        ApiError, RequestContext,
    },
    store::{Identity, NewPost, Post, PostPatch, Role},
};
use axum::{http::StatusCode, routing::get, Router};
use serde::Deserialize;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;

const VALIDATION_ERROR: &str = "ValidationError";

pub fn routes() -> Router {
    Router::new()
        .route(
            "/api/blogs",
            get(list_posts).post(create_post).fallback(not_found),
        )
        .route(
            "/api/blogs/:id",
            get(get_post)
                .put(update_post)
                .delete(delete_post)
                .fallback(not_found),
        )
}

/// Raw query values; anything missing, non-numeric or zero falls back to the default.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// Page number, starting at 1
    page: Option<String>,
    /// Page size
    limit: Option<String>,
}

impl PageQuery {
    fn page(&self) -> u64 {
        positive_or(self.page.as_deref(), DEFAULT_PAGE)
    }

    fn limit(&self) -> u64 {
        positive_or(self.limit.as_deref(), DEFAULT_LIMIT)
    }
}

fn positive_or(value: Option<&str>, default: u64) -> u64 {
    value
        .and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePost {
    title: String,
    content: String,
    /// Display name; defaults to the caller's name
    author: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdatePost {
    title: Option<String>,
    content: Option<String>,
    author: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/blogs",
    params(PageQuery),
    responses(
        (status = 200, description = "One page of posts with pagination counters", body = [Post])
    ),
    tag = "blogs"
)]
pub async fn list_posts(
    ctx: RequestContext,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<PaginatedEnvelope<Post>, ApiError> {
    let page = query.page();
    let limit = query.limit();
    let offset = (page - 1).saturating_mul(limit);

    let (posts, total) = ctx.db().list_posts(offset, limit).await?;
    Ok(paginated(
        StatusCode::OK,
        posts,
        page,
        limit,
        total,
        Some("Posts retrieved successfully"),
    ))
}

#[utoipa::path(
    get,
    path = "/api/blogs/{id}",
    params(("id" = i64, Path, description = "Post id")),
    responses(
        (status = 200, description = "The post", body = Post),
        (status = 400, description = "Id is not a number", body = ErrorEnvelope),
        (status = 404, description = "No such post", body = ErrorEnvelope)
    ),
    tag = "blogs"
)]
pub async fn get_post(
    ctx: RequestContext,
    ApiPath(id): ApiPath<i64>,
) -> Result<SuccessEnvelope<Post>, ApiError> {
    let post = find_post(&ctx, id).await?;
    Ok(success(
        StatusCode::OK,
        post,
        Some("Post retrieved successfully"),
    ))
}

#[utoipa::path(
    post,
    path = "/api/blogs",
    request_body = CreatePost,
    responses(
        (status = 201, description = "Post created", body = Post),
        (status = 400, description = "Missing title or content", body = ErrorEnvelope),
        (status = 401, description = "Not signed in", body = ErrorEnvelope)
    ),
    tag = "blogs"
)]
pub async fn create_post(
    ctx: RequestContext,
    ApiJson(body): ApiJson<CreatePost>,
) -> Result<SuccessEnvelope<Post>, ApiError> {
    let identity = ctx.require_identity()?;

    let title = required("title", &body.title)?;
    let content = required("content", &body.content)?;
    let author = body
        .author
        .as_deref()
        .map(str::trim)
        .filter(|author| !author.is_empty())
        .unwrap_or(identity.user.name.as_str())
        .to_string();

    let post = ctx
        .db()
        .create_post(NewPost {
            title,
            content,
            author,
            author_id: Some(identity.user.id),
        })
        .await?;

    info!(post_id = post.id, user_id = %identity.user.id, "Post created");
    Ok(success(
        StatusCode::CREATED,
        post,
        Some("Post created successfully"),
    ))
}

#[utoipa::path(
    put,
    path = "/api/blogs/{id}",
    params(("id" = i64, Path, description = "Post id")),
    request_body = UpdatePost,
    responses(
        (status = 200, description = "Post updated", body = Post),
        (status = 401, description = "Not signed in", body = ErrorEnvelope),
        (status = 403, description = "Caller is neither the author nor an admin", body = ErrorEnvelope),
        (status = 404, description = "No such post", body = ErrorEnvelope)
    ),
    tag = "blogs"
)]
pub async fn update_post(
    ctx: RequestContext,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<UpdatePost>,
) -> Result<SuccessEnvelope<Post>, ApiError> {
    let identity = ctx.require_identity()?;
    let existing = find_post(&ctx, id).await?;
    ensure_can_modify(identity, &existing)?;

    let patch = PostPatch {
        title: body
            .title
            .as_deref()
            .map(|title| required("title", title))
            .transpose()?,
        content: body
            .content
            .as_deref()
            .map(|content| required("content", content))
            .transpose()?,
        author: body.author.map(|author| author.trim().to_string()),
    };

    let post = ctx
        .db()
        .update_post(id, patch)
        .await?
        .ok_or_else(|| post_not_found(id))?;

    info!(post_id = post.id, user_id = %identity.user.id, "Post updated");
    Ok(success(
        StatusCode::OK,
        post,
        Some("Post updated successfully"),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/blogs/{id}",
    params(("id" = i64, Path, description = "Post id")),
    responses(
        (status = 200, description = "Post deleted; the removed post is returned", body = Post),
        (status = 401, description = "Not signed in", body = ErrorEnvelope),
        (status = 403, description = "Caller is neither the author nor an admin", body = ErrorEnvelope),
        (status = 404, description = "No such post", body = ErrorEnvelope)
    ),
    tag = "blogs"
)]
pub async fn delete_post(
    ctx: RequestContext,
    ApiPath(id): ApiPath<i64>,
) -> Result<SuccessEnvelope<Post>, ApiError> {
    let identity = ctx.require_identity()?;
    let existing = find_post(&ctx, id).await?;
    ensure_can_modify(identity, &existing)?;

    let post = ctx
        .db()
        .delete_post(id)
        .await?
        .ok_or_else(|| post_not_found(id))?;

    info!(post_id = post.id, user_id = %identity.user.id, "Post deleted");
    Ok(success(
        StatusCode::OK,
        post,
        Some("Post deleted successfully"),
    ))
}

async fn find_post(ctx: &RequestContext, id: i64) -> Result<Post, ApiError> {
    ctx.db()
        .get_post(id)
        .await?
        .ok_or_else(|| post_not_found(id))
}

fn post_not_found(id: i64) -> ApiError {
    ApiError::not_found(format!("Post with ID {id} not found"))
}

fn required(field: &str, value: &str) -> Result<String, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::bad_request(format!("{field} is required"))
            .with_kind(VALIDATION_ERROR)
            .with_details(serde_json::json!({ "field": field })));
    }
    Ok(value.to_string())
}

fn ensure_can_modify(identity: &Identity, post: &Post) -> Result<(), ApiError> {
    if identity.user.role == Role::Admin || post.author_id == Some(identity.user.id) {
        Ok(())
    } else {
        Err(ApiError::forbidden("You can only modify your own posts"))
    }
}
