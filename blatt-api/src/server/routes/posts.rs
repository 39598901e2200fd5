use crate::server::{
    PageCache, Result, ServerError, ServerRouter,
    auth::AuthenticatedUser,
    found,
    json::Json,
    routes::PageQuery,
};
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use axum_extra::routing::{RouterExt, TypedPath};
use blatt_common::{
    form::{FieldErrors, COMMENT_FORM, POST_FORM},
    model::{
        Id,
        comment::{Comment, CommentInput, CreateComment},
        post::{CreatePost, EditPost, PartialPost, Post, PostInput, PostMarker},
    },
    page::Page,
};
use blatt_db::client::DbClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_posts)
        .typed_post(create_post)
        .typed_get(get_post)
        .typed_put(edit_post)
        .typed_post(add_comment)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts", rejection(ServerError))]
struct PostsPath();

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}", rejection(ServerError))]
struct PostPath {
    id: Id<PostMarker>,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/comments", rejection(ServerError))]
struct PostCommentsPath {
    id: Id<PostMarker>,
}

#[derive(Serialize)]
struct PostDetail {
    post: Post,
    comments: Vec<Comment>,
}

/// The home listing, served through the page cache.
async fn list_posts(
    PostsPath(): PostsPath,
    Query(query): Query<PageQuery>,
    State(db): State<Arc<DbClient>>,
    State(cache): State<Arc<PageCache>>,
) -> Result<Json<Page<Post>>> {
    if let Some(page) = cache.lookup(query.page) {
        return Ok(Json(page));
    }

    let page = db.fetch_posts_page(query.page).await?;
    // Keyed under the clamped number so out-of-range aliases share an entry.
    cache.store(page.number, page.clone());

    Ok(Json(page))
}

async fn get_post(
    PostPath { id }: PostPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<PostDetail>> {
    let post = db
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;
    let comments = db.fetch_post_comments(id).await?;

    Ok(Json(PostDetail { post, comments }))
}

#[axum::debug_handler]
async fn create_post(
    PostsPath(): PostsPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(input): Json<PostInput>,
) -> Result<Json<PartialPost>> {
    POST_FORM.validate(&input)?;
    check_group(&db, &input).await?;

    // The author is always the submitting identity, never form data.
    let post = db
        .create_post(&CreatePost {
            author: user.user_id(),
            text: input.text,
            group: input.group,
            image: input.image,
        })
        .await?;

    Ok(Json(PartialPost::from(&post)))
}

async fn edit_post(
    PostPath { id }: PostPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(input): Json<PostInput>,
) -> Result<Response> {
    let post = db
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    // Non-owners are bounced to the read view, with no error and no write.
    if post.author.id != user.user_id() {
        return Ok(found(&format!("/posts/{id}")));
    }

    POST_FORM.validate(&input)?;
    check_group(&db, &input).await?;

    db.update_post(
        id,
        &EditPost {
            text: input.text,
            group: input.group,
        },
    )
    .await?;

    let updated = db
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(updated).into_response())
}

async fn add_comment(
    PostCommentsPath { id }: PostCommentsPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(input): Json<CommentInput>,
) -> Result<Json<Comment>> {
    let post = db
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    COMMENT_FORM.validate(&input)?;

    let comment = db
        .create_comment(&CreateComment {
            post: post.id,
            author: user.user_id(),
            text: input.text,
        })
        .await?;

    Ok(Json(comment))
}

/// A submitted group id must reference an existing group; a dangling id is a
/// form error on the `group` field, not a 404.
async fn check_group(db: &DbClient, input: &PostInput) -> Result<()> {
    if let Some(group) = input.group
        && db.fetch_group(group).await?.is_none()
    {
        return Err(FieldErrors::single("group", "Unknown group.").into());
    }

    Ok(())
}
