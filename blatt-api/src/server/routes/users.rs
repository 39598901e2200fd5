use crate::server::{
    Result, ServerError, ServerRouter,
    auth::{AuthenticatedUser, MaybeUser},
    found,
    json::Json,
    routes::PageQuery,
};
use axum::{
    extract::{Query, State},
    response::Response,
};
use axum_extra::routing::{RouterExt, TypedPath};
use blatt_common::{
    model::{post::Post, user::{User, Username}},
    page::Page,
};
use blatt_db::client::DbClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(get_profile)
        .typed_post(follow_author)
        .typed_delete(unfollow_author)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{username}", rejection(ServerError))]
struct ProfilePath {
    username: Username,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{username}/follow", rejection(ServerError))]
struct FollowPath {
    username: Username,
}

#[derive(Serialize)]
struct Profile {
    user: User,
    posts: Page<Post>,
    following: bool,
}

async fn get_profile(
    ProfilePath { username }: ProfilePath,
    Query(query): Query<PageQuery>,
    State(db): State<Arc<DbClient>>,
    MaybeUser(viewer): MaybeUser,
) -> Result<Json<Profile>> {
    let user = db
        .fetch_user_by_username(&username)
        .await?
        .ok_or(ServerError::UserNotFound(username))?;
    let posts = db.fetch_user_posts_page(user.id, query.page).await?;

    let following = match viewer {
        Some(viewer) => db.is_following(viewer.user_id(), user.id).await?,
        None => false,
    };

    Ok(Json(Profile {
        user,
        posts,
        following,
    }))
}

async fn follow_author(
    FollowPath { username }: FollowPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Response> {
    let author = db
        .fetch_user_by_username(&username)
        .await?
        .ok_or(ServerError::UserNotFound(username))?;

    // Duplicate and self-follow attempts are silent no-ops.
    db.follow(user.user_id(), author.id).await?;

    Ok(found(&format!("/users/{}", author.username)))
}

async fn unfollow_author(
    FollowPath { username }: FollowPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Response> {
    let author = db
        .fetch_user_by_username(&username)
        .await?
        .ok_or(ServerError::UserNotFound(username))?;

    db.unfollow(user.user_id(), author.id).await?;

    Ok(found(&format!("/users/{}", author.username)))
}
