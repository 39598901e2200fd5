use crate::server::{
    Result, ServerError, ServerRouter, auth::AuthenticatedUser, json::Json, routes::PageQuery,
};
use axum::extract::{Query, State};
use axum_extra::routing::{RouterExt, TypedPath};
use blatt_common::{model::post::Post, page::Page};
use blatt_db::client::DbClient;
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_get(get_feed)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/feed", rejection(ServerError))]
struct FeedPath();

/// Posts from followed authors only, newest first.
async fn get_feed(
    FeedPath(): FeedPath,
    Query(query): Query<PageQuery>,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Json<Page<Post>>> {
    Ok(Json(db.feed_page(user.user_id(), query.page).await?))
}
