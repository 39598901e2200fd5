use crate::server::{Result, ServerError, ServerRouter, json::Json, routes::PageQuery};
use axum::extract::{Query, State};
use axum_extra::routing::{RouterExt, TypedPath};
use blatt_common::{
    model::{group::{Group, GroupSlug}, post::Post},
    page::Page,
};
use blatt_db::client::DbClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_get(get_group)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/groups/{slug}", rejection(ServerError))]
struct GroupPath {
    slug: GroupSlug,
}

#[derive(Serialize)]
struct GroupView {
    group: Group,
    posts: Page<Post>,
}

async fn get_group(
    GroupPath { slug }: GroupPath,
    Query(query): Query<PageQuery>,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<GroupView>> {
    let group = db
        .fetch_group_by_slug(&slug)
        .await?
        .ok_or(ServerError::GroupNotFound(slug))?;
    let posts = db.fetch_group_posts_page(group.id, query.page).await?;

    Ok(Json(GroupView { group, posts }))
}
