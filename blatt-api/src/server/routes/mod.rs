use crate::server::ServerRouter;
use axum::Router;
use serde::Deserialize;

mod feed;
mod groups;
mod posts;
mod users;

pub fn routes() -> ServerRouter {
    Router::new()
        .merge(posts::routes())
        .merge(groups::routes())
        .merge(users::routes())
        .merge(feed::routes())
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
pub struct PageQuery {
    #[serde(default = "first_page")]
    pub page: u64,
}

fn first_page() -> u64 {
    1
}
