use crate::server::{auth::LoginRefusal, json::Json};
use axum::{
    Router,
    extract::{
        FromRef, Request,
        rejection::{JsonRejection, PathRejection},
    },
    http::{StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use blatt_common::{
    form::FieldErrors,
    model::{Id, group::GroupSlug, post::PostMarker, user::Username},
};
use blatt_db::client::{DbClient, DbError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

mod auth;
mod cache;
mod json;
mod routes;


pub use cache::PageCache;

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, Debug, FromRef)]
pub struct ServerState {
    pub db_client: Arc<DbClient>,
    pub home_cache: Arc<PageCache>,
}

pub fn routes() -> ServerRouter {
    routes::routes().fallback(fallback)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error("Login required: {0}")]
    LoginRequired(#[from] LoginRefusal),
    #[error("Form validation failed: {0}")]
    InvalidForm(#[from] FieldErrors),
    #[error(transparent)]
    Database(#[from] DbError),
    #[error("Post with id {0} was not found.")]
    PostByIdNotFound(Id<PostMarker>),
    #[error("User {0} was not found.")]
    UserNotFound(Username),
    #[error("Group {0} was not found.")]
    GroupNotFound(GroupSlug),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PathRejection(_)
            | ServerError::PostByIdNotFound(_)
            | ServerError::UserNotFound(_)
            | ServerError::GroupNotFound(_) => StatusCode::NOT_FOUND,
            // Unauthenticated requests are redirected, never rejected.
            ServerError::LoginRequired(_) => StatusCode::FOUND,
            ServerError::JsonRejection(_) => StatusCode::BAD_REQUEST,
            ServerError::InvalidForm(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::JsonResponse(_) | ServerError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
struct ErrorResponse {
    status: u16,
}

#[derive(Clone, Eq, PartialEq, Serialize)]
struct FormErrorResponse {
    errors: FieldErrors,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        match self {
            ServerError::LoginRequired(refusal) => {
                debug!(%refusal, "Redirecting unauthenticated request to login");
                found("/login")
            }
            ServerError::InvalidForm(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(FormErrorResponse { errors }),
            )
                .into_response(),
            other => {
                let status = other.status();

                error!(error = %other, %status, "Replying with error");

                let error_response = ErrorResponse {
                    status: status.as_u16(),
                };
                (status, Json(error_response)).into_response()
            }
        }
    }
}

/// 302 Found. The surface contract pins this exact status; axum's `Redirect`
/// helpers emit 303/307.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_owned())]).into_response()
}
