use crate::server::ServerError;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{TypedHeader, typed_header::TypedHeaderRejection};
use blatt_common::model::{
    Id,
    auth::{AuthToken, TokenDecodeError, TokenHashError},
    user::UserMarker,
};
use blatt_db::client::DbClient;
use std::sync::Arc;
use thiserror::Error;
use headers::{Authorization, authorization::Bearer};
use time::UtcDateTime;

type AuthorizationHeader = TypedHeader<Authorization<Bearer>>;

/// Why a request does not carry a usable identity. All of these end in a
/// redirect to the login surface, not in a 401.
#[derive(Debug, Error)]
pub enum LoginRefusal {
    #[error("Authorization header was missing or invalid: {0}")]
    Header(TypedHeaderRejection),
    #[error("The bearer token could not be decoded: {0}")]
    Token(#[from] TokenDecodeError),
    #[error("The token could not be hashed: {0}")]
    Hash(#[from] TokenHashError),
    #[error("No session matches the token")]
    UnknownSession,
    #[error("The session has expired")]
    Expired,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct AuthenticatedUser {
    id: Id<UserMarker>,
}

impl AuthenticatedUser {
    #[must_use]
    pub fn user_id(self) -> Id<UserMarker> {
        self.id
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<DbClient>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token: AuthToken = AuthorizationHeader::from_request_parts(parts, state)
            .await
            .map_err(LoginRefusal::Header)?
            .token()
            .parse()
            .map_err(LoginRefusal::Token)?;

        let token_hash = token.hash().map_err(LoginRefusal::Hash)?;

        let session = Arc::<DbClient>::from_ref(state)
            .fetch_session(&token_hash)
            .await?
            .ok_or(LoginRefusal::UnknownSession)?;

        // A hash hit for a different user than the token claims means the
        // session table is corrupt; treat it as no session.
        if session.user != token.user {
            return Err(LoginRefusal::UnknownSession.into());
        }

        if session.expired_at(UtcDateTime::now()) {
            return Err(LoginRefusal::Expired.into());
        }

        Ok(Self { id: session.user })
    }
}

/// Optional identity for routes that render differently for visitors.
/// Login refusals collapse to `None`; infrastructure errors still fail.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct MaybeUser(pub Option<AuthenticatedUser>);

impl<S> FromRequestParts<S> for MaybeUser
where
    Arc<DbClient>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match AuthenticatedUser::from_request_parts(parts, state).await {
            Ok(user) => Ok(Self(Some(user))),
            Err(ServerError::LoginRequired(_)) => Ok(Self(None)),
            Err(other) => Err(other),
        }
    }
}
