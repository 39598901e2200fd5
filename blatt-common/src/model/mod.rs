pub mod auth;
pub mod comment;
pub mod group;
pub mod post;
pub mod user;

use crate::{
    model::{
        auth::InvalidTokenHashError, group::InvalidGroupSlugError, user::InvalidUsernameError,
    },
    util::NonPositiveTtlError,
};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, marker::PhantomData};
use thiserror::Error;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum ModelValidationError {
    #[error(transparent)]
    Username(#[from] InvalidUsernameError),
    #[error(transparent)]
    GroupSlug(#[from] InvalidGroupSlugError),
    #[error(transparent)]
    Timestamp(#[from] InvalidTimestampError),
    #[error(transparent)]
    TokenHash(#[from] InvalidTokenHashError),
    #[error(transparent)]
    NonPositiveTtl(#[from] NonPositiveTtlError),
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Stored timestamp is out of range: {0} ms")]
pub struct InvalidTimestampError(pub i64);

/// A store-assigned id, typed by the entity it belongs to.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Id<Marker>(u64, #[serde(skip)] PhantomData<Marker>);

impl<Marker> Id<Marker> {
    #[must_use]
    pub fn new(value: u64) -> Self {
        Self(value, PhantomData)
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl<Marker> Display for Id<Marker> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<Marker> From<u64> for Id<Marker> {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl<Marker> From<Id<Marker>> for u64 {
    fn from(value: Id<Marker>) -> Self {
        value.get()
    }
}
