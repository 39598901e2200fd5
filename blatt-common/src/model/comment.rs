use crate::{
    form::FormValues,
    model::{
        Id,
        post::PostMarker,
        user::{User, UserMarker},
    },
};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use time::UtcDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct CommentMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Comment {
    pub id: Id<CommentMarker>,
    pub post: Id<PostMarker>,
    pub author: User,
    pub text: String,
    pub created: UtcDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct CreateComment {
    pub post: Id<PostMarker>,
    pub author: Id<UserMarker>,
    pub text: String,
}

/// Incoming comment form body.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct CommentInput {
    pub text: String,
}

impl FormValues for CommentInput {
    fn value(&self, field: &'static str) -> Option<Cow<'_, str>> {
        match field {
            "text" => Some(Cow::Borrowed(self.text.as_str())),
            _ => None,
        }
    }
}
