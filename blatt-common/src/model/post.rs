use crate::{
    form::FormValues,
    model::{
        Id,
        group::{Group, GroupMarker},
        user::{User, UserMarker},
    },
};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use time::UtcDateTime;

/// Length of the short-form display projection. Stored text is never cut.
pub const POST_PREVIEW_CHARS: usize = 15;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub text: String,
    pub pub_date: UtcDateTime,
    pub author: User,
    pub group: Option<Group>,
    pub image: Option<String>,
}

impl Post {
    /// First [`POST_PREVIEW_CHARS`] characters of the text, for short listings.
    #[must_use]
    pub fn preview(&self) -> String {
        self.text.chars().take(POST_PREVIEW_CHARS).collect()
    }
}

/// Short-form projection of a post, as returned from create/edit acknowledgements.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct PartialPost {
    pub id: Id<PostMarker>,
    pub preview: String,
    pub pub_date: UtcDateTime,
    pub author_id: Id<UserMarker>,
}

impl From<&Post> for PartialPost {
    fn from(post: &Post) -> Self {
        Self {
            id: post.id,
            preview: post.preview(),
            pub_date: post.pub_date,
            author_id: post.author.id,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct CreatePost {
    pub author: Id<UserMarker>,
    pub text: String,
    pub group: Option<Id<GroupMarker>>,
    pub image: Option<String>,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct EditPost {
    pub text: String,
    pub group: Option<Id<GroupMarker>>,
}

/// Incoming post form body. The author is never part of it.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct PostInput {
    pub text: String,
    #[serde(default)]
    pub group: Option<Id<GroupMarker>>,
    #[serde(default)]
    pub image: Option<String>,
}

impl FormValues for PostInput {
    fn value(&self, field: &'static str) -> Option<Cow<'_, str>> {
        match field {
            "text" => Some(Cow::Borrowed(self.text.as_str())),
            "group" => self.group.map(|group| Cow::Owned(group.to_string())),
            "image" => self.image.as_deref().map(Cow::Borrowed),
            _ => None,
        }
    }
}
