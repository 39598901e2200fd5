use blatt_common::{
    model::{
        InvalidTimestampError, ModelValidationError,
        auth::Session,
        comment::Comment,
        group::{Group, GroupSlug},
        post::Post,
        user::{User, Username},
    },
    util::Ttl,
};
use sqlx::FromRow;
use time::{Duration, OffsetDateTime, UtcDateTime};

pub(crate) fn to_millis(time: UtcDateTime) -> i64 {
    #[allow(clippy::cast_possible_truncation)]
    {
        (time.unix_timestamp_nanos() / 1_000_000) as i64
    }
}

pub(crate) fn from_millis(millis: i64) -> Result<UtcDateTime, InvalidTimestampError> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
        .map(OffsetDateTime::to_utc)
        .map_err(|_| InvalidTimestampError(millis))
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct UserRecord {
    pub id: i64,
    pub username: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct GroupRecord {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
}

/// One post row joined with its author and, when set, its group.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct PostRecord {
    pub id: i64,
    pub text: String,
    pub pub_date: i64,
    pub image: Option<String>,
    pub author_id: i64,
    pub author_username: String,
    pub group_id: Option<i64>,
    pub group_title: Option<String>,
    pub group_slug: Option<String>,
    pub group_description: Option<String>,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct CommentRecord {
    pub id: i64,
    pub post_id: i64,
    pub text: String,
    pub created: i64,
    pub author_id: i64,
    pub author_username: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct SessionRecord {
    pub user_id: i64,
    pub token_hash: Vec<u8>,
    pub created_at: i64,
    pub lifetime_secs: Option<i64>,
}

impl TryFrom<UserRecord> for User {
    type Error = ModelValidationError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.id.cast_unsigned().into(),
            username: Username::new(value.username)?,
        })
    }
}

impl TryFrom<GroupRecord> for Group {
    type Error = ModelValidationError;

    fn try_from(value: GroupRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.id.cast_unsigned().into(),
            title: value.title,
            slug: GroupSlug::new(value.slug)?,
            description: value.description,
        })
    }
}

impl TryFrom<PostRecord> for Post {
    type Error = ModelValidationError;

    fn try_from(value: PostRecord) -> Result<Self, Self::Error> {
        let group = match (
            value.group_id,
            value.group_title,
            value.group_slug,
            value.group_description,
        ) {
            (Some(id), Some(title), Some(slug), Some(description)) => Some(Group {
                id: id.cast_unsigned().into(),
                title,
                slug: GroupSlug::new(slug)?,
                description,
            }),
            _ => None,
        };

        Ok(Self {
            id: value.id.cast_unsigned().into(),
            text: value.text,
            pub_date: from_millis(value.pub_date)?,
            author: User {
                id: value.author_id.cast_unsigned().into(),
                username: Username::new(value.author_username)?,
            },
            group,
            image: value.image,
        })
    }
}

impl TryFrom<CommentRecord> for Comment {
    type Error = ModelValidationError;

    fn try_from(value: CommentRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.id.cast_unsigned().into(),
            post: value.post_id.cast_unsigned().into(),
            author: User {
                id: value.author_id.cast_unsigned().into(),
                username: Username::new(value.author_username)?,
            },
            text: value.text,
            created: from_millis(value.created)?,
        })
    }
}

impl TryFrom<SessionRecord> for Session {
    type Error = ModelValidationError;

    fn try_from(value: SessionRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            user: value.user_id.cast_unsigned().into(),
            token_hash: value.token_hash.into_boxed_slice().try_into()?,
            created_at: from_millis(value.created_at)?,
            lifetime: value
                .lifetime_secs
                .map(|secs| Ttl::try_from(Duration::seconds(secs)))
                .transpose()?,
        })
    }
}
