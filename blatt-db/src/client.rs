use crate::record::{
    CommentRecord, GroupRecord, PostRecord, SessionRecord, UserRecord, to_millis,
};
use blatt_common::{
    model::{
        Id, ModelValidationError,
        auth::{Session, TokenHash},
        comment::{Comment, CreateComment},
        group::{CreateGroup, Group, GroupMarker, GroupSlug},
        post::{CreatePost, EditPost, Post, PostMarker},
        user::{CreateUser, User, UserMarker, Username},
    },
    page::{PAGE_SIZE, Page, Pagination},
};
use sqlx::{
    SqlitePool,
    migrate::Migrator,
    query, query_as, query_scalar,
    sqlite::{SqlitePoolOptions, SqliteConnectOptions},
};
use std::str::FromStr;
use thiserror::Error;
use time::UtcDateTime;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("Running migrations failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

static MIGRATOR: Migrator = sqlx::migrate!();

const SELECT_POST: &str = "
    SELECT
        posts.id, posts.text, posts.pub_date, posts.image,
        users.id AS author_id, users.username AS author_username,
        \"groups\".id AS group_id, \"groups\".title AS group_title,
        \"groups\".slug AS group_slug, \"groups\".description AS group_description
    FROM posts
    JOIN users ON users.id = posts.author_id
    LEFT JOIN \"groups\" ON \"groups\".id = posts.group_id
";

const NEWEST_FIRST: &str = "ORDER BY posts.pub_date DESC, posts.id DESC";

const SELECT_COMMENT: &str = "
    SELECT
        comments.id, comments.post_id, comments.text, comments.created,
        users.id AS author_id, users.username AS author_username
    FROM comments
    JOIN users ON users.id = comments.author_id
";

#[derive(Debug)]
pub struct DbClient {
    pool: SqlitePool,
}

impl DbClient {
    /// Opens (and if necessary creates) the database and runs migrations.
    ///
    /// The pool is capped at a single connection: SQLite is single-writer,
    /// and it keeps `sqlite::memory:` databases coherent under test.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        MIGRATOR.run(&pool).await?;

        Ok(Self { pool })
    }

    pub async fn create_user(&self, user: &CreateUser) -> Result<Id<UserMarker>> {
        let id: i64 = query_scalar("INSERT INTO users (username) VALUES (?) RETURNING id")
            .bind(user.username.get())
            .fetch_one(&self.pool)
            .await?;

        Ok(id.cast_unsigned().into())
    }

    pub async fn fetch_user(&self, id: Id<UserMarker>) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>("SELECT id, username FROM users WHERE id = ?")
            .bind(id.get().cast_signed())
            .fetch_optional(&self.pool)
            .await?;

        Ok(record.map(User::try_from).transpose()?)
    }

    pub async fn fetch_user_by_username(&self, username: &Username) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>("SELECT id, username FROM users WHERE username = ?")
            .bind(username.get())
            .fetch_optional(&self.pool)
            .await?;

        Ok(record.map(User::try_from).transpose()?)
    }

    /// Deletes a user. The store cascades to their posts, comments, sessions
    /// and follow edges in both directions.
    pub async fn delete_user(&self, id: Id<UserMarker>) -> Result<()> {
        query("DELETE FROM users WHERE id = ?")
            .bind(id.get().cast_signed())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn create_group(&self, group: &CreateGroup) -> Result<Id<GroupMarker>> {
        let id: i64 = query_scalar(
            "INSERT INTO \"groups\" (title, slug, description) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(&group.title)
        .bind(group.slug.get())
        .bind(&group.description)
        .fetch_one(&self.pool)
        .await?;

        Ok(id.cast_unsigned().into())
    }

    pub async fn fetch_group(&self, id: Id<GroupMarker>) -> Result<Option<Group>> {
        let record = query_as::<_, GroupRecord>(
            "SELECT id, title, slug, description FROM \"groups\" WHERE id = ?",
        )
        .bind(id.get().cast_signed())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Group::try_from).transpose()?)
    }

    pub async fn fetch_group_by_slug(&self, slug: &GroupSlug) -> Result<Option<Group>> {
        let record = query_as::<_, GroupRecord>(
            "SELECT id, title, slug, description FROM \"groups\" WHERE slug = ?",
        )
        .bind(slug.get())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Group::try_from).transpose()?)
    }

    /// Deletes a group. Referencing posts get their group nulled, not deleted.
    pub async fn delete_group(&self, id: Id<GroupMarker>) -> Result<()> {
        query("DELETE FROM \"groups\" WHERE id = ?")
            .bind(id.get().cast_signed())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Creates a post. `pub_date` is assigned here, never by the caller.
    pub async fn create_post(&self, post: &CreatePost) -> Result<Post> {
        let id: i64 = query_scalar(
            "INSERT INTO posts (text, pub_date, author_id, group_id, image)
             VALUES (?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(&post.text)
        .bind(to_millis(UtcDateTime::now()))
        .bind(post.author.get().cast_signed())
        .bind(post.group.map(|group| group.get().cast_signed()))
        .bind(post.image.as_deref())
        .fetch_one(&self.pool)
        .await?;

        self.fetch_post(id.cast_unsigned().into())
            .await?
            .ok_or(DbError::Sqlx(sqlx::Error::RowNotFound))
    }

    pub async fn fetch_post(&self, id: Id<PostMarker>) -> Result<Option<Post>> {
        let record = query_as::<_, PostRecord>(&format!("{SELECT_POST} WHERE posts.id = ?"))
            .bind(id.get().cast_signed())
            .fetch_optional(&self.pool)
            .await?;

        Ok(record.map(Post::try_from).transpose()?)
    }

    /// Rewrites text and group. Ownership is the caller's concern; `pub_date`,
    /// author and image are never touched.
    pub async fn update_post(&self, id: Id<PostMarker>, edit: &EditPost) -> Result<()> {
        query("UPDATE posts SET text = ?, group_id = ? WHERE id = ?")
            .bind(&edit.text)
            .bind(edit.group.map(|group| group.get().cast_signed()))
            .bind(id.get().cast_signed())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn delete_post(&self, id: Id<PostMarker>) -> Result<()> {
        query("DELETE FROM posts WHERE id = ?")
            .bind(id.get().cast_signed())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// All posts, newest first.
    pub async fn fetch_posts_page(&self, requested_page: u64) -> Result<Page<Post>> {
        let total: i64 = query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.pool)
            .await?;
        let pagination = Pagination::locate(total.cast_unsigned(), requested_page);

        let records =
            query_as::<_, PostRecord>(&format!("{SELECT_POST} {NEWEST_FIRST} LIMIT ? OFFSET ?"))
                .bind(PAGE_SIZE.cast_signed())
                .bind(pagination.offset().cast_signed())
                .fetch_all(&self.pool)
                .await?;

        collect_page(records, pagination)
    }

    pub async fn fetch_group_posts_page(
        &self,
        group: Id<GroupMarker>,
        requested_page: u64,
    ) -> Result<Page<Post>> {
        let total: i64 = query_scalar("SELECT COUNT(*) FROM posts WHERE group_id = ?")
            .bind(group.get().cast_signed())
            .fetch_one(&self.pool)
            .await?;
        let pagination = Pagination::locate(total.cast_unsigned(), requested_page);

        let records = query_as::<_, PostRecord>(&format!(
            "{SELECT_POST} WHERE posts.group_id = ? {NEWEST_FIRST} LIMIT ? OFFSET ?"
        ))
        .bind(group.get().cast_signed())
        .bind(PAGE_SIZE.cast_signed())
        .bind(pagination.offset().cast_signed())
        .fetch_all(&self.pool)
        .await?;

        collect_page(records, pagination)
    }

    pub async fn fetch_user_posts_page(
        &self,
        author: Id<UserMarker>,
        requested_page: u64,
    ) -> Result<Page<Post>> {
        let total: i64 = query_scalar("SELECT COUNT(*) FROM posts WHERE author_id = ?")
            .bind(author.get().cast_signed())
            .fetch_one(&self.pool)
            .await?;
        let pagination = Pagination::locate(total.cast_unsigned(), requested_page);

        let records = query_as::<_, PostRecord>(&format!(
            "{SELECT_POST} WHERE posts.author_id = ? {NEWEST_FIRST} LIMIT ? OFFSET ?"
        ))
        .bind(author.get().cast_signed())
        .bind(PAGE_SIZE.cast_signed())
        .bind(pagination.offset().cast_signed())
        .fetch_all(&self.pool)
        .await?;

        collect_page(records, pagination)
    }

    /// Creates a follow edge unless it exists or `user` is `author`.
    /// Both cases are silent no-ops.
    pub async fn follow(&self, user: Id<UserMarker>, author: Id<UserMarker>) -> Result<()> {
        if user == author || self.is_following(user, author).await? {
            return Ok(());
        }

        query("INSERT INTO follows (user_id, author_id) VALUES (?, ?)")
            .bind(user.get().cast_signed())
            .bind(author.get().cast_signed())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Removes the explicit `(user, author)` edge; no-op if absent.
    pub async fn unfollow(&self, user: Id<UserMarker>, author: Id<UserMarker>) -> Result<()> {
        query("DELETE FROM follows WHERE user_id = ? AND author_id = ?")
            .bind(user.get().cast_signed())
            .bind(author.get().cast_signed())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn is_following(
        &self,
        user: Id<UserMarker>,
        author: Id<UserMarker>,
    ) -> Result<bool> {
        let following: bool = query_scalar(
            "SELECT EXISTS (SELECT 1 FROM follows WHERE user_id = ? AND author_id = ?)",
        )
        .bind(user.get().cast_signed())
        .bind(author.get().cast_signed())
        .fetch_one(&self.pool)
        .await?;

        Ok(following)
    }

    /// The authors `user` follows, including duplicates should any ever exist.
    pub async fn fetch_following(&self, user: Id<UserMarker>) -> Result<Vec<User>> {
        let records = query_as::<_, UserRecord>(
            "SELECT users.id, users.username
             FROM follows
             JOIN users ON users.id = follows.author_id
             WHERE follows.user_id = ?
             ORDER BY users.id",
        )
        .bind(user.get().cast_signed())
        .fetch_all(&self.pool)
        .await?;

        Ok(records
            .into_iter()
            .map(User::try_from)
            .collect::<Result<_, _>>()?)
    }

    /// Posts by everyone `user` follows, newest first.
    pub async fn feed_page(&self, user: Id<UserMarker>, requested_page: u64) -> Result<Page<Post>> {
        let total: i64 = query_scalar(
            "SELECT COUNT(*) FROM posts
             WHERE author_id IN (SELECT author_id FROM follows WHERE user_id = ?)",
        )
        .bind(user.get().cast_signed())
        .fetch_one(&self.pool)
        .await?;
        let pagination = Pagination::locate(total.cast_unsigned(), requested_page);

        let records = query_as::<_, PostRecord>(&format!(
            "{SELECT_POST}
             WHERE posts.author_id IN (SELECT author_id FROM follows WHERE user_id = ?)
             {NEWEST_FIRST} LIMIT ? OFFSET ?"
        ))
        .bind(user.get().cast_signed())
        .bind(PAGE_SIZE.cast_signed())
        .bind(pagination.offset().cast_signed())
        .fetch_all(&self.pool)
        .await?;

        collect_page(records, pagination)
    }

    /// Creates a comment. `created` is assigned here, never by the caller.
    pub async fn create_comment(&self, comment: &CreateComment) -> Result<Comment> {
        let id: i64 = query_scalar(
            "INSERT INTO comments (post_id, author_id, text, created)
             VALUES (?, ?, ?, ?)
             RETURNING id",
        )
        .bind(comment.post.get().cast_signed())
        .bind(comment.author.get().cast_signed())
        .bind(&comment.text)
        .bind(to_millis(UtcDateTime::now()))
        .fetch_one(&self.pool)
        .await?;

        let record =
            query_as::<_, CommentRecord>(&format!("{SELECT_COMMENT} WHERE comments.id = ?"))
                .bind(id)
                .fetch_one(&self.pool)
                .await?;

        Ok(Comment::try_from(record)?)
    }

    /// Comments on a post, oldest first.
    pub async fn fetch_post_comments(&self, post: Id<PostMarker>) -> Result<Vec<Comment>> {
        let records = query_as::<_, CommentRecord>(&format!(
            "{SELECT_COMMENT} WHERE comments.post_id = ? ORDER BY comments.created, comments.id"
        ))
        .bind(post.get().cast_signed())
        .fetch_all(&self.pool)
        .await?;

        Ok(records
            .into_iter()
            .map(Comment::try_from)
            .collect::<Result<_, _>>()?)
    }

    pub async fn create_session(&self, session: &Session) -> Result<()> {
        query(
            "INSERT INTO sessions (token_hash, user_id, created_at, lifetime_secs)
             VALUES (?, ?, ?, ?)",
        )
        .bind(session.token_hash.as_bytes())
        .bind(session.user.get().cast_signed())
        .bind(to_millis(session.created_at))
        .bind(session.lifetime.map(|lifetime| lifetime.get().whole_seconds()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn fetch_session(&self, token_hash: &TokenHash) -> Result<Option<Session>> {
        let record = query_as::<_, SessionRecord>(
            "SELECT user_id, token_hash, created_at, lifetime_secs
             FROM sessions
             WHERE token_hash = ?",
        )
        .bind(token_hash.as_bytes())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Session::try_from).transpose()?)
    }
}

fn collect_page(records: Vec<PostRecord>, pagination: Pagination) -> Result<Page<Post>> {
    let posts = records
        .into_iter()
        .map(Post::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Page::assemble(posts, pagination))
}
