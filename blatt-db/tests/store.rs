use blatt_common::model::{
    Id,
    auth::{AuthToken, Session},
    comment::CreateComment,
    group::{CreateGroup, GroupMarker, GroupSlug},
    post::{CreatePost, EditPost, Post},
    user::{CreateUser, UserMarker, Username},
};
use blatt_db::client::DbClient;
use time::UtcDateTime;

async fn client() -> DbClient {
    DbClient::connect("sqlite::memory:").await.unwrap()
}

async fn create_user(db: &DbClient, name: &str) -> Id<UserMarker> {
    db.create_user(&CreateUser {
        username: Username::new(name.to_owned()).unwrap(),
    })
    .await
    .unwrap()
}

async fn create_group(db: &DbClient, slug: &str) -> Id<GroupMarker> {
    db.create_group(&CreateGroup {
        title: format!("Group {slug}"),
        slug: GroupSlug::new(slug.to_owned()).unwrap(),
        description: "A test group".to_owned(),
    })
    .await
    .unwrap()
}

async fn create_post(db: &DbClient, author: Id<UserMarker>, text: &str) -> Post {
    db.create_post(&CreatePost {
        author,
        text: text.to_owned(),
        group: None,
        image: None,
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn post_author_and_pub_date_are_store_assigned() {
    let db = client().await;
    let author = create_user(&db, "Author").await;

    let before = UtcDateTime::now();
    let post = create_post(&db, author, "Hello").await;

    assert_eq!(post.author.id, author);
    assert_eq!(post.author.username.get(), "Author");
    assert!(post.pub_date >= before - time::Duration::seconds(1));
    assert!(post.group.is_none());
}

#[tokio::test]
async fn stored_text_is_never_truncated() {
    let db = client().await;
    let author = create_user(&db, "Author").await;

    let post = create_post(&db, author, "thirteen char").await;
    assert_eq!(post.text, "thirteen char");

    let long = create_post(&db, author, "a text well beyond fifteen characters").await;
    let stored = db.fetch_post(long.id).await.unwrap().unwrap();
    assert_eq!(stored.text, "a text well beyond fifteen characters");
    assert_eq!(stored.preview().chars().count(), 15);
}

#[tokio::test]
async fn author_delete_cascades_posts_and_comments() {
    let db = client().await;
    let author = create_user(&db, "Author").await;
    let commenter = create_user(&db, "Commenter").await;
    let post = create_post(&db, author, "Hello").await;

    db.create_comment(&CreateComment {
        post: post.id,
        author: commenter,
        text: "First!".to_owned(),
    })
    .await
    .unwrap();

    db.delete_user(author).await.unwrap();

    assert!(db.fetch_post(post.id).await.unwrap().is_none());
    assert!(db.fetch_post_comments(post.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn commenter_delete_cascades_only_their_comments() {
    let db = client().await;
    let author = create_user(&db, "Author").await;
    let commenter = create_user(&db, "Commenter").await;
    let post = create_post(&db, author, "Hello").await;

    db.create_comment(&CreateComment {
        post: post.id,
        author: commenter,
        text: "bye".to_owned(),
    })
    .await
    .unwrap();
    db.create_comment(&CreateComment {
        post: post.id,
        author,
        text: "mine stays".to_owned(),
    })
    .await
    .unwrap();

    db.delete_user(commenter).await.unwrap();

    let comments = db.fetch_post_comments(post.id).await.unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].text, "mine stays");
    assert!(db.fetch_post(post.id).await.unwrap().is_some());
}

#[tokio::test]
async fn group_delete_nulls_post_group() {
    let db = client().await;
    let author = create_user(&db, "Author").await;
    let group = create_group(&db, "test-slug").await;

    let post = db
        .create_post(&CreatePost {
            author,
            text: "grouped".to_owned(),
            group: Some(group),
            image: None,
        })
        .await
        .unwrap();
    assert_eq!(post.group.as_ref().map(|g| g.id), Some(group));

    db.delete_group(group).await.unwrap();

    let survivor = db.fetch_post(post.id).await.unwrap().unwrap();
    assert!(survivor.group.is_none());
    assert_eq!(survivor.text, "grouped");
}

#[tokio::test]
async fn follow_twice_leaves_one_edge() {
    let db = client().await;
    let reader = create_user(&db, "Reader").await;
    let author = create_user(&db, "Author").await;

    db.follow(reader, author).await.unwrap();
    db.follow(reader, author).await.unwrap();

    assert!(db.is_following(reader, author).await.unwrap());
    assert_eq!(db.fetch_following(reader).await.unwrap().len(), 1);
}

#[tokio::test]
async fn self_follow_is_a_silent_noop() {
    let db = client().await;
    let user = create_user(&db, "Loner").await;

    db.follow(user, user).await.unwrap();

    assert!(!db.is_following(user, user).await.unwrap());
    assert!(db.fetch_following(user).await.unwrap().is_empty());
}

#[tokio::test]
async fn unfollow_without_edge_is_a_noop() {
    let db = client().await;
    let reader = create_user(&db, "Reader").await;
    let author = create_user(&db, "Author").await;

    db.unfollow(reader, author).await.unwrap();

    assert!(!db.is_following(reader, author).await.unwrap());
}

#[tokio::test]
async fn feed_tracks_follow_edges() {
    let db = client().await;
    let author = create_user(&db, "Author").await;
    let reader = create_user(&db, "Reader").await;

    db.follow(reader, author).await.unwrap();
    create_post(&db, author, "Hello").await;

    let feed = db.feed_page(reader, 1).await.unwrap();
    let texts: Vec<_> = feed.items.iter().map(|post| post.text.as_str()).collect();
    assert_eq!(texts, ["Hello"]);

    db.unfollow(reader, author).await.unwrap();

    let feed = db.feed_page(reader, 1).await.unwrap();
    assert!(feed.items.is_empty());
}

#[tokio::test]
async fn feed_excludes_unfollowed_authors() {
    let db = client().await;
    let followed = create_user(&db, "Followed").await;
    let stranger = create_user(&db, "Stranger").await;
    let reader = create_user(&db, "Reader").await;

    db.follow(reader, followed).await.unwrap();
    create_post(&db, followed, "from followed").await;
    create_post(&db, stranger, "from stranger").await;

    let feed = db.feed_page(reader, 1).await.unwrap();
    assert!(feed.items.iter().all(|post| post.author.id == followed));
    assert_eq!(feed.items.len(), 1);

    // The stranger's post still exists in storage.
    assert_eq!(db.fetch_posts_page(1).await.unwrap().items.len(), 2);
}

#[tokio::test]
async fn thirteen_posts_paginate_ten_then_three() {
    let db = client().await;
    let author = create_user(&db, "Author").await;
    for n in 0..13 {
        create_post(&db, author, &format!("post {n}")).await;
    }

    let first = db.fetch_posts_page(1).await.unwrap();
    assert_eq!(first.items.len(), 10);
    assert_eq!(first.total_pages, 2);
    assert!(first.has_next);
    assert!(!first.has_previous);
    // Newest first.
    assert_eq!(first.items[0].text, "post 12");

    let second = db.fetch_posts_page(2).await.unwrap();
    assert_eq!(second.items.len(), 3);
    assert_eq!(second.items[2].text, "post 0");
    assert!(!second.has_next);

    // Out-of-range requests clamp instead of erroring.
    assert_eq!(db.fetch_posts_page(99).await.unwrap().number, 2);
    assert_eq!(db.fetch_posts_page(0).await.unwrap().number, 1);
}

#[tokio::test]
async fn group_and_profile_listings_filter() {
    let db = client().await;
    let author = create_user(&db, "Author").await;
    let other = create_user(&db, "Other").await;
    let group = create_group(&db, "rustaceans").await;

    db.create_post(&CreatePost {
        author,
        text: "in group".to_owned(),
        group: Some(group),
        image: None,
    })
    .await
    .unwrap();
    create_post(&db, other, "ungrouped").await;

    let by_group = db.fetch_group_posts_page(group, 1).await.unwrap();
    assert_eq!(by_group.items.len(), 1);
    assert_eq!(by_group.items[0].text, "in group");

    let by_author = db.fetch_user_posts_page(other, 1).await.unwrap();
    assert_eq!(by_author.items.len(), 1);
    assert_eq!(by_author.items[0].text, "ungrouped");
}

#[tokio::test]
async fn edit_rewrites_text_and_group_only() {
    let db = client().await;
    let author = create_user(&db, "Author").await;
    let group = create_group(&db, "after-edit").await;
    let post = create_post(&db, author, "before").await;

    db.update_post(
        post.id,
        &EditPost {
            text: "after".to_owned(),
            group: Some(group),
        },
    )
    .await
    .unwrap();

    let updated = db.fetch_post(post.id).await.unwrap().unwrap();
    assert_eq!(updated.text, "after");
    assert_eq!(updated.group.as_ref().map(|g| g.id), Some(group));
    assert_eq!(updated.pub_date, post.pub_date);
    assert_eq!(updated.author.id, author);
}

#[tokio::test]
async fn comments_attach_in_creation_order() {
    let db = client().await;
    let author = create_user(&db, "Author").await;
    let post = create_post(&db, author, "Hello").await;

    for text in ["first", "second"] {
        db.create_comment(&CreateComment {
            post: post.id,
            author,
            text: text.to_owned(),
        })
        .await
        .unwrap();
    }

    let comments = db.fetch_post_comments(post.id).await.unwrap();
    let texts: Vec<_> = comments.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, ["first", "second"]);
    assert!(comments.iter().all(|c| c.post == post.id));
}

#[tokio::test]
async fn sessions_round_trip_by_token_hash() {
    let db = client().await;
    let user = create_user(&db, "Author").await;
    let token = AuthToken::issue(user);
    let hash = token.hash().unwrap();

    db.create_session(&Session {
        user,
        token_hash: hash.clone(),
        created_at: UtcDateTime::now(),
        lifetime: None,
    })
    .await
    .unwrap();

    let session = db.fetch_session(&hash).await.unwrap().unwrap();
    assert_eq!(session.user, user);

    let other = AuthToken::issue(user).hash().unwrap();
    assert!(db.fetch_session(&other).await.unwrap().is_none());
}
