//! Reads and writes shared by the HTML views and the JSON API.
//!
//! Every mutation runs in its own transaction; returning early drops the
//! transaction, which rolls it back.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use entity::{comment, follow, group, post, user};
use sea_orm::{
    sea_query::{Expr, Query},
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, Select, Set, TransactionTrait,
};
use serde::Serialize;

use crate::{
    error::Error,
    forms::{FieldErrors, NON_FIELD},
    pagination::{paginate, Page},
    permissions,
    uploads::media_url,
};

pub const FOLLOW_NOT_UNIQUE: &str = "The fields user, following must make a unique set.";

/// A post with what listings show next to it.
#[derive(Debug, Clone, Serialize)]
pub struct PostCard {
    pub id: i64,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub author: String,
    pub group: Option<group::Model>,
    pub image: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: i64,
    pub post: i64,
    pub author: String,
    pub text: String,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FollowView {
    pub user: String,
    pub following: String,
}

/// Authors and groups referenced by a batch of posts.
#[derive(Debug, Default)]
pub struct CardLookup {
    authors: HashMap<i64, String>,
    groups: HashMap<i64, group::Model>,
}

impl CardLookup {
    pub async fn load<C: ConnectionTrait>(db: &C, posts: &[post::Model]) -> Result<Self, DbErr> {
        let author_ids: Vec<i64> = posts.iter().map(|p| p.author_id).collect();
        let group_ids: Vec<i64> = posts.iter().filter_map(|p| p.group_id).collect();

        let authors = usernames(db, author_ids).await?;
        let groups = if group_ids.is_empty() {
            HashMap::new()
        } else {
            group::Entity::find()
                .filter(group::Column::Id.is_in(group_ids))
                .all(db)
                .await?
                .into_iter()
                .map(|g| (g.id, g))
                .collect()
        };

        Ok(Self { authors, groups })
    }

    pub fn card(&self, post: post::Model) -> PostCard {
        PostCard {
            id: post.id,
            author: self.authors.get(&post.author_id).cloned().unwrap_or_default(),
            group: post.group_id.and_then(|id| self.groups.get(&id).cloned()),
            image_url: post.image.as_deref().map(media_url),
            image: post.image,
            text: post.text,
            pub_date: post.pub_date,
        }
    }
}

async fn usernames<C: ConnectionTrait>(
    db: &C,
    mut ids: Vec<i64>,
) -> Result<HashMap<i64, String>, DbErr> {
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    Ok(user::Entity::find()
        .filter(user::Column::Id.is_in(ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u.username))
        .collect())
}

pub async fn cards<C: ConnectionTrait>(
    db: &C,
    posts: Vec<post::Model>,
) -> Result<Vec<PostCard>, DbErr> {
    let lookup = CardLookup::load(db, &posts).await?;
    Ok(posts.into_iter().map(|p| lookup.card(p)).collect())
}

/// One page of `query`, ready for a listing template.
pub async fn card_page(
    db: &DatabaseConnection,
    query: Select<post::Entity>,
    requested: Option<&str>,
    per_page: u64,
) -> Result<Page<PostCard>, DbErr> {
    let page = paginate(db, query, requested, per_page).await?;
    let lookup = CardLookup::load(db, &page.items).await?;
    Ok(page.map(|p| lookup.card(p)))
}

/// All posts, newest first.
pub fn posts() -> Select<post::Entity> {
    post::Entity::find()
        .order_by_desc(post::Column::PubDate)
        .order_by_desc(post::Column::Id)
}

pub fn group_posts(group_id: i64) -> Select<post::Entity> {
    posts().filter(post::Column::GroupId.eq(group_id))
}

pub fn author_posts(author_id: i64) -> Select<post::Entity> {
    posts().filter(post::Column::AuthorId.eq(author_id))
}

/// Posts by every author `user_id` follows.
pub fn feed(user_id: i64) -> Select<post::Entity> {
    posts().filter(
        post::Column::AuthorId.in_subquery(
            Query::select()
                .column(follow::Column::AuthorId)
                .from(follow::Entity)
                .and_where(follow::Column::UserId.eq(user_id))
                .to_owned(),
        ),
    )
}

pub async fn get_post(db: &DatabaseConnection, id: i64) -> Result<post::Model, Error> {
    post::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or(Error::NotFound)
}

pub async fn get_group_by_slug(db: &DatabaseConnection, slug: &str) -> Result<group::Model, Error> {
    group::Entity::find()
        .filter(group::Column::Slug.eq(slug))
        .one(db)
        .await?
        .ok_or(Error::NotFound)
}

pub async fn all_groups(db: &DatabaseConnection) -> Result<Vec<group::Model>, DbErr> {
    group::Entity::find()
        .order_by_asc(group::Column::Title)
        .all(db)
        .await
}

pub async fn group_exists(db: &DatabaseConnection, id: i64) -> Result<bool, DbErr> {
    Ok(group::Entity::find_by_id(id).one(db).await?.is_some())
}

pub async fn count_author_posts(db: &DatabaseConnection, author_id: i64) -> Result<u64, DbErr> {
    post::Entity::find()
        .filter(post::Column::AuthorId.eq(author_id))
        .count(db)
        .await
}

pub struct NewPost {
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<String>,
}

/// `None` leaves a field as it is.
#[derive(Default)]
pub struct PostChanges {
    pub text: Option<String>,
    pub group_id: Option<Option<i64>>,
    pub image: Option<Option<String>>,
}

pub async fn create_post(
    db: &DatabaseConnection,
    author: &user::Model,
    new: NewPost,
) -> Result<post::Model, Error> {
    let txn = db.begin().await?;
    let post = post::ActiveModel {
        text: Set(new.text),
        pub_date: Set(Utc::now()),
        author_id: Set(author.id),
        group_id: Set(new.group_id),
        image: Set(new.image),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    log::info!("{} published post {}", author.username, post.id);
    Ok(post)
}

/// Publication date and author never change.
pub async fn update_post(
    db: &DatabaseConnection,
    post: post::Model,
    changes: PostChanges,
) -> Result<post::Model, Error> {
    let txn = db.begin().await?;
    let mut active: post::ActiveModel = post.into();
    if let Some(text) = changes.text {
        active.text = Set(text);
    }
    if let Some(group_id) = changes.group_id {
        active.group_id = Set(group_id);
    }
    if let Some(image) = changes.image {
        active.image = Set(image);
    }
    let post = active.update(&txn).await?;
    txn.commit().await?;

    Ok(post)
}

/// Deletes the post together with its comments.
pub async fn delete_post(db: &DatabaseConnection, post: post::Model) -> Result<(), Error> {
    let txn = db.begin().await?;
    comment::Entity::delete_many()
        .filter(comment::Column::PostId.eq(post.id))
        .exec(&txn)
        .await?;
    post.delete(&txn).await?;
    txn.commit().await?;

    Ok(())
}

pub async fn comments_for(db: &DatabaseConnection, post_id: i64) -> Result<Vec<CommentView>, DbErr> {
    let comments = comment::Entity::find()
        .filter(comment::Column::PostId.eq(post_id))
        .order_by_desc(comment::Column::Created)
        .order_by_desc(comment::Column::Id)
        .all(db)
        .await?;
    let authors = usernames(db, comments.iter().map(|c| c.author_id).collect()).await?;

    Ok(comments
        .into_iter()
        .map(|c| comment_view(c, &authors))
        .collect())
}

fn comment_view(comment: comment::Model, authors: &HashMap<i64, String>) -> CommentView {
    CommentView {
        id: comment.id,
        post: comment.post_id,
        author: authors.get(&comment.author_id).cloned().unwrap_or_default(),
        text: comment.text,
        created: comment.created,
    }
}

pub async fn comment_view_of(
    db: &DatabaseConnection,
    comment: comment::Model,
) -> Result<CommentView, DbErr> {
    let authors = usernames(db, vec![comment.author_id]).await?;
    Ok(comment_view(comment, &authors))
}

/// A comment belonging to `post_id`.
pub async fn get_comment(
    db: &DatabaseConnection,
    post_id: i64,
    id: i64,
) -> Result<comment::Model, Error> {
    comment::Entity::find_by_id(id)
        .filter(comment::Column::PostId.eq(post_id))
        .one(db)
        .await?
        .ok_or(Error::NotFound)
}

pub async fn create_comment(
    db: &DatabaseConnection,
    post: &post::Model,
    author: &user::Model,
    text: String,
) -> Result<comment::Model, Error> {
    let txn = db.begin().await?;
    let comment = comment::ActiveModel {
        post_id: Set(post.id),
        author_id: Set(author.id),
        text: Set(text),
        created: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    Ok(comment)
}

pub async fn update_comment(
    db: &DatabaseConnection,
    comment: comment::Model,
    text: String,
) -> Result<comment::Model, Error> {
    let txn = db.begin().await?;
    let mut active: comment::ActiveModel = comment.into();
    active.text = Set(text);
    let comment = active.update(&txn).await?;
    txn.commit().await?;

    Ok(comment)
}

pub async fn delete_comment(db: &DatabaseConnection, comment: comment::Model) -> Result<(), Error> {
    let txn = db.begin().await?;
    comment.delete(&txn).await?;
    txn.commit().await?;

    Ok(())
}

pub async fn is_following(
    db: &DatabaseConnection,
    user_id: i64,
    author_id: i64,
) -> Result<bool, DbErr> {
    Ok(follow::Entity::find_by_id((user_id, author_id))
        .one(db)
        .await?
        .is_some())
}

/// Subscribes `user` to `author`. Following oneself or an author already
/// followed changes nothing; returns whether a row was added.
pub async fn follow(
    db: &DatabaseConnection,
    user: &user::Model,
    author: &user::Model,
) -> Result<bool, Error> {
    if user.id == author.id {
        return Ok(false);
    }

    let txn = db.begin().await?;
    if follow::Entity::find_by_id((user.id, author.id))
        .one(&txn)
        .await?
        .is_some()
    {
        return Ok(false);
    }
    insert_follow(&txn, user, author).await?;
    txn.commit().await?;

    Ok(true)
}

/// Like [`follow`], but a self-follow or a duplicate is reported back as a
/// validation error.
pub async fn create_follow(
    db: &DatabaseConnection,
    user: &user::Model,
    author: &user::Model,
) -> Result<FollowView, Error> {
    permissions::reject_self_follow(user, author)?;

    let txn = db.begin().await?;
    if follow::Entity::find_by_id((user.id, author.id))
        .one(&txn)
        .await?
        .is_some()
    {
        return Err(FieldErrors::single(NON_FIELD, FOLLOW_NOT_UNIQUE).into());
    }
    insert_follow(&txn, user, author).await?;
    txn.commit().await?;

    Ok(FollowView {
        user: user.username.clone(),
        following: author.username.clone(),
    })
}

async fn insert_follow<C: ConnectionTrait>(
    db: &C,
    user: &user::Model,
    author: &user::Model,
) -> Result<(), DbErr> {
    follow::Entity::insert(follow::ActiveModel {
        user_id: Set(user.id),
        author_id: Set(author.id),
    })
    .exec(db)
    .await?;

    log::info!("{} follows {}", user.username, author.username);
    Ok(())
}

/// Removes the subscription if there is one.
pub async fn unfollow(
    db: &DatabaseConnection,
    user: &user::Model,
    author: &user::Model,
) -> Result<u64, Error> {
    let txn = db.begin().await?;
    let removed = follow::Entity::delete_many()
        .filter(follow::Column::UserId.eq(user.id))
        .filter(follow::Column::AuthorId.eq(author.id))
        .exec(&txn)
        .await?
        .rows_affected;
    txn.commit().await?;

    Ok(removed)
}

/// Subscriptions of `user`, optionally only those where either side has
/// exactly the username `search`.
pub async fn follows_of(
    db: &DatabaseConnection,
    user: &user::Model,
    search: Option<&str>,
) -> Result<Vec<FollowView>, DbErr> {
    let rows = follow::Entity::find()
        .filter(follow::Column::UserId.eq(user.id))
        .order_by_asc(follow::Column::AuthorId)
        .all(db)
        .await?;
    let authors = usernames(db, rows.iter().map(|f| f.author_id).collect()).await?;

    Ok(rows
        .into_iter()
        .map(|f| FollowView {
            user: user.username.clone(),
            following: authors.get(&f.author_id).cloned().unwrap_or_default(),
        })
        .filter(|f| search.map_or(true, |s| f.user == s || f.following == s))
        .collect())
}

pub async fn create_group(
    db: &DatabaseConnection,
    title: &str,
    slug: &str,
    description: &str,
) -> Result<group::Model, Error> {
    let mut errors = FieldErrors::new();
    if title.trim().is_empty() {
        errors.add("title", crate::forms::REQUIRED);
    } else if title.chars().count() > group::TITLE_MAX_LENGTH {
        errors.add(
            "title",
            format!(
                "Ensure this value has at most {} characters.",
                group::TITLE_MAX_LENGTH
            ),
        );
    }
    if slug.is_empty()
        || !slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        errors.add(
            "slug",
            "Enter a valid slug consisting of letters, numbers, underscores or hyphens.",
        );
    }
    errors.into_result()?;

    if group::Entity::find()
        .filter(group::Column::Slug.eq(slug))
        .one(db)
        .await?
        .is_some()
    {
        return Err(FieldErrors::single("slug", "Group with this slug already exists.").into());
    }

    let txn = db.begin().await?;
    let group = group::ActiveModel {
        title: Set(title.to_owned()),
        slug: Set(slug.to_owned()),
        description: Set(description.to_owned()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    log::info!("Created group {group}");
    Ok(group)
}

/// Deletes the group; its posts stay and lose their group.
pub async fn delete_group(db: &DatabaseConnection, group: group::Model) -> Result<(), Error> {
    let txn = db.begin().await?;
    post::Entity::update_many()
        .col_expr(post::Column::GroupId, Expr::value(Option::<i64>::None))
        .filter(post::Column::GroupId.eq(group.id))
        .exec(&txn)
        .await?;
    group.delete(&txn).await?;
    txn.commit().await?;

    Ok(())
}

/// Deletes the user with everything they wrote and every subscription
/// they take part in.
pub async fn delete_user(db: &DatabaseConnection, user: user::Model) -> Result<(), Error> {
    let txn = db.begin().await?;

    let own_posts = Query::select()
        .column(post::Column::Id)
        .from(post::Entity)
        .and_where(post::Column::AuthorId.eq(user.id))
        .to_owned();
    comment::Entity::delete_many()
        .filter(
            comment::Column::PostId
                .in_subquery(own_posts)
                .or(comment::Column::AuthorId.eq(user.id)),
        )
        .exec(&txn)
        .await?;
    post::Entity::delete_many()
        .filter(post::Column::AuthorId.eq(user.id))
        .exec(&txn)
        .await?;
    follow::Entity::delete_many()
        .filter(
            follow::Column::UserId
                .eq(user.id)
                .or(follow::Column::AuthorId.eq(user.id)),
        )
        .exec(&txn)
        .await?;

    let username = user.username.clone();
    user.delete(&txn).await?;
    txn.commit().await?;

    log::info!("Deleted user {username}");
    Ok(())
}
