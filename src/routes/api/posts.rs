use std::ops::Deref;

use chrono::{DateTime, Utc};
use entity::{post, user};
use rocket::{
    delete, get, http::Method, patch, post, put, routes, serde::json::Json, Route, State,
};
use sea_orm::{DatabaseConnection, PaginatorTrait, QuerySelect};
use serde::Serialize;

use crate::{
    config::AppConfig,
    error::Error,
    forms::{check_text, FieldErrors, PostPayload},
    models::{auth::TokenUser, response::APIResponse},
    pagination::{ListQuery, Listing},
    permissions,
    store::{self, PostCard},
};

pub fn routes() -> Vec<Route> {
    routes![
        list_posts,
        create_post,
        get_post,
        replace_post,
        patch_post,
        delete_post
    ]
}

#[derive(Debug, Serialize)]
pub struct PostData {
    pub id: i64,
    pub author: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    /// URL of the uploaded image
    pub image: Option<String>,
    pub group: Option<i64>,
}

impl From<PostCard> for PostData {
    fn from(card: PostCard) -> Self {
        Self {
            id: card.id,
            author: card.author,
            text: card.text,
            pub_date: card.pub_date,
            image: card.image_url,
            group: card.group.map(|g| g.id),
        }
    }
}

async fn serialize_all(
    db: &DatabaseConnection,
    posts: Vec<post::Model>,
) -> Result<Vec<PostData>, Error> {
    Ok(store::cards(db, posts)
        .await?
        .into_iter()
        .map(PostData::from)
        .collect())
}

async fn serialize(db: &DatabaseConnection, post: post::Model) -> Result<PostData, Error> {
    serialize_all(db, vec![post])
        .await?
        .pop()
        .ok_or(Error::NotFound)
}

/// Records an error for a group id that names no group.
async fn check_group(
    db: &DatabaseConnection,
    group: Option<i64>,
    errors: &mut FieldErrors,
) -> Result<Option<i64>, Error> {
    let Some(id) = group else {
        return Ok(None);
    };
    if store::group_exists(db, id).await? {
        return Ok(Some(id));
    }

    errors.add("group", format!("Invalid pk \"{id}\" - object does not exist."));
    Ok(None)
}

#[get("/posts")]
async fn list_posts(
    db: &State<DatabaseConnection>,
    config: &State<AppConfig>,
    _user: TokenUser,
    query: ListQuery,
) -> Result<APIResponse, Error> {
    if !query.has_params {
        let posts = store::posts().all(db.deref()).await?;
        let data = serialize_all(db, posts).await?;
        return Ok(APIResponse::new(Listing::Bare(data)));
    }

    let (limit, offset) = query.window(config.posts_per_page);
    let count = store::posts().count(db.deref()).await?;
    let posts = store::posts()
        .offset(offset)
        .limit(limit)
        .all(db.deref())
        .await?;
    let data = serialize_all(db, posts).await?;

    Ok(APIResponse::new(query.envelope(count, limit, offset, data)))
}

#[post("/posts", data = "<payload>")]
async fn create_post(
    db: &State<DatabaseConnection>,
    user: TokenUser,
    payload: Json<PostPayload>,
) -> Result<APIResponse, Error> {
    let payload = payload.into_inner();

    let mut errors = FieldErrors::new();
    check_text(payload.text.as_deref(), false, &mut errors);
    let group_id = check_group(db, payload.group.flatten(), &mut errors).await?;
    errors.into_result()?;

    let post = store::create_post(
        db,
        &user,
        store::NewPost {
            text: payload.text.unwrap_or_default(),
            group_id,
            image: None,
        },
    )
    .await?;

    Ok(APIResponse::created(serialize(db, post).await?))
}

#[get("/posts/<id>")]
async fn get_post(
    db: &State<DatabaseConnection>,
    _user: TokenUser,
    id: i64,
) -> Result<APIResponse, Error> {
    let post = store::get_post(db, id).await?;
    Ok(APIResponse::new(serialize(db, post).await?))
}

async fn update(
    db: &DatabaseConnection,
    user: &user::Model,
    method: Method,
    id: i64,
    payload: PostPayload,
) -> Result<APIResponse, Error> {
    let post = store::get_post(db, id).await?;
    permissions::author_or_read_only(method, user, &post)?;

    let mut errors = FieldErrors::new();
    check_text(payload.text.as_deref(), method == Method::Patch, &mut errors);
    let group_id = match payload.group {
        Some(group) => Some(check_group(db, group, &mut errors).await?),
        None => None,
    };
    errors.into_result()?;

    let post = store::update_post(
        db,
        post,
        store::PostChanges {
            text: payload.text,
            group_id,
            image: None,
        },
    )
    .await?;

    Ok(APIResponse::new(serialize(db, post).await?))
}

#[put("/posts/<id>", data = "<payload>")]
async fn replace_post(
    db: &State<DatabaseConnection>,
    user: TokenUser,
    id: i64,
    payload: Json<PostPayload>,
) -> Result<APIResponse, Error> {
    update(db, &user, Method::Put, id, payload.into_inner()).await
}

#[patch("/posts/<id>", data = "<payload>")]
async fn patch_post(
    db: &State<DatabaseConnection>,
    user: TokenUser,
    id: i64,
    payload: Json<PostPayload>,
) -> Result<APIResponse, Error> {
    update(db, &user, Method::Patch, id, payload.into_inner()).await
}

#[delete("/posts/<id>")]
async fn delete_post(
    db: &State<DatabaseConnection>,
    user: TokenUser,
    id: i64,
) -> Result<APIResponse, Error> {
    let post = store::get_post(db, id).await?;
    permissions::author_or_read_only(Method::Delete, &user, &post)?;
    store::delete_post(db, post).await?;

    Ok(APIResponse::NoContent)
}
