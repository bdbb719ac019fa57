use std::ops::Deref;

use entity::user;
use rocket::{
    delete, get, http::Method, patch, post, put, routes, serde::json::Json, Route, State,
};
use sea_orm::DatabaseConnection;

use crate::{
    error::Error,
    forms::{check_text, CommentPayload, FieldErrors},
    models::{auth::TokenUser, response::APIResponse},
    permissions, store,
};

pub fn routes() -> Vec<Route> {
    routes![
        list_comments,
        create_comment,
        get_comment,
        replace_comment,
        patch_comment,
        delete_comment
    ]
}

#[get("/posts/<post_id>/comments")]
async fn list_comments(
    db: &State<DatabaseConnection>,
    _user: TokenUser,
    post_id: i64,
) -> Result<APIResponse, Error> {
    let post = store::get_post(db, post_id).await?;
    Ok(APIResponse::new(store::comments_for(db, post.id).await?))
}

#[post("/posts/<post_id>/comments", data = "<payload>")]
async fn create_comment(
    db: &State<DatabaseConnection>,
    user: TokenUser,
    post_id: i64,
    payload: Json<CommentPayload>,
) -> Result<APIResponse, Error> {
    let post = store::get_post(db, post_id).await?;

    let mut errors = FieldErrors::new();
    check_text(payload.text.as_deref(), false, &mut errors);
    errors.into_result()?;

    let text = payload.into_inner().text.unwrap_or_default();
    let comment = store::create_comment(db, &post, &user, text).await?;

    Ok(APIResponse::created(
        store::comment_view_of(db.deref(), comment).await?,
    ))
}

#[get("/posts/<post_id>/comments/<id>")]
async fn get_comment(
    db: &State<DatabaseConnection>,
    _user: TokenUser,
    post_id: i64,
    id: i64,
) -> Result<APIResponse, Error> {
    store::get_post(db, post_id).await?;
    let comment = store::get_comment(db, post_id, id).await?;

    Ok(APIResponse::new(store::comment_view_of(db, comment).await?))
}

async fn update(
    db: &DatabaseConnection,
    user: &user::Model,
    method: Method,
    (post_id, id): (i64, i64),
    payload: CommentPayload,
) -> Result<APIResponse, Error> {
    store::get_post(db, post_id).await?;
    let comment = store::get_comment(db, post_id, id).await?;
    permissions::author_or_read_only(method, user, &comment)?;

    let mut errors = FieldErrors::new();
    check_text(payload.text.as_deref(), method == Method::Patch, &mut errors);
    errors.into_result()?;

    let comment = match payload.text {
        Some(text) => store::update_comment(db, comment, text).await?,
        None => comment,
    };

    Ok(APIResponse::new(store::comment_view_of(db, comment).await?))
}

#[put("/posts/<post_id>/comments/<id>", data = "<payload>")]
async fn replace_comment(
    db: &State<DatabaseConnection>,
    user: TokenUser,
    post_id: i64,
    id: i64,
    payload: Json<CommentPayload>,
) -> Result<APIResponse, Error> {
    update(db, &user, Method::Put, (post_id, id), payload.into_inner()).await
}

#[patch("/posts/<post_id>/comments/<id>", data = "<payload>")]
async fn patch_comment(
    db: &State<DatabaseConnection>,
    user: TokenUser,
    post_id: i64,
    id: i64,
    payload: Json<CommentPayload>,
) -> Result<APIResponse, Error> {
    update(db, &user, Method::Patch, (post_id, id), payload.into_inner()).await
}

#[delete("/posts/<post_id>/comments/<id>")]
async fn delete_comment(
    db: &State<DatabaseConnection>,
    user: TokenUser,
    post_id: i64,
    id: i64,
) -> Result<APIResponse, Error> {
    store::get_post(db, post_id).await?;
    let comment = store::get_comment(db, post_id, id).await?;
    permissions::author_or_read_only(Method::Delete, &user, &comment)?;
    store::delete_comment(db, comment).await?;

    Ok(APIResponse::NoContent)
}
