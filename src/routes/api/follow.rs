use rocket::{get, post, routes, serde::json::Json, Route, State};
use sea_orm::DatabaseConnection;

use crate::{
    accounts,
    error::Error,
    forms::{FieldErrors, FollowPayload, REQUIRED},
    models::{auth::TokenUser, response::APIResponse},
    store,
};

pub fn routes() -> Vec<Route> {
    routes![list_follows, create_follow]
}

/// The caller's subscriptions; `search` keeps those where either username
/// matches exactly.
#[get("/follow?<search>")]
async fn list_follows(
    db: &State<DatabaseConnection>,
    user: TokenUser,
    search: Option<&str>,
) -> Result<APIResponse, Error> {
    let search = search.filter(|s| !s.is_empty());
    Ok(APIResponse::new(store::follows_of(db, &user, search).await?))
}

#[post("/follow", data = "<payload>")]
async fn create_follow(
    db: &State<DatabaseConnection>,
    user: TokenUser,
    payload: Json<FollowPayload>,
) -> Result<APIResponse, Error> {
    let Some(username) = payload.into_inner().following else {
        return Err(FieldErrors::single("following", REQUIRED).into());
    };
    let Some(author) = accounts::find_by_username(db, &username).await? else {
        return Err(FieldErrors::single(
            "following",
            format!("Object with username={username} does not exist."),
        )
        .into());
    };

    Ok(APIResponse::created(
        store::create_follow(db, &user, &author).await?,
    ))
}
