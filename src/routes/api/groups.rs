//! Groups are created by administrators only; the API exposes them read-only.

use entity::group;
use rocket::{delete, get, patch, post, put, routes, Route, State};
use sea_orm::{DatabaseConnection, EntityTrait};

use crate::{
    error::Error,
    models::{auth::TokenUser, response::APIResponse},
    store,
};

pub fn routes() -> Vec<Route> {
    routes![
        list_groups,
        get_group,
        create_group,
        replace_group,
        patch_group,
        delete_group
    ]
}

fn not_allowed(method: &str) -> APIResponse {
    APIResponse::error(405, format!("Method \"{method}\" not allowed."))
}

#[get("/groups")]
async fn list_groups(
    db: &State<DatabaseConnection>,
    _user: TokenUser,
) -> Result<APIResponse, Error> {
    Ok(APIResponse::new(store::all_groups(db).await?))
}

#[get("/groups/<id>")]
async fn get_group(
    db: &State<DatabaseConnection>,
    _user: TokenUser,
    id: i64,
) -> Result<APIResponse, Error> {
    let group = group::Entity::find_by_id(id)
        .one(db.inner())
        .await?
        .ok_or(Error::NotFound)?;

    Ok(APIResponse::new(group))
}

#[post("/groups")]
fn create_group(_user: TokenUser) -> APIResponse {
    not_allowed("POST")
}

#[put("/groups/<_>")]
fn replace_group(_user: TokenUser) -> APIResponse {
    not_allowed("PUT")
}

#[patch("/groups/<_>")]
fn patch_group(_user: TokenUser) -> APIResponse {
    not_allowed("PATCH")
}

#[delete("/groups/<_>")]
fn delete_group(_user: TokenUser) -> APIResponse {
    not_allowed("DELETE")
}
