use std::ops::Deref;

use rocket::{get, response::Redirect, routes, Route, State};
use rocket_dyn_templates::{context, Template};
use sea_orm::DatabaseConnection;

use super::user::profile_path;
use crate::{
    accounts, config::AppConfig, error::Error, models::auth::SessionUser, store,
};

const FEED_DESCRIPTION: &str = "Это cтраница с подписками";

pub fn routes() -> Vec<Route> {
    routes![follow_index, profile_follow, profile_unfollow]
}

/// Posts of every author the signed-in user follows.
#[get("/follow?<page>")]
async fn follow_index(
    db: &State<DatabaseConnection>,
    config: &State<AppConfig>,
    user: SessionUser,
    page: Option<&str>,
) -> Result<Template, Error> {
    let page_obj =
        store::card_page(db.deref(), store::feed(user.id), page, config.posts_per_page).await?;

    Ok(Template::render(
        "posts/follow",
        context! {
            description: FEED_DESCRIPTION,
            page_obj,
            viewer: &user.0,
        },
    ))
}

#[get("/profile/<username>/follow")]
async fn profile_follow(
    db: &State<DatabaseConnection>,
    user: SessionUser,
    username: &str,
) -> Result<Redirect, Error> {
    let author = accounts::get_by_username(db.deref(), username).await?;
    store::follow(db.deref(), &user, &author).await?;

    Ok(Redirect::to(profile_path(&author.username)))
}

#[get("/profile/<username>/unfollow")]
async fn profile_unfollow(
    db: &State<DatabaseConnection>,
    user: SessionUser,
    username: &str,
) -> Result<Redirect, Error> {
    let author = accounts::get_by_username(db.deref(), username).await?;
    if store::unfollow(db.deref(), &user, &author).await? > 0 {
        log::info!("{} unfollowed {}", user.username, author.username);
    }

    Ok(Redirect::to(profile_path(&author.username)))
}
