use std::ops::Deref;

use rocket::{get, http::RawStr, routes, Route, State};
use rocket_dyn_templates::{context, Template};
use sea_orm::DatabaseConnection;

use crate::{
    accounts, config::AppConfig, error::Error, models::auth::SessionUser, store,
};

const PROFILE_DESCRIPTION: &str = "Информация о пользователе";

pub fn routes() -> Vec<Route> {
    routes![profile]
}

/// Path of a profile page, with the username percent-encoded.
pub fn profile_path(username: &str) -> String {
    format!("/profile/{}/", RawStr::new(username).percent_encode())
}

#[get("/profile/<username>?<page>")]
async fn profile(
    db: &State<DatabaseConnection>,
    config: &State<AppConfig>,
    viewer: Option<SessionUser>,
    username: &str,
    page: Option<&str>,
) -> Result<Template, Error> {
    let author = accounts::get_by_username(db.deref(), username).await?;
    let page_obj = store::card_page(
        db.deref(),
        store::author_posts(author.id),
        page,
        config.posts_per_page,
    )
    .await?;

    let following = match viewer.as_deref() {
        Some(viewer) => store::is_following(db.deref(), viewer.id, author.id).await?,
        None => false,
    };

    Ok(Template::render(
        "posts/profile",
        context! {
            description: PROFILE_DESCRIPTION,
            total_count: page_obj.count,
            author,
            page_obj,
            following,
            viewer: viewer.as_deref(),
        },
    ))
}
