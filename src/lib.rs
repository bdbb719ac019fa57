use std::time::Duration;

use rocket::{figment::Figment, fs::FileServer, Build, Rocket};
use rocket_dyn_templates::Template;
use sea_orm::DatabaseConnection;

pub mod accounts;
pub mod cache;
pub mod config;
pub mod error;
pub mod forms;
pub mod models;
pub mod pagination;
pub mod permissions;
pub mod routes;
pub mod store;
pub mod uploads;

use crate::{cache::PageCache, config::AppConfig, error::Error};

/// Assembles the web application on top of an already migrated database.
pub fn build(figment: Figment, db: DatabaseConnection) -> Result<Rocket<Build>, Error> {
    let config: AppConfig = figment.extract().map_err(Box::new)?;
    std::fs::create_dir_all(&config.media_root)?;

    log::info!(
        "Serving media from {}, {} posts per page",
        config.media_root.display(),
        config.posts_per_page
    );

    let rocket = rocket::custom(figment)
        .attach(Template::fairing())
        .manage(db)
        .manage(PageCache::new(Duration::from_secs(
            config.index_cache_seconds,
        )))
        .mount("/media", FileServer::from(&config.media_root))
        .manage(config)
        .register("/", routes::catchers::catchers())
        .register("/api", routes::catchers::api_catchers())
        .mount("/", routes::posts::routes())
        .mount("/", routes::user::routes())
        .mount("/", routes::feed::routes())
        .mount("/auth", routes::auth::routes())
        .mount("/api/v1", routes::api::routes());

    Ok(rocket)
}
