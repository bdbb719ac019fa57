#![allow(dead_code)]

use std::path::{Path, PathBuf};

use entity::{group, post, user};
use migration::{Migrator, MigratorTrait};
use rocket::{
    http::{ContentType, Cookie, Header},
    local::asynchronous::{Client, LocalRequest},
};
use sea_orm::{Database, DatabaseConnection, EntityTrait, PaginatorTrait};
use tempfile::TempDir;
use yatube::{accounts, forms::Credentials, models::auth::SESSION_COOKIE, store};

pub const PASSWORD: &str = "correct-horse";
const BOUNDARY: &str = "X-YATUBE-TEST-BOUNDARY";

/// Leading bytes of a JPEG file.
pub const JPEG: &[u8] = &[
    0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0x00, 0x01, 0x01, 0x00, 0x00,
    0x01, 0x00, 0x01, 0x00, 0x00, 0xFF, 0xD9,
];

pub struct TestApp {
    pub client: Client,
    pub db: DatabaseConnection,
    pub media: PathBuf,
    _dir: TempDir,
}

pub async fn database(dir: &Path) -> DatabaseConnection {
    let url = format!("sqlite://{}?mode=rwc", dir.join("yatube.db").display());
    let db = Database::connect(url).await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    db
}

pub async fn app() -> TestApp {
    app_with_cache(0).await
}

pub async fn app_with_cache(index_cache_seconds: u64) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let db = database(dir.path()).await;
    let media = dir.path().join("media");

    let figment = rocket::Config::figment()
        .merge(("template_dir", concat!(env!("CARGO_MANIFEST_DIR"), "/templates")))
        .merge(("media_root", &media))
        .merge(("password_cost", 4))
        .merge(("posts_per_page", 10))
        .merge(("index_cache_seconds", index_cache_seconds))
        .merge(("log_level", "off"));

    let rocket = yatube::build(figment, db.clone()).unwrap();
    let client = Client::tracked(rocket).await.unwrap();

    TestApp {
        client,
        db,
        media,
        _dir: dir,
    }
}

pub async fn create_user(db: &DatabaseConnection, username: &str) -> user::Model {
    let credentials = Credentials {
        username: username.to_owned(),
        password: PASSWORD.to_owned(),
    };
    accounts::create_user(db, &credentials, 4).await.unwrap()
}

pub async fn create_group(db: &DatabaseConnection, slug: &str) -> group::Model {
    store::create_group(db, &format!("Группа {slug}"), slug, "Тестовое описание")
        .await
        .unwrap()
}

pub async fn create_post(
    db: &DatabaseConnection,
    author: &user::Model,
    text: &str,
    group_id: Option<i64>,
) -> post::Model {
    store::create_post(
        db,
        author,
        store::NewPost {
            text: text.to_owned(),
            group_id,
            image: None,
        },
    )
    .await
    .unwrap()
}

pub async fn post_count(db: &DatabaseConnection) -> u64 {
    post::Entity::find().count(db).await.unwrap()
}

/// Signs the request in as `user` through the session cookie.
pub fn session<'c>(request: LocalRequest<'c>, user: &user::Model) -> LocalRequest<'c> {
    request.private_cookie(Cookie::new(SESSION_COOKIE, user.id.to_string()))
}

/// Authenticates the request as `user` through the API token.
pub fn bearer<'c>(request: LocalRequest<'c>, user: &user::Model) -> LocalRequest<'c> {
    request.header(Header::new(
        "Authorization",
        format!("Bearer {}", user.api_token),
    ))
}

/// A `multipart/form-data` body with text fields and at most one file
/// field named `image`.
pub fn multipart(fields: &[(&str, &str)], image: Option<(&str, &[u8])>) -> (ContentType, Vec<u8>) {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, bytes)) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    let content_type = ContentType::new("multipart", "form-data").with_params(("boundary", BOUNDARY));
    (content_type, body)
}

pub fn location(response: &rocket::local::asynchronous::LocalResponse<'_>) -> Option<String> {
    response.headers().get_one("Location").map(str::to_owned)
}
