use entity::user;
use rocket::tokio::task::spawn_blocking;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::Error,
    forms::{Credentials, FieldErrors},
};

pub const USERNAME_TAKEN: &str = "A user with that username already exists.";

async fn hash_password(password: String, cost: u32) -> Result<String, Error> {
    spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(std::io::Error::other)?
        .map_err(Error::from)
}

/// Validates the credentials and stores a new user with a fresh API token.
pub async fn create_user(
    db: &DatabaseConnection,
    credentials: &Credentials,
    cost: u32,
) -> Result<user::Model, Error> {
    credentials.validate().map_err(FieldErrors::from)?;

    if find_by_username(db, &credentials.username).await?.is_some() {
        return Err(FieldErrors::single("username", USERNAME_TAKEN).into());
    }

    let password_hash = hash_password(credentials.password.clone(), cost).await?;

    let txn = db.begin().await?;
    let user = user::ActiveModel {
        username: Set(credentials.username.clone()),
        password_hash: Set(password_hash),
        api_token: Set(Uuid::new_v4().simple().to_string()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    log::info!("Created user {}", user.username);
    Ok(user)
}

/// Returns the user when the password matches.
pub async fn authenticate(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
) -> Result<Option<user::Model>, Error> {
    let Some(user) = find_by_username(db, username).await? else {
        return Ok(None);
    };

    let hash = user.password_hash.clone();
    let password = password.to_owned();
    let matches = spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(std::io::Error::other)?
        .unwrap_or(false);

    Ok(matches.then_some(user))
}

pub async fn find_by_id(db: &DatabaseConnection, id: i64) -> Result<Option<user::Model>, DbErr> {
    user::Entity::find_by_id(id).one(db).await
}

pub async fn find_by_username(
    db: &DatabaseConnection,
    username: &str,
) -> Result<Option<user::Model>, DbErr> {
    user::Entity::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await
}

pub async fn find_by_token(
    db: &DatabaseConnection,
    token: &str,
) -> Result<Option<user::Model>, DbErr> {
    user::Entity::find()
        .filter(user::Column::ApiToken.eq(token))
        .one(db)
        .await
}

/// Like [`find_by_username`], but a missing user is [`Error::NotFound`].
pub async fn get_by_username(db: &DatabaseConnection, username: &str) -> Result<user::Model, Error> {
    find_by_username(db, username).await?.ok_or(Error::NotFound)
}
