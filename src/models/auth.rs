//! Request guards resolving the current user.
//!
//! HTML pages identify users by a private session cookie, the API by an
//! `Authorization: Bearer <token>` header. A missing or unknown identity
//! fails the guard with 401, which the catchers turn into a login redirect
//! or a JSON error.

use std::ops::Deref;

use entity::user;
use rocket::{
    http::Status,
    request::{FromRequest, Outcome},
    Request,
};
use sea_orm::{DatabaseConnection, DbErr};

use crate::accounts;

/// Cookie holding the signed-in user's id.
pub const SESSION_COOKIE: &str = "user_id";

/// User signed in through the HTML interface.
#[derive(Debug, Clone)]
pub struct SessionUser(pub user::Model);

/// User authenticated by API token.
#[derive(Debug, Clone)]
pub struct TokenUser(pub user::Model);

impl Deref for SessionUser {
    type Target = user::Model;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Deref for TokenUser {
    type Target = user::Model;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

fn resolved<T>(found: Result<Option<user::Model>, DbErr>, wrap: fn(user::Model) -> T) -> Outcome<T, ()> {
    match found {
        Ok(Some(user)) => Outcome::Success(wrap(user)),
        Ok(None) => Outcome::Error((Status::Unauthorized, ())),
        Err(e) => {
            log::error!("Failed to load user: {e}");
            Outcome::Error((Status::InternalServerError, ()))
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for SessionUser {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, ()> {
        let Some(id) = req
            .cookies()
            .get_private(SESSION_COOKIE)
            .and_then(|c| c.value().parse::<i64>().ok())
        else {
            return Outcome::Error((Status::Unauthorized, ()));
        };
        let Some(db) = req.rocket().state::<DatabaseConnection>() else {
            return Outcome::Error((Status::InternalServerError, ()));
        };

        resolved(accounts::find_by_id(db, id).await, SessionUser)
    }
}

/// Accepts both `Bearer <token>` and `Token <token>`.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (matches!(scheme, "Bearer" | "Token") && !token.is_empty()).then_some(token)
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for TokenUser {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, ()> {
        let Some(token) = req.headers().get_one("Authorization").and_then(bearer_token) else {
            return Outcome::Error((Status::Unauthorized, ()));
        };
        let Some(db) = req.rocket().state::<DatabaseConnection>() else {
            return Outcome::Error((Status::InternalServerError, ()));
        };

        resolved(accounts::find_by_token(db, token).await, TokenUser)
    }
}
