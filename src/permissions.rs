use entity::{comment, post, user};
use rocket::http::Method;

use crate::{
    error::Error,
    forms::{FieldErrors, NON_FIELD},
};

pub const SELF_FOLLOW: &str = "You can't follow yourself";

/// Something written by a single user.
pub trait Authored {
    fn author_id(&self) -> i64;
}

impl Authored for post::Model {
    fn author_id(&self) -> i64 {
        self.author_id
    }
}

impl Authored for comment::Model {
    fn author_id(&self) -> i64 {
        self.author_id
    }
}

pub fn is_author(user: &user::Model, object: &impl Authored) -> bool {
    user.id == object.author_id()
}

/// Everybody authenticated may read; only the author may change or delete.
pub fn author_or_read_only(
    method: Method,
    user: &user::Model,
    object: &impl Authored,
) -> Result<(), Error> {
    if matches!(method, Method::Get | Method::Head | Method::Options) || is_author(user, object) {
        return Ok(());
    }

    log::warn!(
        "{} {method} rejected: object belongs to user {}",
        user.username,
        object.author_id()
    );
    Err(Error::Forbidden)
}

/// Rejects `user -> following` when both are the same account. The schema
/// refuses such rows as well.
pub fn reject_self_follow(user: &user::Model, following: &user::Model) -> Result<(), FieldErrors> {
    if user.id == following.id {
        return Err(FieldErrors::single(NON_FIELD, SELF_FOLLOW));
    }
    Ok(())
}
