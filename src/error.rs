use rocket::{
    http::Status,
    response::{self, Responder},
    serde::json::Json,
    Request,
};
use sea_orm::DbErr;

use crate::forms::FieldErrors;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("database error: {0}")]
    Db(#[from] DbErr),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("configuration error: {0}")]
    Config(#[from] Box<rocket::figment::Error>),
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("template {0} failed to render")]
    Render(&'static str),
    #[error("not found")]
    NotFound,
    #[error("permission denied")]
    Forbidden,
    #[error("authentication required")]
    Unauthorized,
    #[error("invalid input")]
    Invalid(FieldErrors),
}

impl From<FieldErrors> for Error {
    fn from(errors: FieldErrors) -> Self {
        Self::Invalid(errors)
    }
}

/// Status-only failures are forwarded to the catcher registered for the
/// request path, so HTML pages and the API each render their own error body.
impl<'r> Responder<'r, 'static> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        match self {
            Self::NotFound => Err(Status::NotFound),
            Self::Forbidden => Err(Status::Forbidden),
            Self::Unauthorized => Err(Status::Unauthorized),
            Self::Invalid(errors) => (Status::BadRequest, Json(errors)).respond_to(req),
            err => {
                log::error!("{} {}: {err}", req.method(), req.uri());
                Err(Status::InternalServerError)
            }
        }
    }
}
