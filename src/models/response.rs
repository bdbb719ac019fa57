use rocket::{
    http::Status,
    response::{self, Responder},
    serde::json::Json,
    Request,
};
use serde::Serialize;
use serde_json::{json, Value};

/// JSON answer of an API route.
#[derive(Debug)]
pub enum APIResponse {
    Data(Status, Value),
    Error(Status, String),
    NoContent,
}

impl APIResponse {
    pub fn new<T: Serialize>(data: T) -> Self {
        Self::with_status(Status::Ok, data)
    }

    pub fn created<T: Serialize>(data: T) -> Self {
        Self::with_status(Status::Created, data)
    }

    pub fn with_status<T: Serialize>(status: Status, data: T) -> Self {
        match serde_json::to_value(data) {
            Ok(value) => Self::Data(status, value),
            Err(e) => {
                log::error!("Failed to serialize response: {e}");
                Self::error(500, "Internal server error")
            }
        }
    }

    pub fn error(code: u16, detail: impl Into<String>) -> Self {
        Self::Error(Status::new(code), detail.into())
    }
}

impl<'r> Responder<'r, 'static> for APIResponse {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        match self {
            Self::Data(status, value) => (status, Json(value)).respond_to(req),
            Self::Error(status, detail) => {
                (status, Json(json!({ "detail": detail }))).respond_to(req)
            }
            Self::NoContent => Status::NoContent.respond_to(req),
        }
    }
}
