use rocket::{post, routes, serde::json::Json, Route, State};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use serde_json::json;

use crate::{
    accounts,
    error::Error,
    forms::{FieldErrors, NON_FIELD, REQUIRED},
    models::response::APIResponse,
};

const BAD_CREDENTIALS: &str = "Unable to log in with provided credentials.";

pub fn routes() -> Vec<Route> {
    routes![obtain_token]
}

#[derive(Debug, Default, Deserialize)]
struct TokenRequest {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

/// Exchanges a username and password for the user's API token.
#[post("/token", data = "<payload>")]
async fn obtain_token(
    db: &State<DatabaseConnection>,
    payload: Json<TokenRequest>,
) -> Result<APIResponse, Error> {
    let TokenRequest { username, password } = payload.into_inner();

    let mut errors = FieldErrors::new();
    if username.as_deref().map_or(true, str::is_empty) {
        errors.add("username", REQUIRED);
    }
    if password.as_deref().map_or(true, str::is_empty) {
        errors.add("password", REQUIRED);
    }
    errors.into_result()?;

    let (username, password) = (username.unwrap_or_default(), password.unwrap_or_default());
    match accounts::authenticate(db, &username, &password).await? {
        Some(user) => Ok(APIResponse::new(json!({ "token": user.api_token }))),
        None => {
            log::warn!("Rejected token request for {username}");
            Err(FieldErrors::single(NON_FIELD, BAD_CREDENTIALS).into())
        }
    }
}
