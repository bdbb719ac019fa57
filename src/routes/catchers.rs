use rocket::{
    catch, catchers,
    http::{RawStr, Status},
    response::Redirect,
    Catcher, Request,
};
use rocket_dyn_templates::{context, Template};

use crate::models::response::APIResponse;

/// Error pages of the HTML interface.
pub fn catchers() -> Vec<Catcher> {
    catchers![
        login_required,
        forbidden,
        not_found,
        server_error,
        default_catcher
    ]
}

/// JSON errors of everything under `/api`.
pub fn api_catchers() -> Vec<Catcher> {
    catchers![
        api_unauthorized,
        api_forbidden,
        api_not_found,
        api_unprocessable,
        api_default_catcher
    ]
}

#[catch(401)]
fn login_required(req: &Request) -> Redirect {
    let next = req.uri().path().to_string();
    Redirect::to(format!(
        "/auth/login/?next={}",
        RawStr::new(&next).percent_encode()
    ))
}

#[catch(403)]
fn forbidden(req: &Request) -> (Status, Template) {
    (
        Status::Forbidden,
        Template::render("core/403", context! { path: req.uri().path().to_string() }),
    )
}

#[catch(404)]
fn not_found(req: &Request) -> (Status, Template) {
    (
        Status::NotFound,
        Template::render("core/404", context! { path: req.uri().path().to_string() }),
    )
}

#[catch(500)]
fn server_error(req: &Request) -> (Status, Template) {
    (
        Status::InternalServerError,
        Template::render("core/500", context! { path: req.uri().path().to_string() }),
    )
}

#[catch(default)]
fn default_catcher(status: Status, _: &Request) -> (Status, Template) {
    (
        status,
        Template::render(
            "core/error",
            context! { code: status.code, reason: status.reason_lossy() },
        ),
    )
}

#[catch(401)]
fn api_unauthorized() -> APIResponse {
    APIResponse::error(401, "Authentication credentials were not provided.")
}

#[catch(403)]
fn api_forbidden() -> APIResponse {
    APIResponse::error(403, "You do not have permission to perform this action.")
}

#[catch(404)]
fn api_not_found() -> APIResponse {
    APIResponse::error(404, "Not found.")
}

#[catch(422)]
fn api_unprocessable() -> APIResponse {
    APIResponse::error(400, "Malformed request body.")
}

#[catch(default)]
fn api_default_catcher(status: Status, _: &Request) -> APIResponse {
    APIResponse::error(status.code, status.reason_lossy())
}
