use std::ops::Deref;

use entity::user;
use rocket::{
    form::Form,
    get,
    http::{Cookie, CookieJar},
    post,
    response::Redirect,
    routes, Route, State,
};
use rocket_dyn_templates::{context, Template};
use sea_orm::DatabaseConnection;

use crate::{
    accounts,
    config::AppConfig,
    error::Error,
    forms::{Credentials, FieldErrors, LoginForm, NON_FIELD},
    models::auth::{SessionUser, SESSION_COOKIE},
    routes::posts::FormOutcome,
};

const BAD_LOGIN: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

pub fn routes() -> Vec<Route> {
    routes![login_form, login, logout, signup_form, signup]
}

/// Only local absolute paths are followed after signing in.
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path,
        _ => "/",
    }
}

fn sign_in(cookies: &CookieJar<'_>, user: &user::Model) {
    cookies.add_private(Cookie::new(SESSION_COOKIE, user.id.to_string()));
    log::info!("{} signed in", user.username);
}

#[get("/login?<next>")]
fn login_form(viewer: Option<SessionUser>, next: Option<&str>) -> Template {
    Template::render(
        "auth/login",
        context! {
            username: "",
            next,
            errors: FieldErrors::new(),
            viewer: viewer.as_deref(),
        },
    )
}

#[post("/login?<next>", data = "<form>")]
async fn login(
    db: &State<DatabaseConnection>,
    cookies: &CookieJar<'_>,
    next: Option<&str>,
    form: Form<LoginForm>,
) -> Result<FormOutcome, Error> {
    match accounts::authenticate(db.deref(), &form.username, &form.password).await? {
        Some(user) => {
            sign_in(cookies, &user);
            Ok(FormOutcome::Redirect(Redirect::to(safe_next(next).to_owned())))
        }
        None => Ok(FormOutcome::Page(Template::render(
            "auth/login",
            context! {
                username: &form.username,
                next,
                errors: FieldErrors::single(NON_FIELD, BAD_LOGIN),
            },
        ))),
    }
}

#[get("/logout")]
fn logout(cookies: &CookieJar<'_>) -> Redirect {
    cookies.remove_private(SESSION_COOKIE);
    Redirect::to("/")
}

#[get("/signup")]
fn signup_form() -> Template {
    Template::render(
        "auth/signup",
        context! { username: "", errors: FieldErrors::new() },
    )
}

#[post("/signup", data = "<form>")]
async fn signup(
    db: &State<DatabaseConnection>,
    config: &State<AppConfig>,
    cookies: &CookieJar<'_>,
    form: Form<Credentials>,
) -> Result<FormOutcome, Error> {
    match accounts::create_user(db.deref(), &form, config.password_cost).await {
        Ok(user) => {
            sign_in(cookies, &user);
            Ok(FormOutcome::Redirect(Redirect::to("/")))
        }
        Err(Error::Invalid(errors)) => Ok(FormOutcome::Page(Template::render(
            "auth/signup",
            context! { username: &form.username, errors },
        ))),
        Err(e) => Err(e),
    }
}
