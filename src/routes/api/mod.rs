//! JSON API mounted under `/api/v1`. Every route except `token/` requires a
//! [`TokenUser`](crate::models::auth::TokenUser).

use rocket::Route;

mod comments;
mod follow;
mod groups;
mod posts;
mod token;

pub fn routes() -> Vec<Route> {
    [
        posts::routes(),
        groups::routes(),
        comments::routes(),
        follow::routes(),
        token::routes(),
    ]
    .concat()
}
