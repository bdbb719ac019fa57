pub mod api;
pub mod auth;
pub mod catchers;
pub mod feed;
pub mod posts;
pub mod user;
