pub mod comment;
pub mod follow;
pub mod group;
pub mod post;
pub mod user;

/// First `len` characters of `text`, used for short string representations.
pub fn preview(text: &str, len: usize) -> String {
    text.chars().take(len).collect()
}
