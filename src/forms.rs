//! Submitted HTML forms and JSON payloads, and the field errors they produce.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;
use rocket::{fs::TempFile, FromForm};
use serde::{Deserialize, Deserializer, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";
pub const INVALID_CHOICE: &str = "Select a valid choice. That choice is not one of the available choices.";
pub const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

/// Key for errors that do not belong to a single field.
pub const NON_FIELD: &str = "non_field_errors";

lazy_static! {
    static ref USERNAME_RE: Regex = Regex::new(r"^[\w.@+-]+$").unwrap();
}

/// Messages keyed by field name, serialized as `{"field": ["message", ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_owned())
            .or_default()
            .push(message.into());
    }

    pub fn merge(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<ValidationErrors> for FieldErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut out = Self::new();
        for (field, errors) in errors.field_errors() {
            for error in errors {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| error.code.to_string());
                out.add(field, message);
            }
        }
        out
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("blank");
        error.message = Some(BLANK.into());
        return Err(error);
    }
    Ok(())
}

/// Deserializes a field that was present in the payload, even as `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Post create/edit form, urlencoded or multipart.
#[derive(Debug, FromForm)]
pub struct PostForm<'r> {
    #[field(default = String::new())]
    pub text: String,
    /// Group id; empty means no group
    pub group: Option<String>,
    pub image: Option<TempFile<'r>>,
}

#[derive(Debug, FromForm)]
pub struct CommentForm {
    #[field(default = String::new())]
    pub text: String,
}

#[derive(Debug, FromForm)]
pub struct LoginForm {
    #[field(default = String::new())]
    pub username: String,
    #[field(default = String::new())]
    pub password: String,
}

#[derive(Debug, Clone, FromForm, Validate)]
pub struct Credentials {
    #[field(default = String::new())]
    #[validate(
        length(min = 1, max = 150, message = "Enter 1 to 150 characters."),
        regex(
            path = "USERNAME_RE",
            message = "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
        )
    )]
    pub username: String,
    #[field(default = String::new())]
    #[validate(length(min = 8, message = "This password is too short. It must contain at least 8 characters."))]
    pub password: String,
}

/// Text body shared by posts and comments.
#[derive(Debug, Validate)]
pub struct TextInput<'a> {
    #[validate(custom = "not_blank")]
    pub text: &'a str,
}

impl<'a> TextInput<'a> {
    pub fn check(text: &'a str) -> Result<(), FieldErrors> {
        Self { text }.validate().map_err(FieldErrors::from)
    }
}

/// JSON body for creating or editing a post. `group` distinguishes an
/// explicit `null` (`Some(None)`) from an absent key (`None`).
#[derive(Debug, Default, Deserialize)]
pub struct PostPayload {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub group: Option<Option<i64>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommentPayload {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FollowPayload {
    #[serde(default)]
    pub following: Option<String>,
}

/// Checks an optional text field; `partial` updates may leave it out.
pub fn check_text(text: Option<&str>, partial: bool, errors: &mut FieldErrors) {
    match text {
        Some(text) => {
            if let Err(e) = TextInput::check(text) {
                errors.merge(e);
            }
        }
        None if !partial => errors.add("text", REQUIRED),
        None => {}
    }
}
