use std::collections::BTreeMap;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use validator::ValidationErrors;

pub(crate) const USERNAME_TAKEN: &str = "A user with that username already exists.";
pub(crate) const EMAIL_TAKEN: &str = "A user with that email already exists.";
pub(crate) const USERNAME_RESERVED: &str = "The username \"me\" is reserved.";
pub(crate) const SLUG_TAKEN: &str = "This slug is already in use.";
pub(crate) const ID_TAKEN: &str = "An object with this id already exists.";
pub(crate) const DUPLICATE_REVIEW: &str = "You have already reviewed this title.";

/// FieldErrors
///
/// Field name to list of human-readable messages. Serialized as a flat JSON object,
/// e.g. `{"score": ["Ensure this value is between 1 and 10."]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a map holding a single message.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
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

    pub fn get(&self, field: &str) -> Option<&Vec<String>> {
        self.0.get(field)
    }

    /// Ok when empty, otherwise a validation error carrying these messages.
    pub fn into_result(self) -> Result<(), AppError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }
}

impl From<ValidationErrors> for FieldErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut out = FieldErrors::new();
        for (field, list) in errors.field_errors() {
            for error in list.iter() {
                let message = match &error.message {
                    Some(message) => message.to_string(),
                    None => format!("Invalid value ({}).", error.code),
                };
                out.add(&field.to_string(), message);
            }
        }
        out
    }
}

/// AppError
///
/// The single error type returned by handlers, the repository and the auth extractor.
/// Client errors keep their field-level detail; server errors are logged and reduced to a
/// generic message before they leave the process.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed")]
    Validation(FieldErrors),

    #[error("Authentication credentials were not provided or are invalid.")]
    Unauthorized,

    #[error("You do not have permission to perform this action.")]
    Forbidden,

    #[error("{0} not found.")]
    NotFound(&'static str),

    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("mail delivery failed: {0}")]
    Mail(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(_) | Self::Token(_) | Self::Mail(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Shorthand for a single-field validation failure.
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        Self::Validation(FieldErrors::single(field, message))
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors.into())
    }
}

/// Storage constraint violations are client errors. The constraint names come from
/// `migrations/`; anything unrecognised stays a server error.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match constraint_violation(&err) {
            Some(client_error) => client_error,
            None => AppError::Database(err),
        }
    }
}

fn constraint_violation(err: &sqlx::Error) -> Option<AppError> {
    let sqlx::Error::Database(db) = err else {
        return None;
    };

    if db.is_unique_violation() {
        return match db.constraint() {
            Some("users_username_key") => Some(AppError::field("username", USERNAME_TAKEN)),
            Some("users_email_key") => Some(AppError::field("email", EMAIL_TAKEN)),
            Some("categories_slug_key") | Some("genres_slug_key") => {
                Some(AppError::field("slug", SLUG_TAKEN))
            }
            Some("reviews_title_author_key") => {
                Some(AppError::field("non_field_errors", DUPLICATE_REVIEW))
            }
            Some(name) if name.ends_with("_pkey") => Some(AppError::field("id", ID_TAKEN)),
            _ => None,
        };
    }
    if db.is_foreign_key_violation() {
        return Some(AppError::NotFound("Related object"));
    }
    if db.is_check_violation() {
        return Some(match db.constraint() {
            Some("users_username_not_me") => AppError::field("username", USERNAME_RESERVED),
            _ => AppError::field("non_field_errors", "Value violates a constraint."),
        });
    }
    None
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            AppError::Validation(errors) => {
                tracing::debug!(?errors, "Validation failed");
                return (status, Json(errors.clone())).into_response();
            }
            AppError::Unauthorized | AppError::Forbidden | AppError::NotFound(_) => {
                tracing::debug!(status = status.as_u16(), message = %self, "Client error");
            }
            _ => {
                tracing::error!(error = ?self, "Server error");
            }
        }

        let detail = if status.is_server_error() {
            "Internal server error.".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
