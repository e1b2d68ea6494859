use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::errors::FieldErrors;

// --- Roles ---

/// Role
///
/// The RBAC field stored on every user. Staff accounts are treated as admins regardless of
/// the stored value (see `permissions`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    #[default]
    User,
    Moderator,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a stored or submitted role is not one of the known values.
#[derive(Debug, Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "moderator" => Ok(Role::Moderator),
            "admin" => Ok(Role::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// Canonical identity record from the `users` table. `confirmation_digest` never leaves the
/// process; `is_staff` is internal and only widens permissions.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    #[serde(skip)]
    #[ts(skip)]
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: Option<String>,
    #[sqlx(try_from = "String")]
    pub role: Role,
    #[serde(skip)]
    #[ts(skip)]
    pub is_staff: bool,
    #[serde(skip)]
    #[ts(skip)]
    pub confirmation_digest: Option<String>,
}

/// CatalogKind
///
/// Categories and genres share one shape (name + unique slug) and one set of endpoints;
/// this selects which table an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogKind {
    Category,
    Genre,
}

impl CatalogKind {
    pub fn table(&self) -> &'static str {
        match self {
            CatalogKind::Category => "categories",
            CatalogKind::Genre => "genres",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CatalogKind::Category => "Category",
            CatalogKind::Genre => "Genre",
        }
    }

    pub fn name_max_len(&self) -> usize {
        match self {
            CatalogKind::Category => 256,
            CatalogKind::Genre => 100,
        }
    }

    /// File read by the CSV import for this kind.
    pub fn csv_file(&self) -> &'static str {
        match self {
            CatalogKind::Category => "category.csv",
            CatalogKind::Genre => "genre.csv",
        }
    }
}

/// CatalogItem
///
/// A row of `categories` or `genres`. The numeric id is internal; clients address these by slug.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct CatalogItem {
    #[serde(skip)]
    #[ts(skip)]
    pub id: i64,
    pub name: String,
    pub slug: String,
}

/// CatalogRow
///
/// One parsed line of an import file. `id` is kept when the file supplies it.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRow {
    pub id: Option<i64>,
    pub name: String,
    pub slug: String,
}

/// TitleResponse
///
/// Read representation of a title, with its category and genres expanded and the rating
/// computed from the current reviews (`None` when there are none).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct TitleResponse {
    pub id: i64,
    pub name: String,
    pub year: i32,
    pub rating: Option<f64>,
    pub description: Option<String>,
    pub genre: Vec<CatalogItem>,
    pub category: Option<CatalogItem>,
}

/// Review
///
/// A row of `reviews` joined with the author's username.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Review {
    pub id: i64,
    #[serde(skip)]
    #[ts(skip)]
    pub title_id: i64,
    #[serde(skip)]
    #[ts(skip)]
    pub author_id: Uuid,
    pub author: String,
    pub text: String,
    pub score: i32,
    #[ts(type = "string")]
    pub pub_date: DateTime<Utc>,
}

/// Comment
///
/// A row of `comments` joined with the author's username.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Comment {
    pub id: i64,
    #[serde(skip)]
    #[ts(skip)]
    pub review_id: i64,
    #[serde(skip)]
    #[ts(skip)]
    pub author_id: Uuid,
    pub author: String,
    pub text: String,
    #[ts(type = "string")]
    pub pub_date: DateTime<Utc>,
}

// --- Field rules shared by payloads ---

/// Usernames follow the `[\w.@+-]+` convention and may not be "me" in any case,
/// since `/users/me` is a route.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.eq_ignore_ascii_case("me") {
        let mut err = ValidationError::new("reserved_username");
        err.message = Some("The username \"me\" is reserved.".into());
        return Err(err);
    }
    let valid = username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '@' | '+' | '-'));
    if !valid {
        let mut err = ValidationError::new("invalid_username");
        err.message =
            Some("Username may contain only letters, digits and @/./+/-/_ characters.".into());
        return Err(err);
    }
    Ok(())
}

/// Slugs are ASCII letters, digits, hyphens and underscores.
pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    let valid = slug
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        let mut err = ValidationError::new("invalid_slug");
        err.message =
            Some("Slug may contain only letters, numbers, underscores or hyphens.".into());
        return Err(err);
    }
    Ok(())
}

/// A title's year must not lie in the future.
pub fn check_year(year: i32, errors: &mut FieldErrors) {
    let current = Utc::now().year();
    if year < 1 || year > current {
        errors.add(
            "year",
            format!("Ensure the year is between 1 and {current}."),
        );
    }
}

/// Title descriptions are limited to 256 characters.
pub fn check_description(description: Option<&str>, errors: &mut FieldErrors) {
    if description.is_some_and(|text| text.chars().count() > 256) {
        errors.add(
            "description",
            "Ensure this field has no more than 256 characters.",
        );
    }
}

/// Partial updates tell a missing key (`None`) from an explicit `null` (`Some(None)`).
fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// --- Request Payloads (Input Schemas) ---

/// SignupRequest
///
/// Input payload for `POST /auth/signup`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct SignupRequest {
    #[validate(
        length(min = 1, max = 150, message = "Ensure this field has 1 to 150 characters."),
        custom(function = "validate_username")
    )]
    pub username: String,
    #[validate(
        email(message = "Enter a valid email address."),
        length(max = 254, message = "Ensure this field has no more than 254 characters.")
    )]
    pub email: String,
}

/// TokenRequest
///
/// Input payload for `POST /auth/token`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct TokenRequest {
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub username: String,
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub confirmation_code: String,
}

/// TokenResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct TokenResponse {
    pub token: String,
}

/// CreateUserRequest
///
/// Admin payload for `POST /users`. Role defaults to `user`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct CreateUserRequest {
    #[validate(
        length(min = 1, max = 150, message = "Ensure this field has 1 to 150 characters."),
        custom(function = "validate_username")
    )]
    pub username: String,
    #[validate(
        email(message = "Enter a valid email address."),
        length(max = 254, message = "Ensure this field has no more than 254 characters.")
    )]
    pub email: String,
    #[serde(default)]
    #[validate(length(max = 150, message = "Ensure this field has no more than 150 characters."))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 150, message = "Ensure this field has no more than 150 characters."))]
    pub last_name: String,
    pub bio: Option<String>,
    pub role: Option<Role>,
}

/// UpdateUserRequest
///
/// Partial update for users. On `/users/me` the `role` field is ignored.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(
        length(min = 1, max = 150, message = "Ensure this field has 1 to 150 characters."),
        custom(function = "validate_username")
    )]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(
        email(message = "Enter a valid email address."),
        length(max = 254, message = "Ensure this field has no more than 254 characters.")
    )]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 150, message = "Ensure this field has no more than 150 characters."))]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 150, message = "Ensure this field has no more than 150 characters."))]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    #[schema(value_type = Option<String>)]
    pub bio: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

/// NewUser
///
/// Fully resolved insert for the repository.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: Option<String>,
    pub role: Role,
}

/// CreateCatalogRequest
///
/// Payload for `POST /categories` and `POST /genres`. The name limit differs per kind and
/// is checked in the handler.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct CreateCatalogRequest {
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub name: String,
    #[validate(
        length(min = 1, max = 50, message = "Ensure this field has 1 to 50 characters."),
        custom(function = "validate_slug")
    )]
    pub slug: String,
}

/// CreateTitleRequest
///
/// `category` is a category slug, `genre` a list of genre slugs.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct CreateTitleRequest {
    #[validate(length(min = 1, max = 100, message = "Ensure this field has 1 to 100 characters."))]
    pub name: String,
    pub year: i32,
    #[validate(length(max = 256, message = "Ensure this field has no more than 256 characters."))]
    pub description: Option<String>,
    #[validate(length(min = 1, message = "At least one genre is required."))]
    pub genre: Vec<String>,
    pub category: Option<String>,
}

/// UpdateTitleRequest
///
/// Partial update. A present `genre` list replaces the title's genres.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct UpdateTitleRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 100, message = "Ensure this field has 1 to 100 characters."))]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    /// `null` clears the description; checked by `check_description`.
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "At least one genre is required."))]
    pub genre: Option<Vec<String>>,
    /// A category slug, or `null` to detach the title from its category.
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    #[schema(value_type = Option<String>)]
    pub category: Option<Option<String>>,
}

/// TitleWrite
///
/// Title fields after validation, handed to the repository. Slugs are resolved there so that
/// resolution and insert share a transaction.
#[derive(Debug, Clone, Default)]
pub struct TitleWrite {
    pub name: String,
    pub year: i32,
    pub description: Option<String>,
    pub category: Option<String>,
    pub genre: Vec<String>,
}

/// CreateReviewRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct CreateReviewRequest {
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub text: String,
    #[validate(range(min = 1, max = 10, message = "Score must be between 1 and 10."))]
    pub score: i32,
}

/// UpdateReviewRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct UpdateReviewRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, max = 10, message = "Score must be between 1 and 10."))]
    pub score: Option<i32>,
}

/// CreateCommentRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub text: String,
}

/// UpdateCommentRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct UpdateCommentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub text: Option<String>,
}

// --- Listing ---

/// PageParams
///
/// 1-based page number accepted by every list endpoint.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    pub page: Option<u32>,
}

/// PageRequest
///
/// Resolved limit/offset handed to the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: i64,
    pub offset: i64,
}

impl PageRequest {
    pub fn new(page: Option<u32>, page_size: i64) -> Self {
        let page = page.unwrap_or(1).max(1);
        let limit = page_size.max(1);
        Self {
            page,
            limit,
            offset: (page as i64 - 1) * limit,
        }
    }
}

/// Page
///
/// Paginated envelope: total `count`, neighbouring page numbers and the current results.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<u32>,
    pub previous: Option<u32>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(results: Vec<T>, count: i64, req: PageRequest) -> Self {
        let next = (req.offset + req.limit < count).then_some(req.page + 1);
        let previous = (req.page > 1).then(|| req.page - 1);
        Self {
            count,
            next,
            previous,
            results,
        }
    }
}

/// SearchParams
///
/// `?search=` for users (username contains), categories (name contains) and genres (exact name).
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    pub search: Option<String>,
    pub page: Option<u32>,
}

/// TitleFilter
///
/// Query parameters for `GET /titles`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TitleFilter {
    /// Genre slug.
    pub genre: Option<String>,
    /// Category slug.
    pub category: Option<String>,
    /// Case-insensitive substring of the title name.
    pub name: Option<String>,
    pub year: Option<i32>,
    pub page: Option<u32>,
}
