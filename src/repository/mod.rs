use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    errors::AppError,
    models::{
        CatalogItem, CatalogKind, CatalogRow, Comment, CreateReviewRequest, NewUser, PageRequest,
        Review, TitleFilter, TitleResponse, TitleWrite, UpdateCommentRequest, UpdateReviewRequest,
        UpdateTitleRequest, UpdateUserRequest, User,
    },
};

mod memory;
mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

/// Repository Trait
///
/// Abstract contract for all persistence. Handlers hold an `Arc<dyn Repository>` and never
/// see SQL. Implementations must enforce the storage-level invariants themselves (unique
/// username/email/slug, one review per title and author, cascades), and report violations
/// with the same `AppError` field errors.
///
/// List methods return the requested page together with the total row count.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    // Ordered by username; `search` is a case-insensitive substring of the username.
    async fn list_users(
        &self,
        search: Option<String>,
        page: PageRequest,
    ) -> Result<(Vec<User>, i64), AppError>;
    async fn create_user(&self, user: NewUser) -> Result<User, AppError>;
    // Partial update; `None` fields are left untouched.
    async fn update_user(
        &self,
        id: Uuid,
        patch: UpdateUserRequest,
    ) -> Result<Option<User>, AppError>;
    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError>;

    // --- Confirmation codes ---
    // Replaces any pending digest, invalidating the code it belonged to.
    async fn set_confirmation_digest(&self, user_id: Uuid, digest: &str) -> Result<(), AppError>;
    /// Compare-and-clear in one step: true only if `digest` was the pending one.
    async fn consume_confirmation_digest(
        &self,
        user_id: Uuid,
        digest: &str,
    ) -> Result<bool, AppError>;

    // --- Categories & Genres ---
    // Ordered by name. Categories match `search` as a substring, genres exactly (both
    // case-insensitive).
    async fn list_catalog(
        &self,
        kind: CatalogKind,
        search: Option<String>,
        page: PageRequest,
    ) -> Result<(Vec<CatalogItem>, i64), AppError>;
    async fn create_catalog(
        &self,
        kind: CatalogKind,
        name: String,
        slug: String,
    ) -> Result<CatalogItem, AppError>;
    async fn delete_catalog(&self, kind: CatalogKind, slug: &str) -> Result<bool, AppError>;
    /// Inserts every row or none of them. Returns the number of rows written.
    async fn import_catalog(&self, kind: CatalogKind, rows: Vec<CatalogRow>)
    -> Result<u64, AppError>;

    // --- Titles ---
    async fn list_titles(
        &self,
        filter: &TitleFilter,
        page: PageRequest,
    ) -> Result<(Vec<TitleResponse>, i64), AppError>;
    async fn get_title(&self, id: i64) -> Result<Option<TitleResponse>, AppError>;
    // Unknown category/genre slugs are field errors.
    async fn create_title(&self, title: TitleWrite) -> Result<TitleResponse, AppError>;
    async fn update_title(
        &self,
        id: i64,
        patch: UpdateTitleRequest,
    ) -> Result<Option<TitleResponse>, AppError>;
    async fn delete_title(&self, id: i64) -> Result<bool, AppError>;

    // --- Reviews ---
    async fn list_reviews(
        &self,
        title_id: i64,
        page: PageRequest,
    ) -> Result<(Vec<Review>, i64), AppError>;
    async fn get_review(&self, title_id: i64, review_id: i64) -> Result<Option<Review>, AppError>;
    async fn create_review(
        &self,
        title_id: i64,
        author_id: Uuid,
        review: CreateReviewRequest,
    ) -> Result<Review, AppError>;
    async fn update_review(
        &self,
        review_id: i64,
        patch: UpdateReviewRequest,
    ) -> Result<Option<Review>, AppError>;
    async fn delete_review(&self, review_id: i64) -> Result<bool, AppError>;

    // --- Comments ---
    async fn list_comments(
        &self,
        review_id: i64,
        page: PageRequest,
    ) -> Result<(Vec<Comment>, i64), AppError>;
    async fn get_comment(&self, review_id: i64, comment_id: i64)
    -> Result<Option<Comment>, AppError>;
    async fn create_comment(
        &self,
        review_id: i64,
        author_id: Uuid,
        text: String,
    ) -> Result<Comment, AppError>;
    async fn update_comment(
        &self,
        comment_id: i64,
        patch: UpdateCommentRequest,
    ) -> Result<Option<Comment>, AppError>;
    async fn delete_comment(&self, comment_id: i64) -> Result<bool, AppError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;
