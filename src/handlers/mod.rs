//! HTTP handlers, one module per resource.
//!
//! Every handler validates its payload, asks [`crate::permissions::authorize`] for a decision
//! and only then talks to the repository. Errors are returned as [`crate::errors::AppError`].

pub mod auth;
pub mod catalog;
pub mod reviews;
pub mod titles;
pub mod users;

use crate::{
    AppState,
    models::{Page, PageRequest},
};

/// Resolves a requested page number against the configured page size.
pub(crate) fn page_request(state: &AppState, page: Option<u32>) -> PageRequest {
    PageRequest::new(page, state.config.page_size)
}

/// Wraps a repository `(rows, total)` pair in the list envelope.
pub(crate) fn paginate<T>((results, count): (Vec<T>, i64), req: PageRequest) -> Page<T> {
    Page::new(results, count, req)
}
