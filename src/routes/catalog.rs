use crate::{AppState, handlers::catalog};
use axum::{
    Router,
    routing::{delete, get},
};

/// Catalog Router Module
///
/// Listing is public, writes are admin-only. Entries are addressed by slug.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        // GET /categories?search=...&page=...
        .route(
            "/categories",
            get(catalog::list_categories).post(catalog::create_category),
        )
        .route("/categories/{slug}", delete(catalog::delete_category))
        // GET /genres?search=...&page=...
        // Genre search is an exact (case-insensitive) name match.
        .route(
            "/genres",
            get(catalog::list_genres).post(catalog::create_genre),
        )
        .route("/genres/{slug}", delete(catalog::delete_genre))
}
