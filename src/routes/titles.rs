use crate::{
    AppState,
    handlers::{reviews, titles},
};
use axum::{Router, routing::get};

/// Titles Router Module
///
/// Titles and the reviews/comments nested beneath them. Reads are public. Title writes
/// are admin-only; review and comment writes need a signed-in user, and edits need the
/// author or a moderator.
pub fn title_routes() -> Router<AppState> {
    Router::new()
        // GET /titles?genre=...&category=...&name=...&year=...&page=...
        .route("/titles", get(titles::list_titles).post(titles::create_title))
        .route(
            "/titles/{title_id}",
            get(titles::get_title)
                .patch(titles::update_title)
                .delete(titles::delete_title),
        )
        // --- Reviews ---
        .route(
            "/titles/{title_id}/reviews",
            get(reviews::list_reviews).post(reviews::create_review),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}",
            get(reviews::get_review)
                .patch(reviews::update_review)
                .delete(reviews::delete_review),
        )
        // --- Comments ---
        .route(
            "/titles/{title_id}/reviews/{review_id}/comments",
            get(reviews::list_comments).post(reviews::create_comment),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}/comments/{comment_id}",
            get(reviews::get_comment)
                .patch(reviews::update_comment)
                .delete(reviews::delete_comment),
        )
}
