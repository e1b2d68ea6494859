use crate::{AppState, handlers::users};
use axum::{Router, routing::get};

/// Users Router Module
///
/// Everything here requires a bearer token. `/users/me` needs only that; the other routes
/// are for admins. The static `me` segment takes priority over `{username}`, which is why
/// "me" cannot be a username.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/me", get(users::get_me).patch(users::update_me))
        .route(
            "/users/{username}",
            get(users::get_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
}
