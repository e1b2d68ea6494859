use crate::{AppState, handlers::auth};
use axum::{Router, routing::post};

/// Auth Router Module
///
/// The two steps of the confirmation-code flow. Neither route needs credentials.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        // POST /auth/signup
        // Creates the account on first use and mails a fresh confirmation code.
        .route("/auth/signup", post(auth::signup))
        // POST /auth/token
        // Trades a confirmation code for a bearer token. Each code works once.
        .route("/auth/token", post(auth::obtain_token))
}
