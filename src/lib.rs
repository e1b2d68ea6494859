use axum::{Router, extract::FromRef, http::HeaderName, routing::get};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod import;
pub mod mailer;
pub mod models;
pub mod permissions;
pub mod repository;

// Routers, one per resource family.
pub mod routes;
use routes::{auth as auth_routes, catalog, titles, users};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use errors::AppError;
pub use mailer::{LogMailer, MailerState, MockMailer};
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// OpenAPI document for every `/api/v1` route, served at `/api-docs/openapi.json` and
/// rendered by the Swagger UI.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::signup, handlers::auth::obtain_token,
        handlers::users::list_users, handlers::users::create_user, handlers::users::get_me,
        handlers::users::update_me, handlers::users::get_user, handlers::users::update_user,
        handlers::users::delete_user,
        handlers::catalog::list_categories, handlers::catalog::create_category,
        handlers::catalog::delete_category, handlers::catalog::list_genres,
        handlers::catalog::create_genre, handlers::catalog::delete_genre,
        handlers::titles::list_titles, handlers::titles::get_title,
        handlers::titles::create_title, handlers::titles::update_title,
        handlers::titles::delete_title,
        handlers::reviews::list_reviews, handlers::reviews::get_review,
        handlers::reviews::create_review, handlers::reviews::update_review,
        handlers::reviews::delete_review, handlers::reviews::list_comments,
        handlers::reviews::get_comment, handlers::reviews::create_comment,
        handlers::reviews::update_comment, handlers::reviews::delete_comment
    ),
    components(
        schemas(
            models::Role, models::User, models::CatalogItem, models::TitleResponse,
            models::Review, models::Comment, models::SignupRequest, models::TokenRequest,
            models::TokenResponse, models::CreateUserRequest, models::UpdateUserRequest,
            models::CreateCatalogRequest, models::CreateTitleRequest,
            models::UpdateTitleRequest, models::CreateReviewRequest,
            models::UpdateReviewRequest, models::CreateCommentRequest,
            models::UpdateCommentRequest,
        )
    ),
    tags(
        (name = "yamdb", description = "YaMDb reviews API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, cloneable container for everything a handler needs. Handlers take
/// `State<AppState>`; extractors pull individual parts through `FromRef`.
#[derive(Clone)]
pub struct AppState {
    /// Persistence behind the `Repository` trait (Postgres in production, in-memory in tests).
    pub repo: RepositoryState,
    /// Delivery of confirmation codes.
    pub mailer: MailerState,
    /// The loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for MailerState {
    fn from_ref(app_state: &AppState) -> MailerState {
        app_state.mailer.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the routing structure, applies the observability layers and registers the
/// application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Versioned API
    let api = Router::new()
        .merge(auth_routes::auth_routes())
        .merge(users::user_routes())
        .merge(catalog::catalog_routes())
        .merge(titles::title_routes());

    let base_router = Router::new()
        // Documentation: Serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // GET /health
        // Liveness probe for load balancers; touches nothing.
        .route("/health", get(|| async { "ok" }))
        .nest("/api/v1", api)
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation: a UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing: one span per request, carrying the request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation: echo x-request-id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Span factory for `TraceLayer`: method, URI and the `x-request-id` set by the layer
/// above, so every log line of a request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
