//! Categories and genres. Both are `{name, slug}` records addressed by slug, so the
//! per-resource handlers below are thin wrappers over one set of generic operations.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use validator::Validate;

use super::{page_request, paginate};
use crate::{
    AppState,
    auth::AuthUser,
    errors::{AppError, FieldErrors},
    models::{CatalogItem, CatalogKind, CreateCatalogRequest, Page, SearchParams},
    permissions::{Action, Resource, authorize},
};

fn resource(kind: CatalogKind) -> Resource {
    match kind {
        CatalogKind::Category => Resource::Category,
        CatalogKind::Genre => Resource::Genre,
    }
}

async fn list(
    kind: CatalogKind,
    state: AppState,
    params: SearchParams,
) -> Result<Json<Page<CatalogItem>>, AppError> {
    let req = page_request(&state, params.page);
    let rows = state.repo.list_catalog(kind, params.search, req).await?;
    Ok(Json(paginate(rows, req)))
}

async fn create(
    kind: CatalogKind,
    actor: AuthUser,
    state: AppState,
    payload: CreateCatalogRequest,
) -> Result<(StatusCode, Json<CatalogItem>), AppError> {
    authorize(Some(&actor), Action::Create, resource(kind))?;

    let mut errors = match payload.validate() {
        Ok(()) => FieldErrors::new(),
        Err(e) => e.into(),
    };
    let max = kind.name_max_len();
    if payload.name.chars().count() > max {
        errors.add("name", format!("Ensure this field has no more than {max} characters."));
    }
    errors.into_result()?;

    let item = state
        .repo
        .create_catalog(kind, payload.name, payload.slug)
        .await?;
    tracing::info!(kind = kind.label(), slug = %item.slug, "Catalog entry created");
    Ok((StatusCode::CREATED, Json(item)))
}

async fn delete(
    kind: CatalogKind,
    actor: AuthUser,
    state: AppState,
    slug: String,
) -> Result<StatusCode, AppError> {
    authorize(Some(&actor), Action::Delete, resource(kind))?;
    if state.repo.delete_catalog(kind, &slug).await? {
        tracing::info!(kind = kind.label(), %slug, "Catalog entry deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(kind.label()))
    }
}

// --- Categories ---

/// list_categories
///
/// [Public Route] `?search=` matches any part of the name, ignoring case.
#[utoipa::path(
    get,
    path = "/api/v1/categories",
    params(SearchParams),
    responses((status = 200, description = "Categories", body = Page<CatalogItem>))
)]
pub async fn list_categories(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Page<CatalogItem>>, AppError> {
    list(CatalogKind::Category, state, params).await
}

#[utoipa::path(
    post,
    path = "/api/v1/categories",
    request_body = CreateCatalogRequest,
    responses(
        (status = 201, description = "Created", body = CatalogItem),
        (status = 400, description = "Invalid name or slug")
    )
)]
pub async fn create_category(
    actor: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateCatalogRequest>,
) -> Result<(StatusCode, Json<CatalogItem>), AppError> {
    create(CatalogKind::Category, actor, state, payload).await
}

/// delete_category
///
/// [Admin Route] Titles in the category keep existing with no category.
#[utoipa::path(
    delete,
    path = "/api/v1/categories/{slug}",
    params(("slug" = String, Path, description = "Category slug")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_category(
    actor: AuthUser,
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<StatusCode, AppError> {
    delete(CatalogKind::Category, actor, state, slug).await
}

// --- Genres ---

/// list_genres
///
/// [Public Route] `?search=` must equal the whole name, ignoring case.
#[utoipa::path(
    get,
    path = "/api/v1/genres",
    params(SearchParams),
    responses((status = 200, description = "Genres", body = Page<CatalogItem>))
)]
pub async fn list_genres(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Page<CatalogItem>>, AppError> {
    list(CatalogKind::Genre, state, params).await
}

#[utoipa::path(
    post,
    path = "/api/v1/genres",
    request_body = CreateCatalogRequest,
    responses(
        (status = 201, description = "Created", body = CatalogItem),
        (status = 400, description = "Invalid name or slug")
    )
)]
pub async fn create_genre(
    actor: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateCatalogRequest>,
) -> Result<(StatusCode, Json<CatalogItem>), AppError> {
    create(CatalogKind::Genre, actor, state, payload).await
}

/// delete_genre
///
/// [Admin Route] The genre is unlinked from every title.
#[utoipa::path(
    delete,
    path = "/api/v1/genres/{slug}",
    params(("slug" = String, Path, description = "Genre slug")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_genre(
    actor: AuthUser,
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<StatusCode, AppError> {
    delete(CatalogKind::Genre, actor, state, slug).await
}
