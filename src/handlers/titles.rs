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
    models::{
        CreateTitleRequest, Page, TitleFilter, TitleResponse, TitleWrite, UpdateTitleRequest,
        check_description, check_year,
    },
    permissions::{Action, Resource, authorize},
};

/// Payload validation plus the year bound, reported together.
fn validate_with_year(payload: &impl Validate, year: Option<i32>) -> Result<(), AppError> {
    year_errors(payload, year).into_result()
}

fn year_errors(payload: &impl Validate, year: Option<i32>) -> FieldErrors {
    let mut errors = match payload.validate() {
        Ok(()) => FieldErrors::new(),
        Err(e) => e.into(),
    };
    if let Some(year) = year {
        check_year(year, &mut errors);
    }
    errors
}

/// list_titles
///
/// [Public Route] Lists titles by id. Filters combine with AND: `genre` and `category` are
/// slugs, `name` matches any part of the name ignoring case, `year` is exact.
#[utoipa::path(
    get,
    path = "/api/v1/titles",
    params(TitleFilter),
    responses((status = 200, description = "Titles", body = Page<TitleResponse>))
)]
pub async fn list_titles(
    State(state): State<AppState>,
    Query(filter): Query<TitleFilter>,
) -> Result<Json<Page<TitleResponse>>, AppError> {
    let req = page_request(&state, filter.page);
    let rows = state.repo.list_titles(&filter, req).await?;
    Ok(Json(paginate(rows, req)))
}

#[utoipa::path(
    get,
    path = "/api/v1/titles/{title_id}",
    params(("title_id" = i64, Path, description = "Title ID")),
    responses(
        (status = 200, description = "Found", body = TitleResponse),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_title(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<TitleResponse>, AppError> {
    state
        .repo
        .get_title(id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Title"))
}

/// create_title
///
/// [Admin Route] Takes the category as a slug and genres as a list of slugs, and answers
/// with the read representation (expanded category and genres, `rating: null`).
#[utoipa::path(
    post,
    path = "/api/v1/titles",
    request_body = CreateTitleRequest,
    responses(
        (status = 201, description = "Created", body = TitleResponse),
        (status = 400, description = "Invalid field or unknown slug")
    )
)]
pub async fn create_title(
    actor: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateTitleRequest>,
) -> Result<(StatusCode, Json<TitleResponse>), AppError> {
    authorize(Some(&actor), Action::Create, Resource::Title)?;
    validate_with_year(&payload, Some(payload.year))?;

    let title = state
        .repo
        .create_title(TitleWrite {
            name: payload.name,
            year: payload.year,
            description: payload.description,
            category: payload.category,
            genre: payload.genre,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(title)))
}

/// update_title
///
/// [Admin Route] Partial update. A `genre` list replaces the current genres, and `null` for
/// `category` or `description` clears that field.
#[utoipa::path(
    patch,
    path = "/api/v1/titles/{title_id}",
    params(("title_id" = i64, Path, description = "Title ID")),
    request_body = UpdateTitleRequest,
    responses(
        (status = 200, description = "Updated", body = TitleResponse),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_title(
    actor: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateTitleRequest>,
) -> Result<Json<TitleResponse>, AppError> {
    authorize(Some(&actor), Action::Update, Resource::Title)?;
    let mut errors = year_errors(&payload, payload.year);
    check_description(
        payload.description.as_ref().and_then(|text| text.as_deref()),
        &mut errors,
    );
    errors.into_result()?;

    state
        .repo
        .update_title(id, payload)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Title"))
}

/// delete_title
///
/// [Admin Route] Removes the title with all of its reviews and their comments.
#[utoipa::path(
    delete,
    path = "/api/v1/titles/{title_id}",
    params(("title_id" = i64, Path, description = "Title ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_title(
    actor: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    authorize(Some(&actor), Action::Delete, Resource::Title)?;
    if state.repo.delete_title(id).await? {
        tracing::info!(title_id = id, "Title deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Title"))
    }
}
