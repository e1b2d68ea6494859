//! Reviews of a title and comments on a review.
//!
//! Every route is nested under its parents, and the parents are checked on each request:
//! a review must belong to the title in the path, a comment to the review. A missing or
//! mismatched parent is a 404.

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
    errors::AppError,
    models::{
        Comment, CreateCommentRequest, CreateReviewRequest, Page, PageParams, Review,
        UpdateCommentRequest, UpdateReviewRequest,
    },
    permissions::{Action, Resource, authorize},
};

async fn ensure_title(state: &AppState, title_id: i64) -> Result<(), AppError> {
    match state.repo.get_title(title_id).await? {
        Some(_) => Ok(()),
        None => Err(AppError::NotFound("Title")),
    }
}

async fn find_review(state: &AppState, title_id: i64, review_id: i64) -> Result<Review, AppError> {
    state
        .repo
        .get_review(title_id, review_id)
        .await?
        .ok_or(AppError::NotFound("Review"))
}

async fn find_comment(
    state: &AppState,
    title_id: i64,
    review_id: i64,
    comment_id: i64,
) -> Result<Comment, AppError> {
    find_review(state, title_id, review_id).await?;
    state
        .repo
        .get_comment(review_id, comment_id)
        .await?
        .ok_or(AppError::NotFound("Comment"))
}

// --- Reviews ---

/// list_reviews
///
/// [Public Route] Newest first.
#[utoipa::path(
    get,
    path = "/api/v1/titles/{title_id}/reviews",
    params(("title_id" = i64, Path, description = "Title ID"), PageParams),
    responses(
        (status = 200, description = "Reviews", body = Page<Review>),
        (status = 404, description = "Title not found")
    )
)]
pub async fn list_reviews(
    State(state): State<AppState>,
    Path(title_id): Path<i64>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<Review>>, AppError> {
    ensure_title(&state, title_id).await?;
    let req = page_request(&state, params.page);
    let rows = state.repo.list_reviews(title_id, req).await?;
    Ok(Json(paginate(rows, req)))
}

#[utoipa::path(
    get,
    path = "/api/v1/titles/{title_id}/reviews/{review_id}",
    params(
        ("title_id" = i64, Path, description = "Title ID"),
        ("review_id" = i64, Path, description = "Review ID")
    ),
    responses((status = 200, description = "Found", body = Review))
)]
pub async fn get_review(
    State(state): State<AppState>,
    Path((title_id, review_id)): Path<(i64, i64)>,
) -> Result<Json<Review>, AppError> {
    Ok(Json(find_review(&state, title_id, review_id).await?))
}

/// create_review
///
/// [Authenticated Route] One review per user and title; a second attempt is a 400 with a
/// `non_field_errors` message. The title's rating changes with it.
#[utoipa::path(
    post,
    path = "/api/v1/titles/{title_id}/reviews",
    params(("title_id" = i64, Path, description = "Title ID")),
    request_body = CreateReviewRequest,
    responses(
        (status = 201, description = "Created", body = Review),
        (status = 400, description = "Invalid score or duplicate review"),
        (status = 404, description = "Title not found")
    )
)]
pub async fn create_review(
    actor: AuthUser,
    State(state): State<AppState>,
    Path(title_id): Path<i64>,
    Json(payload): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Review>), AppError> {
    authorize(
        Some(&actor),
        Action::Create,
        Resource::Review { author_id: None },
    )?;
    payload.validate()?;
    ensure_title(&state, title_id).await?;

    let review = state
        .repo
        .create_review(title_id, actor.id, payload)
        .await?;
    tracing::info!(title_id, review_id = review.id, author = %actor.username, "Review created");
    Ok((StatusCode::CREATED, Json(review)))
}

/// update_review
///
/// [Author, Moderator or Admin] Partial update of text and/or score.
#[utoipa::path(
    patch,
    path = "/api/v1/titles/{title_id}/reviews/{review_id}",
    params(
        ("title_id" = i64, Path, description = "Title ID"),
        ("review_id" = i64, Path, description = "Review ID")
    ),
    request_body = UpdateReviewRequest,
    responses(
        (status = 200, description = "Updated", body = Review),
        (status = 403, description = "Not the author")
    )
)]
pub async fn update_review(
    actor: AuthUser,
    State(state): State<AppState>,
    Path((title_id, review_id)): Path<(i64, i64)>,
    Json(payload): Json<UpdateReviewRequest>,
) -> Result<Json<Review>, AppError> {
    let review = find_review(&state, title_id, review_id).await?;
    authorize(
        Some(&actor),
        Action::Update,
        Resource::Review {
            author_id: Some(review.author_id),
        },
    )?;
    payload.validate()?;

    state
        .repo
        .update_review(review.id, payload)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Review"))
}

#[utoipa::path(
    delete,
    path = "/api/v1/titles/{title_id}/reviews/{review_id}",
    params(
        ("title_id" = i64, Path, description = "Title ID"),
        ("review_id" = i64, Path, description = "Review ID")
    ),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not the author")
    )
)]
pub async fn delete_review(
    actor: AuthUser,
    State(state): State<AppState>,
    Path((title_id, review_id)): Path<(i64, i64)>,
) -> Result<StatusCode, AppError> {
    let review = find_review(&state, title_id, review_id).await?;
    authorize(
        Some(&actor),
        Action::Delete,
        Resource::Review {
            author_id: Some(review.author_id),
        },
    )?;
    if state.repo.delete_review(review.id).await? {
        tracing::info!(title_id, review_id, by = %actor.username, "Review deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Review"))
    }
}

// --- Comments ---

#[utoipa::path(
    get,
    path = "/api/v1/titles/{title_id}/reviews/{review_id}/comments",
    params(
        ("title_id" = i64, Path, description = "Title ID"),
        ("review_id" = i64, Path, description = "Review ID"),
        PageParams
    ),
    responses(
        (status = 200, description = "Comments", body = Page<Comment>),
        (status = 404, description = "Review not found")
    )
)]
pub async fn list_comments(
    State(state): State<AppState>,
    Path((title_id, review_id)): Path<(i64, i64)>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<Comment>>, AppError> {
    find_review(&state, title_id, review_id).await?;
    let req = page_request(&state, params.page);
    let rows = state.repo.list_comments(review_id, req).await?;
    Ok(Json(paginate(rows, req)))
}

#[utoipa::path(
    get,
    path = "/api/v1/titles/{title_id}/reviews/{review_id}/comments/{comment_id}",
    params(
        ("title_id" = i64, Path, description = "Title ID"),
        ("review_id" = i64, Path, description = "Review ID"),
        ("comment_id" = i64, Path, description = "Comment ID")
    ),
    responses((status = 200, description = "Found", body = Comment))
)]
pub async fn get_comment(
    State(state): State<AppState>,
    Path((title_id, review_id, comment_id)): Path<(i64, i64, i64)>,
) -> Result<Json<Comment>, AppError> {
    Ok(Json(
        find_comment(&state, title_id, review_id, comment_id).await?,
    ))
}

/// create_comment
///
/// [Authenticated Route] A review id that does not exist under the title is a 404.
#[utoipa::path(
    post,
    path = "/api/v1/titles/{title_id}/reviews/{review_id}/comments",
    params(
        ("title_id" = i64, Path, description = "Title ID"),
        ("review_id" = i64, Path, description = "Review ID")
    ),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Created", body = Comment),
        (status = 404, description = "Review not found")
    )
)]
pub async fn create_comment(
    actor: AuthUser,
    State(state): State<AppState>,
    Path((title_id, review_id)): Path<(i64, i64)>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>), AppError> {
    authorize(
        Some(&actor),
        Action::Create,
        Resource::Comment { author_id: None },
    )?;
    payload.validate()?;
    find_review(&state, title_id, review_id).await?;

    let comment = state
        .repo
        .create_comment(review_id, actor.id, payload.text)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/titles/{title_id}/reviews/{review_id}/comments/{comment_id}",
    params(
        ("title_id" = i64, Path, description = "Title ID"),
        ("review_id" = i64, Path, description = "Review ID"),
        ("comment_id" = i64, Path, description = "Comment ID")
    ),
    request_body = UpdateCommentRequest,
    responses(
        (status = 200, description = "Updated", body = Comment),
        (status = 403, description = "Not the author")
    )
)]
pub async fn update_comment(
    actor: AuthUser,
    State(state): State<AppState>,
    Path((title_id, review_id, comment_id)): Path<(i64, i64, i64)>,
    Json(payload): Json<UpdateCommentRequest>,
) -> Result<Json<Comment>, AppError> {
    let comment = find_comment(&state, title_id, review_id, comment_id).await?;
    authorize(
        Some(&actor),
        Action::Update,
        Resource::Comment {
            author_id: Some(comment.author_id),
        },
    )?;
    payload.validate()?;

    state
        .repo
        .update_comment(comment.id, payload)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Comment"))
}

#[utoipa::path(
    delete,
    path = "/api/v1/titles/{title_id}/reviews/{review_id}/comments/{comment_id}",
    params(
        ("title_id" = i64, Path, description = "Title ID"),
        ("review_id" = i64, Path, description = "Review ID"),
        ("comment_id" = i64, Path, description = "Comment ID")
    ),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not the author")
    )
)]
pub async fn delete_comment(
    actor: AuthUser,
    State(state): State<AppState>,
    Path((title_id, review_id, comment_id)): Path<(i64, i64, i64)>,
) -> Result<StatusCode, AppError> {
    let comment = find_comment(&state, title_id, review_id, comment_id).await?;
    authorize(
        Some(&actor),
        Action::Delete,
        Resource::Comment {
            author_id: Some(comment.author_id),
        },
    )?;
    if state.repo.delete_comment(comment.id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Comment"))
    }
}
