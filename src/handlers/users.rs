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
    models::{CreateUserRequest, NewUser, Page, SearchParams, UpdateUserRequest, User},
    permissions::{Action, Resource, authorize},
};

async fn find_by_username(state: &AppState, username: &str) -> Result<User, AppError> {
    state
        .repo
        .get_user_by_username(username)
        .await?
        .ok_or(AppError::NotFound("User"))
}

/// list_users
///
/// [Admin Route] Lists users ordered by username. `?search=` matches part of the username.
#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(SearchParams),
    responses(
        (status = 200, description = "Users", body = Page<User>),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn list_users(
    actor: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Page<User>>, AppError> {
    authorize(Some(&actor), Action::Read, Resource::Users)?;
    let req = page_request(&state, params.page);
    let rows = state.repo.list_users(params.search, req).await?;
    Ok(Json(paginate(rows, req)))
}

/// create_user
///
/// [Admin Route] Creates an account directly. No confirmation code is sent; the user obtains
/// one later through signup with the same username and email.
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUserRequest,
    responses((status = 201, description = "Created", body = User))
)]
pub async fn create_user(
    actor: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    authorize(Some(&actor), Action::Create, Resource::Users)?;
    payload.validate()?;

    let user = state
        .repo
        .create_user(NewUser {
            username: payload.username,
            email: payload.email,
            first_name: payload.first_name,
            last_name: payload.last_name,
            bio: payload.bio,
            role: payload.role.unwrap_or_default(),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// get_me
///
/// [Authenticated Route] The caller's own profile.
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses((status = 200, description = "Profile", body = User))
)]
pub async fn get_me(actor: AuthUser, State(state): State<AppState>) -> Result<Json<User>, AppError> {
    authorize(Some(&actor), Action::Read, Resource::OwnProfile)?;
    let user = state
        .repo
        .get_user(actor.id)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    Ok(Json(user))
}

/// update_me
///
/// [Authenticated Route] Partial update of the caller's own profile. `role` is read-only
/// here and silently dropped.
#[utoipa::path(
    patch,
    path = "/api/v1/users/me",
    request_body = UpdateUserRequest,
    responses((status = 200, description = "Updated", body = User))
)]
pub async fn update_me(
    actor: AuthUser,
    State(state): State<AppState>,
    Json(mut payload): Json<UpdateUserRequest>,
) -> Result<Json<User>, AppError> {
    authorize(Some(&actor), Action::Update, Resource::OwnProfile)?;
    payload.role = None;
    payload.validate()?;

    let user = state
        .repo
        .update_user(actor.id, payload)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    Ok(Json(user))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{username}",
    params(("username" = String, Path, description = "Username")),
    responses((status = 200, description = "Found", body = User))
)]
pub async fn get_user(
    actor: AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<User>, AppError> {
    authorize(Some(&actor), Action::Read, Resource::Users)?;
    Ok(Json(find_by_username(&state, &username).await?))
}

/// update_user
///
/// [Admin Route] Partial update of any account, role included.
#[utoipa::path(
    patch,
    path = "/api/v1/users/{username}",
    params(("username" = String, Path, description = "Username")),
    request_body = UpdateUserRequest,
    responses((status = 200, description = "Updated", body = User))
)]
pub async fn update_user(
    actor: AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<User>, AppError> {
    authorize(Some(&actor), Action::Update, Resource::Users)?;
    payload.validate()?;

    let target = find_by_username(&state, &username).await?;
    let user = state
        .repo
        .update_user(target.id, payload)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    tracing::info!(username = %user.username, role = %user.role, "User updated by admin");
    Ok(Json(user))
}

/// delete_user
///
/// [Admin Route] Removes the account together with its reviews and comments.
#[utoipa::path(
    delete,
    path = "/api/v1/users/{username}",
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_user(
    actor: AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<StatusCode, AppError> {
    authorize(Some(&actor), Action::Delete, Resource::Users)?;
    let target = find_by_username(&state, &username).await?;
    if state.repo.delete_user(target.id).await? {
        tracing::info!(%username, "User deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("User"))
    }
}
