use axum::{Json, extract::State};
use validator::Validate;

use crate::{
    AppState,
    auth::{confirmation_digest, generate_confirmation_code, issue_access_token},
    errors::{AppError, EMAIL_TAKEN, FieldErrors, USERNAME_TAKEN},
    models::{NewUser, Role, SignupRequest, TokenRequest, TokenResponse, User},
};

const INVALID_CODE: &str = "Invalid confirmation code.";

fn invalid_code() -> AppError {
    AppError::field("confirmation_code", INVALID_CODE)
}

/// signup
///
/// [Public Route] Issues a confirmation code for `{username, email}`.
///
/// Proceeds when the username already belongs to this email (a repeat request re-issues the
/// code) or when neither the username nor the email is known (a new `user` account is
/// created). Any other combination is a conflicting identity and is rejected with a field
/// error naming the clashing field.
///
/// Only a digest of the code is stored. Storing a new digest invalidates any earlier code.
#[utoipa::path(
    post,
    path = "/api/v1/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 200, description = "Confirmation code sent", body = SignupRequest),
        (status = 400, description = "Invalid or conflicting identity")
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<Json<SignupRequest>, AppError> {
    payload.validate()?;

    let by_username = state.repo.get_user_by_username(&payload.username).await?;
    let by_email = state.repo.get_user_by_email(&payload.email).await?;

    let user: User = match (by_username, by_email) {
        (Some(existing), _) if existing.email == payload.email => existing,
        (None, None) => {
            state
                .repo
                .create_user(NewUser {
                    username: payload.username.clone(),
                    email: payload.email.clone(),
                    role: Role::User,
                    ..NewUser::default()
                })
                .await?
        }
        (by_username, by_email) => {
            let mut errors = FieldErrors::new();
            if by_username.is_some() {
                errors.add("username", USERNAME_TAKEN);
            }
            if by_email.is_some() {
                errors.add("email", EMAIL_TAKEN);
            }
            return Err(AppError::Validation(errors));
        }
    };

    let code = generate_confirmation_code();
    let digest = confirmation_digest(&state.config.jwt_secret, user.id, &code);
    state.repo.set_confirmation_digest(user.id, &digest).await?;
    state
        .mailer
        .send_confirmation_code(&user.email, &user.username, &code)
        .await?;

    tracing::info!(username = %user.username, "Confirmation code issued");
    Ok(Json(payload))
}

/// obtain_token
///
/// [Public Route] Exchanges a confirmation code for a bearer token.
///
/// The stored digest is compared and cleared in one step, so a code works exactly once.
/// Every failure, including an unknown username, produces the same 400 body.
#[utoipa::path(
    post,
    path = "/api/v1/auth/token",
    request_body = TokenRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 400, description = "Invalid confirmation code")
    )
)]
pub async fn obtain_token(
    State(state): State<AppState>,
    Json(payload): Json<TokenRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    payload.validate()?;

    let user = state
        .repo
        .get_user_by_username(&payload.username)
        .await?
        .ok_or_else(invalid_code)?;

    let digest = confirmation_digest(&state.config.jwt_secret, user.id, &payload.confirmation_code);
    if !state.repo.consume_confirmation_digest(user.id, &digest).await? {
        tracing::debug!(username = %user.username, "Confirmation code rejected");
        return Err(invalid_code());
    }

    let token = issue_access_token(&state.config, user.id)?;
    tracing::info!(username = %user.username, "Access token issued");
    Ok(Json(TokenResponse { token }))
}
