use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::{Rng, distributions::Alphanumeric};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    errors::AppError,
    models::{Role, User},
    repository::RepositoryState,
};

/// Length of the emailed confirmation code.
pub const CONFIRMATION_CODE_LEN: usize = 24;

/// Claims
///
/// Payload of the bearer tokens issued by `POST /auth/token`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user's id in the `users` table.
    pub sub: Uuid,
    /// Expiration Time (exp), seconds since the epoch.
    pub exp: usize,
    /// Issued At (iat), seconds since the epoch.
    pub iat: usize,
}

/// AuthUser
///
/// The resolved identity of an authenticated request. The role is read from storage on
/// every request, so role changes and deletions take effect before the token expires.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
    pub is_staff: bool,
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
            is_staff: user.is_staff,
        }
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// issue_access_token
///
/// Signs an HS256 token for `user_id`, valid for the configured lifetime.
pub fn issue_access_token(config: &AppConfig, user_id: Uuid) -> Result<String, AppError> {
    let now = now_secs();
    let claims = Claims {
        sub: user_id,
        iat: now as usize,
        exp: (now + config.access_token_ttl_secs) as usize,
    };
    let key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
    Ok(encode(&Header::default(), &claims, &key)?)
}

/// generate_confirmation_code
///
/// Random alphanumeric code mailed to the user. Only its digest is stored.
pub fn generate_confirmation_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CONFIRMATION_CODE_LEN)
        .map(char::from)
        .collect()
}

/// confirmation_digest
///
/// Keyed SHA-256 of a code, bound to the user it was issued for. The server secret is mixed
/// in so a leaked digest column cannot be replayed against another deployment.
pub fn confirmation_digest(secret: &str, user_id: Uuid, code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(b":");
    hasher.update(user_id.as_bytes());
    hasher.update(b":");
    hasher.update(code.trim().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// AuthUser Extractor Implementation
///
/// 1. Local bypass: in `Env::Local`, an `x-user-id` header naming an existing user is accepted.
/// 2. Bearer token extraction and HS256 validation (expiry enforced).
/// 3. Storage lookup of the token subject.
///
/// Rejection: `AppError::Unauthorized` (401) on any failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local {
            if let Some(user_id) = parts
                .headers
                .get("x-user-id")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| Uuid::parse_str(value).ok())
            {
                if let Some(user) = repo.get_user(user_id).await? {
                    return Ok(user.into());
                }
            }
        }

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(AppError::Unauthorized)?;

        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
            AppError::Unauthorized
        })?;

        let user = repo
            .get_user(token_data.claims.sub)
            .await?
            .ok_or(AppError::Unauthorized)?;

        Ok(user.into())
    }
}
