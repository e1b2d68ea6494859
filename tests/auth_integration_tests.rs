mod common;

use axum::{
    extract::FromRequestParts,
    http::{Method, Request, StatusCode, Uri, header, request::Parts},
};
use common::TestApp;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::json;
use std::{sync::Arc, time::SystemTime};
use uuid::Uuid;
use yamdb_api::{
    AppError, AppState, InMemoryRepository, MockMailer,
    auth::{AuthUser, Claims, confirmation_digest},
    config::{AppConfig, Env},
    models::{NewUser, Role, User},
    repository::Repository,
};

const TEST_JWT_SECRET: &str = "super-secure-test-secret-value";

fn now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

fn create_token(secret: &str, user_id: Uuid, iat: u64, exp: u64) -> String {
    let claims = Claims {
        sub: user_id,
        iat: iat as usize,
        exp: exp as usize,
    };
    let key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), &claims, &key).unwrap()
}

fn test_config(env: Env) -> AppConfig {
    AppConfig {
        env,
        jwt_secret: TEST_JWT_SECRET.to_string(),
        ..AppConfig::default()
    }
}

async fn create_app_state(env: Env) -> (AppState, User) {
    let repo = Arc::new(InMemoryRepository::new());
    let user = repo
        .create_user(NewUser {
            username: "tester".to_string(),
            email: "tester@example.com".to_string(),
            role: Role::Moderator,
            ..NewUser::default()
        })
        .await
        .unwrap();
    let state = AppState {
        repo,
        mailer: Arc::new(MockMailer::new()),
        config: test_config(env),
    };
    (state, user)
}

/// Helper to get the mutable Parts struct from a generated Request
fn get_request_parts(method: Method, uri: Uri) -> Parts {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let (parts, _) = request.into_parts();
    parts
}

fn with_bearer(token: &str) -> Parts {
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
    );
    parts
}

// --- Extractor ---

#[tokio::test]
async fn test_auth_success_with_valid_jwt() {
    let (state, user) = create_app_state(Env::Production).await;
    let token = create_token(TEST_JWT_SECRET, user.id, now(), now() + 3600);

    let auth_user = AuthUser::from_request_parts(&mut with_bearer(&token), &state)
        .await
        .expect("valid token accepted");

    assert_eq!(auth_user.id, user.id);
    assert_eq!(auth_user.username, "tester");
    assert_eq!(auth_user.role, Role::Moderator);
}

#[tokio::test]
async fn test_auth_failure_with_missing_header() {
    let (state, _) = create_app_state(Env::Production).await;
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());

    let result = AuthUser::from_request_parts(&mut parts, &state).await;
    assert!(matches!(result, Err(AppError::Unauthorized)));
}

#[tokio::test]
async fn test_auth_failure_with_expired_jwt() {
    let (state, user) = create_app_state(Env::Production).await;
    let issued = now() - 7200;
    let token = create_token(TEST_JWT_SECRET, user.id, issued, issued + 60);

    let result = AuthUser::from_request_parts(&mut with_bearer(&token), &state).await;
    assert!(matches!(result, Err(AppError::Unauthorized)));
}

#[tokio::test]
async fn test_auth_failure_with_foreign_signature() {
    let (state, user) = create_app_state(Env::Production).await;
    let token = create_token("some-other-secret", user.id, now(), now() + 3600);

    let result = AuthUser::from_request_parts(&mut with_bearer(&token), &state).await;
    assert!(matches!(result, Err(AppError::Unauthorized)));
}

#[tokio::test]
async fn test_auth_failure_for_unknown_subject() {
    let (state, _) = create_app_state(Env::Production).await;
    let token = create_token(TEST_JWT_SECRET, Uuid::new_v4(), now(), now() + 3600);

    let result = AuthUser::from_request_parts(&mut with_bearer(&token), &state).await;
    assert!(matches!(result, Err(AppError::Unauthorized)));
}

#[tokio::test]
async fn test_local_bypass_success() {
    let (state, user) = create_app_state(Env::Local).await;
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        "x-user-id",
        header::HeaderValue::from_str(&user.id.to_string()).unwrap(),
    );

    let auth_user = AuthUser::from_request_parts(&mut parts, &state)
        .await
        .expect("bypass accepted locally");
    assert_eq!(auth_user.id, user.id);
}

#[tokio::test]
async fn test_local_bypass_disabled_in_prod() {
    let (state, user) = create_app_state(Env::Production).await;
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        "x-user-id",
        header::HeaderValue::from_str(&user.id.to_string()).unwrap(),
    );

    let result = AuthUser::from_request_parts(&mut parts, &state).await;
    assert!(matches!(result, Err(AppError::Unauthorized)));
}

// --- Signup and token exchange ---

#[tokio::test]
async fn test_signup_then_exchange_issues_working_token() {
    let app = TestApp::new();

    let (status, body) = app
        .post(
            "/api/v1/auth/signup",
            None,
            json!({"username": "newcomer", "email": "newcomer@example.com"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"username": "newcomer", "email": "newcomer@example.com"})
    );

    let created = app
        .repo
        .get_user_by_username("newcomer")
        .await
        .unwrap()
        .expect("user created by signup");
    assert_eq!(created.role, Role::User);

    let code = app.mailer.last_code_for("newcomer").expect("code mailed");
    assert_eq!(code.len(), 24);
    // Only the digest is stored.
    assert_ne!(created.confirmation_digest.as_deref(), Some(code.as_str()));

    let (status, body) = app
        .post(
            "/api/v1/auth/token",
            None,
            json!({"username": "newcomer", "confirmation_code": code}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().expect("token string").to_string();

    let (status, me) = app.get("/api/v1/users/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "newcomer@example.com");
}

#[tokio::test]
async fn test_confirmation_code_is_single_use() {
    let app = TestApp::new();
    let signup = json!({"username": "once", "email": "once@example.com"});
    app.post("/api/v1/auth/signup", None, signup).await;
    let code = app.mailer.last_code_for("once").unwrap();
    let exchange = json!({"username": "once", "confirmation_code": code});

    let (status, _) = app.post("/api/v1/auth/token", None, exchange.clone()).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.post("/api/v1/auth/token", None, exchange).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({"confirmation_code": ["Invalid confirmation code."]})
    );
}

#[tokio::test]
async fn test_reissued_code_invalidates_previous() {
    let app = TestApp::new();
    let signup = json!({"username": "twice", "email": "twice@example.com"});

    app.post("/api/v1/auth/signup", None, signup.clone()).await;
    let first = app.mailer.last_code_for("twice").unwrap();
    let (status, _) = app.post("/api/v1/auth/signup", None, signup).await;
    assert_eq!(status, StatusCode::OK);
    let second = app.mailer.last_code_for("twice").unwrap();
    assert_ne!(first, second);
    assert_eq!(app.mailer.sent().len(), 2);

    let (status, _) = app
        .post(
            "/api/v1/auth/token",
            None,
            json!({"username": "twice", "confirmation_code": first}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/v1/auth/token",
            None,
            json!({"username": "twice", "confirmation_code": second}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_username_looks_like_wrong_code() {
    let app = TestApp::new();
    app.post(
        "/api/v1/auth/signup",
        None,
        json!({"username": "known", "email": "known@example.com"}),
    )
    .await;

    let (status_unknown, body_unknown) = app
        .post(
            "/api/v1/auth/token",
            None,
            json!({"username": "ghost", "confirmation_code": "AAAAAAAAAAAAAAAAAAAAAAAA"}),
        )
        .await;
    let (status_wrong, body_wrong) = app
        .post(
            "/api/v1/auth/token",
            None,
            json!({"username": "known", "confirmation_code": "AAAAAAAAAAAAAAAAAAAAAAAA"}),
        )
        .await;

    assert_eq!(status_unknown, StatusCode::BAD_REQUEST);
    assert_eq!(status_wrong, StatusCode::BAD_REQUEST);
    assert_eq!(body_unknown, body_wrong);

    // The failed attempt did not burn the real code.
    let code = app.mailer.last_code_for("known").unwrap();
    let (status, _) = app
        .post(
            "/api/v1/auth/token",
            None,
            json!({"username": "known", "confirmation_code": code}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_signup_conflicting_identity() {
    let app = TestApp::new();
    app.seed_user("taken", Role::User).await;

    // Known username, different email.
    let (status, body) = app
        .post(
            "/api/v1/auth/signup",
            None,
            json!({"username": "taken", "email": "someone@example.com"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["username"].is_array());
    assert!(body.get("email").is_none());

    // Known email, different username.
    let (status, body) = app
        .post(
            "/api/v1/auth/signup",
            None,
            json!({"username": "fresh", "email": "taken@example.com"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["email"].is_array());

    assert!(app.mailer.sent().is_empty());
}

#[tokio::test]
async fn test_signup_for_admin_created_account() {
    let app = TestApp::new();
    let user = app.seed_user("preloaded", Role::Moderator).await;

    let (status, _) = app
        .post(
            "/api/v1/auth/signup",
            None,
            json!({"username": "preloaded", "email": "preloaded@example.com"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let stored = app.repo.get_user(user.id).await.unwrap().unwrap();
    assert_eq!(stored.role, Role::Moderator);
    let code = app.mailer.last_code_for("preloaded").unwrap();
    assert_eq!(
        stored.confirmation_digest,
        Some(confirmation_digest(&app.config.jwt_secret, user.id, &code))
    );
}

#[tokio::test]
async fn test_signup_validation() {
    let app = TestApp::new();
    let (status, body) = app
        .post(
            "/api/v1/auth/signup",
            None,
            json!({"username": "bad name!", "email": "not-an-email"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["username"].is_array());
    assert!(body["email"].is_array());
}

#[tokio::test]
async fn test_mailer_failure_is_server_error() {
    let app = TestApp::with(AppConfig::default(), MockMailer::new_failing());
    let (status, body) = app
        .post(
            "/api/v1/auth/signup",
            None,
            json!({"username": "unlucky", "email": "unlucky@example.com"}),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["detail"], "Internal server error.");
}
