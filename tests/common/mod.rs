#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use serde_json::Value;
use std::sync::Arc;
use tower::util::ServiceExt;
use yamdb_api::{
    AppConfig, AppState, InMemoryRepository, MockMailer, create_router,
    auth::issue_access_token,
    mailer::MailerState,
    models::{NewUser, Role, User},
    repository::{Repository, RepositoryState},
};

/// Router wired to an in-memory repository and a recording mailer.
pub struct TestApp {
    pub router: Router,
    pub repo: Arc<InMemoryRepository>,
    pub mailer: MockMailer,
    pub config: AppConfig,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with(AppConfig::default(), MockMailer::new())
    }

    pub fn with(config: AppConfig, mailer: MockMailer) -> Self {
        let repo = Arc::new(InMemoryRepository::new());
        let state = AppState {
            repo: repo.clone() as RepositoryState,
            mailer: Arc::new(mailer.clone()) as MailerState,
            config: config.clone(),
        };
        Self {
            router: create_router(state),
            repo,
            mailer,
            config,
        }
    }

    pub async fn seed_user(&self, username: &str, role: Role) -> User {
        self.repo
            .create_user(NewUser {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                role,
                ..NewUser::default()
            })
            .await
            .expect("seed user")
    }

    pub fn token_for(&self, user: &User) -> String {
        issue_access_token(&self.config, user.id).expect("issue token")
    }

    /// Sends one request and returns the status with the JSON body (`Null` when empty).
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.call(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.call(Method::PATCH, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.call(Method::DELETE, uri, token, None).await
    }
}
