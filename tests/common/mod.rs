#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use splitlog::db::{create_memory_pool, DbPool};
use splitlog::error::Result;
use splitlog::migrations::run_migrations_for_tests;
use splitlog::models::User;
use splitlog::repositories::{SessionRepository, UserRepository};
use splitlog::routes::{create_router, AppStates};
use splitlog::services::{ActivityExporter, ExportActivity, TokenGrant};

pub fn setup_test_db() -> DbPool {
    let pool = create_memory_pool().expect("Failed to create test database");
    run_migrations_for_tests(&pool).expect("Failed to run migrations");
    pool
}

pub fn create_test_app(pool: DbPool) -> Router {
    create_router(AppStates::new(pool, 30, None))
}

pub fn create_test_app_with_exporter(pool: DbPool, exporter: Arc<FakeExporter>) -> Router {
    let exporter: Arc<dyn ActivityExporter> = exporter;
    create_router(AppStates::new(pool, 30, Some(exporter)))
}

pub async fn create_test_user(pool: &DbPool, username: &str, password: &str) -> User {
    let user_repo = UserRepository::new(pool.clone());
    user_repo.create(username, password).await.unwrap()
}

pub async fn create_session_cookie(pool: &DbPool, user: &User) -> String {
    let session_repo = SessionRepository::new(pool.clone());
    let token = session_repo.create(&user.id).await.unwrap();
    format!("session={}", token)
}

/// Registers a user with a fresh session and returns its cookie header value.
pub async fn login_as(pool: &DbPool, username: &str) -> String {
    let user = create_test_user(pool, username, "password123").await;
    create_session_cookie(pool, &user).await
}

pub fn extract_cookie_header(set_cookie: &str) -> String {
    // Extract just the cookie name=value part for use in Cookie header
    set_cookie.split(';').next().unwrap_or("").to_string()
}

pub fn json_request(method: &str, uri: &str, cookie: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, cookie);
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn body_json(response: Response<Body>) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    }
}

/// Sends a request and returns the status with the decoded JSON body.
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    cookie: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(json_request(method, uri, cookie, body))
        .await
        .unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

/// Creates a template through the API and saves the given exercise tree into it.
pub async fn create_template(app: &Router, cookie: &str, name: &str, exercises: Value) -> Value {
    let (status, summary) = send(
        app,
        "POST",
        "/workouts",
        cookie,
        Some(serde_json::json!({ "name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = summary["id"].as_str().unwrap().to_string();

    let (status, saved) = send(
        app,
        "PUT",
        &format!("/workouts/{}", id),
        cookie,
        Some(serde_json::json!({ "name": name, "exercises": exercises })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    saved["workout"].clone()
}

/// Stands in for a fitness platform; records what it was asked to do.
pub struct FakeExporter {
    pub token_lifetime: Duration,
    pub uploads: Mutex<Vec<ExportActivity>>,
    pub refreshes: AtomicUsize,
}

impl FakeExporter {
    pub fn new(token_lifetime: Duration) -> Self {
        Self {
            token_lifetime,
            uploads: Mutex::new(Vec::new()),
            refreshes: AtomicUsize::new(0),
        }
    }

    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    fn grant(&self, access_token: &str) -> TokenGrant {
        TokenGrant {
            access_token: access_token.to_string(),
            refresh_token: "refresh-token".to_string(),
            expires_at: Utc::now() + self.token_lifetime,
            athlete_id: Some("42".to_string()),
        }
    }
}

#[async_trait]
impl ActivityExporter for FakeExporter {
    fn provider(&self) -> &'static str {
        "strava"
    }

    fn authorize_url(&self, state: &str) -> Result<String> {
        Ok(format!("https://fake.test/oauth/authorize?state={}", state))
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenGrant> {
        Ok(self.grant(&format!("access-{}", code)))
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<TokenGrant> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        Ok(self.grant("refreshed-access"))
    }

    async fn upload(&self, _access_token: &str, activity: &ExportActivity) -> Result<String> {
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push(activity.clone());
        Ok(format!("activity-{}", uploads.len()))
    }
}
