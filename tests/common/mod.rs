//! Shared helpers: an in-memory app and a oneshot request driver.

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use tenant_accounts::auth::{ApiKey, PasswordHasher, SessionStore};
use tenant_accounts::gateway::{build_router, state::AppState};
use tenant_accounts::store::{
    Account, AccountStore, InMemoryStore, create_account, create_api_key,
};

pub const PASSWORD: &str = "correct horse battery staple";
pub const BODY_LIMIT: usize = 1024 * 1024;

pub struct TestApp {
    pub router: Router,
    pub sessions: Arc<SessionStore>,
    pub memory: Arc<InMemoryStore>,
    pub store: Arc<dyn AccountStore>,
    pub hasher: PasswordHasher,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_session_timeout(Duration::from_secs(3600))
    }

    pub fn with_session_timeout(timeout: Duration) -> Self {
        let sessions = Arc::new(SessionStore::new(timeout));
        let memory = Arc::new(InMemoryStore::new());
        let store: Arc<dyn AccountStore> = memory.clone();
        // Cheap parameters keep the suite fast
        let hasher = PasswordHasher::new(1024, 1, 1).unwrap();

        let state = AppState::new(sessions.clone(), store.clone(), hasher.clone(), BODY_LIMIT);
        Self {
            router: build_router(state),
            sessions,
            memory,
            store,
            hasher,
        }
    }

    /// Create an account with [`PASSWORD`] and return it with a fresh API key.
    pub async fn account(&self, email: &str) -> (Account, ApiKey) {
        let account = create_account(&self.store, &self.hasher, email, PASSWORD)
            .await
            .unwrap();
        let key = create_api_key(&self.store, account.account_id, 32)
            .await
            .unwrap();
        (account, key)
    }

    /// Log in through the HTTP surface and return the session ID.
    pub async fn login(&self, email: &str) -> String {
        let (status, _, body) = send(
            &self.router,
            Method::POST,
            "/api/login",
            None,
            Some(json!({ "email": email, "password": PASSWORD })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["data"]["sessionID"].as_str().unwrap().to_string()
    }
}

/// Send one JSON request through the router.
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    authorization: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, HeaderMap, Value) {
    let raw = body.map(|v| serde_json::to_vec(&v).unwrap());
    send_raw(app, method, uri, authorization, raw, "application/json").await
}

/// Send raw bytes; returns the JSON body, or `{"raw": ...}` when it is not JSON.
pub async fn send_raw(
    app: &Router,
    method: Method,
    uri: &str,
    authorization: Option<&str>,
    body: Option<Vec<u8>>,
    content_type: &str,
) -> (StatusCode, HeaderMap, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if body.is_some() {
        builder = builder.header("content-type", content_type);
    }
    if let Some(value) = authorization {
        builder = builder.header("authorization", value);
    }
    let request = builder
        .body(body.map(Body::from).unwrap_or_else(Body::empty))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();

    let json = if bytes.is_empty() {
        json!({})
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| json!({ "raw": String::from_utf8_lossy(&bytes) }))
    };
    (status, headers, json)
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}
