//! API-key gate: key checks and body pass-through.

mod common;

use axum::body::Bytes;
use axum::http::{Method, StatusCode};
use axum::{Router, middleware::from_fn_with_state, routing::post};
use serde_json::{Value, json};
use uuid::Uuid;

use tenant_accounts::auth::{ApiKeyGate, api_key_auth_middleware, generate_token};

use common::*;

async fn echo(body: Bytes) -> Bytes {
    body
}

fn echo_router(app: &TestApp, body_limit: usize) -> Router {
    Router::new()
        .route("/echo", post(echo))
        .layer(from_fn_with_state(
            ApiKeyGate::new(app.store.clone(), body_limit),
            api_key_auth_middleware,
        ))
}

fn metric(account_id: Uuid, user_id: Uuid) -> Value {
    json!({
        "account_id": account_id,
        "user_id": user_id,
        "timestamp": "2024-01-01T00:00:00Z",
    })
}

#[tokio::test]
async fn test_body_passes_through_unchanged() {
    let app = TestApp::new();
    let (account, key) = app.account("machine@example.com").await;
    let router = echo_router(&app, BODY_LIMIT);

    // Odd spacing, field order, unicode and extra fields must all survive
    let raw = format!(
        "{{ \"note\" : \"h\u{e9}llo \u{1F600}\",\n  \"account_id\":\"{}\" ,\"n\":[1, 2 ,3]}}",
        account.account_id
    );
    let (status, _, body) = send_raw(
        &router,
        Method::POST,
        "/echo",
        Some(&bearer(key.as_str())),
        Some(raw.clone().into_bytes()),
        "application/json",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    // send_raw decodes JSON; compare against the same decoding of the input
    assert_eq!(body, serde_json::from_str::<Value>(&raw).unwrap());
}

#[tokio::test]
async fn test_body_bytes_identical() {
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    let app = TestApp::new();
    let (account, key) = app.account("bytes@example.com").await;
    let router = echo_router(&app, BODY_LIMIT);

    let raw = format!(
        "{{\"account_id\":\"{}\",   \"blob\":\"\\u0000\\t\"}}\n\n",
        account.account_id
    );
    let request = Request::builder()
        .method(Method::POST)
        .uri("/echo")
        .header("content-type", "application/json")
        .header("authorization", bearer(key.as_str()))
        .body(Body::from(raw.clone()))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let echoed = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(echoed.as_ref(), raw.as_bytes());
}

#[tokio::test]
async fn test_wrong_key_rejected() {
    let app = TestApp::new();
    let (account, _) = app.account("wrong@example.com").await;
    let router = echo_router(&app, BODY_LIMIT);

    let forged = generate_token(32).unwrap();
    let (status, _, body) = send(
        &router,
        Method::POST,
        "/echo",
        Some(&bearer(&forged)),
        Some(json!({ "account_id": account.account_id })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "code": 2001, "msg": "Unauthorized" }));
}

#[tokio::test]
async fn test_key_bound_to_its_account() {
    let app = TestApp::new();
    let (_, key_a) = app.account("a@example.com").await;
    let (account_b, _) = app.account("b@example.com").await;
    let router = echo_router(&app, BODY_LIMIT);

    let (status, _, _) = send(
        &router,
        Method::POST,
        "/echo",
        Some(&bearer(key_a.as_str())),
        Some(json!({ "account_id": account_b.account_id })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_account_without_key_rejected() {
    let app = TestApp::new();
    let (_, key) = app.account("keyed@example.com").await;
    let router = echo_router(&app, BODY_LIMIT);

    let (status, _, _) = send(
        &router,
        Method::POST,
        "/echo",
        Some(&bearer(key.as_str())),
        Some(json!({ "account_id": Uuid::new_v4() })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_bad_account_id_rejected() {
    let app = TestApp::new();
    let (account, key) = app.account("shape@example.com").await;
    let router = echo_router(&app, BODY_LIMIT);

    let bodies = [
        json!({}),
        json!({ "user_id": Uuid::new_v4() }),
        json!({ "account_id": "too-short" }),
        json!({ "account_id": account.account_id.simple().to_string() }),
        json!({ "account_id": 42 }),
        json!([account.account_id]),
    ];
    for body in bodies {
        let (status, _, _) = send(
            &router,
            Method::POST,
            "/echo",
            Some(&bearer(key.as_str())),
            Some(body.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", body);
    }
}

#[tokio::test]
async fn test_missing_or_malformed_header_rejected() {
    let app = TestApp::new();
    let (account, key) = app.account("hdr@example.com").await;
    let router = echo_router(&app, BODY_LIMIT);
    let body = json!({ "account_id": account.account_id });

    for header in [
        None,
        Some(key.as_str().to_string()),
        Some(format!("Token {}", key.as_str())),
        Some(format!("Bearer  {}", key.as_str())),
    ] {
        let (status, _, _) =
            send(&router, Method::POST, "/echo", header.as_deref(), Some(body.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{:?}", header);
    }
}

#[tokio::test]
async fn test_session_id_is_not_an_api_key() {
    let app = TestApp::new();
    let (account, _) = app.account("mixed@example.com").await;
    let sid = app.login("mixed@example.com").await;

    let (status, _, _) = send(
        &app.router,
        Method::POST,
        "/api/metrics",
        Some(&bearer(&sid)),
        Some(metric(account.account_id, Uuid::new_v4())),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(app.memory.metrics_for(account.account_id).is_empty());
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let app = TestApp::new();
    let (account, key) = app.account("big@example.com").await;
    let router = echo_router(&app, 64);

    let (status, _, _) = send(
        &router,
        Method::POST,
        "/echo",
        Some(&bearer(key.as_str())),
        Some(json!({ "account_id": account.account_id, "pad": "x".repeat(128) })),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_metric_ingest_through_gate() {
    let app = TestApp::new();
    let (account, key) = app.account("ingest@example.com").await;
    let user_id = Uuid::new_v4();

    for _ in 0..2 {
        let (status, _, body) = send(
            &app.router,
            Method::POST,
            "/api/metrics",
            Some(&bearer(key.as_str())),
            Some(metric(account.account_id, user_id)),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        assert_eq!(body["data"]["user_active"], true);
    }

    assert_eq!(app.memory.metrics_for(account.account_id).len(), 2);
    let users = app.memory.users_for(account.account_id);
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].user_id, user_id);
}

#[tokio::test]
async fn test_metric_body_is_strict() {
    let app = TestApp::new();
    let (account, key) = app.account("strict@example.com").await;

    let mut body = metric(account.account_id, Uuid::new_v4());
    body["extra"] = json!(1);
    let (status, _, response) = send(
        &app.router,
        Method::POST,
        "/api/metrics",
        Some(&bearer(key.as_str())),
        Some(body),
    )
    .await;
    assert!(status.is_client_error());
    assert_ne!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(response["code"], 1001);
    assert!(app.memory.metrics_for(account.account_id).is_empty());
}
