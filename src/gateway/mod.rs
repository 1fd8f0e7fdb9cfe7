pub mod handlers;
pub mod openapi;
pub mod state;
pub mod types;

use anyhow::Context;
use axum::{
    Router,
    body::Body,
    extract::DefaultBodyLimit,
    http::{HeaderName, HeaderValue, Request, StatusCode, header},
    middleware::{Next, from_fn, from_fn_with_state},
    response::Response,
    routing::{delete, get, patch, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::{api_key_auth_middleware, session_auth_middleware};
use state::AppState;

/// Attach API security headers to every response.
async fn security_headers(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;
    let status = response.status();
    let headers = response.headers_mut();

    if status != StatusCode::NO_CONTENT && !headers.contains_key(header::CONTENT_TYPE) {
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
    }
    headers.insert(
        header::STRICT_TRANSPORT_SECURITY,
        HeaderValue::from_static("max-age=63072000; includeSubDomains"),
    );
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        HeaderName::from_static("x-permitted-cross-domain-policies"),
        HeaderValue::from_static("none"),
    );
    response
}

/// Build the complete router.
///
/// Gates are attached per method with `MethodRouter::route_layer`, so an
/// unsupported method on a gated path gets 405 without touching credentials.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.body_limit;
    let session_gate = from_fn_with_state(Arc::clone(&state.sessions), session_auth_middleware);
    let api_key_gate = from_fn_with_state(state.api_key_gate(), api_key_auth_middleware);
    let state = Arc::new(state);

    let api = Router::new()
        // ======================================================================
        // Public Routes (no auth required)
        // ======================================================================
        .route("/health", get(handlers::health_check))
        .route("/login", post(handlers::login))
        // ======================================================================
        // Session Routes (bearer session ID) and Machine Routes (bearer API key)
        // ======================================================================
        .route(
            "/logout",
            delete(handlers::logout).route_layer(session_gate.clone()),
        )
        .route(
            "/metrics",
            get(handlers::get_usage)
                .route_layer(session_gate.clone())
                .merge(post(handlers::record_metric).route_layer(api_key_gate)),
        )
        .route(
            "/upgrade",
            patch(handlers::upgrade).route_layer(session_gate),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(from_fn(security_headers));

    Router::new()
        .nest("/api", api)
        .with_state(state)
        // OpenAPI / Swagger UI (stateless, added after with_state)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
}

/// Start HTTP server and serve until Ctrl-C.
pub async fn run_server(host: &str, port: u16, app: Router) -> anyhow::Result<()> {
    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {} (port in use?)", addr))?;

    tracing::info!("Gateway listening on http://{}", addr);
    tracing::info!("API Docs: http://{}/docs", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
