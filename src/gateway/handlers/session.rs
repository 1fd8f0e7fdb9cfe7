//! Login and logout

use std::sync::Arc;

use axum::{extract::State, http::StatusCode};

use super::super::state::AppState;
use super::super::types::{
    ApiError, ApiJson, ApiResponse, ApiResult, LoginRequest, LoginResponse, ok,
};
use super::internal;
use crate::auth::{CurrentSession, SessionAccount};

/// Login with email and password
///
/// POST /api/login
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Invalid credentials"),
        (status = 415, description = "Body is not JSON"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let account = state
        .store
        .get_account_by_email(&req.email)
        .await
        .map_err(|e| internal("account lookup", e))?;

    let hasher = state.passwords.clone();
    let password = req.password;

    // Unknown emails still pay for one hash so timing does not reveal them.
    let verified = match account {
        Some(account) => {
            let digest = account.password_hash.clone();
            let matches =
                tokio::task::spawn_blocking(move || hasher.verify(&password, &digest))
                    .await
                    .map_err(|e| internal("password verification task", e))?;
            matches.then_some(account)
        }
        None => {
            tokio::task::spawn_blocking(move || hasher.dummy_verify(&password))
                .await
                .map_err(|e| internal("password verification task", e))?;
            None
        }
    };

    let Some(account) = verified else {
        tracing::warn!(kind = "INVALID_CREDENTIALS", "Login rejected");
        return Err(ApiError::unauthorized());
    };

    let session = state
        .sessions
        .create(SessionAccount {
            account_id: account.account_id,
            plan: account.plan,
        })
        .map_err(|e| internal("session creation", e))?;

    tracing::info!(account_id = %account.account_id, "Login succeeded");
    ok(LoginResponse {
        session_id: session.id.as_str().to_string(),
    })
}

/// End the current session
///
/// DELETE /api/logout
#[utoipa::path(
    delete,
    path = "/api/logout",
    responses(
        (status = 204, description = "Session ended"),
        (status = 401, description = "Authentication failed")
    ),
    security(("session_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    CurrentSession(session): CurrentSession,
) -> StatusCode {
    if state.sessions.delete(&session.id) {
        tracing::info!(account_id = %session.account.account_id, "Logout succeeded");
    } else {
        // Lost a race with a concurrent logout or eviction
        tracing::warn!(
            account_id = %session.account.account_id,
            "Logout found the session already gone"
        );
    }
    StatusCode::NO_CONTENT
}
