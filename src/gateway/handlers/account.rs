//! Plan upgrade

use std::sync::Arc;

use axum::extract::State;

use super::super::state::AppState;
use super::super::types::{ApiResponse, ApiResult, PlanUsageResponse, ok};
use super::store_failure;
use crate::auth::CurrentSession;
use crate::store::Plan;

/// Upgrade the logged-in account to ENTERPRISE
///
/// PATCH /api/upgrade
///
/// Activates the account's users up to the new limit, then rewrites the
/// current session so later requests see the new plan.
#[utoipa::path(
    patch,
    path = "/api/upgrade",
    responses(
        (status = 200, description = "Account upgraded", body = ApiResponse<PlanUsageResponse>),
        (status = 401, description = "Authentication failed"),
        (status = 404, description = "Account no longer exists")
    ),
    security(("session_auth" = [])),
    tag = "Account"
)]
pub async fn upgrade(
    State(state): State<Arc<AppState>>,
    CurrentSession(mut session): CurrentSession,
) -> ApiResult<PlanUsageResponse> {
    let plan = Plan::Enterprise;
    let account_id = session.account.account_id;

    let total_users = state
        .store
        .upgrade_account(account_id, plan)
        .await
        .map_err(|e| store_failure("upgrade account", e))?;

    session.account.plan = plan;
    if let Err(e) = state.sessions.update(session) {
        // Logged out mid-request; the account itself is upgraded
        tracing::warn!(account_id = %account_id, "Session not refreshed after upgrade: {}", e);
    }

    tracing::info!(account_id = %account_id, plan = %plan, total_users, "Account upgraded");
    ok(PlanUsageResponse {
        plan,
        max_users: plan.max_users(),
        total_users,
    })
}
