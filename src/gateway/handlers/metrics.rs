//! Usage metrics: machine ingest (API key) and plan usage (session)

use std::sync::Arc;

use axum::extract::State;
use uuid::Uuid;

use super::super::state::AppState;
use super::super::types::{
    ApiJson, ApiResponse, ApiResult, MetricRequest, MetricResponse, PlanUsageResponse, created, ok,
};
use super::store_failure;
use crate::auth::CurrentSession;
use crate::store::{Metric, UserRegistration};

/// Record one usage event
///
/// POST /api/metrics
///
/// The first event for a `user_id` creates that user under the account,
/// active only while the plan's user limit is not yet reached.
#[utoipa::path(
    post,
    path = "/api/metrics",
    request_body = MetricRequest,
    responses(
        (status = 201, description = "Metric recorded", body = ApiResponse<MetricResponse>),
        (status = 400, description = "Invalid parameters"),
        (status = 401, description = "Authentication failed"),
        (status = 413, description = "Body too large")
    ),
    security(("api_key_auth" = [])),
    tag = "Metrics"
)]
pub async fn record_metric(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<MetricRequest>,
) -> ApiResult<MetricResponse> {
    let metric = Metric {
        metric_id: Uuid::new_v4(),
        account_id: req.account_id,
        user_id: req.user_id,
        timestamp: req.timestamp,
    };
    state
        .store
        .record_metric(&metric)
        .await
        .map_err(|e| store_failure("record metric", e))?;

    let registration = state
        .store
        .register_user(req.user_id, req.account_id)
        .await
        .map_err(|e| store_failure("register user", e))?;

    if let UserRegistration::Created { is_active } = registration {
        if is_active {
            tracing::info!(account_id = %req.account_id, user_id = %req.user_id, "User created");
        } else {
            tracing::warn!(
                account_id = %req.account_id,
                user_id = %req.user_id,
                "User created inactive, plan user limit reached"
            );
        }
    }

    created(MetricResponse {
        metric_id: metric.metric_id,
        user_active: registration.is_active(),
    })
}

/// Plan usage for the logged-in account
///
/// GET /api/metrics
#[utoipa::path(
    get,
    path = "/api/metrics",
    responses(
        (status = 200, description = "Plan usage", body = ApiResponse<PlanUsageResponse>),
        (status = 401, description = "Authentication failed")
    ),
    security(("session_auth" = [])),
    tag = "Metrics"
)]
pub async fn get_usage(
    State(state): State<Arc<AppState>>,
    CurrentSession(session): CurrentSession,
) -> ApiResult<PlanUsageResponse> {
    let account_id = session.account.account_id;
    let total_users = state
        .store
        .count_users(account_id)
        .await
        .map_err(|e| store_failure("count users", e))?;

    let plan = session.account.plan;
    ok(PlanUsageResponse {
        plan,
        max_users: plan.max_users(),
        total_users,
    })
}
