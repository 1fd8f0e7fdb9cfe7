//! HTTP handlers

pub mod account;
pub mod health;
pub mod metrics;
pub mod session;

pub use account::upgrade;
pub use health::{HealthResponse, health_check};
pub use metrics::{get_usage, record_metric};
pub use session::{login, logout};

use std::fmt::Display;

use super::types::ApiError;
use crate::store::StoreError;

/// Log an unexpected failure and answer with a generic 500.
pub(crate) fn internal(context: &str, e: impl Display) -> ApiError {
    tracing::error!(kind = "INTERNAL_ERROR", "{} failed: {}", context, e);
    ApiError::internal()
}

/// Map a store failure: missing rows are 404, everything else is internal.
pub(crate) fn store_failure(context: &str, e: StoreError) -> ApiError {
    match e {
        StoreError::NotFound(what) => {
            tracing::warn!(kind = "NOT_FOUND", "{}: {} not found", context, what);
            ApiError::not_found("Not Found")
        }
        other => internal(context, other),
    }
}
