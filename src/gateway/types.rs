//! API Response types, error codes and request/response DTOs
//!
//! - `ApiResponse<T>`: Unified response wrapper
//! - `ApiError` / `ApiResult<T>`: handler error plumbing
//! - `ApiJson<T>`: strict JSON body extractor with envelope rejections
//! - `error_codes`: Standard error code constants

use axum::Json;
use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::store::Plan;

// ============================================================================
// Unified API Response Format
// ============================================================================

/// Unified API response wrapper
///
/// All API responses follow this structure:
/// - code: 0 = success, non-zero = error code
/// - msg: short message description
/// - data: actual data (success) or null (error)
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response code: 0 for success, non-zero for errors
    #[schema(example = 0)]
    pub code: i32,
    /// Response message
    #[schema(example = "ok")]
    pub msg: String,
    /// Response data (only present when code == 0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Create success response
    pub fn success(data: T) -> Self {
        Self {
            code: error_codes::SUCCESS,
            msg: "ok".to_string(),
            data: Some(data),
        }
    }

    /// Create error response
    pub fn error(code: i32, msg: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            code,
            msg: msg.into(),
            data: None,
        }
    }
}

// ============================================================================
// Handler errors
// ============================================================================

/// Error returned by handlers, rendered as an `ApiResponse` envelope.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: i32,
    pub msg: String,
}

pub type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

impl ApiError {
    pub fn new(status: StatusCode, code: i32, msg: impl Into<String>) -> Self {
        Self {
            status,
            code,
            msg: msg.into(),
        }
    }

    pub fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            error_codes::UNAUTHORIZED,
            "Unauthorized",
        )
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, error_codes::NOT_FOUND, msg)
    }

    /// Generic 500. The cause belongs in the log line, not the response.
    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            error_codes::INTERNAL_ERROR,
            "Internal Server Error",
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ApiResponse::<()>::error(self.code, self.msg)),
        )
            .into_response()
    }
}

/// 200 OK with data
pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok((StatusCode::OK, Json(ApiResponse::success(data))))
}

/// 201 Created with data
pub fn created<T>(data: T) -> ApiResult<T> {
    Ok((StatusCode::CREATED, Json(ApiResponse::success(data))))
}

// ============================================================================
// Strict JSON extractor
// ============================================================================

/// `Json<T>` whose rejections use the response envelope.
///
/// A `Content-Type` that is present but not JSON keeps axum's 415; an
/// absent one is decoded as JSON. Malformed bodies, unknown fields (with
/// `deny_unknown_fields`) and type errors are 400.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if req.headers().contains_key(header::CONTENT_TYPE) {
            return match Json::<T>::from_request(req, state).await {
                Ok(Json(value)) => Ok(ApiJson(value)),
                Err(rejection) => Err(body_rejection(rejection.status(), rejection.body_text())),
            };
        }

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| body_rejection(rejection.status(), rejection.body_text()))?;
        match Json::<T>::from_bytes(&bytes) {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(body_rejection(rejection.status(), rejection.body_text())),
        }
    }
}

fn body_rejection(status: StatusCode, body_text: String) -> ApiError {
    let code = match status {
        StatusCode::UNSUPPORTED_MEDIA_TYPE => error_codes::UNSUPPORTED_MEDIA_TYPE,
        StatusCode::PAYLOAD_TOO_LARGE => error_codes::PAYLOAD_TOO_LARGE,
        _ => error_codes::INVALID_PARAMETER,
    };
    tracing::warn!(status = %status, "Request body rejected: {}", body_text);
    ApiError::new(status, code, body_text)
}

// ============================================================================
// Request DTOs
// ============================================================================

/// Login request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    #[schema(example = "dev@example.com")]
    pub email: String,
    #[schema(example = "password123")]
    pub password: String,
}

/// One usage event posted by a machine client
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct MetricRequest {
    #[schema(example = "67e55044-10b1-426f-9247-bb680e5fe0c8")]
    pub account_id: Uuid,
    #[schema(example = "0c6a1f0e-4d1b-4f7a-9a0b-2f3c4d5e6f70")]
    pub user_id: Uuid,
    #[schema(example = "2024-01-01T00:00:00Z")]
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// Response DTOs
// ============================================================================

/// Login response data
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    /// Bearer token for session-gated endpoints
    #[serde(rename = "sessionID")]
    pub session_id: String,
}

/// Plan usage for the session's account
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanUsageResponse {
    pub plan: Plan,
    #[schema(example = 100)]
    pub max_users: i64,
    #[schema(example = 42)]
    pub total_users: i64,
}

/// Recorded metric
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MetricResponse {
    pub metric_id: Uuid,
    /// Whether the event's user counts against the plan (false once over the limit)
    pub user_active: bool,
}

// ============================================================================
// Error Codes
// ============================================================================

/// Standard API error codes
pub mod error_codes {
    // Success
    pub const SUCCESS: i32 = 0;

    // Client errors (1xxx)
    pub const INVALID_PARAMETER: i32 = 1001;
    pub const UNSUPPORTED_MEDIA_TYPE: i32 = 1002;
    pub const PAYLOAD_TOO_LARGE: i32 = 1003;

    // Auth errors (2xxx)
    pub const UNAUTHORIZED: i32 = 2001;

    // Resource errors (4xxx)
    pub const NOT_FOUND: i32 = 4004;

    // Server errors (5xxx)
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const SERVICE_UNAVAILABLE: i32 = 5001;
}
