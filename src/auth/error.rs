//! Authorization failure taxonomy.
//!
//! Every variant keeps its specific kind for operator logs, but the client
//! sees one generic response per status class: all credential failures
//! collapse to the same `401` body so a caller cannot tell a malformed
//! header from an expired session or a wrong key.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::gateway::types::{ApiResponse, error_codes};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("malformed credential: {0}")]
    MalformedCredential(&'static str),

    #[error("the session does not exist")]
    UnknownSession,

    #[error("the session timed out")]
    ExpiredSession,

    #[error("request body missing required field \"account_id\"")]
    MissingAccountId,

    #[error("account_id improperly formatted")]
    MalformedAccountId,

    #[error("no API key registered for account {0}")]
    ApiKeyNotFound(String),

    #[error("received invalid API key for account {0}")]
    ApiKeyMismatch(String),

    #[error("request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    #[error("request body could not be read: {0}")]
    BodyUnreadable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Short machine-readable kind, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedCredential(_) => "MALFORMED_CREDENTIAL",
            Self::UnknownSession => "SESSION_NOT_FOUND",
            Self::ExpiredSession => "SESSION_EXPIRED",
            Self::MissingAccountId => "MISSING_ACCOUNT_ID",
            Self::MalformedAccountId => "MALFORMED_ACCOUNT_ID",
            Self::ApiKeyNotFound(_) => "API_KEY_NOT_FOUND",
            Self::ApiKeyMismatch(_) => "API_KEY_MISMATCH",
            Self::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            Self::BodyUnreadable(_) => "BODY_UNREADABLE",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::BodyUnreadable(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    fn client_body(&self) -> ApiResponse<()> {
        match self.http_status() {
            StatusCode::UNAUTHORIZED => {
                ApiResponse::<()>::error(error_codes::UNAUTHORIZED, "Unauthorized")
            }
            StatusCode::PAYLOAD_TOO_LARGE => {
                ApiResponse::<()>::error(error_codes::PAYLOAD_TOO_LARGE, "Payload Too Large")
            }
            StatusCode::BAD_REQUEST => {
                ApiResponse::<()>::error(error_codes::INVALID_PARAMETER, "Bad Request")
            }
            _ => ApiResponse::<()>::error(error_codes::INTERNAL_ERROR, "Internal Server Error"),
        }
    }
}

impl From<super::session::SessionError> for AuthError {
    fn from(e: super::session::SessionError) -> Self {
        match e {
            super::session::SessionError::NotFound => Self::UnknownSession,
            super::session::SessionError::Expired => Self::ExpiredSession,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if matches!(self, Self::Internal(_)) {
            tracing::error!(kind = self.kind(), "Request rejected: {}", self);
        } else {
            tracing::warn!(kind = self.kind(), "Request rejected: {}", self);
        }
        (self.http_status(), Json(self.client_body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::SessionError;

    #[test]
    fn test_auth_failures_share_status() {
        let errors = [
            AuthError::MalformedCredential("x"),
            AuthError::UnknownSession,
            AuthError::ExpiredSession,
            AuthError::MissingAccountId,
            AuthError::MalformedAccountId,
            AuthError::ApiKeyNotFound("a".into()),
            AuthError::ApiKeyMismatch("a".into()),
        ];
        for e in errors {
            assert_eq!(e.http_status(), StatusCode::UNAUTHORIZED, "{}", e.kind());
        }
    }

    #[test]
    fn test_auth_failures_share_body() {
        let a = serde_json::to_string(&AuthError::UnknownSession.client_body()).unwrap();
        let b = serde_json::to_string(&AuthError::ApiKeyMismatch("x".into()).client_body()).unwrap();
        let c = serde_json::to_string(&AuthError::MalformedCredential("x").client_body()).unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert!(!a.contains("session"));
    }

    #[test]
    fn test_internal_status() {
        assert_eq!(
            AuthError::Internal("db down".into()).http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_body_failures_are_not_auth_failures() {
        assert_eq!(
            AuthError::PayloadTooLarge(64).http_status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            AuthError::BodyUnreadable("connection reset".into()).http_status(),
            StatusCode::BAD_REQUEST
        );
        let body = AuthError::BodyUnreadable("connection reset".into()).client_body();
        assert_eq!(body.code, error_codes::INVALID_PARAMETER);
    }

    #[test]
    fn test_session_error_mapping() {
        assert!(matches!(
            AuthError::from(SessionError::NotFound),
            AuthError::UnknownSession
        ));
        assert!(matches!(
            AuthError::from(SessionError::Expired),
            AuthError::ExpiredSession
        ));
    }
}
