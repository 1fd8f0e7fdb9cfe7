//! Request-scoped identity.
//!
//! The session gate attaches the verified [`Session`] to the request's own
//! extensions; handlers read it back with the [`CurrentSession`] extractor.
//! Nothing is global: the value lives and dies with the request.

use axum::Json;
use axum::body::Body;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{Extensions, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use super::session::Session;
use crate::gateway::types::{ApiResponse, error_codes};

/// The authenticated session of the current request.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Session);

/// A handler asked for an identity that no gate attached.
///
/// This is a routing bug (the gate was not applied), not a client error.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("no session in request context, session gate was not applied")]
pub struct MissingIdentity;

/// Attach `session` to the request. Called once, by the session gate.
///
/// Write-once: if an identity is already attached it is kept and the new
/// one is dropped.
pub fn attach(mut request: Request<Body>, session: Session) -> Request<Body> {
    let extensions = request.extensions_mut();
    if extensions.get::<CurrentSession>().is_some() {
        tracing::error!(
            account_id = %session.account.account_id,
            "Session identity already attached, keeping the first"
        );
        return request;
    }
    extensions.insert(CurrentSession(session));
    request
}

/// Read the identity attached by the gate.
pub fn extract(extensions: &Extensions) -> Result<Session, MissingIdentity> {
    extensions
        .get::<CurrentSession>()
        .map(|current| current.0.clone())
        .ok_or(MissingIdentity)
}

impl IntoResponse for MissingIdentity {
    fn into_response(self) -> Response {
        tracing::error!("{}", self);
        if cfg!(debug_assertions) {
            panic!("{}", self);
        }
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::<()>::error(
                error_codes::INTERNAL_ERROR,
                "Internal Server Error",
            )),
        )
            .into_response()
    }
}

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = MissingIdentity;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        extract(&parts.extensions).map(CurrentSession)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::SessionAccount;
    use crate::auth::token::SessionId;
    use crate::store::models::Plan;
    use chrono::Utc;
    use uuid::Uuid;

    fn session() -> Session {
        Session {
            id: SessionId::from("sid"),
            account: SessionAccount {
                account_id: Uuid::new_v4(),
                plan: Plan::Free,
            },
            expires_at: Utc::now(),
        }
    }

    #[test]
    fn test_attach_then_extract() {
        let s = session();
        let request = attach(Request::new(Body::empty()), s.clone());
        assert_eq!(extract(request.extensions()).unwrap(), s);
    }

    #[test]
    fn test_extract_without_gate() {
        let request = Request::new(Body::empty());
        assert_eq!(extract(request.extensions()), Err(MissingIdentity));
    }

    #[test]
    fn test_identity_is_per_request() {
        let s = session();
        let _first = attach(Request::new(Body::empty()), s);
        let second = Request::new(Body::empty());
        assert!(extract(second.extensions()).is_err());
    }

    #[test]
    fn test_attach_is_write_once() {
        let first = session();
        let mut second = session();
        second.account.plan = Plan::Enterprise;

        let request = attach(Request::new(Body::empty()), first.clone());
        let request = attach(request, second);
        assert_eq!(extract(request.extensions()).unwrap(), first);
    }

    #[tokio::test]
    async fn test_extractor_reads_extension() {
        let s = session();
        let request = attach(Request::new(Body::empty()), s.clone());
        let (mut parts, _) = request.into_parts();
        let CurrentSession(found) = CurrentSession::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(found, s);
    }
}
