//! Authorization gates for Axum.
//!
//! - [`session_auth_middleware`]: bearer token is a session ID; on success
//!   the session is attached to the request for downstream handlers.
//! - [`api_key_auth_middleware`]: bearer token is an API key, checked
//!   against the stored digest for the `account_id` named in the JSON body.
//!   The body is buffered and handed on byte-for-byte unchanged.
//!
//! Both apply with `axum::middleware::from_fn_with_state`.

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use http_body_util::LengthLimitError;
use serde_json::value::RawValue;
use std::collections::HashMap;
use std::error::Error as StdError;
use std::sync::Arc;
use uuid::Uuid;

use super::bearer::extract_bearer_token;
use super::error::AuthError;
use super::identity;
use super::key_hash::verify_key;
use super::session::SessionStore;
use super::token::{ApiKey, SessionId};
use crate::store::AccountStore;

/// Length of a hyphenated UUID, the only accepted `account_id` shape.
pub const ACCOUNT_ID_LEN: usize = 36;

/// Require a live session.
pub async fn session_auth_middleware(
    State(sessions): State<Arc<SessionStore>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let session_id = SessionId::from(extract_bearer_token(request.headers())?);
    let session = sessions.get(&session_id)?;

    tracing::debug!(account_id = %session.account.account_id, "Session authorized");
    let request = identity::attach(request, session);
    Ok(next.run(request).await)
}

/// State for the API-key gate.
#[derive(Clone)]
pub struct ApiKeyGate {
    pub store: Arc<dyn AccountStore>,
    /// Upper bound on the buffered request body.
    pub body_limit: usize,
}

impl ApiKeyGate {
    pub fn new(store: Arc<dyn AccountStore>, body_limit: usize) -> Self {
        Self { store, body_limit }
    }
}

/// Require an API key matching the body's `account_id`.
pub async fn api_key_auth_middleware(
    State(gate): State<ApiKeyGate>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let key = ApiKey::from(extract_bearer_token(request.headers())?);

    let (parts, body) = request.into_parts();
    let bytes = read_body(body, gate.body_limit).await?;

    let account_id = account_id_from_body(&bytes)?;

    let record = gate
        .store
        .get_api_key(account_id)
        .await
        .map_err(|e| AuthError::Internal(format!("API key lookup failed: {}", e)))?
        .ok_or_else(|| AuthError::ApiKeyNotFound(account_id.to_string()))?;

    if !verify_key(&key, &record.key_hash) {
        return Err(AuthError::ApiKeyMismatch(account_id.to_string()));
    }

    tracing::debug!(account_id = %account_id, "API key authorized");
    let request = Request::from_parts(parts, Body::from(bytes));
    Ok(next.run(request).await)
}

/// Buffer at most `limit` bytes of a request body.
///
/// Only an over-limit body is `PayloadTooLarge`; transport failures are
/// `BodyUnreadable`.
pub async fn read_body(body: Body, limit: usize) -> Result<Bytes, AuthError> {
    axum::body::to_bytes(body, limit).await.map_err(|e| {
        if exceeds_limit(&e) {
            AuthError::PayloadTooLarge(limit)
        } else {
            AuthError::BodyUnreadable(e.to_string())
        }
    })
}

fn exceeds_limit(e: &axum::Error) -> bool {
    let mut source: Option<&(dyn StdError + 'static)> = Some(e);
    while let Some(err) = source {
        if err.is::<LengthLimitError>() {
            return true;
        }
        source = err.source();
    }
    false
}

/// Read `account_id` from a JSON object body without decoding the other fields.
pub fn account_id_from_body(bytes: &Bytes) -> Result<Uuid, AuthError> {
    let fields: HashMap<String, &RawValue> =
        serde_json::from_slice(bytes).map_err(|_| AuthError::MissingAccountId)?;

    let raw = fields.get("account_id").ok_or(AuthError::MissingAccountId)?;
    let account_id: String =
        serde_json::from_str(raw.get()).map_err(|_| AuthError::MalformedAccountId)?;

    if account_id.len() != ACCOUNT_ID_LEN {
        return Err(AuthError::MalformedAccountId);
    }
    Uuid::parse_str(&account_id).map_err(|_| AuthError::MalformedAccountId)
}
