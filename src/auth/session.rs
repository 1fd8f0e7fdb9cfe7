//! In-memory session store.
//!
//! Sessions live only in process memory and expire on an absolute timeout
//! fixed at creation; activity never extends them. Expired records are
//! evicted lazily by the lookup that notices them.
//!
//! Locking: lookups share a read lock, every mutation takes the write lock
//! for exactly one critical section. `delete` checks presence and removes
//! under the same guard, so two concurrent deletes of one ID can never both
//! report success.

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use super::token::{DEFAULT_TOKEN_BYTES, SessionId, TokenError};
use crate::store::models::Plan;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    #[error("the session does not exist")]
    NotFound,

    #[error("the session timed out")]
    Expired,
}

/// Account attributes carried by a session.
///
/// Replaced wholesale through [`SessionStore::update`] when the account
/// changes, e.g. after a plan upgrade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionAccount {
    pub account_id: Uuid,
    pub plan: Plan,
}

/// A single logged-in session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    pub account: SessionAccount,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// A session is live only while `expires_at` is strictly in the future.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Concurrency-safe map from session ID to session record.
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
    timeout: TimeDelta,
    token_bytes: usize,
}

impl SessionStore {
    /// Create a store whose sessions expire `timeout` after creation.
    pub fn new(timeout: Duration) -> Self {
        Self::with_token_bytes(timeout, DEFAULT_TOKEN_BYTES)
    }

    pub fn with_token_bytes(timeout: Duration, token_bytes: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            timeout: TimeDelta::from_std(timeout).unwrap_or(TimeDelta::MAX),
            token_bytes,
        }
    }

    /// Issue a fresh session for `account`.
    pub fn create(&self, account: SessionAccount) -> Result<Session, TokenError> {
        let id = SessionId::generate(self.token_bytes)?;
        let expires_at = Utc::now()
            .checked_add_signed(self.timeout)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let session = Session {
            id: id.clone(),
            account,
            expires_at,
        };

        self.sessions.write().insert(id, session.clone());
        tracing::debug!(
            account_id = %session.account.account_id,
            expires_at = %session.expires_at,
            "Session created"
        );
        Ok(session)
    }

    /// Look up a live session.
    ///
    /// An expired record is removed and reported as [`SessionError::Expired`];
    /// any later lookup of the same ID yields [`SessionError::NotFound`].
    pub fn get(&self, id: &SessionId) -> Result<Session, SessionError> {
        let now = Utc::now();
        let found = self.sessions.read().get(id).cloned();

        match found {
            None => Err(SessionError::NotFound),
            Some(session) if session.is_expired_at(now) => {
                let mut sessions = self.sessions.write();
                // Re-check under the write lock: the record may have been replaced meanwhile.
                let still_expired = sessions
                    .get(id)
                    .is_some_and(|current| current.is_expired_at(now));
                if still_expired {
                    sessions.remove(id);
                }
                Err(SessionError::Expired)
            }
            Some(session) => Ok(session),
        }
    }

    /// Replace the stored record for an existing session ID.
    ///
    /// Unknown IDs are not re-inserted; a session that was logged out or
    /// evicted stays gone.
    pub fn update(&self, session: Session) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write();
        match sessions.get_mut(&session.id) {
            Some(slot) => {
                *slot = session;
                Ok(())
            }
            None => Err(SessionError::NotFound),
        }
    }

    /// Remove a session. Returns `false` if it was not present.
    pub fn delete(&self, id: &SessionId) -> bool {
        self.sessions.write().remove(id).is_some()
    }

    /// Number of stored records, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}
