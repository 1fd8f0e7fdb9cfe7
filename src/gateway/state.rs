use std::sync::Arc;

use crate::auth::{ApiKeyGate, PasswordHasher, SessionStore};
use crate::db::Database;
use crate::store::AccountStore;

/// Gateway shared state
#[derive(Clone)]
pub struct AppState {
    /// Live sessions (process memory only)
    pub sessions: Arc<SessionStore>,
    /// Relational store collaborator
    pub store: Arc<dyn AccountStore>,
    /// Password hashing with the configured work factor
    pub passwords: PasswordHasher,
    /// Upper bound on buffered request bodies
    pub body_limit: usize,
    /// PostgreSQL pool, pinged by the health check (None with the in-memory store)
    pub pg_db: Option<Arc<Database>>,
}

impl AppState {
    pub fn new(
        sessions: Arc<SessionStore>,
        store: Arc<dyn AccountStore>,
        passwords: PasswordHasher,
        body_limit: usize,
    ) -> Self {
        Self {
            sessions,
            store,
            passwords,
            body_limit,
            pg_db: None,
        }
    }

    pub fn with_database(mut self, db: Arc<Database>) -> Self {
        self.pg_db = Some(db);
        self
    }

    /// State for the API-key gate
    pub fn api_key_gate(&self) -> ApiKeyGate {
        ApiKeyGate::new(Arc::clone(&self.store), self.body_limit)
    }
}
