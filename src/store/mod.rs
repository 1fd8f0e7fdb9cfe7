//! Relational store collaborator
//!
//! The auth core only needs "fetch API key record by account ID"; the
//! handlers need a little more (accounts, metrics, metered users). All of it
//! sits behind the [`AccountStore`] trait so the service runs against
//! PostgreSQL in production and an in-memory store in tests.
//!
//! Cross-entity invariants (user counts against plan limits) are guarded
//! by a lock or transaction owned by each implementation.

pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::key_hash::hash_key;
use crate::auth::password::{PasswordError, PasswordHasher};
use crate::auth::token::{ApiKey, TokenError};

pub use memory::InMemoryStore;
pub use models::{Account, ApiKeyRecord, Metric, Plan, User, UserRegistration};
pub use postgres::PgAccountStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn get_account(&self, account_id: Uuid) -> Result<Option<Account>, StoreError>;

    async fn get_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    /// Insert a new account. Duplicate IDs or emails are a [`StoreError::Conflict`].
    async fn insert_account(&self, account: &Account) -> Result<(), StoreError>;

    /// Fetch the API key record for an account.
    async fn get_api_key(&self, account_id: Uuid) -> Result<Option<ApiKeyRecord>, StoreError>;

    /// Store an account's API key digest, replacing any previous key.
    async fn put_api_key(&self, record: &ApiKeyRecord) -> Result<(), StoreError>;

    async fn record_metric(&self, metric: &Metric) -> Result<(), StoreError>;

    /// Create `user_id` under `account_id` unless it already exists.
    ///
    /// A new user is active only while the account's plan limit is not
    /// exceeded. The count and the insert happen atomically.
    async fn register_user(
        &self,
        user_id: Uuid,
        account_id: Uuid,
    ) -> Result<UserRegistration, StoreError>;

    async fn count_users(&self, account_id: Uuid) -> Result<i64, StoreError>;

    /// Move an account to `plan` and activate users up to its limit.
    ///
    /// Returns the account's total user count.
    async fn upgrade_account(&self, account_id: Uuid, plan: Plan) -> Result<i64, StoreError>;
}

// ============================================================================
// Provisioning helpers
// ============================================================================

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("password hashing task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Create a FREE account with a hashed password.
pub async fn create_account(
    store: &Arc<dyn AccountStore>,
    hasher: &PasswordHasher,
    email: &str,
    password: &str,
) -> Result<Account, ProvisionError> {
    let hasher = hasher.clone();
    let password = password.to_string();
    let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password)).await??;

    let now = Utc::now();
    let account = Account {
        account_id: Uuid::new_v4(),
        plan: Plan::Free,
        email: email.to_string(),
        password_hash,
        created_at: now,
        updated_at: now,
    };
    store.insert_account(&account).await?;
    tracing::info!(account_id = %account.account_id, "Account created");
    Ok(account)
}

/// Issue a new API key for an account. The plaintext is returned once and never stored.
pub async fn create_api_key(
    store: &Arc<dyn AccountStore>,
    account_id: Uuid,
    token_bytes: usize,
) -> Result<ApiKey, ProvisionError> {
    let key = ApiKey::generate(token_bytes)?;
    let record = ApiKeyRecord {
        key_hash: hash_key(&key),
        account_id,
    };
    store.put_api_key(&record).await?;
    tracing::info!(account_id = %account_id, "API key issued");
    Ok(key)
}

pub const DEV_EMAIL: &str = "dev@example.com";
pub const DEV_PASSWORD: &str = "dev-password";

/// Ensure the dev account exists and give it a fresh API key.
///
/// Re-running rotates the key, since the previous plaintext is not recoverable.
pub async fn seed_dev_account(
    store: &Arc<dyn AccountStore>,
    hasher: &PasswordHasher,
    token_bytes: usize,
) -> Result<(Account, ApiKey), ProvisionError> {
    let account = match store.get_account_by_email(DEV_EMAIL).await? {
        Some(existing) => existing,
        None => create_account(store, hasher, DEV_EMAIL, DEV_PASSWORD).await?,
    };
    let key = create_api_key(store, account.account_id, token_bytes).await?;
    Ok((account, key))
}
