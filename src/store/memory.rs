//! In-memory [`AccountStore`], used by tests and by `dev` when no database
//! URL is configured.
//!
//! All tables share one mutex, so each trait method is a single atomic
//! critical section and the user-limit check cannot race its insert.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use uuid::Uuid;

use super::models::{Account, ApiKeyRecord, Metric, Plan, User, UserRegistration};
use super::{AccountStore, StoreError};

#[derive(Default)]
struct Tables {
    accounts: HashMap<Uuid, Account>,
    email_index: HashMap<String, Uuid>,
    api_keys: HashMap<Uuid, ApiKeyRecord>,
    metrics: Vec<Metric>,
    users: HashMap<Uuid, User>,
    /// Per-account user IDs in creation order
    account_users: HashMap<Uuid, Vec<Uuid>>,
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Metrics recorded for an account, oldest first.
    pub fn metrics_for(&self, account_id: Uuid) -> Vec<Metric> {
        self.tables
            .lock()
            .metrics
            .iter()
            .filter(|m| m.account_id == account_id)
            .cloned()
            .collect()
    }

    /// Users of an account in creation order.
    pub fn users_for(&self, account_id: Uuid) -> Vec<User> {
        let tables = self.tables.lock();
        tables
            .account_users
            .get(&account_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| tables.users.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl AccountStore for InMemoryStore {
    async fn get_account(&self, account_id: Uuid) -> Result<Option<Account>, StoreError> {
        Ok(self.tables.lock().accounts.get(&account_id).cloned())
    }

    async fn get_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let tables = self.tables.lock();
        Ok(tables
            .email_index
            .get(email)
            .and_then(|id| tables.accounts.get(id))
            .cloned())
    }

    async fn insert_account(&self, account: &Account) -> Result<(), StoreError> {
        let mut tables = self.tables.lock();
        if tables.accounts.contains_key(&account.account_id) {
            return Err(StoreError::Conflict(format!(
                "account {} already exists",
                account.account_id
            )));
        }
        if tables.email_index.contains_key(&account.email) {
            return Err(StoreError::Conflict("email already registered".to_string()));
        }
        tables
            .email_index
            .insert(account.email.clone(), account.account_id);
        tables.accounts.insert(account.account_id, account.clone());
        Ok(())
    }

    async fn get_api_key(&self, account_id: Uuid) -> Result<Option<ApiKeyRecord>, StoreError> {
        Ok(self.tables.lock().api_keys.get(&account_id).cloned())
    }

    async fn put_api_key(&self, record: &ApiKeyRecord) -> Result<(), StoreError> {
        self.tables
            .lock()
            .api_keys
            .insert(record.account_id, record.clone());
        Ok(())
    }

    async fn record_metric(&self, metric: &Metric) -> Result<(), StoreError> {
        self.tables.lock().metrics.push(metric.clone());
        Ok(())
    }

    async fn register_user(
        &self,
        user_id: Uuid,
        account_id: Uuid,
    ) -> Result<UserRegistration, StoreError> {
        let mut tables = self.tables.lock();
        let plan = tables
            .accounts
            .get(&account_id)
            .map(|a| a.plan)
            .ok_or_else(|| StoreError::NotFound(format!("account {}", account_id)))?;

        if let Some(user) = tables.users.get(&user_id) {
            return Ok(UserRegistration::Existing {
                is_active: user.is_active,
            });
        }

        let count = tables
            .account_users
            .get(&account_id)
            .map_or(0, |ids| ids.len() as i64);
        let is_active = count < plan.max_users();

        let now = Utc::now();
        tables.users.insert(
            user_id,
            User {
                user_id,
                account_id,
                is_active,
                created_at: now,
                updated_at: now,
            },
        );
        tables
            .account_users
            .entry(account_id)
            .or_default()
            .push(user_id);
        Ok(UserRegistration::Created { is_active })
    }

    async fn count_users(&self, account_id: Uuid) -> Result<i64, StoreError> {
        Ok(self
            .tables
            .lock()
            .account_users
            .get(&account_id)
            .map_or(0, |ids| ids.len() as i64))
    }

    async fn upgrade_account(&self, account_id: Uuid, plan: Plan) -> Result<i64, StoreError> {
        let mut guard = self.tables.lock();
        let tables = &mut *guard;
        let now = Utc::now();

        let account = tables
            .accounts
            .get_mut(&account_id)
            .ok_or_else(|| StoreError::NotFound(format!("account {}", account_id)))?;
        account.plan = plan;
        account.updated_at = now;

        let ids = tables
            .account_users
            .get(&account_id)
            .cloned()
            .unwrap_or_default();
        let limit = usize::try_from(plan.max_users()).unwrap_or(usize::MAX);
        for id in ids.iter().take(limit) {
            match tables.users.get_mut(id) {
                Some(user) if !user.is_active => {
                    user.is_active = true;
                    user.updated_at = now;
                }
                _ => {}
            }
        }
        Ok(ids.len() as i64)
    }
}
