//! PostgreSQL [`AccountStore`].
//!
//! Uses runtime queries to avoid sqlx compile-time database connection.
//! User-limit enforcement and plan upgrades lock the account row with
//! `SELECT ... FOR UPDATE` inside a transaction.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use std::sync::Arc;
use uuid::Uuid;

use super::models::{Account, ApiKeyRecord, Metric, Plan, UserRegistration};
use super::{AccountStore, StoreError};
use crate::db::{Database, SafeRow};

/// Tables created on startup, in dependency order.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS account (
        account_id    UUID PRIMARY KEY,
        plan          TEXT NOT NULL DEFAULT 'FREE' CHECK (plan IN ('FREE', 'ENTERPRISE')),
        email         TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        created_at    TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at    TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS apikey (
        account_id UUID PRIMARY KEY REFERENCES account (account_id),
        key_hash   CHAR(64) NOT NULL UNIQUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS metric (
        metric_id   UUID PRIMARY KEY,
        account_id  UUID NOT NULL REFERENCES account (account_id),
        user_id     UUID NOT NULL,
        occurred_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS app_user (
        user_id    UUID PRIMARY KEY,
        account_id UUID NOT NULL REFERENCES account (account_id),
        is_active  BOOLEAN NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_app_user_account ON app_user (account_id, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_metric_account ON metric (account_id)",
];

pub struct PgAccountStore {
    db: Arc<Database>,
}

impl PgAccountStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create tables and indexes if they do not exist.
    pub async fn init_schema(&self) -> Result<(), sqlx::Error> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(self.db.pool()).await?;
        }
        tracing::info!("Database schema ready");
        Ok(())
    }

    fn row_to_account(row: &PgRow) -> Result<Account, sqlx::Error> {
        let plan: String = row.require("plan")?;
        Ok(Account {
            account_id: row.require("account_id")?,
            plan: plan
                .parse::<Plan>()
                .map_err(|e| sqlx::Error::Decode(e.into()))?,
            email: row.require("email")?,
            password_hash: row.require("password_hash")?,
            created_at: row.require("created_at")?,
            updated_at: row.require("updated_at")?,
        })
    }
}

fn map_unique_violation(e: sqlx::Error, what: &str) -> StoreError {
    match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            StoreError::Conflict(format!("{} already exists", what))
        }
        _ => StoreError::Database(e),
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn get_account(&self, account_id: Uuid) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT account_id, plan, email, password_hash, created_at, updated_at
            FROM account
            WHERE account_id = $1
            "#,
        )
        .bind(account_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(Self::row_to_account).transpose()?)
    }

    async fn get_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT account_id, plan, email, password_hash, created_at, updated_at
            FROM account
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(Self::row_to_account).transpose()?)
    }

    async fn insert_account(&self, account: &Account) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO account (account_id, plan, email, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(account.account_id)
        .bind(account.plan.as_str())
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(self.db.pool())
        .await
        .map_err(|e| map_unique_violation(e, "account"))?;
        Ok(())
    }

    async fn get_api_key(&self, account_id: Uuid) -> Result<Option<ApiKeyRecord>, StoreError> {
        let row = sqlx::query("SELECT key_hash, account_id FROM apikey WHERE account_id = $1")
            .bind(account_id)
            .fetch_optional(self.db.pool())
            .await?;

        match row {
            Some(r) => {
                let key_hash: String = r.require("key_hash")?;
                Ok(Some(ApiKeyRecord {
                    // CHAR(n) may come back blank-padded
                    key_hash: key_hash.trim_end().to_string(),
                    account_id: r.require("account_id")?,
                }))
            }
            None => Ok(None),
        }
    }

    async fn put_api_key(&self, record: &ApiKeyRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO apikey (account_id, key_hash)
            VALUES ($1, $2)
            ON CONFLICT (account_id)
            DO UPDATE SET key_hash = EXCLUDED.key_hash, created_at = NOW()
            "#,
        )
        .bind(record.account_id)
        .bind(&record.key_hash)
        .execute(self.db.pool())
        .await
        .map_err(|e| map_unique_violation(e, "API key"))?;
        Ok(())
    }

    async fn record_metric(&self, metric: &Metric) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO metric (metric_id, account_id, user_id, occurred_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(metric.metric_id)
        .bind(metric.account_id)
        .bind(metric.user_id)
        .bind(metric.timestamp)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    async fn register_user(
        &self,
        user_id: Uuid,
        account_id: Uuid,
    ) -> Result<UserRegistration, StoreError> {
        let mut tx = self.db.pool().begin().await?;

        // Serializes registrations per account
        let plan: Option<String> =
            sqlx::query_scalar("SELECT plan FROM account WHERE account_id = $1 FOR UPDATE")
                .bind(account_id)
                .fetch_optional(&mut *tx)
                .await?;
        let plan = plan
            .ok_or_else(|| StoreError::NotFound(format!("account {}", account_id)))?
            .parse::<Plan>()
            .map_err(|e| StoreError::Database(sqlx::Error::Decode(e.into())))?;

        let existing: Option<bool> =
            sqlx::query_scalar("SELECT is_active FROM app_user WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;
        if let Some(is_active) = existing {
            tx.commit().await?;
            return Ok(UserRegistration::Existing { is_active });
        }

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM app_user WHERE account_id = $1")
            .bind(account_id)
            .fetch_one(&mut *tx)
            .await?;
        let is_active = count < plan.max_users();

        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO app_user (user_id, account_id, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            "#,
        )
        .bind(user_id)
        .bind(account_id)
        .bind(is_active)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(UserRegistration::Created { is_active })
    }

    async fn count_users(&self, account_id: Uuid) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM app_user WHERE account_id = $1")
            .bind(account_id)
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }

    async fn upgrade_account(&self, account_id: Uuid, plan: Plan) -> Result<i64, StoreError> {
        let mut tx = self.db.pool().begin().await?;

        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT account_id FROM account WHERE account_id = $1 FOR UPDATE")
                .bind(account_id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(StoreError::NotFound(format!("account {}", account_id)));
        }

        sqlx::query("UPDATE account SET plan = $2, updated_at = NOW() WHERE account_id = $1")
            .bind(account_id)
            .bind(plan.as_str())
            .execute(&mut *tx)
            .await?;

        // Oldest users first, up to the new plan's limit
        sqlx::query(
            r#"
            UPDATE app_user SET is_active = TRUE, updated_at = NOW()
            WHERE user_id IN (
                SELECT user_id FROM app_user
                WHERE account_id = $1
                ORDER BY created_at
                LIMIT $2
            ) AND is_active = FALSE
            "#,
        )
        .bind(account_id)
        .bind(plan.max_users())
        .execute(&mut *tx)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM app_user WHERE account_id = $1")
            .bind(account_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(total)
    }
}
