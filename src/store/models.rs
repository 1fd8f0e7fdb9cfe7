//! Data models for accounts, API keys, metrics and metered users

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

// ============================================================================
// Plans
// ============================================================================

/// Billing plan. User limits are policy data, not computed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Plan {
    Free,
    Enterprise,
}

impl Plan {
    /// Maximum number of active users on this plan.
    pub fn max_users(self) -> i64 {
        match self {
            Plan::Free => 100,
            Plan::Enterprise => 1000,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Plan::Free => "FREE",
            Plan::Enterprise => "ENTERPRISE",
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Plan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FREE" => Ok(Plan::Free),
            "ENTERPRISE" => Ok(Plan::Enterprise),
            other => Err(format!("unknown plan: {}", other)),
        }
    }
}

// ============================================================================
// Rows
// ============================================================================

/// Tenant account
#[derive(Debug, Clone)]
pub struct Account {
    pub account_id: Uuid,
    pub plan: Plan,
    pub email: String,
    /// Argon2id PHC string
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stored API key. The plaintext key is never kept.
#[derive(Debug, Clone)]
pub struct ApiKeyRecord {
    /// SHA-256 hex digest of the key
    pub key_hash: String,
    pub account_id: Uuid,
}

/// One metered usage event
#[derive(Debug, Clone)]
pub struct Metric {
    pub metric_id: Uuid,
    pub account_id: Uuid,
    pub user_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

/// An end user seen in an account's metrics
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub account_id: Uuid,
    /// False once the account's plan limit was reached at creation time
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of registering a user sighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRegistration {
    /// The user already existed; nothing changed.
    Existing { is_active: bool },
    /// A new user row was created.
    Created { is_active: bool },
}

impl UserRegistration {
    pub fn is_active(self) -> bool {
        match self {
            Self::Existing { is_active } | Self::Created { is_active } => is_active,
        }
    }
}
