//! Tenant accounts gateway
//!
//! ```text
//! ┌──────────┐    ┌──────────────┐    ┌──────────┐    ┌──────────────┐
//! │  Client  │───▶│ Gate         │───▶│ Handler  │───▶│ AccountStore │
//! │ (Bearer) │    │(session/key) │    │          │    │ (PG / memory)│
//! └──────────┘    └──────────────┘    └──────────┘    └──────────────┘
//! ```
//!
//! Usage: `tenant_accounts [--env dev] [--port 8080] [--session-timeout 3600]`

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;

use tenant_accounts::auth::{PasswordHasher, SessionStore};
use tenant_accounts::config::AppConfig;
use tenant_accounts::db::Database;
use tenant_accounts::gateway::{build_router, run_server, state::AppState};
use tenant_accounts::store::{
    AccountStore, DEV_EMAIL, DEV_PASSWORD, InMemoryStore, PgAccountStore, seed_dev_account,
};

// ============================================================
// COMMAND LINE
// ============================================================

fn get_arg(names: &[&str]) -> Option<String> {
    let args: Vec<String> = std::env::args().collect();
    args.windows(2)
        .find(|pair| names.contains(&pair[0].as_str()))
        .map(|pair| pair[1].clone())
}

fn get_env() -> String {
    get_arg(&["--env", "-e"]).unwrap_or_else(|| "dev".to_string())
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    get_arg(&["--port"]).and_then(|p| p.parse().ok())
}

/// Get session timeout override in seconds (--session-timeout argument)
fn get_session_timeout_override() -> Option<u64> {
    get_arg(&["--session-timeout"]).and_then(|s| s.parse().ok())
}

// ============================================================
// MAIN
// ============================================================

fn main() -> ExitCode {
    let env = get_env();
    let mut app_config = match AppConfig::load(&env) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {:#}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(port) = get_port_override() {
        app_config.gateway.port = port;
    }
    if let Some(secs) = get_session_timeout_override() {
        app_config.auth.session_timeout_secs = secs;
    }

    let _log_guard = tenant_accounts::logging::init_logging(&app_config);
    tracing::info!(
        git_hash = env!("GIT_HASH"),
        "Starting tenant_accounts in {} mode",
        env
    );

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("FATAL: failed to start tokio runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(serve(app_config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("FATAL: {:#}", e);
            eprintln!("FATAL: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let passwords = PasswordHasher::new(
        config.auth.password_memory_kib,
        config.auth.password_iterations,
        config.auth.password_parallelism,
    )
    .context("invalid password hashing parameters")?;

    let sessions = Arc::new(SessionStore::with_token_bytes(
        config.auth.session_timeout(),
        config.auth.token_bytes,
    ));
    tracing::info!(
        timeout_secs = config.auth.session_timeout_secs,
        "Session store ready"
    );

    let (store, pg_db): (Arc<dyn AccountStore>, Option<Arc<Database>>) =
        match config.postgres_url.as_deref() {
            Some(url) => {
                let db = Arc::new(
                    Database::connect(url, config.postgres_max_connections)
                        .await
                        .context("failed to connect to PostgreSQL")?,
                );
                let pg = PgAccountStore::new(Arc::clone(&db));
                pg.init_schema()
                    .await
                    .context("failed to create database schema")?;
                (Arc::new(pg), Some(db))
            }
            None => {
                tracing::warn!("No postgres_url configured, using in-memory store");
                (Arc::new(InMemoryStore::new()), None)
            }
        };

    if config.seed_dev_data {
        let (account, key) = seed_dev_account(&store, &passwords, config.auth.token_bytes)
            .await
            .context("failed to seed dev data")?;
        tracing::info!(account_id = %account.account_id, "Dev account seeded");
        // stdout only: the key must never reach the log files
        println!("Dev account:  {} / {}", DEV_EMAIL, DEV_PASSWORD);
        println!("Account ID:   {}", account.account_id);
        println!("API key:      {}", key.as_str());
    }

    let mut state = AppState::new(sessions, store, passwords, config.gateway.body_limit_bytes);
    if let Some(db) = pg_db {
        state = state.with_database(db);
    }

    let app = build_router(state);
    run_server(&config.gateway.host, config.gateway.port, app).await
}
