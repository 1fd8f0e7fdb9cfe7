//! Tenant accounts service
//!
//! Session and API-key authorization for a multi-tenant account service:
//! people log in with email and password and carry an opaque session ID,
//! machines post usage metrics with a per-account API key.
//!
//! - [`auth`]: tokens, password hashing, session store, the two gates
//! - [`store`]: accounts, API keys, metrics and users behind [`store::AccountStore`]
//! - [`gateway`]: axum router, handlers, OpenAPI document

pub mod auth;
pub mod config;
pub mod db;
pub mod gateway;
pub mod logging;
pub mod store;
