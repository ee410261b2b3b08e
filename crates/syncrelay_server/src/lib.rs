//! # Sync Relay Server
//!
//! Token-gated HTTP relay between client applications and a shared
//! PostgreSQL database.
//!
//! This crate provides:
//! - HTTP endpoints (credentials, replace-sync, sync log)
//! - Tenant authentication by client identifier and access token
//! - Atomic replace-sync with audit logging
//! - Per-tenant serialization and request timeouts
//!
//! # Replace-sync
//!
//! A replace-sync swaps a tenant's whole record partition for a new batch:
//! 1. Authenticate the tenant
//! 2. Acquire the tenant lock
//! 3. Delete the partition, insert the batch, append a SUCCESS log entry
//! 4. Commit, or roll back and append a FAILED log entry
//!
//! Readers never see an empty or half-written partition.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use syncrelay_server::{EnvConfig, SyncServer};
//! use syncrelay_store::PostgresStore;
//!
//! let env = EnvConfig::from_env()?;
//! let store = PostgresStore::new(&env.store);
//! SyncServer::new(env.server, Arc::new(store)).serve().await?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod auth;
mod config;
mod error;
mod handler;
mod http;
mod lock;
mod server;

pub use auth::{authenticate, AuthVerdict, Credentials};
pub use config::{ConfigError, EnvConfig, ServerConfig};
pub use error::{ServerError, ServerResult, SERVER_ERROR_MESSAGE, UNAUTHORIZED_MESSAGE};
pub use handler::{HandlerContext, RequestHandler, SYNC_SUCCESS_MESSAGE};
pub use http::router;
pub use lock::{TenantGuard, TenantLocks};
pub use server::SyncServer;
