//! # SyncRelay Store
//!
//! Store gateway trait and implementations for SyncRelay.
//!
//! This crate is the only place that talks to the relational store. The
//! relay opens one connection per request, issues parameterized statements
//! through it and releases it before the response goes out.
//!
//! ## Tables
//!
//! - `sync_users` - provisioned tenants ([`Tenant`])
//! - `rrc_clients` - tenant-scoped records ([`ClientRecord`])
//! - `sync_logs` - append-only audit trail ([`SyncLogEntry`])
//!
//! ## Available Gateways
//!
//! - [`InMemoryStore`] - For testing and ephemeral deployments
//! - [`PostgresStore`] - PostgreSQL via sqlx (feature `postgres`, on by default)
//!
//! ## Transactions
//!
//! Replacing a tenant partition goes through [`StoreTransaction`]: writes
//! become visible only on commit and are discarded on rollback or drop.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod error;
mod gateway;
mod memory;
mod models;
#[cfg(feature = "postgres")]
mod postgres;

pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use gateway::{StoreConnection, StoreGateway, StoreTransaction};
pub use memory::InMemoryStore;
pub use models::{ClientRecord, NewSyncLog, SyncLogEntry, Tenant};
#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;
