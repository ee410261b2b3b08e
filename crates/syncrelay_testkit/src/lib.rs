//! # Sync Relay Testkit
//!
//! Test utilities for the sync relay.
//!
//! This crate provides:
//! - Tenant fixtures and seeded in-memory stores
//! - Record and request builders
//! - A fault-injecting store gateway
//! - Property-based generators for raw records
//! - Disposable PostgreSQL containers (feature `postgres`)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use syncrelay_testkit::prelude::*;
//!
//! let store = seeded_store();
//! let gateway = FaultyGateway::new(store.clone(), FaultPlan::new().fail_insert_at(1));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod faults;
pub mod fixtures;
pub mod generators;
#[cfg(feature = "postgres")]
pub mod postgres;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::faults::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use faults::*;
pub use fixtures::*;
pub use generators::*;
