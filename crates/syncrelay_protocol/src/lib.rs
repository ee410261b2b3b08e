//! # SyncRelay Protocol
//!
//! Wire types for the SyncRelay HTTP surface.
//!
//! This crate provides:
//! - Request/response bodies for `/auth/credentials`, `/sync/data` and `/sync/log`
//! - [`RawRecord`] normalization with upper-case key precedence
//! - [`SyncStatus`] labels for the audit log
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod messages;
mod record;

pub use messages::{
    CredentialsRequest, CredentialsResponse, ErrorResponse, SyncDataRequest, SyncDataResponse,
    SyncLogRequest, SyncLogResponse, SyncStatus,
};
pub use record::{RawRecord, RecordFields};
