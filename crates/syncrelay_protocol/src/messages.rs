//! Request and response bodies.
//!
//! Every body is a JSON object with camelCase keys. Required request fields
//! are still modelled as `Option` so a missing field reaches the handler
//! and becomes a validation error instead of a deserialization failure.

use crate::record::RawRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome recorded for a replace-sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncStatus {
    /// The partition was replaced.
    Success,
    /// The replace-sync failed and was rolled back.
    Failed,
}

impl SyncStatus {
    /// Returns the label stored in the audit log.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Success => "SUCCESS",
            SyncStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `POST /auth/credentials`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsRequest {
    /// Claimed client identifier.
    pub client_id: Option<String>,
    /// Pre-shared access token.
    pub access_token: Option<String>,
}

impl CredentialsRequest {
    /// Creates a request with both fields set.
    pub fn new(client_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            client_id: Some(client_id.into()),
            access_token: Some(access_token.into()),
        }
    }
}

/// Delegated credentials returned to an authenticated tenant.
///
/// Holds nothing but the user and password: host, port and database name
/// of the delegation target are never disclosed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsResponse {
    /// Downstream database user.
    pub db_user: String,
    /// Downstream database password.
    pub db_password: String,
}

/// Body of `POST /sync/data`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncDataRequest {
    /// Claimed client identifier.
    pub client_id: Option<String>,
    /// Pre-shared access token.
    pub access_token: Option<String>,
    /// Replacement batch. An empty array is valid.
    pub data: Option<Vec<RawRecord>>,
}

impl SyncDataRequest {
    /// Creates a request carrying the given batch.
    pub fn new(
        client_id: impl Into<String>,
        access_token: impl Into<String>,
        data: Vec<RawRecord>,
    ) -> Self {
        Self {
            client_id: Some(client_id.into()),
            access_token: Some(access_token.into()),
            data: Some(data),
        }
    }
}

/// Successful reply to `POST /sync/data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncDataResponse {
    /// Always true; failures use [`ErrorResponse`].
    pub success: bool,
    /// Human readable summary.
    pub message: String,
    /// Number of records now stored for the tenant.
    pub record_count: u64,
}

impl SyncDataResponse {
    /// Creates the reply for a replace-sync that stored `record_count` rows.
    pub fn new(record_count: u64) -> Self {
        Self {
            success: true,
            message: format!("Successfully synced {record_count} records"),
            record_count,
        }
    }
}

/// Body of `POST /sync/log`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncLogRequest {
    /// Claimed client identifier.
    pub client_id: Option<String>,
    /// Pre-shared access token.
    pub access_token: Option<String>,
    /// Status label, stored verbatim.
    pub status: Option<String>,
    /// Defaults to 0.
    pub record_count: Option<u64>,
    /// Defaults to the empty string.
    pub message: Option<String>,
}

/// Successful reply to `POST /sync/log`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncLogResponse {
    /// Always true.
    pub success: bool,
}

impl SyncLogResponse {
    /// The accepted reply.
    pub fn accepted() -> Self {
        Self { success: true }
    }
}

/// Body of every non-200 reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Caller facing message.
    pub error: String,
}

impl ErrorResponse {
    /// Creates an error body.
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
