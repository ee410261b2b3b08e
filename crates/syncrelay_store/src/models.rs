//! Row types for the relay tables.

use chrono::{DateTime, Utc};
use std::fmt;

/// A registered client permitted to sync (`sync_users`).
///
/// Tenants are provisioned out-of-band; the relay only reads them.
#[derive(Clone, PartialEq, Eq)]
pub struct Tenant {
    /// Unique client identifier.
    pub client_id: String,
    /// Pre-shared access token.
    pub access_token: String,
    /// Delegated downstream database user.
    pub db_user: String,
    /// Delegated downstream database password.
    pub db_password: String,
}

impl Tenant {
    /// Creates a tenant row.
    pub fn new(
        client_id: impl Into<String>,
        access_token: impl Into<String>,
        db_user: impl Into<String>,
        db_password: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            access_token: access_token.into(),
            db_user: db_user.into(),
            db_password: db_password.into(),
        }
    }
}

// Secrets stay out of log output.
impl fmt::Debug for Tenant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tenant")
            .field("client_id", &self.client_id)
            .field("access_token", &"<redacted>")
            .field("db_user", &self.db_user)
            .field("db_password", &"<redacted>")
            .finish()
    }
}

/// A tenant-scoped row of `rrc_clients`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientRecord {
    /// Record code.
    pub code: Option<String>,
    /// Display name.
    pub name: Option<String>,
    /// Postal address.
    pub address: Option<String>,
    /// Branch label.
    pub branch: Option<String>,
    /// Owning tenant.
    pub client_id: String,
}

/// An audit entry to append to `sync_logs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSyncLog {
    /// Tenant the entry belongs to.
    pub client_id: String,
    /// Number of records the sync touched.
    pub records_synced: u64,
    /// Outcome label (`SUCCESS`, `FAILED`, or a caller supplied string).
    pub status: String,
    /// Free text.
    pub message: String,
}

impl NewSyncLog {
    /// Creates a new audit entry.
    pub fn new(
        client_id: impl Into<String>,
        records_synced: u64,
        status: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            records_synced,
            status: status.into(),
            message: message.into(),
        }
    }
}

/// A persisted audit entry, timestamped by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncLogEntry {
    /// Tenant the entry belongs to.
    pub client_id: String,
    /// Number of records the sync touched.
    pub records_synced: u64,
    /// Outcome label.
    pub status: String,
    /// Free text.
    pub message: String,
    /// When the store accepted the entry.
    pub created_at: DateTime<Utc>,
}
