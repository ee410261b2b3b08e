//! Store gateway trait definitions.

use crate::error::StoreResult;
use crate::models::{ClientRecord, NewSyncLog, SyncLogEntry, Tenant};
use async_trait::async_trait;

/// Opens short-lived connections to the relational store.
///
/// Gateways own no per-request state. Every call to [`connect`] returns a
/// fresh connection which the caller must release with
/// [`StoreConnection::close`] once the request is done. Connections also
/// release themselves on drop, so an early return never leaks one.
///
/// # Implementors
///
/// - [`super::InMemoryStore`] - For testing and ephemeral deployments
/// - `PostgresStore` - One `PgConnection` per request (feature `postgres`)
///
/// [`connect`]: StoreGateway::connect
#[async_trait]
pub trait StoreGateway: Send + Sync {
    /// Opens a new connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached.
    async fn connect(&self) -> StoreResult<Box<dyn StoreConnection>>;
}

/// A single connection to the store.
///
/// All statements are parameterized; caller supplied strings are never
/// spliced into SQL text.
#[async_trait]
pub trait StoreConnection: Send {
    /// Looks up the tenant matching both `client_id` and `access_token`.
    ///
    /// Returns `None` when no row matches either field.
    async fn find_tenant(
        &mut self,
        client_id: &str,
        access_token: &str,
    ) -> StoreResult<Option<Tenant>>;

    /// Appends an audit entry outside of any transaction.
    async fn append_sync_log(&mut self, entry: &NewSyncLog) -> StoreResult<()>;

    /// Returns the committed records of a tenant.
    async fn client_records(&mut self, client_id: &str) -> StoreResult<Vec<ClientRecord>>;

    /// Returns the audit entries of a tenant, oldest first.
    async fn sync_logs(&mut self, client_id: &str) -> StoreResult<Vec<SyncLogEntry>>;

    /// Starts a transaction on this connection.
    ///
    /// Writes made through the transaction become visible to other
    /// connections only once [`StoreTransaction::commit`] succeeds.
    async fn begin<'a>(&'a mut self) -> StoreResult<Box<dyn StoreTransaction + 'a>>;

    /// Releases the connection.
    async fn close(self: Box<Self>) -> StoreResult<()>;
}

/// An open transaction.
///
/// Dropping a transaction without committing rolls it back.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Serializes writers of one tenant partition until the transaction ends.
    async fn lock_partition(&mut self, client_id: &str) -> StoreResult<()>;

    /// Deletes every record of a tenant, returning how many rows went away.
    async fn delete_client_records(&mut self, client_id: &str) -> StoreResult<u64>;

    /// Inserts one record.
    async fn insert_client_record(&mut self, record: &ClientRecord) -> StoreResult<()>;

    /// Appends an audit entry as part of the transaction.
    async fn append_sync_log(&mut self, entry: &NewSyncLog) -> StoreResult<()>;

    /// Makes all writes visible atomically.
    async fn commit(self: Box<Self>) -> StoreResult<()>;

    /// Discards all writes.
    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}
