//! In-memory store for testing and ephemeral deployments.

use crate::error::{StoreError, StoreResult};
use crate::gateway::{StoreConnection, StoreGateway, StoreTransaction};
use crate::models::{ClientRecord, NewSyncLog, SyncLogEntry, Tenant};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Tables {
    tenants: HashMap<String, Tenant>,
    records: Vec<ClientRecord>,
    logs: Vec<SyncLogEntry>,
}

#[derive(Debug)]
struct Shared {
    tables: RwLock<Tables>,
    opened: AtomicUsize,
    open: AtomicUsize,
    available: AtomicBool,
}

/// An in-memory store.
///
/// Behaves like the relational store as far as the relay can tell:
/// - tenants are unique per `client_id`
/// - transactional writes are buffered and applied under one write lock
///   on commit, so readers never see a half-replaced partition
/// - dropped transactions leave no trace
///
/// The store also counts connections, which lets tests check that a
/// request opened none, or that every connection it opened was released.
///
/// Cloning is cheap; clones share the same tables.
///
/// # Example
///
/// ```rust
/// use syncrelay_store::{InMemoryStore, StoreConnection, StoreGateway, Tenant};
///
/// # tokio_test_block(async {
/// let store = InMemoryStore::with_tenants([Tenant::new("c1", "t1", "u", "p")]);
/// let mut conn = store.connect().await.unwrap();
/// assert!(conn.find_tenant("c1", "t1").await.unwrap().is_some());
/// conn.close().await.unwrap();
/// assert_eq!(store.open_connections(), 0);
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    shared: Arc<Shared>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self {
            shared: Arc::new(Shared {
                tables: RwLock::new(Tables::default()),
                opened: AtomicUsize::new(0),
                open: AtomicUsize::new(0),
                available: AtomicBool::new(true),
            }),
        }
    }
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store provisioned with the given tenants.
    #[must_use]
    pub fn with_tenants(tenants: impl IntoIterator<Item = Tenant>) -> Self {
        let store = Self::new();
        for tenant in tenants {
            store.add_tenant(tenant);
        }
        store
    }

    /// Provisions a tenant, replacing any row with the same `client_id`.
    pub fn add_tenant(&self, tenant: Tenant) {
        self.shared
            .tables
            .write()
            .tenants
            .insert(tenant.client_id.clone(), tenant);
    }

    /// Makes subsequent `connect` calls fail (or succeed again).
    pub fn set_available(&self, available: bool) {
        self.shared.available.store(available, Ordering::SeqCst);
    }

    /// Returns the committed records of a tenant without opening a connection.
    #[must_use]
    pub fn records(&self, client_id: &str) -> Vec<ClientRecord> {
        self.shared
            .tables
            .read()
            .records
            .iter()
            .filter(|r| r.client_id == client_id)
            .cloned()
            .collect()
    }

    /// Returns the audit entries of a tenant without opening a connection.
    #[must_use]
    pub fn logs(&self, client_id: &str) -> Vec<SyncLogEntry> {
        self.shared
            .tables
            .read()
            .logs
            .iter()
            .filter(|e| e.client_id == client_id)
            .cloned()
            .collect()
    }

    /// Total number of connections opened so far.
    #[must_use]
    pub fn connections_opened(&self) -> usize {
        self.shared.opened.load(Ordering::SeqCst)
    }

    /// Number of connections currently open.
    #[must_use]
    pub fn open_connections(&self) -> usize {
        self.shared.open.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoreGateway for InMemoryStore {
    async fn connect(&self) -> StoreResult<Box<dyn StoreConnection>> {
        if !self.shared.available.load(Ordering::SeqCst) {
            return Err(StoreError::Connection("in-memory store unavailable".into()));
        }
        self.shared.opened.fetch_add(1, Ordering::SeqCst);
        self.shared.open.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryConnection {
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct MemoryConnection {
    shared: Arc<Shared>,
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        self.shared.open.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl StoreConnection for MemoryConnection {
    async fn find_tenant(
        &mut self,
        client_id: &str,
        access_token: &str,
    ) -> StoreResult<Option<Tenant>> {
        let tables = self.shared.tables.read();
        Ok(tables
            .tenants
            .get(client_id)
            .filter(|t| t.access_token == access_token)
            .cloned())
    }

    async fn append_sync_log(&mut self, entry: &NewSyncLog) -> StoreResult<()> {
        self.shared.tables.write().logs.push(stamp(entry.clone()));
        Ok(())
    }

    async fn client_records(&mut self, client_id: &str) -> StoreResult<Vec<ClientRecord>> {
        let tables = self.shared.tables.read();
        Ok(tables
            .records
            .iter()
            .filter(|r| r.client_id == client_id)
            .cloned()
            .collect())
    }

    async fn sync_logs(&mut self, client_id: &str) -> StoreResult<Vec<SyncLogEntry>> {
        let tables = self.shared.tables.read();
        Ok(tables
            .logs
            .iter()
            .filter(|e| e.client_id == client_id)
            .cloned()
            .collect())
    }

    async fn begin<'a>(&'a mut self) -> StoreResult<Box<dyn StoreTransaction + 'a>> {
        Ok(Box::new(MemoryTransaction {
            shared: &self.shared,
            cleared: Vec::new(),
            inserts: Vec::new(),
            logs: Vec::new(),
        }))
    }

    async fn close(self: Box<Self>) -> StoreResult<()> {
        // Drop releases the slot.
        Ok(())
    }
}

/// Buffered writes, applied on commit.
struct MemoryTransaction<'a> {
    shared: &'a Shared,
    cleared: Vec<String>,
    inserts: Vec<ClientRecord>,
    logs: Vec<NewSyncLog>,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction<'_> {
    async fn lock_partition(&mut self, _client_id: &str) -> StoreResult<()> {
        // Commits already apply under the table write lock.
        Ok(())
    }

    async fn delete_client_records(&mut self, client_id: &str) -> StoreResult<u64> {
        let committed = self
            .shared
            .tables
            .read()
            .records
            .iter()
            .filter(|r| r.client_id == client_id)
            .count();
        let pending = self.inserts.len();
        self.inserts.retain(|r| r.client_id != client_id);
        let pending_removed = pending - self.inserts.len();

        let already_cleared = self.cleared.iter().any(|c| c == client_id);
        if !already_cleared {
            self.cleared.push(client_id.to_string());
        }
        let committed_removed = if already_cleared { 0 } else { committed };
        Ok((committed_removed + pending_removed) as u64)
    }

    async fn insert_client_record(&mut self, record: &ClientRecord) -> StoreResult<()> {
        self.inserts.push(record.clone());
        Ok(())
    }

    async fn append_sync_log(&mut self, entry: &NewSyncLog) -> StoreResult<()> {
        self.logs.push(entry.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let this = *self;
        let mut tables = this.shared.tables.write();
        for client_id in &this.cleared {
            tables.records.retain(|r| &r.client_id != client_id);
        }
        tables.records.extend(this.inserts);
        tables.logs.extend(this.logs.into_iter().map(stamp));
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}

fn stamp(entry: NewSyncLog) -> SyncLogEntry {
    SyncLogEntry {
        client_id: entry.client_id,
        records_synced: entry.records_synced,
        status: entry.status,
        message: entry.message,
        created_at: Utc::now(),
    }
}
