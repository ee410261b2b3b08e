//! Per-tenant mutual exclusion for replace-sync.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Serializes replace-sync calls per `client_id`.
///
/// Tenants never contend with each other. Entries are created on first use
/// and removed once no task holds or waits for them.
#[derive(Debug, Default)]
pub struct TenantLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl TenantLocks {
    /// Creates an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other task holds the lock for `client_id`.
    ///
    /// The lock is released when the returned guard is dropped.
    pub async fn acquire(&self, client_id: &str) -> TenantGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock();
            Arc::clone(locks.entry(client_id.to_string()).or_default())
        };
        let guard = Arc::clone(&lock).lock_owned().await;

        TenantGuard {
            table: self,
            client_id: client_id.to_string(),
            lock,
            guard: Some(guard),
        }
    }

    /// Number of tenants with a live entry.
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    /// Returns true if no tenant is locked or awaited.
    pub fn is_empty(&self) -> bool {
        self.locks.lock().is_empty()
    }
}

/// Holds one tenant's lock.
pub struct TenantGuard<'a> {
    table: &'a TenantLocks,
    client_id: String,
    lock: Arc<AsyncMutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl TenantGuard<'_> {
    /// The tenant this guard serializes.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }
}

impl Drop for TenantGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = self.table.locks.lock();
        // One reference in the table, one here: nobody else is waiting.
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.client_id);
        }
    }
}
