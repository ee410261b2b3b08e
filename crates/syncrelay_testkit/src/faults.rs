//! Fault injection for store gateways.
//!
//! [`FaultyGateway`] wraps an [`InMemoryStore`] and fails selected
//! operations according to a [`FaultPlan`]. It also tracks how many
//! transactions are open at once, which lets concurrency tests assert that
//! replace-syncs of one tenant never overlap.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use syncrelay_store::{
    ClientRecord, InMemoryStore, NewSyncLog, StoreConnection, StoreError, StoreGateway,
    StoreResult, StoreTransaction, SyncLogEntry, Tenant,
};

/// Which operations should fail.
#[derive(Debug, Clone, Default)]
pub struct FaultPlan {
    fail_insert_at: Option<usize>,
    fail_connection_logs: bool,
    fail_connects_after: Option<usize>,
    fail_commit: bool,
    insert_delay: Option<Duration>,
    close_delay: Option<Duration>,
}

impl FaultPlan {
    /// A plan that injects nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the `index`-th (0-based) insert of every transaction.
    pub fn fail_insert_at(mut self, index: usize) -> Self {
        self.fail_insert_at = Some(index);
        self
    }

    /// Fails audit appends made outside a transaction.
    pub fn fail_connection_logs(mut self) -> Self {
        self.fail_connection_logs = true;
        self
    }

    /// Lets `count` connects succeed, then fails every later one.
    pub fn fail_connects_after(mut self, count: usize) -> Self {
        self.fail_connects_after = Some(count);
        self
    }

    /// Fails every commit.
    pub fn fail_commit(mut self) -> Self {
        self.fail_commit = true;
        self
    }

    /// Sleeps before each insert.
    pub fn insert_delay(mut self, delay: Duration) -> Self {
        self.insert_delay = Some(delay);
        self
    }

    /// Sleeps before closing each connection.
    pub fn close_delay(mut self, delay: Duration) -> Self {
        self.close_delay = Some(delay);
        self
    }
}

#[derive(Debug, Default)]
struct FaultState {
    connects: AtomicUsize,
    active_tx: AtomicUsize,
    max_active_tx: AtomicUsize,
}

/// A gateway that injects failures into an [`InMemoryStore`].
#[derive(Debug, Clone)]
pub struct FaultyGateway {
    inner: InMemoryStore,
    plan: Arc<FaultPlan>,
    state: Arc<FaultState>,
}

impl FaultyGateway {
    /// Wraps `inner` with the given plan.
    pub fn new(inner: InMemoryStore, plan: FaultPlan) -> Self {
        Self {
            inner,
            plan: Arc::new(plan),
            state: Arc::new(FaultState::default()),
        }
    }

    /// Returns the wrapped store.
    pub fn store(&self) -> &InMemoryStore {
        &self.inner
    }

    /// Highest number of transactions that were open at the same time.
    pub fn max_concurrent_transactions(&self) -> usize {
        self.state.max_active_tx.load(Ordering::SeqCst)
    }

    /// Number of transactions currently open.
    pub fn active_transactions(&self) -> usize {
        self.state.active_tx.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoreGateway for FaultyGateway {
    async fn connect(&self) -> StoreResult<Box<dyn StoreConnection>> {
        let attempt = self.state.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(limit) = self.plan.fail_connects_after {
            if attempt >= limit {
                return Err(StoreError::Connection(format!(
                    "injected: connect #{attempt} refused"
                )));
            }
        }

        let inner = self.inner.connect().await?;
        Ok(Box::new(FaultyConnection {
            inner,
            plan: Arc::clone(&self.plan),
            state: Arc::clone(&self.state),
        }))
    }
}

struct FaultyConnection {
    inner: Box<dyn StoreConnection>,
    plan: Arc<FaultPlan>,
    state: Arc<FaultState>,
}

#[async_trait]
impl StoreConnection for FaultyConnection {
    async fn find_tenant(
        &mut self,
        client_id: &str,
        access_token: &str,
    ) -> StoreResult<Option<Tenant>> {
        self.inner.find_tenant(client_id, access_token).await
    }

    async fn append_sync_log(&mut self, entry: &NewSyncLog) -> StoreResult<()> {
        if self.plan.fail_connection_logs {
            return Err(StoreError::Injected("sync log append".into()));
        }
        self.inner.append_sync_log(entry).await
    }

    async fn client_records(&mut self, client_id: &str) -> StoreResult<Vec<ClientRecord>> {
        self.inner.client_records(client_id).await
    }

    async fn sync_logs(&mut self, client_id: &str) -> StoreResult<Vec<SyncLogEntry>> {
        self.inner.sync_logs(client_id).await
    }

    async fn begin<'a>(&'a mut self) -> StoreResult<Box<dyn StoreTransaction + 'a>> {
        let inner = self.inner.begin().await?;
        Ok(Box::new(FaultyTransaction {
            inner,
            plan: &self.plan,
            inserts: 0,
            _active: ActiveTx::enter(&self.state),
        }))
    }

    async fn close(self: Box<Self>) -> StoreResult<()> {
        if let Some(delay) = self.plan.close_delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.close().await
    }
}

/// Counts an open transaction until dropped.
struct ActiveTx<'a>(&'a FaultState);

impl<'a> ActiveTx<'a> {
    fn enter(state: &'a FaultState) -> Self {
        let now = state.active_tx.fetch_add(1, Ordering::SeqCst) + 1;
        state.max_active_tx.fetch_max(now, Ordering::SeqCst);
        Self(state)
    }
}

impl Drop for ActiveTx<'_> {
    fn drop(&mut self) {
        self.0.active_tx.fetch_sub(1, Ordering::SeqCst);
    }
}

struct FaultyTransaction<'a> {
    inner: Box<dyn StoreTransaction + 'a>,
    plan: &'a FaultPlan,
    inserts: usize,
    _active: ActiveTx<'a>,
}

#[async_trait]
impl StoreTransaction for FaultyTransaction<'_> {
    async fn lock_partition(&mut self, client_id: &str) -> StoreResult<()> {
        self.inner.lock_partition(client_id).await
    }

    async fn delete_client_records(&mut self, client_id: &str) -> StoreResult<u64> {
        self.inner.delete_client_records(client_id).await
    }

    async fn insert_client_record(&mut self, record: &ClientRecord) -> StoreResult<()> {
        if let Some(delay) = self.plan.insert_delay {
            tokio::time::sleep(delay).await;
        }
        let index = self.inserts;
        self.inserts += 1;
        if self.plan.fail_insert_at == Some(index) {
            return Err(StoreError::Injected(format!("insert #{index}")));
        }
        self.inner.insert_client_record(record).await
    }

    async fn append_sync_log(&mut self, entry: &NewSyncLog) -> StoreResult<()> {
        self.inner.append_sync_log(entry).await
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        if self.plan.fail_commit {
            return Err(StoreError::Injected("commit".into()));
        }
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.inner.rollback().await
    }
}
