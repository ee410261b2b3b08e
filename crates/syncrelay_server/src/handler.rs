//! Request handlers for relay endpoints.
//!
//! Every handler follows the same shape:
//! 1. validate the body (no store access on failure)
//! 2. open one store connection
//! 3. authenticate the tenant
//! 4. do the work
//! 5. release the connection, on every path
//!
//! Steps 2 to 4 run under [`ServerConfig::request_timeout`]. Step 5 has its
//! own bound and never changes the outcome of the request.

use crate::auth::{authenticate, Credentials};
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::lock::TenantLocks;
use std::future::Future;
use std::sync::Arc;
use syncrelay_protocol::{
    CredentialsRequest, CredentialsResponse, RecordFields, SyncDataRequest, SyncDataResponse,
    SyncLogRequest, SyncLogResponse, SyncStatus,
};
use syncrelay_store::{
    ClientRecord, NewSyncLog, StoreConnection, StoreGateway, StoreResult, StoreTransaction,
};

/// Audit message written by a successful replace-sync.
pub const SYNC_SUCCESS_MESSAGE: &str = "Sync completed successfully";

const MISSING_CREDENTIALS: &str = "Missing clientId or accessToken";
const MISSING_FIELDS: &str = "Missing required fields";

/// Context for request handling.
pub struct HandlerContext {
    /// Server configuration.
    pub config: ServerConfig,
    /// Store gateway (one connection per request).
    pub gateway: Arc<dyn StoreGateway>,
    /// Replace-sync serialization per tenant.
    pub locks: TenantLocks,
}

impl HandlerContext {
    /// Creates a new handler context.
    pub fn new(config: ServerConfig, gateway: Arc<dyn StoreGateway>) -> Self {
        Self {
            config,
            gateway,
            locks: TenantLocks::new(),
        }
    }
}

/// Handler for relay requests.
#[derive(Clone)]
pub struct RequestHandler {
    context: Arc<HandlerContext>,
}

impl RequestHandler {
    /// Creates a new request handler.
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }

    /// Returns the shared context.
    pub fn context(&self) -> &HandlerContext {
        &self.context
    }

    /// Returns the delegated database credentials of a tenant.
    pub async fn disclose_credentials(
        &self,
        request: CredentialsRequest,
    ) -> ServerResult<CredentialsResponse> {
        let credentials = Credentials::from_parts(request.client_id, request.access_token)
            .ok_or_else(|| ServerError::invalid(MISSING_CREDENTIALS))?;

        let mut slot = None;
        let verdict = self
            .bounded(async {
                let conn = self.open_into(&mut slot).await?;
                authenticate(conn, &credentials)
                    .await
                    .map_err(ServerError::from)
            })
            .await;
        self.release(slot).await;

        let tenant = verdict
            .inspect_err(|e| report(credentials.client_id(), "credentials", e))?
            .into_tenant()?;

        Ok(CredentialsResponse {
            db_user: tenant.db_user,
            db_password: tenant.db_password,
        })
    }

    /// Replaces a tenant's record partition with a new batch.
    ///
    /// Delete, inserts and the SUCCESS audit entry commit as one unit. Any
    /// failure after authentication rolls the unit back and appends a
    /// FAILED entry through a fresh connection.
    pub async fn replace_sync(&self, request: SyncDataRequest) -> ServerResult<SyncDataResponse> {
        let (credentials, data) =
            match Credentials::from_parts(request.client_id, request.access_token) {
                Some(credentials) => match request.data {
                    Some(data) => (credentials, data),
                    None => return Err(ServerError::invalid(MISSING_FIELDS)),
                },
                None => return Err(ServerError::invalid(MISSING_FIELDS)),
            };

        let max = self.context.config.max_records_per_sync;
        if max > 0 && data.len() > max {
            return Err(ServerError::invalid(format!(
                "Too many records: {} > {}",
                data.len(),
                max
            )));
        }

        let batch: Vec<RecordFields> = data.iter().map(|raw| raw.normalize()).collect();

        // The timeout ends at commit; releasing the connection afterwards
        // cannot turn a committed sync into a failure.
        let mut authenticated = false;
        let mut slot = None;
        let result = self
            .bounded(self.replace_on(&mut slot, &credentials, batch, &mut authenticated))
            .await;
        self.release(slot).await;

        match result {
            Ok(count) => {
                tracing::info!(
                    client_id = %credentials.client_id(),
                    records = count,
                    "Replace-sync committed"
                );
                Ok(SyncDataResponse::new(count))
            }
            Err(e) => {
                report(credentials.client_id(), "replace-sync", &e);
                if authenticated {
                    self.record_failure(credentials.client_id(), &e).await;
                }
                Err(e)
            }
        }
    }

    /// Appends a caller supplied audit entry.
    pub async fn record_log(&self, request: SyncLogRequest) -> ServerResult<SyncLogResponse> {
        let credentials = Credentials::from_parts(request.client_id, request.access_token)
            .ok_or_else(|| ServerError::invalid(MISSING_FIELDS))?;
        let status = request
            .status
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ServerError::invalid(MISSING_FIELDS))?;

        let entry = NewSyncLog::new(
            credentials.client_id(),
            request.record_count.unwrap_or(0),
            status,
            request.message.unwrap_or_default(),
        );

        let mut slot = None;
        let result = self
            .bounded(async {
                let conn = self.open_into(&mut slot).await?;
                append_authenticated(conn, &credentials, &entry).await
            })
            .await;
        self.release(slot).await;
        result.inspect_err(|e| report(credentials.client_id(), "sync log", e))?;

        Ok(SyncLogResponse::accepted())
    }

    async fn replace_on(
        &self,
        slot: &mut Option<Box<dyn StoreConnection>>,
        credentials: &Credentials,
        batch: Vec<RecordFields>,
        authenticated: &mut bool,
    ) -> ServerResult<u64> {
        let conn = self.open_into(slot).await?;
        authenticate(conn, credentials).await?.into_tenant()?;
        *authenticated = true;

        let guard = self.context.locks.acquire(credentials.client_id()).await;
        let client_id = guard.client_id();
        tracing::debug!(client_id = %client_id, "Tenant lock acquired");

        let mut tx = conn.begin().await?;
        match apply_replace(tx.as_mut(), client_id, batch).await {
            Ok(count) => {
                tx.commit().await?;
                Ok(count)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::error!(
                        client_id = %client_id,
                        error = %rollback,
                        "Rollback failed"
                    );
                }
                Err(ServerError::PartialFailure(e.to_string()))
            }
        }
    }

    /// Best effort FAILED entry. Never surfaces its own failure.
    async fn record_failure(&self, client_id: &str, error: &ServerError) {
        let entry = NewSyncLog::new(client_id, 0, SyncStatus::Failed.as_str(), error.detail());

        let attempt = async {
            let mut conn = self.context.gateway.connect().await?;
            let result = conn.append_sync_log(&entry).await;
            close(conn).await;
            result
        };

        match tokio::time::timeout(self.context.config.request_timeout, attempt).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!(client_id = %client_id, error = %e, "Failed to log sync failure");
            }
            Err(_) => {
                tracing::error!(client_id = %client_id, "Timed out logging sync failure");
            }
        }
    }

    /// Opens a connection into `slot`, which outlives the request timeout.
    async fn open_into<'s>(
        &self,
        slot: &'s mut Option<Box<dyn StoreConnection>>,
    ) -> ServerResult<&'s mut dyn StoreConnection> {
        let conn = self.context.gateway.connect().await?;
        Ok(slot.insert(conn).as_mut())
    }

    /// Releases the request's connection, if one was opened.
    ///
    /// Bounded separately from the request; a slow close is only logged.
    async fn release(&self, slot: Option<Box<dyn StoreConnection>>) {
        let Some(conn) = slot else { return };
        let timeout = self.context.config.request_timeout;
        if tokio::time::timeout(timeout, close(conn)).await.is_err() {
            tracing::warn!(?timeout, "Timed out releasing store connection");
        }
    }

    async fn bounded<T, F>(&self, work: F) -> ServerResult<T>
    where
        F: Future<Output = ServerResult<T>>,
    {
        let timeout = self.context.config.request_timeout;
        tokio::time::timeout(timeout, work)
            .await
            .map_err(|_| ServerError::Timeout(timeout))?
    }
}

async fn apply_replace(
    tx: &mut (dyn StoreTransaction + '_),
    client_id: &str,
    batch: Vec<RecordFields>,
) -> StoreResult<u64> {
    tx.lock_partition(client_id).await?;
    let removed = tx.delete_client_records(client_id).await?;

    let mut count = 0u64;
    for fields in batch {
        let record = ClientRecord {
            code: fields.code,
            name: fields.name,
            address: fields.address,
            branch: fields.branch,
            client_id: client_id.to_string(),
        };
        tx.insert_client_record(&record).await?;
        count += 1;
    }

    tx.append_sync_log(&NewSyncLog::new(
        client_id,
        count,
        SyncStatus::Success.as_str(),
        SYNC_SUCCESS_MESSAGE,
    ))
    .await?;

    tracing::debug!(client_id = %client_id, removed, inserted = count, "Partition replaced");
    Ok(count)
}

async fn append_authenticated(
    conn: &mut dyn StoreConnection,
    credentials: &Credentials,
    entry: &NewSyncLog,
) -> ServerResult<()> {
    authenticate(conn, credentials).await?.into_tenant()?;
    conn.append_sync_log(entry).await?;
    Ok(())
}

/// Closes a connection, logging (not returning) a failed close.
async fn close(conn: Box<dyn StoreConnection>) {
    if let Err(e) = conn.close().await {
        tracing::warn!(error = %e, "Failed to release store connection");
    }
}

fn report(client_id: &str, operation: &str, error: &ServerError) {
    match error {
        ServerError::Store(e) if e.is_connection() => {
            tracing::error!(client_id = %client_id, operation, error = %e, "Store unreachable");
        }
        e if e.is_server_error() => {
            tracing::error!(client_id = %client_id, operation, error = %e, "Request failed");
        }
        _ => {}
    }
}
