//! PostgreSQL store, one connection per request.
//!
//! Expected tables:
//!
//! ```sql
//! CREATE TABLE sync_users (
//!     client_id    TEXT PRIMARY KEY,
//!     access_token TEXT NOT NULL,
//!     db_user      TEXT NOT NULL,
//!     db_password  TEXT NOT NULL
//! );
//! CREATE TABLE rrc_clients (
//!     code      TEXT,
//!     name      TEXT,
//!     address   TEXT,
//!     branch    TEXT,
//!     client_id TEXT NOT NULL
//! );
//! CREATE TABLE sync_logs (
//!     client_id      TEXT NOT NULL,
//!     records_synced INTEGER NOT NULL,
//!     status         TEXT NOT NULL,
//!     message        TEXT NOT NULL,
//!     created_at     TIMESTAMPTZ NOT NULL DEFAULT now()
//! );
//! ```
//!
//! The relay never creates or migrates them.

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::gateway::{StoreConnection, StoreGateway, StoreTransaction};
use crate::models::{ClientRecord, NewSyncLog, SyncLogEntry, Tenant};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow, PgSslMode};
use sqlx::{Connection, Postgres, Row, Transaction};

/// Gateway that dials PostgreSQL for every request.
///
/// No pool: each [`connect`](StoreGateway::connect) performs a fresh
/// handshake and each connection is closed when its request finishes.
pub struct PostgresStore {
    options: PgConnectOptions,
}

impl PostgresStore {
    /// Creates a gateway from connection settings.
    pub fn new(config: &StoreConfig) -> Self {
        let mut options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.database)
            .ssl_mode(if config.ssl {
                PgSslMode::Require
            } else {
                PgSslMode::Disable
            });

        if let Some(user) = &config.user {
            options = options.username(user);
        }
        if let Some(password) = &config.password {
            options = options.password(password);
        }

        tracing::info!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            user = config.user.as_deref().unwrap_or("<none>"),
            ssl = config.ssl,
            "Configured PostgreSQL store"
        );

        Self { options }
    }
}

#[async_trait]
impl StoreGateway for PostgresStore {
    async fn connect(&self) -> StoreResult<Box<dyn StoreConnection>> {
        let conn = PgConnection::connect_with(&self.options)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(Box::new(PgStoreConnection { conn }))
    }
}

struct PgStoreConnection {
    conn: PgConnection,
}

#[async_trait]
impl StoreConnection for PgStoreConnection {
    async fn find_tenant(
        &mut self,
        client_id: &str,
        access_token: &str,
    ) -> StoreResult<Option<Tenant>> {
        let row = sqlx::query(
            "SELECT client_id, access_token, db_user, db_password \
             FROM sync_users WHERE client_id = $1 AND access_token = $2",
        )
        .bind(client_id)
        .bind(access_token)
        .fetch_optional(&mut self.conn)
        .await?;

        row.map(|row| tenant_from_row(&row)).transpose()
    }

    async fn append_sync_log(&mut self, entry: &NewSyncLog) -> StoreResult<()> {
        insert_sync_log(&mut self.conn, entry).await
    }

    async fn client_records(&mut self, client_id: &str) -> StoreResult<Vec<ClientRecord>> {
        let rows = sqlx::query(
            "SELECT code, name, address, branch, client_id \
             FROM rrc_clients WHERE client_id = $1",
        )
        .bind(client_id)
        .fetch_all(&mut self.conn)
        .await?;

        rows.iter().map(record_from_row).collect()
    }

    async fn sync_logs(&mut self, client_id: &str) -> StoreResult<Vec<SyncLogEntry>> {
        let rows = sqlx::query(
            "SELECT client_id, records_synced::BIGINT AS records_synced, status, message, created_at \
             FROM sync_logs WHERE client_id = $1 ORDER BY created_at",
        )
        .bind(client_id)
        .fetch_all(&mut self.conn)
        .await?;

        rows.iter().map(log_from_row).collect()
    }

    async fn begin<'a>(&'a mut self) -> StoreResult<Box<dyn StoreTransaction + 'a>> {
        let tx = self.conn.begin().await?;
        Ok(Box::new(PgStoreTransaction { tx }))
    }

    async fn close(self: Box<Self>) -> StoreResult<()> {
        self.conn.close().await?;
        Ok(())
    }
}

struct PgStoreTransaction<'c> {
    tx: Transaction<'c, Postgres>,
}

#[async_trait]
impl StoreTransaction for PgStoreTransaction<'_> {
    async fn lock_partition(&mut self, client_id: &str) -> StoreResult<()> {
        // Released automatically at COMMIT or ROLLBACK.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(client_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn delete_client_records(&mut self, client_id: &str) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM rrc_clients WHERE client_id = $1")
            .bind(client_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_client_record(&mut self, record: &ClientRecord) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO rrc_clients (code, name, address, branch, client_id) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(record.code.as_deref())
        .bind(record.name.as_deref())
        .bind(record.address.as_deref())
        .bind(record.branch.as_deref())
        .bind(&record.client_id)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn append_sync_log(&mut self, entry: &NewSyncLog) -> StoreResult<()> {
        insert_sync_log(&mut *self.tx, entry).await
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

async fn insert_sync_log(conn: &mut PgConnection, entry: &NewSyncLog) -> StoreResult<()> {
    let records_synced = i64::try_from(entry.records_synced)
        .map_err(|_| StoreError::query("records_synced out of range"))?;

    sqlx::query(
        "INSERT INTO sync_logs (client_id, records_synced, status, message) \
         VALUES ($1, $2, $3, $4)",
    )
    .bind(&entry.client_id)
    .bind(records_synced)
    .bind(&entry.status)
    .bind(&entry.message)
    .execute(conn)
    .await?;
    Ok(())
}

fn tenant_from_row(row: &PgRow) -> StoreResult<Tenant> {
    Ok(Tenant {
        client_id: row.try_get("client_id")?,
        access_token: row.try_get("access_token")?,
        db_user: row.try_get("db_user")?,
        db_password: row.try_get("db_password")?,
    })
}

fn record_from_row(row: &PgRow) -> StoreResult<ClientRecord> {
    Ok(ClientRecord {
        code: row.try_get("code")?,
        name: row.try_get("name")?,
        address: row.try_get("address")?,
        branch: row.try_get("branch")?,
        client_id: row.try_get("client_id")?,
    })
}

fn log_from_row(row: &PgRow) -> StoreResult<SyncLogEntry> {
    let records_synced: i64 = row.try_get("records_synced")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    Ok(SyncLogEntry {
        client_id: row.try_get("client_id")?,
        records_synced: u64::try_from(records_synced)
            .map_err(|_| StoreError::query("negative records_synced"))?,
        status: row.try_get("status")?,
        message: row.try_get("message")?,
        created_at,
    })
}
