//! PostgreSQL fixtures backed by testcontainers.
//!
//! Tests need Docker. Set `SKIP_POSTGRES_TESTS=1` to skip them; they also
//! skip when the container cannot be started. Any later failure (schema,
//! connection, query) still fails the test.

use sqlx::{Connection, PgConnection};
use syncrelay_store::{PostgresStore, StoreConfig, StoreError, StoreResult, Tenant};
use testcontainers::{runners::AsyncRunner, ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;

/// Marks errors raised while starting the container.
pub const POSTGRES_CONTAINER_START_ERR_PREFIX: &str = "postgres-container-start:";

/// A record code the test schema refuses, so an insert can fail mid-batch.
pub const REJECTED_CODE: &str = "REJECT";

/// Relay tables, plus a check constraint on [`REJECTED_CODE`].
pub const TEST_SCHEMA: &str = r#"
CREATE TABLE sync_users (
    client_id    TEXT PRIMARY KEY,
    access_token TEXT NOT NULL,
    db_user      TEXT NOT NULL,
    db_password  TEXT NOT NULL
);
CREATE TABLE rrc_clients (
    code      TEXT CHECK (code IS DISTINCT FROM 'REJECT'),
    name      TEXT,
    address   TEXT,
    branch    TEXT,
    client_id TEXT NOT NULL
);
CREATE TABLE sync_logs (
    client_id      TEXT NOT NULL,
    records_synced INTEGER NOT NULL,
    status         TEXT NOT NULL,
    message        TEXT NOT NULL,
    created_at     TIMESTAMPTZ NOT NULL DEFAULT now()
);
"#;

/// A throwaway PostgreSQL with the relay schema.
pub struct PostgresFixture {
    config: StoreConfig,
    _container: ContainerAsync<Postgres>,
}

impl PostgresFixture {
    /// Starts a container and creates the schema.
    pub async fn start() -> StoreResult<Self> {
        let container = Postgres::default()
            .with_tag("15-alpine")
            .start()
            .await
            .map_err(|e| {
                StoreError::Connection(format!(
                    "{POSTGRES_CONTAINER_START_ERR_PREFIX} failed to start PostgreSQL container: {e}"
                ))
            })?;

        let host = container
            .get_host()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        let port = container
            .get_host_port_ipv4(5432)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        // Default credentials of the postgres module image.
        let config = StoreConfig::new(host.to_string(), "postgres")
            .with_port(port)
            .with_credentials("postgres", "postgres");

        let fixture = Self {
            config,
            _container: container,
        };
        let mut conn = fixture.raw_connection().await?;
        sqlx::raw_sql(TEST_SCHEMA).execute(&mut conn).await?;
        conn.close().await?;
        Ok(fixture)
    }

    /// Connection settings for the container.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// A gateway pointing at the container.
    pub fn store(&self) -> PostgresStore {
        PostgresStore::new(&self.config)
    }

    /// Opens a plain sqlx connection for setup and inspection.
    pub async fn raw_connection(&self) -> StoreResult<PgConnection> {
        let url = format!(
            "postgres://postgres:postgres@{}:{}/{}",
            self.config.host, self.config.port, self.config.database
        );
        Ok(PgConnection::connect(&url).await?)
    }

    /// Provisions tenants in `sync_users`.
    pub async fn seed(&self, tenants: &[Tenant]) -> StoreResult<()> {
        let mut conn = self.raw_connection().await?;
        for tenant in tenants {
            sqlx::query(
                "INSERT INTO sync_users (client_id, access_token, db_user, db_password) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(&tenant.client_id)
            .bind(&tenant.access_token)
            .bind(&tenant.db_user)
            .bind(&tenant.db_password)
            .execute(&mut conn)
            .await?;
        }
        conn.close().await?;
        Ok(())
    }
}

/// Starts a fixture, or returns `None` when PostgreSQL tests are skipped.
///
/// Panics on setup failures other than the container refusing to start.
pub async fn postgres_or_skip() -> Option<PostgresFixture> {
    if std::env::var("SKIP_POSTGRES_TESTS").is_ok() {
        return None;
    }
    match PostgresFixture::start().await {
        Ok(fixture) => Some(fixture),
        Err(err) => {
            let msg = err.to_string();
            if msg.contains(POSTGRES_CONTAINER_START_ERR_PREFIX) {
                eprintln!("Skipping PostgreSQL test (Docker unavailable): {msg}");
                None
            } else {
                panic!("PostgreSQL test setup failed: {msg}");
            }
        }
    }
}
