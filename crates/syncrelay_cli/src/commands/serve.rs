//! Serve command implementation.

use std::sync::Arc;
use syncrelay_server::{EnvConfig, SyncServer};
use syncrelay_store::{InMemoryStore, PostgresStore, StoreGateway, Tenant};

/// Runs the relay until interrupted.
///
/// With `memory`, the relay uses an in-memory store provisioned with
/// `tenants`; otherwise it dials PostgreSQL and `tenants` must be empty.
pub async fn run(memory: bool, tenants: Vec<Tenant>) -> Result<(), Box<dyn std::error::Error>> {
    let env = EnvConfig::from_env()?;

    let gateway: Arc<dyn StoreGateway> = if memory {
        if tenants.is_empty() {
            tracing::warn!("In-memory store has no tenants; every request will be rejected");
        }
        tracing::warn!(
            tenants = tenants.len(),
            "Using an in-memory store; data is lost on exit"
        );
        Arc::new(InMemoryStore::with_tenants(tenants))
    } else {
        if !tenants.is_empty() {
            return Err("--tenant only applies with --memory".into());
        }
        tracing::info!(
            host = %env.store.host,
            port = env.store.port,
            database = %env.store.database,
            ssl = env.store.ssl,
            "Using PostgreSQL store"
        );
        Arc::new(PostgresStore::new(&env.store))
    };

    SyncServer::new(env.server, gateway).serve().await?;
    Ok(())
}

/// Parses `client_id:access_token:db_user:db_password`.
///
/// The password is everything after the third colon.
pub fn parse_tenant(value: &str) -> Result<Tenant, String> {
    let parts: Vec<&str> = value.splitn(4, ':').collect();
    match parts.as_slice() {
        [client_id, access_token, db_user, db_password]
            if parts.iter().all(|part| !part.is_empty()) =>
        {
            Ok(Tenant::new(*client_id, *access_token, *db_user, *db_password))
        }
        _ => Err("expected client_id:access_token:db_user:db_password".to_string()),
    }
}
