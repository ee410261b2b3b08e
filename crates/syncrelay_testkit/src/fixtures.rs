//! Tenant fixtures and request builders.
//!
//! Two tenants are provisioned by [`seeded_store`]; tests use them to check
//! both the happy path and cross-tenant isolation.

use syncrelay_protocol::{CredentialsRequest, RawRecord, SyncDataRequest, SyncLogRequest};
use syncrelay_store::{InMemoryStore, Tenant};

/// First fixture tenant: `(client_id, access_token, db_user, db_password)`.
pub const TENANT_A: (&str, &str, &str, &str) = ("client-a", "token-a", "user_a", "pass_a");

/// Second fixture tenant.
pub const TENANT_B: (&str, &str, &str, &str) = ("client-b", "token-b", "user_b", "pass_b");

/// Builds a [`Tenant`] from a fixture tuple.
pub fn tenant(fixture: (&str, &str, &str, &str)) -> Tenant {
    let (client_id, access_token, db_user, db_password) = fixture;
    Tenant::new(client_id, access_token, db_user, db_password)
}

/// An in-memory store provisioned with [`TENANT_A`] and [`TENANT_B`].
pub fn seeded_store() -> InMemoryStore {
    InMemoryStore::with_tenants([tenant(TENANT_A), tenant(TENANT_B)])
}

/// A record with upper-case keys for every field.
pub fn record(code: &str, name: &str, address: &str, branch: &str) -> RawRecord {
    RawRecord::new()
        .with("CODE", code)
        .with("NAME", name)
        .with("ADDRESS", address)
        .with("BRANCH", branch)
}

/// The canonical single record used across tests.
pub fn acme() -> RawRecord {
    record("A1", "Acme", "1 Main St", "HQ")
}

/// `count` distinct records with codes `R0`, `R1`, ...
pub fn batch(count: usize) -> Vec<RawRecord> {
    (0..count)
        .map(|i| record(&format!("R{i}"), &format!("Record {i}"), "Street", "Main"))
        .collect()
}

/// A credentials request for a fixture tenant.
pub fn credentials_request(fixture: (&str, &str, &str, &str)) -> CredentialsRequest {
    CredentialsRequest::new(fixture.0, fixture.1)
}

/// A replace-sync request for a fixture tenant.
pub fn sync_request(fixture: (&str, &str, &str, &str), data: Vec<RawRecord>) -> SyncDataRequest {
    SyncDataRequest::new(fixture.0, fixture.1, data)
}

/// A sync log request for a fixture tenant.
pub fn log_request(
    fixture: (&str, &str, &str, &str),
    status: &str,
    record_count: u64,
    message: &str,
) -> SyncLogRequest {
    SyncLogRequest {
        client_id: Some(fixture.0.to_string()),
        access_token: Some(fixture.1.to_string()),
        status: Some(status.to_string()),
        record_count: Some(record_count),
        message: Some(message.to_string()),
    }
}
