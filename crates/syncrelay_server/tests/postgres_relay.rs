//! The relay end to end over a real PostgreSQL.
//!
//! Skipped without Docker or with `SKIP_POSTGRES_TESTS` set.

use std::sync::Arc;
use syncrelay_protocol::RawRecord;
use syncrelay_server::{ServerConfig, ServerError, SyncServer};
use syncrelay_store::{StoreConnection, StoreGateway, SyncLogEntry};
use syncrelay_testkit::postgres::{postgres_or_skip, PostgresFixture, REJECTED_CODE};
use syncrelay_testkit::{acme, batch, credentials_request, log_request, sync_request, tenant};
use syncrelay_testkit::{TENANT_A, TENANT_B};

async fn relay() -> Option<(PostgresFixture, SyncServer)> {
    let fixture = postgres_or_skip().await?;
    fixture
        .seed(&[tenant(TENANT_A), tenant(TENANT_B)])
        .await
        .unwrap();
    let server = SyncServer::new(ServerConfig::default(), Arc::new(fixture.store()));
    Some((fixture, server))
}

async fn codes(fixture: &PostgresFixture, client_id: &str) -> Vec<String> {
    let mut conn = fixture.store().connect().await.unwrap();
    let mut codes: Vec<_> = conn
        .client_records(client_id)
        .await
        .unwrap()
        .into_iter()
        .filter_map(|r| r.code)
        .collect();
    conn.close().await.unwrap();
    codes.sort();
    codes
}

async fn logs(fixture: &PostgresFixture, client_id: &str) -> Vec<SyncLogEntry> {
    let mut conn = fixture.store().connect().await.unwrap();
    let logs = conn.sync_logs(client_id).await.unwrap();
    conn.close().await.unwrap();
    logs
}

#[tokio::test]
async fn credentials_and_sync_round_trip() {
    let Some((fixture, server)) = relay().await else { return };

    let creds = server
        .handle_credentials(credentials_request(TENANT_A))
        .await
        .unwrap();
    assert_eq!(creds.db_user, "user_a");

    server
        .handle_sync_data(sync_request(TENANT_A, batch(3)))
        .await
        .unwrap();
    let response = server
        .handle_sync_data(sync_request(TENANT_A, vec![acme()]))
        .await
        .unwrap();
    assert_eq!(response.record_count, 1);

    assert_eq!(codes(&fixture, TENANT_A.0).await, ["A1"]);
    assert!(codes(&fixture, TENANT_B.0).await.is_empty());

    let logs = logs(&fixture, TENANT_A.0).await;
    let counts: Vec<_> = logs.iter().map(|l| l.records_synced).collect();
    assert_eq!(counts, [3, 1]);
    assert!(logs.iter().all(|l| l.status == "SUCCESS"));
}

#[tokio::test]
async fn rejected_record_rolls_back_and_logs_failure() {
    let Some((fixture, server)) = relay().await else { return };
    server
        .handle_sync_data(sync_request(TENANT_A, batch(2)))
        .await
        .unwrap();

    let mut data = batch(3);
    data.insert(1, RawRecord::new().with("CODE", REJECTED_CODE));
    let err = server
        .handle_sync_data(sync_request(TENANT_A, data))
        .await
        .unwrap_err();
    assert!(matches!(err, ServerError::PartialFailure(_)));

    assert_eq!(codes(&fixture, TENANT_A.0).await, ["R0", "R1"]);

    let logs = logs(&fixture, TENANT_A.0).await;
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[1].status, "FAILED");
    assert_eq!(logs[1].records_synced, 0);
    assert!(logs[1].message.contains("check constraint"), "{}", logs[1].message);
    assert!(!logs[1].message.starts_with("sync rolled back"));
}

#[tokio::test]
async fn client_reported_log_is_stored() {
    let Some((fixture, server)) = relay().await else { return };

    server
        .handle_sync_log(log_request(TENANT_B, "PARTIAL", 7, "device offline"))
        .await
        .unwrap();

    let logs = logs(&fixture, TENANT_B.0).await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, "PARTIAL");
    assert_eq!(logs[0].records_synced, 7);
    assert_eq!(logs[0].message, "device offline");
}
