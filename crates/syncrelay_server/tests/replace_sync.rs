//! Replace-sync integration tests.
//!
//! These drive the server facade against the in-memory store, with and
//! without injected faults, and check what a reader of the store observes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use syncrelay_protocol::RawRecord;
use syncrelay_server::{ServerConfig, ServerError, SyncServer, SYNC_SUCCESS_MESSAGE};
use syncrelay_store::InMemoryStore;
use syncrelay_testkit::prelude::*;

fn server_over(store: &InMemoryStore) -> SyncServer {
    SyncServer::new(ServerConfig::default(), Arc::new(store.clone()))
}

fn faulty_server(gateway: &FaultyGateway, config: ServerConfig) -> SyncServer {
    SyncServer::new(config, Arc::new(gateway.clone()))
}

#[tokio::test]
async fn single_record_round_trip() {
    let store = seeded_store();
    let server = server_over(&store);

    let response = server
        .handle_sync_data(sync_request(TENANT_A, vec![acme()]))
        .await
        .unwrap();
    assert!(response.success);
    assert_eq!(response.record_count, 1);
    assert_eq!(response.message, "Successfully synced 1 records");

    let records = store.records(TENANT_A.0);
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.code.as_deref(), Some("A1"));
    assert_eq!(record.name.as_deref(), Some("Acme"));
    assert_eq!(record.address.as_deref(), Some("1 Main St"));
    assert_eq!(record.branch.as_deref(), Some("HQ"));

    let logs = store.logs(TENANT_A.0);
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, "SUCCESS");
    assert_eq!(logs[0].records_synced, 1);
    assert_eq!(logs[0].message, SYNC_SUCCESS_MESSAGE);
}

#[tokio::test]
async fn repeated_sync_is_idempotent() {
    let store = seeded_store();
    let server = server_over(&store);

    for _ in 0..3 {
        server
            .handle_sync_data(sync_request(TENANT_A, batch(4)))
            .await
            .unwrap();
    }

    let codes: Vec<_> = store
        .records(TENANT_A.0)
        .into_iter()
        .filter_map(|r| r.code)
        .collect();
    assert_eq!(codes, ["R0", "R1", "R2", "R3"]);
    assert_eq!(store.logs(TENANT_A.0).len(), 3);
}

#[tokio::test]
async fn empty_batch_clears_partition() {
    let store = seeded_store();
    let server = server_over(&store);

    server
        .handle_sync_data(sync_request(TENANT_A, batch(5)))
        .await
        .unwrap();
    let response = server
        .handle_sync_data(sync_request(TENANT_A, Vec::new()))
        .await
        .unwrap();

    assert_eq!(response.record_count, 0);
    assert_eq!(response.message, "Successfully synced 0 records");
    assert!(store.records(TENANT_A.0).is_empty());

    let logs = store.logs(TENANT_A.0);
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[1].status, "SUCCESS");
    assert_eq!(logs[1].records_synced, 0);
}

#[tokio::test]
async fn tenants_are_isolated() {
    let store = seeded_store();
    let server = server_over(&store);

    server
        .handle_sync_data(sync_request(TENANT_B, batch(2)))
        .await
        .unwrap();
    server
        .handle_sync_data(sync_request(TENANT_A, vec![acme()]))
        .await
        .unwrap();

    assert_eq!(store.records(TENANT_B.0).len(), 2);
    assert_eq!(store.records(TENANT_A.0).len(), 1);
    assert_eq!(store.logs(TENANT_B.0).len(), 1);
}

#[tokio::test]
async fn field_casing_and_missing_fields() {
    let store = seeded_store();
    let server = server_over(&store);

    let data = vec![
        RawRecord::new().with("code", "lower").with("name", "Only Lower"),
        RawRecord::new().with("CODE", "UPPER").with("code", "ignored"),
        RawRecord::new().with("CODE", "").with("code", "fallback"),
        RawRecord::new().with("CODE", 42),
    ];
    server
        .handle_sync_data(sync_request(TENANT_A, data))
        .await
        .unwrap();

    let records = store.records(TENANT_A.0);
    let codes: Vec<_> = records.iter().map(|r| r.code.as_deref()).collect();
    assert_eq!(
        codes,
        [Some("lower"), Some("UPPER"), Some("fallback"), Some("42")]
    );
    assert_eq!(records[0].name.as_deref(), Some("Only Lower"));
    assert_eq!(records[0].address, None);
    assert_eq!(records[1].branch, None);
}

#[tokio::test]
async fn unknown_client_and_wrong_token_are_unauthorized() {
    let store = seeded_store();
    let server = server_over(&store);

    let wrong_token = server
        .handle_sync_data(sync_request((TENANT_A.0, "nope", "", ""), vec![acme()]))
        .await
        .unwrap_err();
    let unknown = server
        .handle_sync_data(sync_request(("ghost", TENANT_A.1, "", ""), vec![acme()]))
        .await
        .unwrap_err();

    assert!(matches!(wrong_token, ServerError::Unauthorized));
    assert!(matches!(unknown, ServerError::Unauthorized));
    assert_eq!(wrong_token.public_message(), unknown.public_message());
    assert!(store.records(TENANT_A.0).is_empty());
    assert!(store.logs(TENANT_A.0).is_empty());
    assert!(store.logs("ghost").is_empty());
}

#[tokio::test]
async fn insert_failure_rolls_back_and_logs_failure() {
    let store = seeded_store();
    let clean = server_over(&store);
    clean
        .handle_sync_data(sync_request(TENANT_A, vec![acme()]))
        .await
        .unwrap();

    let gateway = FaultyGateway::new(store.clone(), FaultPlan::new().fail_insert_at(2));
    let server = faulty_server(&gateway, ServerConfig::default());

    let err = server
        .handle_sync_data(sync_request(TENANT_A, batch(5)))
        .await
        .unwrap_err();
    assert!(matches!(err, ServerError::PartialFailure(_)));
    assert_eq!(err.public_message(), "Server error");

    // The previous partition survives untouched.
    let records = store.records(TENANT_A.0);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].code.as_deref(), Some("A1"));

    let logs = store.logs(TENANT_A.0);
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].status, "SUCCESS");
    assert_eq!(logs[1].status, "FAILED");
    assert_eq!(logs[1].records_synced, 0);
    assert_eq!(logs[1].message, "injected fault: insert #2");

    assert_eq!(gateway.active_transactions(), 0);
    assert_eq!(store.open_connections(), 0);
}

#[tokio::test]
async fn commit_failure_logs_failure() {
    let store = seeded_store();
    let gateway = FaultyGateway::new(store.clone(), FaultPlan::new().fail_commit());
    let server = faulty_server(&gateway, ServerConfig::default());

    let err = server
        .handle_sync_data(sync_request(TENANT_A, batch(2)))
        .await
        .unwrap_err();
    assert!(err.is_server_error());
    assert!(store.records(TENANT_A.0).is_empty());

    let logs = store.logs(TENANT_A.0);
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, "FAILED");
}

#[tokio::test]
async fn failed_failure_log_is_swallowed() {
    let store = seeded_store();
    let plan = FaultPlan::new().fail_insert_at(0).fail_connection_logs();
    let gateway = FaultyGateway::new(store.clone(), plan);
    let server = faulty_server(&gateway, ServerConfig::default());

    let err = server
        .handle_sync_data(sync_request(TENANT_A, vec![acme()]))
        .await
        .unwrap_err();

    // The caller sees the original failure, not the logging one.
    assert!(matches!(err, ServerError::PartialFailure(_)));
    assert!(store.logs(TENANT_A.0).is_empty());
    assert_eq!(store.open_connections(), 0);
}

#[tokio::test]
async fn unreachable_failure_log_store_is_swallowed() {
    let store = seeded_store();
    let plan = FaultPlan::new().fail_insert_at(0).fail_connects_after(1);
    let gateway = FaultyGateway::new(store.clone(), plan);
    let server = faulty_server(&gateway, ServerConfig::default());

    let err = server
        .handle_sync_data(sync_request(TENANT_A, vec![acme()]))
        .await
        .unwrap_err();

    assert!(matches!(err, ServerError::PartialFailure(_)));
    assert!(store.logs(TENANT_A.0).is_empty());
}

#[tokio::test]
async fn store_outage_before_auth_writes_no_log() {
    let store = seeded_store();
    store.set_available(false);
    let server = server_over(&store);

    let err = server
        .handle_sync_data(sync_request(TENANT_A, vec![acme()]))
        .await
        .unwrap_err();
    assert!(matches!(err, ServerError::Store(_)));

    store.set_available(true);
    assert!(store.logs(TENANT_A.0).is_empty());
}

#[tokio::test]
async fn timeout_rolls_back_and_releases_connection() {
    let store = seeded_store();
    let gateway = FaultyGateway::new(
        store.clone(),
        FaultPlan::new().insert_delay(Duration::from_millis(200)),
    );
    let config = ServerConfig::default().with_request_timeout(Duration::from_millis(50));
    let server = faulty_server(&gateway, config);

    let err = server
        .handle_sync_data(sync_request(TENANT_A, batch(3)))
        .await
        .unwrap_err();
    assert!(matches!(err, ServerError::Timeout(_)));

    assert!(store.records(TENANT_A.0).is_empty());
    let logs = store.logs(TENANT_A.0);
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, "FAILED");

    assert_eq!(gateway.active_transactions(), 0);
    assert_eq!(store.open_connections(), 0);
}

#[tokio::test]
async fn slow_release_after_commit_is_still_success() {
    let store = seeded_store();
    let gateway = FaultyGateway::new(
        store.clone(),
        FaultPlan::new().close_delay(Duration::from_millis(200)),
    );
    let config = ServerConfig::default().with_request_timeout(Duration::from_millis(50));
    let server = faulty_server(&gateway, config);

    let response = server
        .handle_sync_data(sync_request(TENANT_A, batch(2)))
        .await
        .unwrap();
    assert_eq!(response.record_count, 2);

    assert_eq!(store.records(TENANT_A.0).len(), 2);
    let statuses: Vec<_> = store
        .logs(TENANT_A.0)
        .into_iter()
        .map(|l| l.status)
        .collect();
    assert_eq!(statuses, ["SUCCESS"]);
    assert_eq!(store.open_connections(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_syncs_of_one_tenant_never_overlap() {
    let store = seeded_store();
    const SEEDED: usize = 5;
    server_over(&store)
        .handle_sync_data(sync_request(TENANT_A, batch(SEEDED)))
        .await
        .unwrap();

    let gateway = FaultyGateway::new(
        store.clone(),
        FaultPlan::new().insert_delay(Duration::from_millis(2)),
    );
    let server = Arc::new(faulty_server(&gateway, ServerConfig::default()));
    let sizes = [2usize, 4, 6, 8, 10, 12];

    // Samples the partition size while the syncs run.
    let done = Arc::new(AtomicBool::new(false));
    let reader = {
        let store = store.clone();
        let done = Arc::clone(&done);
        tokio::spawn(async move {
            let mut samples = Vec::new();
            while !done.load(Ordering::SeqCst) {
                samples.push(store.records(TENANT_A.0).len());
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
            samples
        })
    };

    let tasks: Vec<_> = sizes
        .iter()
        .map(|&size| {
            let server = Arc::clone(&server);
            tokio::spawn(async move {
                server
                    .handle_sync_data(sync_request(TENANT_A, batch(size)))
                    .await
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap().unwrap();
    }
    done.store(true, Ordering::SeqCst);
    let samples = reader.await.unwrap();

    assert_eq!(gateway.max_concurrent_transactions(), 1);

    assert!(!samples.is_empty());
    for sample in &samples {
        assert!(
            *sample == SEEDED || sizes.contains(sample),
            "reader saw a torn partition of {sample} records"
        );
    }

    // The partition is exactly one of the submitted batches.
    let codes: Vec<_> = store
        .records(TENANT_A.0)
        .into_iter()
        .filter_map(|r| r.code)
        .collect();
    let expected: Vec<_> = (0..codes.len()).map(|i| format!("R{i}")).collect();
    assert!(sizes.contains(&codes.len()));
    assert_eq!(codes, expected);

    let logs = store.logs(TENANT_A.0);
    assert_eq!(logs.len(), sizes.len() + 1);
    assert!(logs.iter().all(|l| l.status == "SUCCESS"));
    assert_eq!(logs.last().unwrap().records_synced as usize, codes.len());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn different_tenants_sync_concurrently() {
    let store = seeded_store();
    let gateway = FaultyGateway::new(
        store.clone(),
        FaultPlan::new().insert_delay(Duration::from_millis(20)),
    );
    let server = Arc::new(faulty_server(&gateway, ServerConfig::default()));

    let a = {
        let server = Arc::clone(&server);
        tokio::spawn(async move {
            server
                .handle_sync_data(sync_request(TENANT_A, batch(3)))
                .await
        })
    };
    let b = {
        let server = Arc::clone(&server);
        tokio::spawn(async move {
            server
                .handle_sync_data(sync_request(TENANT_B, batch(3)))
                .await
        })
    };
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    assert_eq!(gateway.max_concurrent_transactions(), 2);
    assert_eq!(store.records(TENANT_A.0).len(), 3);
    assert_eq!(store.records(TENANT_B.0).len(), 3);
}

#[tokio::test]
async fn sync_log_recorder_appends_caller_entries() {
    let store = seeded_store();
    let server = server_over(&store);

    server
        .handle_sync_log(log_request(TENANT_A, "PARTIAL", 7, "client side note"))
        .await
        .unwrap();

    let logs = store.logs(TENANT_A.0);
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, "PARTIAL");
    assert_eq!(logs[0].records_synced, 7);
    assert_eq!(logs[0].message, "client side note");
    assert!(store.records(TENANT_A.0).is_empty());
}

#[tokio::test]
async fn sync_log_rejects_bad_credentials() {
    let store = seeded_store();
    let server = server_over(&store);

    let err = server
        .handle_sync_log(log_request((TENANT_A.0, "bad", "", ""), "SUCCESS", 1, "x"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServerError::Unauthorized));
    assert!(store.logs(TENANT_A.0).is_empty());
}

#[tokio::test]
async fn credentials_never_cross_tenants() {
    let store = seeded_store();
    let server = server_over(&store);

    let a = server
        .handle_credentials(credentials_request(TENANT_A))
        .await
        .unwrap();
    let b = server
        .handle_credentials(credentials_request(TENANT_B))
        .await
        .unwrap();

    assert_eq!((a.db_user.as_str(), a.db_password.as_str()), (TENANT_A.2, TENANT_A.3));
    assert_eq!((b.db_user.as_str(), b.db_password.as_str()), (TENANT_B.2, TENANT_B.3));
    assert!(store.logs(TENANT_A.0).is_empty());
}
