//! Exclusive audits sharing one lease

use crate::helpers::{create_test_config, mount_mock_site};
use site_audit::{run_exclusive, AuditError, AuditLease};
use std::sync::Arc;
use wiremock::MockServer;

#[tokio::test]
async fn test_exclusive_audit_releases_lease() {
    let mock_server = MockServer::start().await;
    mount_mock_site(&mock_server).await;
    let lease = Arc::new(AuditLease::new());

    let result = run_exclusive(
        Arc::clone(&lease),
        "worker-1",
        &mock_server.uri(),
        create_test_config(3),
        None,
    )
    .await
    .expect("lease should be free");

    assert_eq!(result.pages.len(), 3);
    assert!(lease.holder().is_none());
    assert!(!lease.is_busy("worker-2"));
}

#[tokio::test]
async fn test_second_exclusive_audit_is_refused() {
    let mock_server = MockServer::start().await;
    mount_mock_site(&mock_server).await;
    let lease = Arc::new(AuditLease::new());
    lease
        .try_acquire("worker-1", chrono::Duration::minutes(10))
        .unwrap();

    let refused = run_exclusive(
        Arc::clone(&lease),
        "worker-2",
        &mock_server.uri(),
        create_test_config(3),
        None,
    )
    .await;
    assert!(matches!(refused, Err(AuditError::Busy { .. })));

    // No requests beyond the mock setup were made for the refused run
    let received = mock_server.received_requests().await.unwrap_or_default();
    assert!(received.is_empty());

    lease.release("worker-1");
    let accepted = run_exclusive(
        Arc::clone(&lease),
        "worker-2",
        &mock_server.uri(),
        create_test_config(1),
        None,
    )
    .await;
    assert!(accepted.is_ok());
}
