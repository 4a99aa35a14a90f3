//! accrual 故障与 Worker 生命周期

use std::time::Duration;

use points_ledger::models::OrderStatus;

use crate::helpers::{assert_balance, wait_until};
use crate::setup::TestEnvironment;

#[tokio::test]
async fn test_server_error_is_retried_next_cycle() {
    let env = TestEnvironment::setup().await.unwrap();
    env.user_with_orders("alice", &["1"]).await.unwrap();
    env.accrual.program("1", "REGISTERED", Some(12.34));
    env.accrual.fail_next("1");

    let report = env.worker().run_cycle().await.unwrap();
    assert_eq!(report.skipped, 1);
    assert_balance(&env.ledger, "alice", 0, 0).await;

    let report = env.worker().run_cycle().await.unwrap();
    assert_eq!(report.finalized, 1);
    assert_balance(&env.ledger, "alice", 1_234, 0).await;
}

#[tokio::test]
async fn test_unknown_status_keeps_order_pending() {
    let env = TestEnvironment::setup().await.unwrap();
    env.user_with_orders("alice", &["1"]).await.unwrap();
    env.accrual.program("1", "PROCESSED", Some(5.0));

    let report = env.worker().run_cycle().await.unwrap();
    assert_eq!(report.skipped, 1);

    let history = env.orders.list_accrual_history("alice").await.unwrap();
    assert_eq!(history[0].status, OrderStatus::New);
}

#[tokio::test]
async fn test_worker_stops_polling_after_shutdown() {
    let env = TestEnvironment::setup().await.unwrap();
    env.user_with_orders("alice", &["pending"]).await.unwrap();

    let worker = env.start_worker();
    let accrual = &env.accrual;
    assert!(wait_until(env.config.wait_timeout, move || async move { accrual.fetch_count() >= 2 }).await);
    worker.stop().await.unwrap();

    let fetched = env.accrual.fetch_count();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(env.accrual.fetch_count(), fetched);
}
