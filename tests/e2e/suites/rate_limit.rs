//! accrual 限流场景
//!
//! 收到 429 后，所有订单的查询都要暂停到 Retry-After 之后。

use std::time::Duration;

use points_ledger::models::OrderStatus;

use crate::helpers::{assert_balance, wait_for_status, wait_until};
use crate::setup::{TestEnvConfig, TestEnvironment};

#[tokio::test]
async fn test_rate_limit_pauses_every_order() {
    let env = TestEnvironment::setup_with(TestEnvConfig {
        concurrency: 1,
        ..TestEnvConfig::default()
    })
    .await
    .unwrap();

    env.user_with_orders("alice", &["1", "2", "3"]).await.unwrap();
    for number in ["1", "2", "3"] {
        env.accrual.program(number, "REGISTERED", Some(10.0));
    }
    env.accrual.force_rate_limit(1, Some(1));

    let worker = env.start_worker();

    let accrual = &env.accrual;
    assert!(wait_until(env.config.wait_timeout, move || async move { accrual.fetch_count() >= 1 }).await);

    // 暂停期间 Worker 仍在轮询，但不应再发出任何查询
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(env.accrual.fetch_count(), 1);

    for number in ["1", "2", "3"] {
        assert!(
            wait_for_status(&env.ledger, number, OrderStatus::Registered, env.config.wait_timeout)
                .await,
            "订单 {number} 应在限流结束后入账"
        );
    }
    worker.stop().await.unwrap();

    assert_balance(&env.ledger, "alice", 3_000, 0).await;
}

#[tokio::test]
async fn test_rate_limited_cycle_reports_deferred_orders() {
    let env = TestEnvironment::setup_with(TestEnvConfig {
        concurrency: 1,
        ..TestEnvConfig::default()
    })
    .await
    .unwrap();

    env.user_with_orders("alice", &["1", "2", "3"]).await.unwrap();
    env.accrual.force_rate_limit(1, Some(2));

    let report = env.worker().run_cycle().await.unwrap();
    assert_eq!(report.fetched, 1);
    assert_eq!(report.deferred, 3);
    assert!(report.rate_limited_for.is_some());
    assert!(!env.worker().gate().is_open());

    // 暂停期间再跑一轮也不会查询
    let report = env.worker().run_cycle().await.unwrap();
    assert_eq!(report.fetched, 0);
    assert_eq!(env.accrual.fetch_count(), 1);
}
