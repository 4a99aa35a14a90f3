//! 订单积分入账全流程
//!
//! 提交订单 → Worker 轮询 accrual 服务 → 状态推进 → 终态入账。

use std::time::Duration;

use points_ledger::models::OrderStatus;

use crate::helpers::{assert_balance, assert_ledger_consistent, wait_for_status};
use crate::setup::TestEnvironment;

#[tokio::test]
async fn test_order_registered_end_to_end() {
    let env = TestEnvironment::setup().await.unwrap();
    env.user_with_orders("alice", &["12345"]).await.unwrap();
    env.accrual.program("12345", "PROCESSING", None);

    let worker = env.start_worker();

    assert!(
        wait_for_status(&env.ledger, "12345", OrderStatus::Processing, env.config.wait_timeout).await,
        "订单应进入 PROCESSING"
    );
    assert_balance(&env.ledger, "alice", 0, 0).await;

    env.accrual.program("12345", "REGISTERED", Some(500.5));
    assert!(
        wait_for_status(&env.ledger, "12345", OrderStatus::Registered, env.config.wait_timeout).await,
        "订单应进入 REGISTERED"
    );

    // 再跑几轮，终态订单不会被重复入账
    tokio::time::sleep(env.config.poll_interval * 4).await;
    worker.stop().await.unwrap();

    assert_balance(&env.ledger, "alice", 50050, 0).await;
    let history = env.orders.list_accrual_history("alice").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].accrual, Some(500.5));
    assert_ledger_consistent(&env.ledger, "alice").await;
}

#[tokio::test]
async fn test_mixed_outcomes_for_multiple_users() {
    let env = TestEnvironment::setup().await.unwrap();
    env.user_with_orders("alice", &["a-1", "a-2"]).await.unwrap();
    env.user_with_orders("bob", &["b-1"]).await.unwrap();

    env.accrual.program("a-1", "REGISTERED", Some(100.0));
    env.accrual.program("a-2", "INVALID", None);
    env.accrual.program("b-1", "REGISTERED", Some(0.1 + 0.2));

    let report = env.worker().run_cycle().await.unwrap();
    assert_eq!(report.pending, 3);
    assert_eq!(report.finalized, 3);

    assert_balance(&env.ledger, "alice", 10_000, 0).await;
    assert_balance(&env.ledger, "bob", 30, 0).await;

    let history = env.orders.list_accrual_history("alice").await.unwrap();
    let invalid = history.iter().find(|o| o.number == "a-2").unwrap();
    assert_eq!(invalid.status, OrderStatus::Invalid);
    assert_eq!(invalid.accrual, None);

    // 全部终态后不再查询
    let fetched = env.accrual.fetch_count();
    let report = env.worker().run_cycle().await.unwrap();
    assert_eq!(report.pending, 0);
    assert_eq!(env.accrual.fetch_count(), fetched);
}

#[tokio::test]
async fn test_unregistered_orders_stay_pending() {
    let env = TestEnvironment::setup().await.unwrap();
    env.user_with_orders("alice", &["unknown"]).await.unwrap();

    for _ in 0..3 {
        let report = env.worker().run_cycle().await.unwrap();
        assert_eq!(report.skipped, 1);
    }

    let history = env.orders.list_accrual_history("alice").await.unwrap();
    assert_eq!(history[0].status, OrderStatus::New);
    assert_eq!(env.accrual.fetch_count(), 3);
    assert_balance(&env.ledger, "alice", 0, 0).await;
}

#[tokio::test]
async fn test_late_registration_is_picked_up() {
    let env = TestEnvironment::setup().await.unwrap();
    env.user_with_orders("alice", &["late"]).await.unwrap();
    let worker = env.start_worker();

    tokio::time::sleep(Duration::from_millis(200)).await;
    env.accrual.program("late", "REGISTERED", Some(42.0));

    assert!(
        wait_for_status(&env.ledger, "late", OrderStatus::Registered, env.config.wait_timeout).await
    );
    worker.stop().await.unwrap();
    assert_balance(&env.ledger, "alice", 4_200, 0).await;
}
