//! 积分提现流程

use points_ledger::LedgerError;
use points_ledger::service::WithdrawRequest;

use crate::helpers::{assert_balance, assert_ledger_consistent};
use crate::setup::TestEnvironment;

fn request(order: &str, sum: f64) -> WithdrawRequest {
    WithdrawRequest {
        order: order.to_string(),
        sum,
    }
}

/// 准备一个已入账 `points` 积分的用户
async fn funded_user(env: &TestEnvironment, login: &str, points: f64) {
    let number = format!("{login}-seed");
    env.user_with_orders(login, &[number.as_str()]).await.unwrap();
    env.accrual.program(&number, "REGISTERED", Some(points));
    env.worker().run_cycle().await.unwrap();
}

#[tokio::test]
async fn test_withdraw_until_insufficient() {
    let env = TestEnvironment::setup().await.unwrap();
    funded_user(&env, "alice", 300.0).await;
    assert_balance(&env.ledger, "alice", 30_000, 0).await;

    let view = env
        .withdrawals
        .withdraw("alice", &request("W-1", 300.0))
        .await
        .unwrap();
    assert_eq!(view.order, "W-1");
    assert_eq!(view.sum, 300.0);
    assert_balance(&env.ledger, "alice", 0, 30_000).await;

    let err = env
        .withdrawals
        .withdraw("alice", &request("W-1", 300.0))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
    assert_balance(&env.ledger, "alice", 0, 30_000).await;

    let balance = env.accounts.balance("alice").await.unwrap();
    assert_eq!(balance.current, 0.0);
    assert_eq!(balance.withdrawn, 300.0);
    assert_ledger_consistent(&env.ledger, "alice").await;
}

#[tokio::test]
async fn test_withdrawal_history_in_order() {
    let env = TestEnvironment::setup().await.unwrap();
    funded_user(&env, "alice", 1_000.0).await;

    for (order, sum) in [("W-1", 100.0), ("W-2", 250.5), ("W-3", 0.01)] {
        env.withdrawals
            .withdraw("alice", &request(order, sum))
            .await
            .unwrap();
    }

    let history = env.withdrawals.list_withdrawal_history("alice").await.unwrap();
    let orders: Vec<&str> = history.iter().map(|w| w.order.as_str()).collect();
    assert_eq!(orders, ["W-1", "W-2", "W-3"]);
    assert_balance(&env.ledger, "alice", 100_000 - 35_051, 35_051).await;
    assert_ledger_consistent(&env.ledger, "alice").await;
}

#[tokio::test]
async fn test_invalid_withdrawals_leave_balance_untouched() {
    let env = TestEnvironment::setup().await.unwrap();
    funded_user(&env, "alice", 50.0).await;

    for sum in [0.0, -10.0, f64::NAN] {
        let err = env
            .withdrawals
            .withdraw("alice", &request("W-bad", sum))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)), "sum = {sum}");
    }

    let err = env
        .withdrawals
        .withdraw("nobody", &request("W-1", 1.0))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::AccountNotFound(_)));

    assert_balance(&env.ledger, "alice", 5_000, 0).await;
    assert!(
        env.withdrawals
            .list_withdrawal_history("alice")
            .await
            .unwrap()
            .is_empty()
    );
}
