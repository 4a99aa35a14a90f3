//! 断言与等待辅助函数

use std::future::Future;
use std::time::Duration;

use points_ledger::models::{EntryKind, OrderStatus, Points};
use points_ledger::repository::{
    AccountRepositoryTrait, InMemoryLedger, LedgerEntryRepositoryTrait, OrderRepositoryTrait,
};

/// 轮询直到条件成立或超时
pub async fn wait_until<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// 等待订单进入指定状态
pub async fn wait_for_status(
    ledger: &InMemoryLedger,
    number: &str,
    expected: OrderStatus,
    timeout: Duration,
) -> bool {
    wait_until(timeout, move || async move {
        matches!(
            ledger.get_order(number).await,
            Ok(Some(order)) if order.status == expected
        )
    })
    .await
}

/// 断言账户余额（最小单位）
pub async fn assert_balance(ledger: &InMemoryLedger, login: &str, current: i64, withdrawn: i64) {
    let account = ledger
        .get_account(login)
        .await
        .unwrap()
        .unwrap_or_else(|| panic!("账户 {login} 不存在"));
    assert_eq!(
        (account.current_points.minor(), account.withdrawn_points.minor()),
        (current, withdrawn),
        "账户 {login} 余额不符"
    );
}

/// 断言余额可由流水完全解释
pub async fn assert_ledger_consistent(ledger: &InMemoryLedger, login: &str) {
    let account = ledger.get_account(login).await.unwrap().unwrap();
    let accrued: Points = ledger
        .list_entries(login, EntryKind::Accrual)
        .await
        .unwrap()
        .iter()
        .map(|e| e.amount)
        .sum();
    let withdrawn: Points = ledger
        .list_entries(login, EntryKind::Withdrawal)
        .await
        .unwrap()
        .iter()
        .map(|e| e.amount.abs())
        .sum();

    assert_eq!(account.withdrawn_points, withdrawn, "账户 {login} 累计提现与流水不符");
    assert_eq!(
        account.current_points.checked_add(withdrawn),
        Some(accrued),
        "账户 {login} 余额无法由流水解释"
    );
}
