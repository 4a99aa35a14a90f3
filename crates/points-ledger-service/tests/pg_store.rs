//! Postgres 仓储集成测试
//!
//! 需要可用的 Postgres（TEST_DATABASE_URL），默认忽略：
//! `cargo test -p points-ledger-service --test pg_store -- --ignored`

use std::sync::Arc;

use points_ledger::models::{EntryKind, OrderStatus, Points, SubmitOutcome};
use points_ledger::repository::{
    AccountRepository, AccountRepositoryTrait, LedgerEntryRepository, LedgerEntryRepositoryTrait,
    OrderRepository, OrderRepositoryTrait,
};
use points_ledger::{ApplyResult, LedgerError};
use points_shared::database::Database;
use points_shared::test_utils::{test_database_config, test_login, test_order_number};
use tokio::sync::OnceCell;

const SCHEMA: &str = include_str!("../migrations/0001_points_ledger.sql");

static SCHEMA_READY: OnceCell<()> = OnceCell::const_new();

struct Repos {
    orders: OrderRepository,
    accounts: AccountRepository,
    entries: LedgerEntryRepository,
}

async fn setup() -> Repos {
    let db = Database::connect(&test_database_config())
        .await
        .expect("连接测试数据库失败");
    let pool = db.pool().clone();

    SCHEMA_READY
        .get_or_init(|| async {
            sqlx::raw_sql(SCHEMA)
                .execute(&pool)
                .await
                .expect("初始化表结构失败");
        })
        .await;

    Repos {
        orders: OrderRepository::new(pool.clone()),
        accounts: AccountRepository::new(pool.clone()),
        entries: LedgerEntryRepository::new(pool),
    }
}

#[tokio::test]
#[ignore]
async fn test_registered_outcome_credits_once() {
    let repos = setup().await;
    let login = test_login();
    let number = test_order_number();

    repos.accounts.open_account(&login).await.unwrap();
    assert_eq!(
        repos.orders.submit_order(&number, &login).await.unwrap(),
        SubmitOutcome::Accepted
    );

    let result = repos
        .orders
        .apply_outcome(&number, OrderStatus::Registered, Points::from_minor(50050))
        .await
        .unwrap();
    assert!(result.is_updated());

    let again = repos
        .orders
        .apply_outcome(&number, OrderStatus::Registered, Points::from_minor(50050))
        .await
        .unwrap();
    assert_eq!(
        again,
        ApplyResult::Unchanged {
            current: OrderStatus::Registered
        }
    );

    let account = repos.accounts.get_account(&login).await.unwrap().unwrap();
    assert_eq!(account.current_points.minor(), 50050);

    let entries = repos
        .entries
        .list_entries(&login, EntryKind::Accrual)
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].amount.minor(), 50050);
}

#[tokio::test]
#[ignore]
async fn test_submit_conflicts_are_classified() {
    let repos = setup().await;
    let alice = test_login();
    let bob = test_login();
    let number = test_order_number();

    repos.orders.submit_order(&number, &alice).await.unwrap();
    assert_eq!(
        repos.orders.submit_order(&number, &alice).await.unwrap(),
        SubmitOutcome::OwnedBySelf
    );
    assert_eq!(
        repos.orders.submit_order(&number, &bob).await.unwrap(),
        SubmitOutcome::OwnedByOther
    );

    let order = repos.orders.get_order(&number).await.unwrap().unwrap();
    assert_eq!(order.owner, alice);
}

#[tokio::test]
#[ignore]
async fn test_credit_without_account_rolls_back() {
    let repos = setup().await;
    let login = test_login();
    let number = test_order_number();

    repos.orders.submit_order(&number, &login).await.unwrap();
    let err = repos
        .orders
        .apply_outcome(&number, OrderStatus::Registered, Points::from_minor(100))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::AccountNotFound(_)));

    let order = repos.orders.get_order(&number).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::New);
    let pending = repos.orders.list_pending(10_000).await.unwrap();
    assert!(pending.iter().any(|p| p.number == number));
}

#[tokio::test]
#[ignore]
async fn test_withdraw_is_atomic() {
    let repos = setup().await;
    let login = test_login();
    let number = test_order_number();
    let withdrawal = test_order_number();

    repos.accounts.open_account(&login).await.unwrap();
    repos.orders.submit_order(&number, &login).await.unwrap();
    repos
        .orders
        .apply_outcome(&number, OrderStatus::Registered, Points::from_minor(30000))
        .await
        .unwrap();

    repos
        .accounts
        .withdraw(&login, &withdrawal, Points::from_minor(30000))
        .await
        .unwrap();

    let err = repos
        .accounts
        .withdraw(&login, &test_order_number(), Points::from_minor(30000))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientFunds { .. }));

    let account = repos.accounts.get_account(&login).await.unwrap().unwrap();
    assert_eq!(account.current_points, Points::ZERO);
    assert_eq!(account.withdrawn_points.minor(), 30000);

    let entries = repos
        .entries
        .list_entries(&login, EntryKind::Withdrawal)
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].amount.minor(), -30000);
}

#[tokio::test]
#[ignore]
async fn test_concurrent_withdrawals_never_overdraw() {
    let repos = setup().await;
    let login = test_login();
    let number = test_order_number();

    repos.accounts.open_account(&login).await.unwrap();
    repos.orders.submit_order(&number, &login).await.unwrap();
    repos
        .orders
        .apply_outcome(&number, OrderStatus::Registered, Points::from_minor(10_000))
        .await
        .unwrap();

    let accounts = Arc::new(repos.accounts);
    let handles: Vec<_> = (0..10)
        .map(|_| {
            let accounts = accounts.clone();
            let login = login.clone();
            let withdrawal = test_order_number();
            tokio::spawn(async move {
                accounts
                    .withdraw(&login, &withdrawal, Points::from_minor(3_000))
                    .await
            })
        })
        .collect();

    let mut succeeded = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            succeeded += 1;
        }
    }

    assert_eq!(succeeded, 3);
    let account = accounts.get_account(&login).await.unwrap().unwrap();
    assert_eq!(account.current_points.minor(), 1_000);
    assert_eq!(account.withdrawn_points.minor(), 9_000);
}

#[tokio::test]
#[ignore]
async fn test_concurrent_credit_and_withdraw_lose_no_update() {
    let repos = setup().await;
    let login = test_login();
    let seed = test_order_number();

    repos.accounts.open_account(&login).await.unwrap();
    repos.orders.submit_order(&seed, &login).await.unwrap();
    repos
        .orders
        .apply_outcome(&seed, OrderStatus::Registered, Points::from_minor(10_000))
        .await
        .unwrap();

    let mut numbers = Vec::new();
    for _ in 0..10 {
        let number = test_order_number();
        repos.orders.submit_order(&number, &login).await.unwrap();
        numbers.push(number);
    }

    let orders = Arc::new(repos.orders);
    let accounts = Arc::new(repos.accounts);
    let mut handles = Vec::new();
    for number in numbers {
        let orders = orders.clone();
        handles.push(tokio::spawn(async move {
            orders
                .apply_outcome(&number, OrderStatus::Registered, Points::from_minor(1_000))
                .await
                .map(|result| assert!(result.is_updated()))
        }));
        let accounts = accounts.clone();
        let login = login.clone();
        let withdrawal = test_order_number();
        handles.push(tokio::spawn(async move {
            accounts
                .withdraw(&login, &withdrawal, Points::from_minor(500))
                .await
                .map(|_| ())
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let account = accounts.get_account(&login).await.unwrap().unwrap();
    let accrued: Points = repos
        .entries
        .list_entries(&login, EntryKind::Accrual)
        .await
        .unwrap()
        .iter()
        .map(|e| e.amount)
        .sum();
    let withdrawn: Points = repos
        .entries
        .list_entries(&login, EntryKind::Withdrawal)
        .await
        .unwrap()
        .iter()
        .map(|e| e.amount.abs())
        .sum();

    assert_eq!(accrued.minor(), 20_000);
    assert_eq!(withdrawn.minor(), 5_000);
    assert_eq!(account.withdrawn_points, withdrawn);
    assert_eq!(account.current_points.checked_add(withdrawn), Some(accrued));
}
