//! 积分账户仓储
//!
//! 余额字段只通过本仓储的事务操作修改：
//! 入账（`credit_in_tx`）由订单仓储在应用对账结果时调用，扣减由 `withdraw` 完成。

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument};

use super::ledger_repo::LedgerEntryRepository;
use super::traits::AccountRepositoryTrait;
use crate::error::{LedgerError, Result, is_unique_violation};
use crate::models::{Account, LedgerEntry, NewLedgerEntry, Points};

/// 积分账户仓储
pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 开户，余额从零开始
    #[instrument(skip(self))]
    pub async fn open_account(&self, login: &str) -> Result<Account> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (login, current_points, withdrawn_points, created_at)
            VALUES ($1, 0, 0, NOW())
            ON CONFLICT (login) DO NOTHING
            RETURNING login, current_points, withdrawn_points, created_at
            "#,
        )
        .bind(login)
        .fetch_optional(&self.pool)
        .await?;

        account.ok_or_else(|| LedgerError::AccountAlreadyExists(login.to_string()))
    }

    pub async fn get_account(&self, login: &str) -> Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT login, current_points, withdrawn_points, created_at
            FROM accounts
            WHERE login = $1
            "#,
        )
        .bind(login)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    /// 扣减积分并记录提现流水
    ///
    /// 锁定账户行后检查余额，余额不足直接返回且不做任何写入；
    /// 流水写入失败（如提现单号重复）时事务回滚，扣减一并撤销。
    #[instrument(skip(self), fields(amount = %amount))]
    pub async fn withdraw(
        &self,
        login: &str,
        order_number: &str,
        amount: Points,
    ) -> Result<LedgerEntry> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount(amount.to_string()));
        }

        let mut tx = self.pool.begin().await?;

        Self::debit_in_tx(&mut tx, login, amount).await?;

        let entry = NewLedgerEntry::withdrawal(order_number, login, amount);
        let created = match LedgerEntryRepository::create_in_tx(&mut tx, &entry).await {
            Ok(created) => created,
            Err(LedgerError::Database(e)) if is_unique_violation(&e) => {
                return Err(LedgerError::DuplicateWithdrawal(order_number.to_string()));
            }
            Err(e) => return Err(e),
        };

        tx.commit().await?;

        info!(login = %login, order_number = %order_number, "积分提现成功");

        Ok(created)
    }

    // ==================== 事务操作 ====================

    /// 在事务中锁定账户行
    pub async fn get_account_for_update(
        tx: &mut PgConnection,
        login: &str,
    ) -> Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT login, current_points, withdrawn_points, created_at
            FROM accounts
            WHERE login = $1
            FOR UPDATE
            "#,
        )
        .bind(login)
        .fetch_optional(tx)
        .await?;

        Ok(account)
    }

    /// 在事务中入账
    pub async fn credit_in_tx(tx: &mut PgConnection, login: &str, amount: Points) -> Result<()> {
        if amount.is_negative() {
            return Err(LedgerError::InvalidAmount(amount.to_string()));
        }

        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET current_points = current_points + $2
            WHERE login = $1
            "#,
        )
        .bind(login)
        .bind(amount)
        .execute(tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::AccountNotFound(login.to_string()));
        }

        Ok(())
    }

    /// 在事务中扣减：先锁行检查余额，再以条件更新兜底
    pub async fn debit_in_tx(tx: &mut PgConnection, login: &str, amount: Points) -> Result<()> {
        let account = Self::get_account_for_update(&mut *tx, login)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(login.to_string()))?;

        if !account.can_afford(amount) {
            return Err(LedgerError::InsufficientFunds {
                required: amount,
                available: account.current_points,
            });
        }

        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET current_points = current_points - $2,
                withdrawn_points = withdrawn_points + $2
            WHERE login = $1 AND current_points >= $2
            "#,
        )
        .bind(login)
        .bind(amount)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::InsufficientFunds {
                required: amount,
                available: account.current_points,
            });
        }

        Ok(())
    }
}

#[async_trait]
impl AccountRepositoryTrait for AccountRepository {
    async fn open_account(&self, login: &str) -> Result<Account> {
        self.open_account(login).await
    }

    async fn get_account(&self, login: &str) -> Result<Option<Account>> {
        self.get_account(login).await
    }

    async fn withdraw(
        &self,
        login: &str,
        order_number: &str,
        amount: Points,
    ) -> Result<LedgerEntry> {
        self.withdraw(login, order_number, amount).await
    }
}
