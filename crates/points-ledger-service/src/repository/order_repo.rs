//! 订单仓储
//!
//! 订单号唯一性由主键保证；状态迁移在锁定订单行的事务内完成，
//! REGISTERED 时在同一事务内给账户入账并追加 ACCRUAL 流水。
//! 加锁顺序固定为「订单行 → 账户行」，与提现事务不会互相死锁。

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, info, instrument};

use super::account_repo::AccountRepository;
use super::ledger_repo::LedgerEntryRepository;
use super::traits::OrderRepositoryTrait;
use crate::error::{LedgerError, Result};
use crate::models::{
    ApplyResult, NewLedgerEntry, Order, OrderStatus, PendingOrder, Points, SubmitOutcome,
};

/// 订单仓储
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 登记订单
    ///
    /// `ON CONFLICT DO NOTHING` 保证并发提交只有一个插入成功，
    /// 之后读取所有人区分重复提交的来源。
    #[instrument(skip(self))]
    pub async fn submit_order(&self, number: &str, owner: &str) -> Result<SubmitOutcome> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO orders (number, owner, status, points, submitted_at, updated_at)
            VALUES ($1, $2, $3, 0, NOW(), NOW())
            ON CONFLICT (number) DO NOTHING
            "#,
        )
        .bind(number)
        .bind(owner)
        .bind(OrderStatus::New)
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() == 1 {
            return Ok(SubmitOutcome::Accepted);
        }

        let existing_owner: String =
            sqlx::query_scalar("SELECT owner FROM orders WHERE number = $1")
                .bind(number)
                .fetch_one(&self.pool)
                .await?;

        if existing_owner == owner {
            Ok(SubmitOutcome::OwnedBySelf)
        } else {
            Ok(SubmitOutcome::OwnedByOther)
        }
    }

    /// 待对账订单
    pub async fn list_pending(&self, limit: i64) -> Result<Vec<PendingOrder>> {
        let pending = sqlx::query_as::<_, PendingOrder>(
            r#"
            SELECT number, owner
            FROM orders
            WHERE status IN ($1, $2)
            ORDER BY submitted_at ASC, number ASC
            LIMIT $3
            "#,
        )
        .bind(OrderStatus::New)
        .bind(OrderStatus::Processing)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(pending)
    }

    /// 应用 accrual 结果
    ///
    /// 终态订单、同状态以及 PROCESSING → NEW 的回退都返回 Unchanged，不做任何写入，
    /// 因此重复应用同一个 REGISTERED 结果不会二次入账。
    #[instrument(skip(self), fields(status = %status, points = %points))]
    pub async fn apply_outcome(
        &self,
        number: &str,
        status: OrderStatus,
        points: Points,
    ) -> Result<ApplyResult> {
        if points.is_negative() {
            return Err(LedgerError::InvalidAmount(points.to_string()));
        }

        let mut tx = self.pool.begin().await?;

        let order = Self::get_order_for_update(&mut tx, number)
            .await?
            .ok_or_else(|| LedgerError::OrderNotFound(number.to_string()))?;

        if !order.status.accepts(status) {
            debug!(current = %order.status, "状态迁移不被接受，保持原样");
            return Ok(ApplyResult::Unchanged {
                current: order.status,
            });
        }

        let credited = if status == OrderStatus::Registered {
            points
        } else {
            Points::ZERO
        };

        Self::update_status_in_tx(&mut tx, number, status, credited).await?;

        if status == OrderStatus::Registered {
            AccountRepository::credit_in_tx(&mut tx, &order.owner, credited).await?;
            let entry = NewLedgerEntry::accrual(number, &order.owner, credited);
            LedgerEntryRepository::create_in_tx(&mut tx, &entry).await?;
        }

        tx.commit().await?;

        if status.is_terminal() {
            info!(owner = %order.owner, credited = %credited, "订单进入终态");
        }

        Ok(ApplyResult::Updated { status, credited })
    }

    pub async fn get_order(&self, number: &str) -> Result<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT number, owner, status, points, submitted_at, updated_at
            FROM orders
            WHERE number = $1
            "#,
        )
        .bind(number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    pub async fn list_orders_by_owner(&self, owner: &str) -> Result<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT number, owner, status, points, submitted_at, updated_at
            FROM orders
            WHERE owner = $1
            ORDER BY submitted_at ASC, number ASC
            "#,
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    // ==================== 事务操作 ====================

    /// 在事务中获取订单（带行级锁）
    pub async fn get_order_for_update(
        tx: &mut PgConnection,
        number: &str,
    ) -> Result<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT number, owner, status, points, submitted_at, updated_at
            FROM orders
            WHERE number = $1
            FOR UPDATE
            "#,
        )
        .bind(number)
        .fetch_optional(tx)
        .await?;

        Ok(order)
    }

    /// 在事务中更新订单状态与积分
    pub async fn update_status_in_tx(
        tx: &mut PgConnection,
        number: &str,
        status: OrderStatus,
        points: Points,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE orders
            SET status = $2, points = $3, updated_at = NOW()
            WHERE number = $1
            "#,
        )
        .bind(number)
        .bind(status)
        .bind(points)
        .execute(tx)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl OrderRepositoryTrait for OrderRepository {
    async fn submit_order(&self, number: &str, owner: &str) -> Result<SubmitOutcome> {
        self.submit_order(number, owner).await
    }

    async fn list_pending(&self, limit: i64) -> Result<Vec<PendingOrder>> {
        self.list_pending(limit).await
    }

    async fn apply_outcome(
        &self,
        number: &str,
        status: OrderStatus,
        points: Points,
    ) -> Result<ApplyResult> {
        self.apply_outcome(number, status, points).await
    }

    async fn get_order(&self, number: &str) -> Result<Option<Order>> {
        self.get_order(number).await
    }

    async fn list_orders_by_owner(&self, owner: &str) -> Result<Vec<Order>> {
        self.list_orders_by_owner(owner).await
    }
}
