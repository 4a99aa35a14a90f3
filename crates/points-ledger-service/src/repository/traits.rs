//! 仓储 Trait 定义
//!
//! 定义仓储接口，便于服务层和对账 Worker 依赖抽象而非具体实现，
//! 测试中可替换为 mock 或内存实现。
//!
//! 每个写操作都是一个原子单元：要么全部生效，要么全部不生效。

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    Account, ApplyResult, EntryKind, LedgerEntry, Order, OrderStatus, PendingOrder, Points,
    SubmitOutcome,
};

/// 订单仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderRepositoryTrait: Send + Sync {
    /// 订单号不存在时以 NEW 状态登记，否则按所有人分类冲突
    async fn submit_order(&self, number: &str, owner: &str) -> Result<SubmitOutcome>;

    /// 待对账订单（NEW / PROCESSING），按提交时间升序，最多 `limit` 条
    async fn list_pending(&self, limit: i64) -> Result<Vec<PendingOrder>>;

    /// 应用 accrual 结果；进入 REGISTERED 时在同一原子单元内入账并追加流水
    async fn apply_outcome(
        &self,
        number: &str,
        status: OrderStatus,
        points: Points,
    ) -> Result<ApplyResult>;

    async fn get_order(&self, number: &str) -> Result<Option<Order>>;

    /// 用户提交过的订单，按提交时间升序
    async fn list_orders_by_owner(&self, owner: &str) -> Result<Vec<Order>>;
}

/// 积分账户仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountRepositoryTrait: Send + Sync {
    async fn open_account(&self, login: &str) -> Result<Account>;

    async fn get_account(&self, login: &str) -> Result<Option<Account>>;

    /// 扣减积分并追加 WITHDRAWAL 流水，余额不足时不做任何修改
    async fn withdraw(
        &self,
        login: &str,
        order_number: &str,
        amount: Points,
    ) -> Result<LedgerEntry>;
}

/// 账本流水仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerEntryRepositoryTrait: Send + Sync {
    /// 用户某类流水，按发生时间升序
    async fn list_entries(&self, owner: &str, kind: EntryKind) -> Result<Vec<LedgerEntry>>;
}
