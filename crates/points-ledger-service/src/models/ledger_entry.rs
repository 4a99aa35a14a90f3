//! 账本流水实体定义
//!
//! 流水只追加不修改，余额可由流水重新推导

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::EntryKind;
use super::points::Points;

/// 账本流水
///
/// `amount` 带符号：入账为正，消费为负
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: i64,
    /// 关联订单号（入账为购物订单，消费为提现单号）
    pub order_number: String,
    pub owner: String,
    pub kind: EntryKind,
    pub amount: Points,
    pub occurred_at: DateTime<Utc>,
}

/// 待写入的账本流水
#[derive(Debug, Clone, PartialEq)]
pub struct NewLedgerEntry {
    pub order_number: String,
    pub owner: String,
    pub kind: EntryKind,
    pub amount: Points,
}

impl NewLedgerEntry {
    /// 创建入账记录
    pub fn accrual(order_number: &str, owner: &str, amount: Points) -> Self {
        Self {
            order_number: order_number.to_string(),
            owner: owner.to_string(),
            kind: EntryKind::Accrual,
            amount: amount.abs(),
        }
    }

    /// 创建消费记录，金额取负
    pub fn withdrawal(order_number: &str, owner: &str, amount: Points) -> Self {
        Self {
            order_number: order_number.to_string(),
            owner: owner.to_string(),
            kind: EntryKind::Withdrawal,
            amount: amount.abs().negate(),
        }
    }

    pub fn into_entry(self, id: i64, occurred_at: DateTime<Utc>) -> LedgerEntry {
        LedgerEntry {
            id,
            order_number: self.order_number,
            owner: self.owner,
            kind: self.kind,
            amount: self.amount,
            occurred_at,
        }
    }
}
