//! 积分账本枚举类型定义
//!
//! 所有枚举都支持数据库（sqlx）和 JSON（serde）序列化

use serde::{Deserialize, Serialize};

/// 订单的积分计算状态
///
/// 状态机：`NEW → PROCESSING → {REGISTERED, INVALID}`，也允许 `NEW` 直接进入终态。
/// 终态之后不再有任何迁移。
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// 已提交，尚未被 accrual 服务受理
    #[default]
    New,
    /// accrual 服务计算中
    Processing,
    /// 计算完成，积分已入账
    Registered,
    /// 订单不参与积分计算
    Invalid,
}

impl OrderStatus {
    /// 待对账状态集合
    pub const PENDING: [OrderStatus; 2] = [OrderStatus::New, OrderStatus::Processing];

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Registered | Self::Invalid)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Processing => "PROCESSING",
            Self::Registered => "REGISTERED",
            Self::Invalid => "INVALID",
        }
    }

    /// 当前状态是否接受迁移到 `next`
    ///
    /// 同状态、回退（PROCESSING → NEW）以及离开终态都返回 false，由调用方视为 Unchanged。
    pub fn accepts(self, next: OrderStatus) -> bool {
        match (self, next) {
            (from, _) if from.is_terminal() => false,
            (Self::New, Self::Processing) => true,
            (_, to) => to.is_terminal(),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 账本流水类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryKind {
    /// 订单计算完成后的积分入账（正数）
    Accrual,
    /// 用户消费积分（负数）
    Withdrawal,
}

impl EntryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accrual => "ACCRUAL",
            Self::Withdrawal => "WITHDRAWAL",
        }
    }
}
