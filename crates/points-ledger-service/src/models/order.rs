//! 订单相关实体定义
//!
//! 订单记录每个用户提交的购物订单号及其积分计算进度

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::OrderStatus;
use super::points::Points;

/// 订单
///
/// 订单号全局唯一，首次提交者即为所有人，之后不可变更
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// 订单号（主键）
    pub number: String,
    /// 提交者登录名
    pub owner: String,
    pub status: OrderStatus,
    /// 已入账积分，仅 REGISTERED 时非零
    pub points: Points,
    /// 提交时间，创建后不再修改
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// 新提交的订单
    pub fn new(number: impl Into<String>, owner: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            number: number.into(),
            owner: owner.into(),
            status: OrderStatus::New,
            points: Points::ZERO,
            submitted_at: now,
            updated_at: now,
        }
    }

    pub fn is_pending(&self) -> bool {
        !self.status.is_terminal()
    }
}

/// 待对账订单
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct PendingOrder {
    pub number: String,
    pub owner: String,
}

/// 订单提交结果
///
/// 冲突不是错误：存储层只负责分类，是否报错由服务层决定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// 新订单已登记
    Accepted,
    /// 同一用户重复提交
    OwnedBySelf,
    /// 已被其他用户提交
    OwnedByOther,
}

impl SubmitOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::OwnedBySelf => "owned_by_self",
            Self::OwnedByOther => "owned_by_other",
        }
    }
}

/// 对账结果应用到订单后的效果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyResult {
    /// 状态已变更；`credited` 为本次入账积分（非 REGISTERED 时为 0）
    Updated {
        status: OrderStatus,
        credited: Points,
    },
    /// 迁移不被接受（终态、同状态或回退），订单保持原样
    Unchanged { current: OrderStatus },
}

impl ApplyResult {
    pub fn is_updated(&self) -> bool {
        matches!(self, Self::Updated { .. })
    }
}
