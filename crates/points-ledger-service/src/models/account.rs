//! 积分账户实体定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::points::Points;

/// 积分账户
///
/// `current_points` 永不为负；`withdrawn_points` 只增不减
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub login: String,
    /// 可用积分
    pub current_points: Points,
    /// 累计已消费积分
    pub withdrawn_points: Points,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            current_points: Points::ZERO,
            withdrawn_points: Points::ZERO,
            created_at: Utc::now(),
        }
    }

    pub fn can_afford(&self, amount: Points) -> bool {
        self.current_points >= amount
    }
}
