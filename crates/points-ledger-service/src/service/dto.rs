//! 服务层数据传输对象
//!
//! 面向路由层的展示结构：积分以小数表示，时间为 RFC3339 字符串。
//! 与内部领域模型解耦，小数与最小单位的转换只在这里发生。
//! 请求结构使用 validator 校验，长度上限与存储列宽一致：订单号 32，登录名 64。

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::{Account, LedgerEntry, Order, OrderStatus};

fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// 订单积分记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderView {
    pub number: String,
    pub status: OrderStatus,
    /// 仅 REGISTERED 时出现
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accrual: Option<f64>,
    pub uploaded_at: String,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            number: order.number.clone(),
            status: order.status,
            accrual: (order.status == OrderStatus::Registered).then(|| order.points.as_decimal()),
            uploaded_at: rfc3339(order.submitted_at),
        }
    }
}

/// 积分余额
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceView {
    pub current: f64,
    pub withdrawn: f64,
}

impl From<&Account> for BalanceView {
    fn from(account: &Account) -> Self {
        Self {
            current: account.current_points.as_decimal(),
            withdrawn: account.withdrawn_points.as_decimal(),
        }
    }
}

fn no_surrounding_whitespace(value: &str) -> Result<(), ValidationError> {
    if value.trim() != value {
        let mut error = ValidationError::new("whitespace");
        error.message = Some("不能包含首尾空白".into());
        return Err(error);
    }
    Ok(())
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("blank");
        error.message = Some("不能为空白".into());
        return Err(error);
    }
    Ok(())
}

/// 已认证的调用方
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct Caller {
    #[validate(
        length(min = 1, max = 64, message = "登录名长度必须在1-64之间"),
        custom(function = "not_blank")
    )]
    pub login: String,
}

impl Caller {
    pub fn new(login: &str) -> Self {
        Self {
            login: login.to_string(),
        }
    }
}

/// 订单提交请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SubmitOrderRequest {
    #[validate(
        length(min = 1, max = 32, message = "订单号长度必须在1-32之间"),
        custom(function = "no_surrounding_whitespace")
    )]
    pub number: String,
}

impl SubmitOrderRequest {
    pub fn new(number: &str) -> Self {
        Self {
            number: number.to_string(),
        }
    }
}

/// 积分提现请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct WithdrawRequest {
    /// 消费订单号
    #[validate(
        length(min = 1, max = 32, message = "订单号长度必须在1-32之间"),
        custom(function = "no_surrounding_whitespace")
    )]
    pub order: String,
    #[validate(range(exclusive_min = 0.0, message = "提现金额必须大于0"))]
    pub sum: f64,
}

/// 积分提现记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalView {
    pub order: String,
    pub sum: f64,
    pub processed_at: String,
}

impl From<&LedgerEntry> for WithdrawalView {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            order: entry.order_number.clone(),
            sum: entry.amount.abs().as_decimal(),
            processed_at: rfc3339(entry.occurred_at),
        }
    }
}
