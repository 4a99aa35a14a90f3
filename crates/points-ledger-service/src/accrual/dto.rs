//! accrual 服务响应结构

use serde::{Deserialize, Serialize};

use crate::models::OrderStatus;

/// `GET /api/orders/{number}` 的 200 响应体
///
/// `accrual` 为整积分的小数表示，缺省视为 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccrualResponse {
    pub order: String,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accrual: Option<f64>,
}
