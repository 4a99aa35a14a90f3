//! 积分定点数表示
//!
//! 内部统一以「分」（1/100 积分）为单位的 i64 存储，
//! 只在服务边界（accrual 响应、提现请求、展示 DTO）与小数互转一次。

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 小数积分转换失败的原因
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PointsConversionError {
    #[error("积分数值不是有限数: {0}")]
    NonFinite(f64),

    #[error("积分数值不能为负: {0}")]
    Negative(f64),

    #[error("积分数值超出范围: {0}")]
    OutOfRange(f64),
}

/// 积分金额（最小单位：0.01 积分）
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct Points(i64);

impl Points {
    pub const ZERO: Points = Points(0);

    /// 每个整积分对应的最小单位数
    pub const MINOR_UNITS_PER_POINT: i64 = 100;

    pub const fn from_minor(minor_units: i64) -> Self {
        Self(minor_units)
    }

    pub const fn minor(self) -> i64 {
        self.0
    }

    /// 小数积分转为最小单位，四舍五入（远离零）而不是截断
    ///
    /// 截断会让 `0.1 + 0.2` 这类浮点值系统性少记 1 分。
    pub fn from_decimal(value: f64) -> Result<Self, PointsConversionError> {
        if !value.is_finite() {
            return Err(PointsConversionError::NonFinite(value));
        }
        if value < 0.0 {
            return Err(PointsConversionError::Negative(value));
        }

        let scaled = (value * Self::MINOR_UNITS_PER_POINT as f64).round();
        if scaled >= i64::MAX as f64 {
            return Err(PointsConversionError::OutOfRange(value));
        }

        Ok(Self(scaled as i64))
    }

    /// 转为小数积分，仅用于展示
    pub fn as_decimal(self) -> f64 {
        self.0 as f64 / Self::MINOR_UNITS_PER_POINT as f64
    }

    pub fn checked_add(self, other: Points) -> Option<Points> {
        self.0.checked_add(other.0).map(Points)
    }

    pub fn checked_sub(self, other: Points) -> Option<Points> {
        self.0.checked_sub(other.0).map(Points)
    }

    pub const fn negate(self) -> Points {
        Points(-self.0)
    }

    pub const fn abs(self) -> Points {
        Points(self.0.abs())
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for Points {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let per_point = Self::MINOR_UNITS_PER_POINT as u64;
        write!(f, "{}{}.{:02}", sign, abs / per_point, abs % per_point)
    }
}

impl std::iter::Sum for Points {
    fn sum<I: Iterator<Item = Points>>(iter: I) -> Self {
        Points(iter.map(|p| p.0).sum())
    }
}
