//! 积分账本错误类型
//!
//! 定义账本操作的业务错误和系统错误。
//! accrual 服务的瞬时故障不在这里，它们以 `AccrualOutcome` 的形式在对账 Worker 内部消化。

use thiserror::Error;

use crate::models::{Points, PointsConversionError};

/// 错误分类，供路由层映射 HTTP 状态码
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 唯一性冲突
    Conflict,
    /// 余额不足
    Balance,
    /// 参数校验失败
    Validation,
    /// 资源不存在
    NotFound,
    /// 系统内部错误
    Internal,
}

/// 积分账本错误类型
#[derive(Debug, Error)]
pub enum LedgerError {
    // === 冲突 ===
    #[error("订单已由当前用户提交: {0}")]
    OrderAlreadySubmittedBySelf(String),

    #[error("订单已被其他用户提交: {0}")]
    OrderAlreadySubmittedByOther(String),

    #[error("积分账户已存在: {0}")]
    AccountAlreadyExists(String),

    #[error("提现单号已使用: {0}")]
    DuplicateWithdrawal(String),

    // === 余额 ===
    #[error("积分余额不足: 需要 {required}, 可用 {available}")]
    InsufficientFunds { required: Points, available: Points },

    // === 校验 ===
    #[error("积分金额无效: {0}")]
    InvalidAmount(String),

    #[error("订单号格式无效: {0}")]
    InvalidOrderNumber(String),

    #[error("登录名无效: {0}")]
    InvalidLogin(String),

    // === 不存在 ===
    #[error("订单不存在: {0}")]
    OrderNotFound(String),

    #[error("积分账户不存在: {0}")]
    AccountNotFound(String),

    // === 系统错误 ===
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 积分账本 Result 类型别名
pub type Result<T> = std::result::Result<T, LedgerError>;

impl From<PointsConversionError> for LedgerError {
    fn from(err: PointsConversionError) -> Self {
        Self::InvalidAmount(err.to_string())
    }
}

/// 从 validator 错误转换，按出错字段选择变体
impl From<validator::ValidationErrors> for LedgerError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors.to_string();
        let fields = errors.field_errors();
        if fields.contains_key("login") {
            Self::InvalidLogin(message)
        } else if fields.contains_key("sum") {
            Self::InvalidAmount(message)
        } else {
            Self::InvalidOrderNumber(message)
        }
    }
}

impl LedgerError {
    /// 错误分类
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::OrderAlreadySubmittedBySelf(_)
            | Self::OrderAlreadySubmittedByOther(_)
            | Self::AccountAlreadyExists(_)
            | Self::DuplicateWithdrawal(_) => ErrorKind::Conflict,
            Self::InsufficientFunds { .. } => ErrorKind::Balance,
            Self::InvalidAmount(_) | Self::InvalidOrderNumber(_) | Self::InvalidLogin(_) => {
                ErrorKind::Validation
            }
            Self::OrderNotFound(_) | Self::AccountNotFound(_) => ErrorKind::NotFound,
            Self::Database(_) | Self::Configuration(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// 检查是否为可重试的错误
    ///
    /// 只有连接层面的数据库故障值得重试，约束冲突等重试也不会成功。
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Database(e) => matches!(
                e,
                sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed
            ),
            _ => false,
        }
    }

    /// 检查是否为业务错误（非系统错误）
    pub fn is_business_error(&self) -> bool {
        self.kind() != ErrorKind::Internal
    }

    /// 同一用户重复提交同一订单，对调用方而言等同成功
    pub fn is_success_like(&self) -> bool {
        matches!(self, Self::OrderAlreadySubmittedBySelf(_))
    }

    /// 获取错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::OrderAlreadySubmittedBySelf(_) => "ORDER_ALREADY_SUBMITTED_BY_SELF",
            Self::OrderAlreadySubmittedByOther(_) => "ORDER_ALREADY_SUBMITTED_BY_OTHER",
            Self::AccountAlreadyExists(_) => "ACCOUNT_ALREADY_EXISTS",
            Self::DuplicateWithdrawal(_) => "DUPLICATE_WITHDRAWAL",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::InvalidOrderNumber(_) => "INVALID_ORDER_NUMBER",
            Self::InvalidLogin(_) => "INVALID_LOGIN",
            Self::OrderNotFound(_) => "ORDER_NOT_FOUND",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// 判断 sqlx 错误是否为唯一约束冲突（Postgres 23505）
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.is_unique_violation(),
        _ => false,
    }
}
