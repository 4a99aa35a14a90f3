//! 基础设施错误
//!
//! 只覆盖进程启动阶段：加载配置与连接数据库。账本业务错误见 `points_ledger::LedgerError`。

use thiserror::Error;

/// Postgres 正在启动或恢复，暂不接受连接（SQLSTATE 57P03）
const CANNOT_CONNECT_NOW: &str = "57P03";

#[derive(Debug, Error)]
pub enum SharedError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("配置错误: {0}")]
    Config(#[from] config::ConfigError),
}

pub type Result<T> = std::result::Result<T, SharedError>;

impl SharedError {
    /// 数据库暂时连不上时可重试；配置错误重试也不会好转
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Database(sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut) => true,
            Self::Database(sqlx::Error::Database(e)) => {
                e.code().as_deref() == Some(CANNOT_CONNECT_NOW)
            }
            Self::Database(_) | Self::Config(_) => false,
        }
    }
}
