//! 积分账本服务
//!
//! 负责订单积分对账与积分账本：跟踪每个订单的积分计算进度，
//! 在限流约束下轮询外部 accrual 服务，并以事务保证入账与提现的正确性
//! （不重复入账、余额不为负、订单不丢失）。
//!
//! ## 核心功能
//!
//! - **订单登记**：订单号全局唯一，区分本人重复提交与他人冲突
//! - **对账轮询**：后台 Worker 查询 accrual 服务并应用结果，429 时全局退避
//! - **积分入账**：订单进入 REGISTERED 时入账并追加流水，重复应用不会二次入账
//! - **积分提现**：余额检查、扣减与流水写入在同一事务内完成
//!
//! ## 模块结构
//!
//! - `models`: 领域模型与积分定点数
//! - `error`: 错误类型定义
//! - `repository`: 仓储接口、Postgres 实现与内存实现
//! - `accrual`: accrual 服务 HTTP 客户端
//! - `reconciliation`: 限流闸门与对账 Worker
//! - `service`: 面向路由层的账本操作

pub mod accrual;
pub mod error;
pub mod models;
pub mod reconciliation;
pub mod repository;
pub mod service;

pub use accrual::{AccrualClient, AccrualOutcome, HttpAccrualClient};
pub use error::{ErrorKind, LedgerError, Result};
pub use models::*;
pub use reconciliation::{CycleReport, RateLimitGate, ReconciliationWorker};
pub use repository::{
    AccountRepository, InMemoryLedger, LedgerEntryRepository, OrderRepository,
};
pub use service::{AccountService, OrderService, WithdrawalService, dto};
