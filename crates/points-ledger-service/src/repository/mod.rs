//! 数据访问层
//!
//! ## 设计原则
//!
//! - 仓储只负责持久化与原子性，不包含展示逻辑
//! - Postgres 实现使用 SQLx，事务内的步骤以 `*_in_tx` 关联函数的形式复用
//! - 内存实现满足相同的原子性约定，供测试替换
//! - 定义 trait 接口以支持 mock 测试

mod account_repo;
mod ledger_repo;
mod memory_repo;
mod order_repo;
mod traits;

pub use account_repo::AccountRepository;
pub use ledger_repo::LedgerEntryRepository;
pub use memory_repo::InMemoryLedger;
pub use order_repo::OrderRepository;
pub use traits::*;
