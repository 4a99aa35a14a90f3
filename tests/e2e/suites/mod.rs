//! 测试套件模块
//!
//! 按业务流程组织的测试用例集合。

pub mod accrual_flow;
pub mod rate_limit;
pub mod resilience;
pub mod withdrawal;
