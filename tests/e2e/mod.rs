//! 积分账本端到端测试
//!
//! 在进程内组装完整链路：内存账本 + mock accrual HTTP 服务 + 对账 Worker + 用户服务。
//! 测试覆盖：
//! - 订单提交到积分入账的全流程
//! - 积分提现与余额守恒
//! - accrual 限流时的全局暂停与恢复
//! - accrual 故障与 Worker 停止

pub mod helpers;
pub mod setup;
pub mod suites;

pub use setup::TestEnvironment;
