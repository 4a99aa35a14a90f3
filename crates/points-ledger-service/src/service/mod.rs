//! 服务层
//!
//! 面向路由层暴露的账本操作，每个操作都接收已认证的登录名。
//!
//! ## 模块结构
//!
//! - `dto`: 请求与展示用数据传输对象
//! - `order_service`: 订单提交与积分记录
//! - `account_service`: 开户与余额查询
//! - `withdrawal_service`: 积分提现与提现记录

pub mod account_service;
pub mod dto;
pub mod order_service;
pub mod withdrawal_service;

pub use account_service::AccountService;
pub use dto::*;
pub use order_service::OrderService;
pub use withdrawal_service::WithdrawalService;
