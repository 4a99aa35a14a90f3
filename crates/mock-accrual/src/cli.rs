//! CLI 参数定义

use clap::Parser;

/// Mock accrual 服务
///
/// 模拟外部积分计算服务，用于本地开发和集成测试。
#[derive(Parser, Debug)]
#[command(name = "mock-accrual")]
#[command(version, about = "积分计算服务模拟器")]
pub struct Cli {
    /// 服务端口
    #[arg(short, long, default_value = "8081")]
    pub port: u16,

    /// 每分钟最多处理的查询数，0 表示不限流
    #[arg(long, default_value = "0")]
    pub max_rpm: u32,

    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    pub log_level: String,
}
