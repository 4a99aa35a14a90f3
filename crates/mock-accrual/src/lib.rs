//! Mock Accrual
//!
//! 模拟外部积分计算（accrual）服务，用于开发和测试环境。
//!
//! # 主要模块
//!
//! - `service`: HTTP 路由与可编排的响应行为
//! - `store`: 内存存储实现
//! - `cli`: 命令行参数
//!
//! # 使用示例
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mock_accrual::{AccrualServiceState, spawn_server};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let state = Arc::new(AccrualServiceState::new());
//! state.program("12345", "REGISTERED", Some(500.5));
//!
//! let (addr, _handle) = spawn_server(state.clone()).await?;
//! println!("accrual base url: http://{addr}");
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod service;
pub mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::error;

pub use service::{AccrualRecord, AccrualServiceState, accrual_routes, app};

/// 在 127.0.0.1 的随机端口上启动服务（测试用）
pub async fn spawn_server(
    state: Arc<AccrualServiceState>,
) -> anyhow::Result<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
    let addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app(state)).await {
            error!("Mock accrual server error: {}", e);
        }
    });

    Ok((addr, handle))
}
