//! 积分账本服务
//!
//! 进程入口：连接数据库并运行订单对账 Worker。
//! 面向用户的账本操作以库的形式提供给路由层。

use std::sync::Arc;

use anyhow::Result;
use points_shared::{config::AppConfig, database::Database, observability, retry::RetryPolicy};
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

use points_ledger::{
    accrual::HttpAccrualClient, reconciliation::ReconciliationWorker, repository::OrderRepository,
};

const SERVICE_NAME: &str = "points-ledger-service";

#[tokio::main]
async fn main() -> Result<()> {
    // 1. 加载配置：config/*.toml + POINTS_ 前缀环境变量
    let config = AppConfig::load(SERVICE_NAME).unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    });

    // 2. 初始化可观测性
    let _guard = observability::init(SERVICE_NAME, &config.observability).await?;

    info!("Starting points-ledger-service...");
    info!(
        environment = %config.environment,
        accrual_base_url = %config.accrual.base_url,
        "Configuration loaded"
    );

    // 3. 连接数据库（启动阶段依赖可能尚未就绪，带重试）
    let db = Database::connect_with_retry(&config.database, &RetryPolicy::startup()).await?;
    info!("Database connection established");

    // 4. 创建仓储与 accrual 客户端
    let order_repo = Arc::new(OrderRepository::new(db.pool().clone()));
    let accrual_client = Arc::new(HttpAccrualClient::new(&config.accrual)?);

    // 5. 启动对账 Worker
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = ReconciliationWorker::new(
        order_repo,
        accrual_client,
        config.reconciliation.clone(),
    );
    let worker_handle = tokio::spawn(async move { worker.run(shutdown_rx).await });
    info!("Reconciliation worker started");

    // 6. 等待退出信号，通知 Worker 完成当前轮次后退出
    shutdown_signal().await;
    let _ = shutdown_tx.send(true);

    if let Err(e) = worker_handle.await {
        error!("Reconciliation worker terminated abnormally: {}", e);
    }

    db.close().await;
    info!("Service shutdown complete");
    Ok(())
}

/// 优雅关闭信号处理
///
/// 监听 Ctrl+C 和 SIGTERM 信号，用于 Kubernetes 优雅关闭
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        }
    }
}
