//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Metrics 资源守卫
pub struct MetricsHandle {
    server_handle: tokio::task::JoinHandle<()>,
}

impl Drop for MetricsHandle {
    fn drop(&mut self) {
        self.server_handle.abort();
    }
}

/// 初始化 Prometheus 指标导出
///
/// 启动一个独立的 HTTP 服务器在指定端口暴露 `/metrics` 与 `/health` 端点。
pub async fn init(service_name: &str, port: u16) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    register_common_metrics(service_name);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle { server_handle })
}

/// 注册通用指标描述（出现在 /metrics 的 HELP 注释中）
fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!(
        "accrual_fetches_total",
        "Accrual service lookups by outcome"
    );
    metrics::describe_histogram!(
        "accrual_fetch_duration_seconds",
        "Accrual service lookup duration in seconds"
    );
    metrics::describe_counter!("orders_submitted_total", "Order submissions by result");
    metrics::describe_counter!(
        "orders_finalized_total",
        "Orders that reached a terminal status"
    );
    metrics::describe_counter!(
        "points_credited_total",
        "Points credited to accounts, in minor units"
    );
    metrics::describe_counter!("withdrawals_total", "Withdrawal attempts by result");
    metrics::describe_counter!(
        "reconciliation_cycles_total",
        "Completed reconciliation cycles"
    );
    metrics::describe_counter!(
        "reconciliation_deferred_orders_total",
        "Pending orders deferred by the rate-limit gate"
    );
    metrics::describe_gauge!(
        "reconciliation_rate_limited_seconds",
        "Pause requested by the last 429 response"
    );
    metrics::describe_gauge!(
        "worker_last_run_timestamp",
        "Unix timestamp of the last worker cycle"
    );

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

/// 启动指标 HTTP 服务器
async fn start_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }));

    let listener = TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}", addr);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(server_handle)
}

// ============================================================================
// 便捷的指标记录函数
// ============================================================================

/// 记录一次 accrual 查询
#[inline]
pub fn record_accrual_fetch(outcome: &'static str, duration_secs: f64) {
    metrics::counter!("accrual_fetches_total", "outcome" => outcome).increment(1);
    metrics::histogram!("accrual_fetch_duration_seconds", "outcome" => outcome)
        .record(duration_secs);
}

/// 记录订单提交结果
#[inline]
pub fn record_order_submission(result: &'static str) {
    metrics::counter!("orders_submitted_total", "result" => result).increment(1);
}

/// 记录订单进入终态，REGISTERED 时同时累计入账积分
#[inline]
pub fn record_order_finalized(status: &'static str, credited_minor_units: u64) {
    metrics::counter!("orders_finalized_total", "status" => status).increment(1);
    if credited_minor_units > 0 {
        metrics::counter!("points_credited_total").increment(credited_minor_units);
    }
}

/// 记录提现结果
#[inline]
pub fn record_withdrawal(result: &'static str) {
    metrics::counter!("withdrawals_total", "result" => result).increment(1);
}

/// 记录一轮对账
#[inline]
pub fn record_reconciliation_cycle(deferred: u64, rate_limited_secs: f64) {
    metrics::counter!("reconciliation_cycles_total").increment(1);
    if deferred > 0 {
        metrics::counter!("reconciliation_deferred_orders_total").increment(deferred);
    }
    metrics::gauge!("reconciliation_rate_limited_seconds").set(rate_limited_secs);
}

/// 记录后台 Worker 最近一次运行时间
#[inline]
pub fn set_worker_last_run(worker: &'static str) {
    metrics::gauge!("worker_last_run_timestamp", "worker" => worker)
        .set(chrono::Utc::now().timestamp() as f64);
}
