//! 可观测性
//!
//! 积分服务是常驻进程：日志与追踪、Prometheus 指标都在启动时装配一次，
//! 返回的守卫持有到进程退出。
//!
//! - `tracing`: 日志订阅器，可选 OTLP 追踪导出与 accrual 请求的 traceparent 传播
//! - `metrics`: 账本与对账指标，`/metrics` 端点

pub mod metrics;
pub mod tracing;

use ::tracing::info;
use anyhow::Result;
use serde::Deserialize;

/// 可观测性配置（`[observability]` 段，环境变量 `POINTS_OBSERVABILITY__*`）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// 日志过滤指令，设置了 RUST_LOG 时以 RUST_LOG 为准
    pub log_level: String,
    pub json_logs: bool,
    /// OTLP gRPC 端点，未配置时只输出本地日志
    pub otlp_endpoint: Option<String>,
    /// `/metrics` 监听端口，0 表示不启动指标服务
    pub metrics_port: u16,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            otlp_endpoint: None,
            metrics_port: 9090,
        }
    }
}

impl ObservabilityConfig {
    pub fn metrics_enabled(&self) -> bool {
        self.metrics_port != 0
    }
}

/// 可观测性守卫：drop 时刷新未导出的 span 并停止指标服务
pub struct ObservabilityGuard {
    _tracing: tracing::TracingGuard,
    _metrics: Option<metrics::MetricsHandle>,
}

/// 装配日志、追踪与指标
///
/// 先装配 tracing，指标服务启动失败时的错误日志才有输出目标。
pub async fn init(service_name: &str, config: &ObservabilityConfig) -> Result<ObservabilityGuard> {
    let tracing_guard = tracing::init(service_name, config)?;

    let metrics_handle = if config.metrics_enabled() {
        Some(metrics::init(service_name, config.metrics_port).await?)
    } else {
        None
    };

    info!(
        service = service_name,
        metrics_port = ?config.metrics_enabled().then_some(config.metrics_port),
        otlp_endpoint = ?config.otlp_endpoint,
        "Observability initialized"
    );

    Ok(ObservabilityGuard {
        _tracing: tracing_guard,
        _metrics: metrics_handle,
    })
}
