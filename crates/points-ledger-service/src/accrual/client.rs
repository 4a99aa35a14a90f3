//! accrual 服务 HTTP 客户端
//!
//! 每次调用只返回一种结果（`AccrualOutcome`），客户端内部不重试，
//! 重试与退避由对账 Worker 决定。

use std::time::{Duration, Instant};

use async_trait::async_trait;
use points_shared::config::AccrualConfig;
use points_shared::observability::tracing::trace_headers;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{StatusCode, Url};
use tracing::{debug, instrument, warn};

use super::dto::AccrualResponse;
use crate::error::{LedgerError, Result};
use crate::models::{OrderStatus, Points};

/// 单次查询结果
#[derive(Debug, Clone, PartialEq)]
pub enum AccrualOutcome {
    /// 服务给出了状态（含进行中的 PROCESSING）
    Resolved { status: OrderStatus, points: Points },
    /// 服务限流，所有查询需暂停至少 `retry_after`
    RateLimited { retry_after: Duration },
    /// 传输错误、超时、响应体异常或非预期状态码
    Unavailable { reason: String },
}

impl AccrualOutcome {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// 指标标签
    pub fn label(&self) -> &'static str {
        match self {
            Self::Resolved { .. } => "resolved",
            Self::RateLimited { .. } => "rate_limited",
            Self::Unavailable { .. } => "unavailable",
        }
    }
}

/// accrual 服务客户端接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccrualClient: Send + Sync {
    async fn fetch(&self, number: &str) -> AccrualOutcome;
}

/// 基于 reqwest 的 accrual 客户端
pub struct HttpAccrualClient {
    client: reqwest::Client,
    base_url: Url,
    default_retry_after: Duration,
}

impl HttpAccrualClient {
    pub fn new(config: &AccrualConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            LedgerError::Configuration(format!("accrual.base_url 无效 ({}): {e}", config.base_url))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(LedgerError::Configuration(format!(
                "accrual.base_url 不能作为基础地址: {}",
                config.base_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| LedgerError::Configuration(format!("创建 HTTP 客户端失败: {e}")))?;

        Ok(Self {
            client,
            base_url,
            default_retry_after: config.default_retry_after(),
        })
    }

    /// `{base}/api/orders/{number}`，订单号按路径段转义
    fn order_url(&self, number: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["api", "orders", number]);
        }
        url
    }

    /// 解析 Retry-After（整数秒），缺失或无法解析时使用默认值
    ///
    /// 服务端给出的值原样生效，暂停时间不会短于服务端要求。
    fn retry_after(&self, headers: &HeaderMap) -> Duration {
        let parsed = headers
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);

        if parsed.is_none() {
            warn!("429 响应缺少有效的 Retry-After，使用默认退避");
        }

        parsed.unwrap_or(self.default_retry_after)
    }

    async fn parse_resolved(number: &str, response: reqwest::Response) -> AccrualOutcome {
        let body = match response.json::<AccrualResponse>().await {
            Ok(body) => body,
            Err(e) => return AccrualOutcome::unavailable(format!("响应体解析失败: {e}")),
        };

        if body.order != number {
            return AccrualOutcome::unavailable(format!(
                "响应订单号不匹配: 期望 {number}, 实际 {}",
                body.order
            ));
        }

        match Points::from_decimal(body.accrual.unwrap_or(0.0)) {
            Ok(points) => AccrualOutcome::Resolved {
                status: body.status,
                points,
            },
            Err(e) => AccrualOutcome::unavailable(format!("accrual 数值无效: {e}")),
        }
    }
}

#[async_trait]
impl AccrualClient for HttpAccrualClient {
    #[instrument(skip(self))]
    async fn fetch(&self, number: &str) -> AccrualOutcome {
        let started = Instant::now();

        let mut request = self.client.get(self.order_url(number));
        for (key, value) in trace_headers() {
            request = request.header(key, value);
        }

        let outcome = match request.send().await {
            Err(e) => AccrualOutcome::unavailable(format!("请求失败: {e}")),
            Ok(response) => match response.status() {
                StatusCode::OK => Self::parse_resolved(number, response).await,
                StatusCode::TOO_MANY_REQUESTS => AccrualOutcome::RateLimited {
                    retry_after: self.retry_after(response.headers()),
                },
                StatusCode::INTERNAL_SERVER_ERROR => {
                    AccrualOutcome::unavailable("accrual 服务内部错误")
                }
                other => AccrualOutcome::unavailable(format!("非预期的状态码: {other}")),
            },
        };

        let elapsed = started.elapsed().as_secs_f64();
        points_shared::observability::metrics::record_accrual_fetch(outcome.label(), elapsed);
        debug!(outcome = outcome.label(), elapsed_secs = elapsed, "accrual 查询完成");

        outcome
    }
}
