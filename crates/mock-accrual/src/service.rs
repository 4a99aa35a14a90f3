//! Mock accrual 服务
//!
//! 按外部 accrual 服务的契约响应查询：
//! - `GET /api/orders/{number}`：200 返回预置结果，未预置返回 204
//! - 限流时返回 429 并带 `Retry-After`（秒）
//! - 标记过的订单下一次查询返回 500
//!
//! 额外的控制端点用于测试编排：预置结果、注入失败、强制限流。

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::store::MemoryStore;

/// 预置的订单计算结果，也是 200 响应体
///
/// `status` 保持为原始字符串，便于测试非法状态值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccrualRecord {
    pub order: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accrual: Option<f64>,
}

impl AccrualRecord {
    pub fn new(order: &str, status: &str, accrual: Option<f64>) -> Self {
        Self {
            order: order.to_string(),
            status: status.to_string(),
            accrual,
        }
    }
}

/// 强制限流请求
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForceRateLimitRequest {
    /// 接下来返回 429 的次数
    pub responses: u32,
    /// `Retry-After` 秒数，None 时不带该响应头
    #[serde(default)]
    pub retry_after: Option<u64>,
}

/// 固定窗口限流
#[derive(Debug)]
struct Throttle {
    max_per_window: u32,
    window: Duration,
    state: Mutex<(Instant, u32)>,
}

impl Throttle {
    fn new(max_per_window: u32, window: Duration) -> Self {
        Self {
            max_per_window,
            window,
            state: Mutex::new((Instant::now(), 0)),
        }
    }

    /// 放行返回 None，否则返回窗口剩余秒数（至少 1）
    fn check(&self) -> Option<u64> {
        let mut state = self.state.lock();
        let now = Instant::now();

        if now.duration_since(state.0) >= self.window {
            *state = (now, 0);
        }

        if state.1 >= self.max_per_window {
            let remaining = self.window.saturating_sub(now.duration_since(state.0));
            return Some(remaining.as_secs_f64().ceil().max(1.0) as u64);
        }

        state.1 += 1;
        None
    }
}

/// 服务状态
#[derive(Debug)]
pub struct AccrualServiceState {
    pub outcomes: MemoryStore<AccrualRecord>,
    /// 下一次查询返回 500 的订单号
    pub failures: MemoryStore<()>,
    forced_rate_limit: Mutex<ForceRateLimitRequest>,
    throttle: Option<Throttle>,
    fetches: AtomicU64,
}

impl Default for AccrualServiceState {
    fn default() -> Self {
        Self::new()
    }
}

impl AccrualServiceState {
    pub fn new() -> Self {
        Self {
            outcomes: MemoryStore::new(),
            failures: MemoryStore::new(),
            forced_rate_limit: Mutex::new(ForceRateLimitRequest::default()),
            throttle: None,
            fetches: AtomicU64::new(0),
        }
    }

    /// 每分钟最多 `max_requests_per_minute` 次查询，0 表示不限流
    pub fn with_rate_limit(mut self, max_requests_per_minute: u32) -> Self {
        self.throttle = (max_requests_per_minute > 0)
            .then(|| Throttle::new(max_requests_per_minute, Duration::from_secs(60)));
        self
    }

    /// 预置或覆盖某个订单的结果
    pub fn program(&self, order: &str, status: &str, accrual: Option<f64>) {
        self.outcomes
            .insert(order, AccrualRecord::new(order, status, accrual));
    }

    /// 该订单的下一次查询返回 500
    pub fn fail_next(&self, order: &str) {
        self.failures.insert(order, ());
    }

    /// 接下来 `responses` 次查询返回 429
    pub fn force_rate_limit(&self, responses: u32, retry_after: Option<u64>) {
        *self.forced_rate_limit.lock() = ForceRateLimitRequest {
            responses,
            retry_after,
        };
    }

    /// 已收到的查询次数（含被限流的）
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::SeqCst)
    }

    /// 需要返回 429 时给出 Retry-After（None 表示不带响应头）
    fn take_rate_limit(&self) -> Option<Option<u64>> {
        {
            let mut forced = self.forced_rate_limit.lock();
            if forced.responses > 0 {
                forced.responses -= 1;
                return Some(forced.retry_after);
            }
        }

        self.throttle
            .as_ref()
            .and_then(|t| t.check())
            .map(Some)
    }
}

/// 构建 accrual 服务路由
pub fn accrual_routes() -> Router<Arc<AccrualServiceState>> {
    Router::new()
        .route("/api/orders/{number}", get(get_accrual))
        .route("/api/orders", post(program_accrual))
        .route("/api/fail/{number}", post(fail_next))
        .route("/api/rate-limit", post(force_rate_limit))
}

/// 完整应用：业务路由 + 健康检查
pub fn app(state: Arc<AccrualServiceState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(accrual_routes().with_state(state))
}

/// 查询订单计算结果
///
/// GET /api/orders/{number}
async fn get_accrual(
    State(state): State<Arc<AccrualServiceState>>,
    Path(number): Path<String>,
) -> Response {
    state.fetches.fetch_add(1, Ordering::SeqCst);

    if let Some(retry_after) = state.take_rate_limit() {
        warn!(order = %number, retry_after = ?retry_after, "请求被限流");
        let mut response = StatusCode::TOO_MANY_REQUESTS.into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        return response;
    }

    if state.failures.remove(&number).is_some() {
        warn!(order = %number, "注入的失败，返回 500");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    match state.outcomes.get(&number) {
        Some(record) => {
            debug!(order = %number, status = %record.status, "返回预置结果");
            Json(record).into_response()
        }
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

/// 预置订单结果
///
/// POST /api/orders
async fn program_accrual(
    State(state): State<Arc<AccrualServiceState>>,
    Json(record): Json<AccrualRecord>,
) -> StatusCode {
    if record.order.is_empty() {
        return StatusCode::BAD_REQUEST;
    }

    info!(order = %record.order, status = %record.status, accrual = ?record.accrual, "预置订单结果");
    let order = record.order.clone();
    state.outcomes.insert(&order, record);
    StatusCode::ACCEPTED
}

/// 注入一次 500
///
/// POST /api/fail/{number}
async fn fail_next(
    State(state): State<Arc<AccrualServiceState>>,
    Path(number): Path<String>,
) -> StatusCode {
    state.fail_next(&number);
    StatusCode::ACCEPTED
}

/// 强制限流
///
/// POST /api/rate-limit
async fn force_rate_limit(
    State(state): State<Arc<AccrualServiceState>>,
    Json(request): Json<ForceRateLimitRequest>,
) -> StatusCode {
    state.force_rate_limit(request.responses, request.retry_after);
    StatusCode::ACCEPTED
}

/// GET /health
async fn health_check() -> &'static str {
    "OK"
}
