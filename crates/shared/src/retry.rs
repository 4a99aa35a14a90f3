//! 启动阶段重试
//!
//! 容器编排下积分服务可能先于 Postgres 就绪。启动时对连接类错误按倍增退避重试，
//! 配置错误等其余错误立即返回。运行期的失败不走这里：对账 Worker 在下一轮自然重试。

use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::Result;

/// 启动重试策略，每次等待时间翻倍，不超过 `max_delay`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 首次失败之后最多再尝试的次数
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// 8 次重试，0.5s 起步，单次最多等 15s，总计约一分钟
    pub fn startup() -> Self {
        Self {
            max_retries: 8,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(15),
        }
    }

    /// 第 `attempt` 次失败后的等待时间（从 0 开始）
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.initial_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay)
    }

    /// 执行 `operation`，遇到 `SharedError::is_retryable` 的错误时退避后重试
    pub async fn run<T, F, Fut>(&self, operation_name: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt: u32 = 0;

        loop {
            let err = match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        info!(operation = operation_name, attempt, "依赖已就绪");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if !err.is_retryable() || attempt >= self.max_retries {
                warn!(
                    operation = operation_name,
                    attempt,
                    retryable = err.is_retryable(),
                    error = %err,
                    "启动失败，不再重试"
                );
                return Err(err);
            }

            let delay = self.delay_for_attempt(attempt);
            warn!(
                operation = operation_name,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "依赖尚未就绪，退避后重试"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
