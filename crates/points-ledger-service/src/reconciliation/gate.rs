//! 全局限流闸门
//!
//! 记录「最早可再次请求」的时刻。任一查询收到 429 都会关闭闸门，
//! 之后所有订单的查询都要等闸门重新打开。

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

/// 限流闸门，由对账 Worker 持有并在所有查询间共享
#[derive(Debug, Default)]
pub struct RateLimitGate {
    reopen_at: Mutex<Option<Instant>>,
}

impl RateLimitGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// 关闭闸门 `pause` 时长
    ///
    /// 只会延长不会缩短：并发收到多个 429 时取最晚的重开时刻。
    pub fn close_for(&self, pause: Duration) {
        let candidate = Instant::now() + pause;
        let mut reopen_at = self.reopen_at.lock();
        match *reopen_at {
            Some(existing) if existing >= candidate => {}
            _ => *reopen_at = Some(candidate),
        }
    }

    /// 距离闸门重开的剩余时间，已打开时返回 None
    pub fn remaining(&self) -> Option<Duration> {
        let reopen_at = (*self.reopen_at.lock())?;
        let now = Instant::now();
        (reopen_at > now).then(|| reopen_at - now)
    }

    pub fn is_open(&self) -> bool {
        self.remaining().is_none()
    }

    /// 等待闸门重开
    ///
    /// 睡醒后重新检查，期间若被再次关闭则继续等待。
    pub async fn wait_until_open(&self) {
        while let Some(remaining) = self.remaining() {
            tokio::time::sleep(remaining).await;
        }
    }
}
