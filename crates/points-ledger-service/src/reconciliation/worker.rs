//! 对账 Worker
//!
//! 按固定间隔拉取待对账订单，逐个向 accrual 服务查询结果并应用到账本：
//! 1. Resolved：应用状态迁移，REGISTERED 时入账
//! 2. RateLimited：关闭全局闸门，本轮尚未开始的查询全部顺延，下一轮等闸门重开后再开始
//! 3. Unavailable（含超时）：本轮跳过，下一轮重试
//!
//! 收到关闭信号后完成当前轮次即退出，不会开始新的一轮。

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use points_shared::config::ReconciliationConfig;
use points_shared::observability::metrics;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use super::gate::RateLimitGate;
use crate::accrual::{AccrualClient, AccrualOutcome};
use crate::error::Result;
use crate::models::{ApplyResult, PendingOrder};
use crate::repository::OrderRepositoryTrait;

const WORKER_NAME: &str = "reconciliation_worker";

/// 单个订单在一轮对账中的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderProgress {
    /// 状态已变更，`finalized` 表示进入了终态
    Updated { finalized: bool },
    /// 结果未引起状态变化
    Unchanged,
    /// 服务不可用或超时，本轮跳过
    Skipped,
    /// 闸门关闭，未发起查询
    Deferred,
    /// 本次查询收到 429，订单顺延
    RateLimited,
    /// 应用结果时存储出错，下一轮重试
    Failed,
}

/// 一轮对账的统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub pending: usize,
    /// 实际发起的查询数
    pub fetched: usize,
    pub updated: usize,
    pub finalized: usize,
    pub unchanged: usize,
    pub skipped: usize,
    /// 因限流顺延的订单（含收到 429 的那一个）
    pub deferred: usize,
    pub failed: usize,
    /// 本轮结束时闸门的剩余关闭时长
    pub rate_limited_for: Option<Duration>,
}

impl CycleReport {
    fn record(&mut self, progress: OrderProgress) {
        match progress {
            OrderProgress::Updated { finalized } => {
                self.fetched += 1;
                self.updated += 1;
                if finalized {
                    self.finalized += 1;
                }
            }
            OrderProgress::Unchanged => {
                self.fetched += 1;
                self.unchanged += 1;
            }
            OrderProgress::Skipped => {
                self.fetched += 1;
                self.skipped += 1;
            }
            OrderProgress::Deferred => self.deferred += 1,
            OrderProgress::RateLimited => {
                self.fetched += 1;
                self.deferred += 1;
            }
            OrderProgress::Failed => {
                self.fetched += 1;
                self.failed += 1;
            }
        }
    }
}

/// 对账 Worker
pub struct ReconciliationWorker {
    orders: Arc<dyn OrderRepositoryTrait>,
    client: Arc<dyn AccrualClient>,
    gate: Arc<RateLimitGate>,
    config: ReconciliationConfig,
}

impl ReconciliationWorker {
    pub fn new(
        orders: Arc<dyn OrderRepositoryTrait>,
        client: Arc<dyn AccrualClient>,
        config: ReconciliationConfig,
    ) -> Self {
        Self {
            orders,
            client,
            gate: Arc::new(RateLimitGate::new()),
            config,
        }
    }

    /// 限流闸门（测试和诊断用）
    pub fn gate(&self) -> &Arc<RateLimitGate> {
        &self.gate
    }

    /// 主循环：持续对账直到收到关闭信号
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            poll_interval = ?self.config.poll_interval(),
            batch_size = self.config.batch_size,
            concurrency = self.config.concurrency,
            "ReconciliationWorker 已启动"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            if let Some(remaining) = self.gate.remaining() {
                info!(remaining = ?remaining, "accrual 服务限流中，等待闸门重开");
                if wait_or_shutdown(&mut shutdown, self.gate.wait_until_open()).await {
                    break;
                }
            }

            match self.run_cycle().await {
                Ok(report) if report.pending > 0 => {
                    info!(
                        pending = report.pending,
                        fetched = report.fetched,
                        updated = report.updated,
                        finalized = report.finalized,
                        skipped = report.skipped,
                        deferred = report.deferred,
                        failed = report.failed,
                        "对账轮次完成"
                    );
                }
                Ok(_) => debug!("没有待对账订单"),
                Err(e) => error!(error = %e, "拉取待对账订单失败"),
            }

            // 记录 Worker 健康状态
            metrics::set_worker_last_run(WORKER_NAME);

            let poll = tokio::time::sleep(self.config.poll_interval());
            if wait_or_shutdown(&mut shutdown, poll).await {
                break;
            }
        }

        info!("ReconciliationWorker 已停止");
    }

    /// 执行一轮对账
    ///
    /// 只有拉取待对账订单失败才返回错误，单个订单的失败计入报告。
    #[instrument(skip(self))]
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let pending = self.orders.list_pending(self.config.batch_size).await?;

        let mut report = CycleReport {
            pending: pending.len(),
            ..CycleReport::default()
        };

        let concurrency = self.config.concurrency.max(1);
        let results: Vec<OrderProgress> = stream::iter(pending)
            .map(|order| self.process_order(order))
            .buffer_unordered(concurrency)
            .collect()
            .await;

        for progress in results {
            report.record(progress);
        }
        report.rate_limited_for = self.gate.remaining();

        metrics::record_reconciliation_cycle(
            report.deferred as u64,
            report
                .rate_limited_for
                .map(|d| d.as_secs_f64())
                .unwrap_or(0.0),
        );

        Ok(report)
    }

    /// 处理单个订单；闸门在每次查询前检查
    async fn process_order(&self, order: PendingOrder) -> OrderProgress {
        if !self.gate.is_open() {
            return OrderProgress::Deferred;
        }

        let outcome = match tokio::time::timeout(
            self.config.fetch_timeout(),
            self.client.fetch(&order.number),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => AccrualOutcome::unavailable("查询超时"),
        };

        match outcome {
            AccrualOutcome::Resolved { status, points } => {
                match self.orders.apply_outcome(&order.number, status, points).await {
                    Ok(ApplyResult::Updated { status, credited }) => {
                        if status.is_terminal() {
                            metrics::record_order_finalized(
                                status.as_str(),
                                credited.minor().unsigned_abs(),
                            );
                        }
                        debug!(order = %order.number, status = %status, "订单状态已更新");
                        OrderProgress::Updated {
                            finalized: status.is_terminal(),
                        }
                    }
                    Ok(ApplyResult::Unchanged { .. }) => OrderProgress::Unchanged,
                    Err(e) => {
                        error!(order = %order.number, owner = %order.owner, error = %e, "应用对账结果失败，下一轮重试");
                        OrderProgress::Failed
                    }
                }
            }
            AccrualOutcome::RateLimited { retry_after } => {
                warn!(order = %order.number, retry_after = ?retry_after, "accrual 服务限流，暂停所有查询");
                self.gate.close_for(retry_after);
                OrderProgress::RateLimited
            }
            AccrualOutcome::Unavailable { reason } => {
                warn!(order = %order.number, reason = %reason, "accrual 服务不可用，本轮跳过");
                OrderProgress::Skipped
            }
        }
    }
}

/// 等待 `until` 完成或收到关闭信号，收到关闭信号时返回 true
///
/// 值未变为 true 的通知不会打断等待。发送端被丢弃视为关闭。
async fn wait_or_shutdown<F>(shutdown: &mut watch::Receiver<bool>, until: F) -> bool
where
    F: Future<Output = ()>,
{
    tokio::pin!(until);
    loop {
        tokio::select! {
            _ = &mut until => return false,
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    return true;
                }
            }
        }
    }
}
