//! 测试环境管理
//!
//! 每个测试独占一套账本、mock accrual 服务和 Worker，互不干扰。

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use mock_accrual::{AccrualServiceState, spawn_server};
use points_ledger::repository::InMemoryLedger;
use points_ledger::service::{AccountService, OrderService, WithdrawalService};
use points_ledger::{HttpAccrualClient, ReconciliationWorker};
use points_shared::config::{AccrualConfig, ReconciliationConfig};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// 测试环境配置
#[derive(Debug, Clone)]
pub struct TestEnvConfig {
    /// Worker 轮询间隔
    pub poll_interval: Duration,
    /// Worker 并发度
    pub concurrency: usize,
    /// mock accrual 每分钟请求上限，0 为不限
    pub accrual_max_rpm: u32,
    /// 等待异步结果的超时时间
    pub wait_timeout: Duration,
}

impl Default for TestEnvConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(50),
            concurrency: 2,
            accrual_max_rpm: 0,
            wait_timeout: Duration::from_secs(10),
        }
    }
}

/// 运行中的 Worker
pub struct WorkerHandle {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl WorkerHandle {
    /// 通知停止并等待 Worker 退出
    pub async fn stop(self) -> Result<()> {
        self.shutdown.send(true)?;
        tokio::time::timeout(Duration::from_secs(5), self.handle).await??;
        Ok(())
    }
}

/// 端到端测试环境
pub struct TestEnvironment {
    pub config: TestEnvConfig,
    pub accrual: Arc<AccrualServiceState>,
    pub accrual_addr: SocketAddr,
    pub ledger: Arc<InMemoryLedger>,
    pub accounts: AccountService<InMemoryLedger>,
    pub orders: OrderService<InMemoryLedger, InMemoryLedger>,
    pub withdrawals: WithdrawalService<InMemoryLedger, InMemoryLedger>,
    worker: Arc<ReconciliationWorker>,
    accrual_server: JoinHandle<()>,
}

impl TestEnvironment {
    pub async fn setup() -> Result<Self> {
        Self::setup_with(TestEnvConfig::default()).await
    }

    pub async fn setup_with(config: TestEnvConfig) -> Result<Self> {
        let accrual =
            Arc::new(AccrualServiceState::new().with_rate_limit(config.accrual_max_rpm));
        let (accrual_addr, accrual_server) = spawn_server(accrual.clone()).await?;

        let client = HttpAccrualClient::new(&AccrualConfig {
            base_url: format!("http://{accrual_addr}"),
            request_timeout_ms: 2_000,
            default_retry_after_secs: 1,
        })?;

        let ledger = Arc::new(InMemoryLedger::new());
        let worker = Arc::new(ReconciliationWorker::new(
            ledger.clone(),
            Arc::new(client),
            ReconciliationConfig {
                poll_interval_ms: config.poll_interval.as_millis() as u64,
                batch_size: 100,
                concurrency: config.concurrency,
                fetch_timeout_ms: 3_000,
            },
        ));

        Ok(Self {
            accounts: AccountService::new(ledger.clone()),
            orders: OrderService::new(ledger.clone(), ledger.clone()),
            withdrawals: WithdrawalService::new(ledger.clone(), ledger.clone()),
            config,
            accrual,
            accrual_addr,
            ledger,
            worker,
            accrual_server,
        })
    }

    /// 后台启动对账 Worker
    pub fn start_worker(&self) -> WorkerHandle {
        let (shutdown, rx) = watch::channel(false);
        let worker = self.worker.clone();
        let handle = tokio::spawn(async move { worker.run(rx).await });
        WorkerHandle { shutdown, handle }
    }

    pub fn worker(&self) -> &ReconciliationWorker {
        &self.worker
    }

    /// 开户并提交一组订单
    pub async fn user_with_orders(&self, login: &str, numbers: &[&str]) -> Result<()> {
        self.accounts.open(login).await?;
        for number in numbers {
            self.orders.submit(login, number).await?;
        }
        Ok(())
    }
}

impl Drop for TestEnvironment {
    fn drop(&mut self) {
        self.accrual_server.abort();
    }
}
