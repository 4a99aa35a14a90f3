//! 积分提现服务
//!
//! 校验请求后调用账户仓储的原子提现：扣减余额与追加 WITHDRAWAL 流水在同一单元内完成。

use std::sync::Arc;

use points_shared::observability::metrics;
use tracing::{info, instrument, warn};

use validator::Validate;

use super::dto::{Caller, WithdrawRequest, WithdrawalView};
use crate::error::{LedgerError, Result};
use crate::models::{EntryKind, Points};
use crate::repository::{AccountRepositoryTrait, LedgerEntryRepositoryTrait};

/// 积分提现服务
pub struct WithdrawalService<A, L>
where
    A: AccountRepositoryTrait,
    L: LedgerEntryRepositoryTrait,
{
    account_repo: Arc<A>,
    ledger_repo: Arc<L>,
}

impl<A, L> WithdrawalService<A, L>
where
    A: AccountRepositoryTrait,
    L: LedgerEntryRepositoryTrait,
{
    pub fn new(account_repo: Arc<A>, ledger_repo: Arc<L>) -> Self {
        Self {
            account_repo,
            ledger_repo,
        }
    }

    /// 使用积分支付订单
    ///
    /// 金额必须大于 0；余额不足时返回 InsufficientFunds，余额保持不变。
    #[instrument(skip(self, request), fields(order = %request.order, sum = request.sum))]
    pub async fn withdraw(&self, login: &str, request: &WithdrawRequest) -> Result<WithdrawalView> {
        Caller::new(login).validate()?;
        request.validate()?;

        // NaN 与不足一个最小单位的金额能通过范围校验，在换算后拦截
        let amount = Points::from_decimal(request.sum)?;
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount(format!(
                "提现金额必须大于 0: {}",
                request.sum
            )));
        }

        match self
            .account_repo
            .withdraw(login, &request.order, amount)
            .await
        {
            Ok(entry) => {
                metrics::record_withdrawal("success");
                info!(login = %login, amount = %amount, "积分提现完成");
                Ok(WithdrawalView::from(&entry))
            }
            Err(e) => {
                metrics::record_withdrawal(e.error_code());
                if e.is_business_error() {
                    warn!(login = %login, error = %e, "积分提现被拒绝");
                }
                Err(e)
            }
        }
    }

    /// 提现记录，按处理时间升序
    pub async fn list_withdrawal_history(&self, login: &str) -> Result<Vec<WithdrawalView>> {
        Caller::new(login).validate()?;

        let entries = self
            .ledger_repo
            .list_entries(login, EntryKind::Withdrawal)
            .await?;
        Ok(entries.iter().map(WithdrawalView::from).collect())
    }
}
