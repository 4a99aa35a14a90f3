//! 订单提交与积分记录查询
//!
//! 提交只登记订单，积分计算由对账 Worker 异步完成，提交请求不会等待结果。

use std::sync::Arc;

use points_shared::observability::metrics;
use tracing::{info, instrument};

use validator::Validate;

use super::dto::{Caller, OrderView, SubmitOrderRequest};
use crate::error::{LedgerError, Result};
use crate::models::SubmitOutcome;
use crate::repository::{AccountRepositoryTrait, OrderRepositoryTrait};

/// 订单服务
pub struct OrderService<O, A>
where
    O: OrderRepositoryTrait,
    A: AccountRepositoryTrait,
{
    order_repo: Arc<O>,
    account_repo: Arc<A>,
}

impl<O, A> OrderService<O, A>
where
    O: OrderRepositoryTrait,
    A: AccountRepositoryTrait,
{
    pub fn new(order_repo: Arc<O>, account_repo: Arc<A>) -> Self {
        Self {
            order_repo,
            account_repo,
        }
    }

    /// 提交订单
    ///
    /// 订单号已被提交过时返回冲突错误，`is_success_like()` 区分是否为本人重复提交。
    /// 未开户的用户不能提交，否则订单入账时找不到账户。
    #[instrument(skip(self))]
    pub async fn submit(&self, login: &str, number: &str) -> Result<()> {
        Caller::new(login).validate()?;
        SubmitOrderRequest::new(number).validate()?;

        if self.account_repo.get_account(login).await?.is_none() {
            return Err(LedgerError::AccountNotFound(login.to_string()));
        }

        let outcome = self.order_repo.submit_order(number, login).await?;
        metrics::record_order_submission(outcome.as_str());

        match outcome {
            SubmitOutcome::Accepted => {
                info!(login = %login, number = %number, "订单已登记，等待积分计算");
                Ok(())
            }
            SubmitOutcome::OwnedBySelf => {
                Err(LedgerError::OrderAlreadySubmittedBySelf(number.to_string()))
            }
            SubmitOutcome::OwnedByOther => {
                Err(LedgerError::OrderAlreadySubmittedByOther(number.to_string()))
            }
        }
    }

    /// 用户提交过的订单，按提交时间升序
    pub async fn list_accrual_history(&self, login: &str) -> Result<Vec<OrderView>> {
        Caller::new(login).validate()?;

        let orders = self.order_repo.list_orders_by_owner(login).await?;
        Ok(orders.iter().map(OrderView::from).collect())
    }
}
