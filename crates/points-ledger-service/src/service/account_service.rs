//! 积分账户服务

use std::sync::Arc;

use tracing::{info, instrument};
use validator::Validate;

use super::dto::{BalanceView, Caller};
use crate::error::{LedgerError, Result};
use crate::repository::AccountRepositoryTrait;

/// 积分账户服务
pub struct AccountService<A: AccountRepositoryTrait> {
    account_repo: Arc<A>,
}

impl<A: AccountRepositoryTrait> AccountService<A> {
    pub fn new(account_repo: Arc<A>) -> Self {
        Self { account_repo }
    }

    /// 开户（用户注册时调用），余额从零开始
    #[instrument(skip(self))]
    pub async fn open(&self, login: &str) -> Result<BalanceView> {
        Caller::new(login).validate()?;

        let account = self.account_repo.open_account(login).await?;
        info!(login = %login, "积分账户已开通");

        Ok(BalanceView::from(&account))
    }

    pub async fn balance(&self, login: &str) -> Result<BalanceView> {
        Caller::new(login).validate()?;

        self.account_repo
            .get_account(login)
            .await?
            .map(|account| BalanceView::from(&account))
            .ok_or_else(|| LedgerError::AccountNotFound(login.to_string()))
    }
}
