//! 内存账本
//!
//! 与 Postgres 仓储满足相同的原子性约定：每个写操作在同一把锁内
//! 先完成全部校验再修改状态，任何一步失败都不会留下部分写入。
//! 用于测试和本地开发。

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use super::traits::{AccountRepositoryTrait, LedgerEntryRepositoryTrait, OrderRepositoryTrait};
use crate::error::{LedgerError, Result};
use crate::models::{
    Account, ApplyResult, EntryKind, LedgerEntry, NewLedgerEntry, Order, OrderStatus,
    PendingOrder, Points, SubmitOutcome,
};

#[derive(Default)]
struct LedgerState {
    /// 按提交顺序保存，`order_index` 记录订单号到下标的映射
    orders: Vec<Order>,
    order_index: HashMap<String, usize>,
    accounts: HashMap<String, Account>,
    entries: Vec<LedgerEntry>,
    next_entry_id: i64,
}

impl LedgerState {
    fn has_entry(&self, order_number: &str, kind: EntryKind) -> bool {
        self.entries
            .iter()
            .any(|e| e.kind == kind && e.order_number == order_number)
    }

    fn append_entry(&mut self, entry: NewLedgerEntry) -> LedgerEntry {
        self.next_entry_id += 1;
        let created = entry.into_entry(self.next_entry_id, Utc::now());
        self.entries.push(created.clone());
        created
    }
}

/// 内存账本，同时实现订单、账户、流水三个仓储接口
#[derive(Default)]
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// 所有流水快照（测试中用于核对守恒关系）
    pub fn entries_snapshot(&self) -> Vec<LedgerEntry> {
        self.state.lock().entries.clone()
    }
}

#[async_trait]
impl OrderRepositoryTrait for InMemoryLedger {
    async fn submit_order(&self, number: &str, owner: &str) -> Result<SubmitOutcome> {
        let mut state = self.state.lock();

        if let Some(&idx) = state.order_index.get(number) {
            return Ok(if state.orders[idx].owner == owner {
                SubmitOutcome::OwnedBySelf
            } else {
                SubmitOutcome::OwnedByOther
            });
        }

        let idx = state.orders.len();
        state.orders.push(Order::new(number, owner));
        state.order_index.insert(number.to_string(), idx);

        Ok(SubmitOutcome::Accepted)
    }

    async fn list_pending(&self, limit: i64) -> Result<Vec<PendingOrder>> {
        let state = self.state.lock();
        let limit = usize::try_from(limit).unwrap_or(0);

        Ok(state
            .orders
            .iter()
            .filter(|o| o.is_pending())
            .take(limit)
            .map(|o| PendingOrder {
                number: o.number.clone(),
                owner: o.owner.clone(),
            })
            .collect())
    }

    async fn apply_outcome(
        &self,
        number: &str,
        status: OrderStatus,
        points: Points,
    ) -> Result<ApplyResult> {
        if points.is_negative() {
            return Err(LedgerError::InvalidAmount(points.to_string()));
        }

        let mut state = self.state.lock();

        let idx = *state
            .order_index
            .get(number)
            .ok_or_else(|| LedgerError::OrderNotFound(number.to_string()))?;

        let current = state.orders[idx].status;
        if !current.accepts(status) {
            return Ok(ApplyResult::Unchanged { current });
        }

        let owner = state.orders[idx].owner.clone();
        let credited = if status == OrderStatus::Registered {
            points
        } else {
            Points::ZERO
        };

        // 全部校验通过后才修改状态
        if status == OrderStatus::Registered {
            let account = state
                .accounts
                .get(&owner)
                .ok_or_else(|| LedgerError::AccountNotFound(owner.clone()))?;
            let new_balance = account
                .current_points
                .checked_add(credited)
                .ok_or_else(|| LedgerError::InvalidAmount(credited.to_string()))?;
            if state.has_entry(number, EntryKind::Accrual) {
                return Err(LedgerError::Internal(format!(
                    "订单 {number} 已存在入账流水"
                )));
            }

            if let Some(account) = state.accounts.get_mut(&owner) {
                account.current_points = new_balance;
            }
            state.append_entry(NewLedgerEntry::accrual(number, &owner, credited));
        }

        let order = &mut state.orders[idx];
        order.status = status;
        order.points = credited;
        order.updated_at = Utc::now();

        Ok(ApplyResult::Updated { status, credited })
    }

    async fn get_order(&self, number: &str) -> Result<Option<Order>> {
        let state = self.state.lock();
        Ok(state
            .order_index
            .get(number)
            .map(|&idx| state.orders[idx].clone()))
    }

    async fn list_orders_by_owner(&self, owner: &str) -> Result<Vec<Order>> {
        let state = self.state.lock();
        Ok(state
            .orders
            .iter()
            .filter(|o| o.owner == owner)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AccountRepositoryTrait for InMemoryLedger {
    async fn open_account(&self, login: &str) -> Result<Account> {
        let mut state = self.state.lock();

        if state.accounts.contains_key(login) {
            return Err(LedgerError::AccountAlreadyExists(login.to_string()));
        }

        let account = Account::new(login);
        state.accounts.insert(login.to_string(), account.clone());

        Ok(account)
    }

    async fn get_account(&self, login: &str) -> Result<Option<Account>> {
        Ok(self.state.lock().accounts.get(login).cloned())
    }

    async fn withdraw(
        &self,
        login: &str,
        order_number: &str,
        amount: Points,
    ) -> Result<LedgerEntry> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount(amount.to_string()));
        }

        let mut state = self.state.lock();

        let account = state
            .accounts
            .get(login)
            .ok_or_else(|| LedgerError::AccountNotFound(login.to_string()))?;

        if !account.can_afford(amount) {
            return Err(LedgerError::InsufficientFunds {
                required: amount,
                available: account.current_points,
            });
        }

        let remaining = account
            .current_points
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::InvalidAmount(amount.to_string()))?;
        let withdrawn = account
            .withdrawn_points
            .checked_add(amount)
            .ok_or_else(|| LedgerError::InvalidAmount(amount.to_string()))?;

        if state.has_entry(order_number, EntryKind::Withdrawal) {
            return Err(LedgerError::DuplicateWithdrawal(order_number.to_string()));
        }

        if let Some(account) = state.accounts.get_mut(login) {
            account.current_points = remaining;
            account.withdrawn_points = withdrawn;
        }

        Ok(state.append_entry(NewLedgerEntry::withdrawal(order_number, login, amount)))
    }
}

#[async_trait]
impl LedgerEntryRepositoryTrait for InMemoryLedger {
    async fn list_entries(&self, owner: &str, kind: EntryKind) -> Result<Vec<LedgerEntry>> {
        let state = self.state.lock();
        Ok(state
            .entries
            .iter()
            .filter(|e| e.owner == owner && e.kind == kind)
            .cloned()
            .collect())
    }
}
