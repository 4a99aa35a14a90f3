//! 账本流水仓储
//!
//! 流水只追加不修改；写入只发生在入账或提现事务内部

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use super::traits::LedgerEntryRepositoryTrait;
use crate::error::Result;
use crate::models::{EntryKind, LedgerEntry, NewLedgerEntry};

/// 账本流水仓储
pub struct LedgerEntryRepository {
    pool: PgPool,
}

impl LedgerEntryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 在事务中追加流水
    ///
    /// `(order_number, kind)` 唯一，违反时返回的 sqlx 错误由调用方映射为业务冲突
    pub async fn create_in_tx(tx: &mut PgConnection, entry: &NewLedgerEntry) -> Result<LedgerEntry> {
        let created = sqlx::query_as::<_, LedgerEntry>(
            r#"
            INSERT INTO ledger_entries (order_number, owner, kind, amount, occurred_at)
            VALUES ($1, $2, $3, $4, NOW())
            RETURNING id, order_number, owner, kind, amount, occurred_at
            "#,
        )
        .bind(&entry.order_number)
        .bind(&entry.owner)
        .bind(entry.kind)
        .bind(entry.amount)
        .fetch_one(tx)
        .await?;

        Ok(created)
    }

    /// 用户某类流水，按发生时间升序
    #[instrument(skip(self))]
    pub async fn list_entries(&self, owner: &str, kind: EntryKind) -> Result<Vec<LedgerEntry>> {
        let entries = sqlx::query_as::<_, LedgerEntry>(
            r#"
            SELECT id, order_number, owner, kind, amount, occurred_at
            FROM ledger_entries
            WHERE owner = $1 AND kind = $2
            ORDER BY occurred_at ASC, id ASC
            "#,
        )
        .bind(owner)
        .bind(kind)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}

#[async_trait]
impl LedgerEntryRepositoryTrait for LedgerEntryRepository {
    async fn list_entries(&self, owner: &str, kind: EntryKind) -> Result<Vec<LedgerEntry>> {
        self.list_entries(owner, kind).await
    }
}
