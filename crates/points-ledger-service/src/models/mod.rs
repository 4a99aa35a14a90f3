//! 积分账本领域模型

pub mod account;
pub mod enums;
pub mod ledger_entry;
pub mod order;
pub mod points;

// 重新导出常用类型
pub use account::Account;
pub use enums::{EntryKind, OrderStatus};
pub use ledger_entry::{LedgerEntry, NewLedgerEntry};
pub use order::{ApplyResult, Order, PendingOrder, SubmitOutcome};
pub use points::{Points, PointsConversionError};
