//! 订单对账

mod gate;
mod worker;

pub use gate::RateLimitGate;
pub use worker::{CycleReport, OrderProgress, ReconciliationWorker};
