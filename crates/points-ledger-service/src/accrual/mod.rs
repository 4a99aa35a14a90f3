//! 外部 accrual 服务接入

mod client;
mod dto;

pub use client::{AccrualClient, AccrualOutcome, HttpAccrualClient};
pub use dto::AccrualResponse;

#[cfg(test)]
pub use client::MockAccrualClient;
