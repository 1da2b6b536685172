//! Transfer Scenarios
//!
//! Two ways of issuing the same scripted transfers:
//!
//! - [`UnguardedRunner`] - one OS thread per transfer, bounded join waits,
//!   per-account locks only. May deadlock; blocked threads are left behind.
//! - [`SerialExecutor`] - one coarse `tokio::sync::Mutex` gate owned by the
//!   caller, acquired around each transfer in order. Deterministic, and
//!   without any transfer-level parallelism.
//!
//! The serialized variant does not order account locks by identity. It
//! trades concurrency for correctness and is kept that way on purpose.

use std::time::Duration;

use serde::Serialize;

use crate::core_types::{Amount, DEFAULT_PROCESSING_DELAY_MS};

pub mod serialized;
pub mod unguarded;

pub use serialized::SerialExecutor;
pub use unguarded::{ThreadOutcome, UnguardedReport, UnguardedRunner};

/// One scripted transfer step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferPlan {
    pub from: String,
    pub to: String,
    pub amount: Amount,
    /// How long the unguarded runner waits for this thread before moving on
    pub join_wait: Duration,
    /// How long the serialized runner keeps the gate after the transfer
    pub hold: Duration,
}

impl TransferPlan {
    pub fn new(from: &str, to: &str, amount: Amount) -> Self {
        let default_wait = Duration::from_millis(DEFAULT_PROCESSING_DELAY_MS);
        Self {
            from: from.to_string(),
            to: to.to_string(),
            amount,
            join_wait: default_wait,
            hold: default_wait,
        }
    }

    pub fn with_join_wait(mut self, join_wait: Duration) -> Self {
        self.join_wait = join_wait;
        self
    }

    pub fn with_hold(mut self, hold: Duration) -> Self {
        self.hold = hold;
        self
    }

    /// Thread name used by the unguarded runner
    pub fn thread_name(&self, index: usize) -> String {
        format!("transfer-{}-{}->{}", index, self.from, self.to)
    }
}
