//! Serialized Executor
//!
//! A single `tokio::sync::Mutex<()>` gate, owned by the caller and passed in,
//! is held around each transfer. Each acquisition waits for the previous
//! transfer *and* its hold time to complete, so transfers run strictly one
//! after another.
//!
//! # Limitation
//!
//! This is sequential execution, not fine-grained concurrency control. The
//! account locks underneath are still taken in caller order with no global
//! ordering; the gate only guarantees that no two transfers overlap.
//!
//! # Cancellation
//!
//! The gate guard is owned, not borrowed from the future. It travels into the
//! blocking task with the transfer and comes back out when the transfer
//! returns. Dropping the future returned by [`SerialExecutor::run_one`]
//! therefore frees the gate only after a transfer already handed to the
//! blocking pool has finished. A drop during the hold frees it at once.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use super::TransferPlan;
use crate::bank::{Bank, Snapshot};
use crate::error::LabError;
use crate::lock::LockHandle;

pub struct SerialExecutor {
    gate: Arc<Mutex<()>>,
}

impl SerialExecutor {
    pub fn new(gate: Arc<Mutex<()>>) -> Self {
        Self { gate }
    }

    pub fn gate(&self) -> &Arc<Mutex<()>> {
        &self.gate
    }

    /// Run one transfer with the gate held, then keep it for `plan.hold`
    pub async fn run_one<L>(&self, bank: &Bank<L>, plan: &TransferPlan) -> Result<(), LabError>
    where
        L: LockHandle + 'static,
    {
        let from = bank.account(&plan.from)?.clone();
        let to = bank.account(&plan.to)?.clone();
        let amount = plan.amount;

        let gate = self.gate.clone().lock_owned().await;
        debug!(from = %plan.from, to = %plan.to, "Gate acquired");

        // If this future is dropped mid-transfer, the task still owns the gate
        let gate = tokio::task::spawn_blocking(move || {
            from.transfer(&to, amount);
            gate
        })
        .await?;
        tokio::time::sleep(plan.hold).await;
        drop(gate);

        debug!(from = %plan.from, to = %plan.to, "Gate released");
        Ok(())
    }

    /// Run every plan in order and return the final balances.
    ///
    /// The snapshot is taken under the gate, so no gated transfer can be
    /// mid-flight. An account lock held by anything else is reported as
    /// [`LabError::BalancesBusy`] instead of blocking the runtime.
    pub async fn run<L>(&self, bank: &Bank<L>, plans: &[TransferPlan]) -> Result<Snapshot, LabError>
    where
        L: LockHandle + 'static,
    {
        for plan in plans {
            self.run_one(bank, plan).await?;
        }
        let _gate = self.gate.lock().await;
        let snapshot = bank.try_snapshot().ok_or(LabError::BalancesBusy)?;
        info!(total = snapshot.total(), "Serialized transfers finished");
        Ok(snapshot)
    }
}
