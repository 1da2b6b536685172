//! Unguarded Runner
//!
//! Issues every transfer on its own named thread, then waits at most the
//! plan's `join_wait` for it (a join-with-timeout) before launching the next.
//! Threads still running afterwards are never cancelled. A deadlocked thread
//! stays blocked for the life of the process.
//!
//! # Outcome
//!
//! Either every thread finished and the snapshot total equals the starting
//! total, or some threads are stuck. In the second case no snapshot can be
//! taken (a stuck transfer always holds its source lock) and the lock
//! monitor, if any, reports the wait-for cycle.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver};
use serde::Serialize;
use tracing::{info, warn};

use super::TransferPlan;
use crate::bank::{Bank, Snapshot};
use crate::core_types::Amount;
use crate::error::LabError;
use crate::lock::{DeadlockReport, LockHandle, LockMonitor};

/// Whether one transfer thread finished within the waits it was given
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadOutcome {
    pub thread: String,
    /// Finished within its own bounded join wait
    pub joined_in_time: bool,
    /// Finished by the end of the settle period
    pub finished: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnguardedReport {
    pub outcomes: Vec<ThreadOutcome>,
    pub snapshot: Option<Snapshot>,
    pub deadlocks: Vec<DeadlockReport>,
    pub expected_total: Amount,
}

impl UnguardedReport {
    pub fn all_finished(&self) -> bool {
        self.outcomes.iter().all(|o| o.finished)
    }

    pub fn stuck_threads(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| !o.finished)
            .map(|o| o.thread.as_str())
            .collect()
    }

    pub fn deadlock_detected(&self) -> bool {
        !self.deadlocks.is_empty()
    }

    /// `Some(true)` if a snapshot was taken and its total matches,
    /// `None` if no snapshot could be taken
    pub fn is_conserved(&self) -> Option<bool> {
        self.snapshot
            .as_ref()
            .map(|s| s.total() == self.expected_total)
    }
}

pub struct UnguardedRunner<'a, L> {
    bank: &'a Bank<L>,
    monitor: Option<Arc<LockMonitor>>,
    settle: Duration,
}

impl<'a, L: LockHandle + 'static> UnguardedRunner<'a, L> {
    pub fn new(bank: &'a Bank<L>) -> Self {
        Self {
            bank,
            monitor: None,
            settle: Duration::ZERO,
        }
    }

    /// Scan this monitor for deadlocks after the run
    pub fn with_monitor(mut self, monitor: Arc<LockMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// Extra time to let late threads finish before inspecting balances
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn run(&self, plans: &[TransferPlan]) -> Result<UnguardedReport, LabError> {
        // Resolve every account before launching anything
        let mut resolved = Vec::with_capacity(plans.len());
        for plan in plans {
            let from = self.bank.account(&plan.from)?.clone();
            let to = self.bank.account(&plan.to)?.clone();
            resolved.push((plan, from, to));
        }

        let mut pending: Vec<(String, Receiver<()>, bool)> = Vec::with_capacity(plans.len());
        for (index, (plan, from, to)) in resolved.into_iter().enumerate() {
            let name = plan.thread_name(index);
            let amount = plan.amount;
            let (done_tx, done_rx) = channel::bounded::<()>(1);

            thread::Builder::new()
                .name(name.clone())
                .spawn(move || {
                    from.transfer(&to, amount);
                    let _ = done_tx.send(());
                })
                .map_err(LabError::ThreadSpawn)?;

            let joined = done_rx.recv_timeout(plan.join_wait).is_ok();
            if !joined {
                info!(thread = %name, wait_ms = plan.join_wait.as_millis() as u64, "Join wait elapsed, moving on");
            }
            pending.push((name, done_rx, joined));
        }

        let deadline = Instant::now() + self.settle;
        let outcomes: Vec<ThreadOutcome> = pending
            .into_iter()
            .map(|(thread, done_rx, joined_in_time)| {
                let finished = joined_in_time
                    || done_rx
                        .recv_timeout(deadline.saturating_duration_since(Instant::now()))
                        .is_ok();
                ThreadOutcome {
                    thread,
                    joined_in_time,
                    finished,
                }
            })
            .collect();

        let deadlocks = self
            .monitor
            .as_ref()
            .map(|m| m.log_deadlocks())
            .unwrap_or_default();

        let report = UnguardedReport {
            outcomes,
            snapshot: self.bank.try_snapshot(),
            deadlocks,
            expected_total: self.bank.expected_total(),
        };

        match report.is_conserved() {
            Some(true) => info!(total = report.expected_total, "All transfers finished, funds conserved"),
            Some(false) => warn!(expected = report.expected_total, "Funds not conserved"),
            None => warn!(stuck = ?report.stuck_threads(), "Balances unavailable, transfers still hold locks"),
        }

        Ok(report)
    }
}
