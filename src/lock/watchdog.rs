//! Deadlock Watchdog
//!
//! Background thread that periodically scans a [`LockMonitor`] and logs each
//! newly seen wait-for cycle once. Diagnostics only: it never recovers.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, RecvTimeoutError, Sender};
use rustc_hash::FxHashSet;
use tracing::{info, warn};

use super::monitor::LockMonitor;
use crate::core_types::LockId;
use crate::error::LabError;

pub struct DeadlockWatchdog {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<usize>>,
}

impl DeadlockWatchdog {
    /// Start scanning `monitor` every `interval`
    pub fn spawn(monitor: Arc<LockMonitor>, interval: Duration) -> Result<Self, LabError> {
        let (stop_tx, stop_rx) = channel::bounded::<()>(1);

        let handle = thread::Builder::new()
            .name("deadlock-watchdog".into())
            .spawn(move || {
                let mut seen: FxHashSet<Vec<LockId>> = FxHashSet::default();
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }

                    for report in monitor.find_deadlocks() {
                        if !seen.insert(report.key()) {
                            continue;
                        }
                        for blocked in &report.threads {
                            warn!(
                                thread = %blocked.thread,
                                lock = %blocked.lock_label,
                                owner = blocked.owner.as_deref().unwrap_or("?"),
                                "Watchdog: thread blocked in deadlock cycle"
                            );
                        }
                    }
                }
                info!(cycles = seen.len(), "Watchdog stopped");
                seen.len()
            })
            .map_err(LabError::ThreadSpawn)?;

        Ok(Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Stop the watchdog and return the number of distinct cycles it logged
    pub fn stop(mut self) -> usize {
        self.shutdown()
    }

    fn shutdown(&mut self) -> usize {
        // Dropping the sender disconnects the channel and wakes the thread
        self.stop_tx.take();
        self.handle
            .take()
            .and_then(|h| h.join().ok())
            .unwrap_or(0)
    }
}

impl Drop for DeadlockWatchdog {
    fn drop(&mut self) {
        self.shutdown();
    }
}
