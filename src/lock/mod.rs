//! Lock Handles
//!
//! Every account owns exactly one lock handle guarding its balance. There is
//! no global acquisition order: `Account::transfer` nests the destination
//! lock inside the source lock, so two opposite transfers can deadlock.
//!
//! # Implementations
//!
//! - [`PlainLock`] - bare `std::sync::Mutex`, blocks forever when deadlocked
//! - [`MonitoredLock`] - same mutex, but registers owners and waiters with a
//!   shared [`LockMonitor`] so the deadlock can be observed from outside
//!
//! ```text
//! thread-1 ── holds ──▶ Hangga   ◀── waits ── thread-2
//!    │                                          │
//!  waits                                      holds
//!    ▼                                          ▼
//!   John  ◀──────────── (wait-for cycle) ─────────
//! ```

use std::ops::DerefMut;

use crate::core_types::{Amount, LockId};

pub mod monitor;
pub mod monitored;
pub mod plain;
pub mod watchdog;

pub use monitor::{BlockedThread, DeadlockReport, LockMonitor};
pub use monitored::{MonitoredGuard, MonitoredLock};
pub use plain::PlainLock;
pub use watchdog::DeadlockWatchdog;

/// A lock guarding one account balance.
///
/// `acquire` blocks with no timeout. Poisoning is recovered, never surfaced:
/// a panicking transfer thread must not hide the balance from inspection.
pub trait LockHandle: Send + Sync {
    type Guard<'a>: DerefMut<Target = Amount>
    where
        Self: 'a;

    /// Block until the lock is held
    fn acquire(&self) -> Self::Guard<'_>;

    /// Take the lock only if it is free right now
    fn try_acquire(&self) -> Option<Self::Guard<'_>>;

    /// Monitor registration, if any
    fn lock_id(&self) -> Option<LockId> {
        None
    }
}
