use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use super::LockHandle;
use super::monitor::LockMonitor;
use crate::core_types::{Amount, LockId};

/// Per-account mutex that reports owners and waiters to a [`LockMonitor`].
///
/// Locking semantics are identical to [`super::PlainLock`]; a deadlocked
/// thread still blocks forever, it just becomes visible.
#[derive(Debug)]
pub struct MonitoredLock {
    id: LockId,
    balance: Mutex<Amount>,
    monitor: Arc<LockMonitor>,
}

impl MonitoredLock {
    pub fn new(monitor: &Arc<LockMonitor>, label: &str, initial: Amount) -> Self {
        Self {
            id: monitor.register(label),
            balance: Mutex::new(initial),
            monitor: monitor.clone(),
        }
    }

    fn guard<'a>(&'a self, inner: MutexGuard<'a, Amount>) -> MonitoredGuard<'a> {
        self.monitor.acquired(self.id);
        MonitoredGuard { inner, lock: self }
    }
}

/// Guard that clears the owner record before the mutex is unlocked
pub struct MonitoredGuard<'a> {
    inner: MutexGuard<'a, Amount>,
    lock: &'a MonitoredLock,
}

impl Deref for MonitoredGuard<'_> {
    type Target = Amount;

    fn deref(&self) -> &Amount {
        &self.inner
    }
}

impl DerefMut for MonitoredGuard<'_> {
    fn deref_mut(&mut self) -> &mut Amount {
        &mut self.inner
    }
}

impl Drop for MonitoredGuard<'_> {
    fn drop(&mut self) {
        // Runs before `inner` is dropped, i.e. while the mutex is still held
        self.lock.monitor.released(self.lock.id);
    }
}

impl LockHandle for MonitoredLock {
    type Guard<'a> = MonitoredGuard<'a>;

    fn acquire(&self) -> MonitoredGuard<'_> {
        if let Some(guard) = self.try_acquire() {
            return guard;
        }
        self.monitor.begin_wait(self.id);
        let inner = self.balance.lock().unwrap_or_else(PoisonError::into_inner);
        self.monitor.end_wait();
        self.guard(inner)
    }

    fn try_acquire(&self) -> Option<MonitoredGuard<'_>> {
        let inner = match self.balance.try_lock() {
            Ok(inner) => inner,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return None,
        };
        Some(self.guard(inner))
    }

    fn lock_id(&self) -> Option<LockId> {
        Some(self.id)
    }
}
