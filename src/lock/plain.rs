use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};

use super::LockHandle;
use crate::core_types::Amount;

/// Per-account `std::sync::Mutex` with nothing else attached.
///
/// A thread blocked here in a deadlock stays blocked until the process exits.
#[derive(Debug, Default)]
pub struct PlainLock {
    balance: Mutex<Amount>,
}

impl PlainLock {
    pub fn new(initial: Amount) -> Self {
        Self {
            balance: Mutex::new(initial),
        }
    }
}

impl LockHandle for PlainLock {
    type Guard<'a> = MutexGuard<'a, Amount>;

    fn acquire(&self) -> MutexGuard<'_, Amount> {
        self.balance.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn try_acquire(&self) -> Option<MutexGuard<'_, Amount>> {
        match self.balance.try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        }
    }
}
