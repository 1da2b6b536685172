//! Account - the transfer demonstration's only entity
//!
//! # Locking
//!
//! `transfer` takes the source lock, sleeps the processing delay, and only
//! then takes the destination lock, nested inside the first. Locks are
//! per-account with no global order, so two opposite transfers between the
//! same pair can deadlock. This is the behaviour being demonstrated; it is
//! not fixed here. See [`crate::scenario::SerialExecutor`] for the
//! externally serialized variant.

use std::ptr;
use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use crate::core_types::{Amount, DEFAULT_PROCESSING_DELAY_MS};
use crate::lock::{LockHandle, PlainLock};

#[derive(Debug)]
pub struct Account<L = PlainLock> {
    name: String,
    balance: L,
    processing_delay: Duration,
}

impl Account<PlainLock> {
    pub fn new(name: impl Into<String>, balance: Amount) -> Self {
        Self::with_lock(name, PlainLock::new(balance))
    }
}

impl<L: LockHandle> Account<L> {
    /// Create an account whose balance is guarded by `lock`
    pub fn with_lock(name: impl Into<String>, lock: L) -> Self {
        Self {
            name: name.into(),
            balance: lock,
            processing_delay: Duration::from_millis(DEFAULT_PROCESSING_DELAY_MS),
        }
    }

    pub fn with_processing_delay(mut self, delay: Duration) -> Self {
        self.processing_delay = delay;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lock(&self) -> &L {
        &self.balance
    }

    /// Current balance, blocking until the account lock is free
    pub fn balance(&self) -> Amount {
        *self.balance.acquire()
    }

    /// Current balance, or `None` if the account lock is held
    pub fn try_balance(&self) -> Option<Amount> {
        self.balance.try_acquire().map(|b| *b)
    }

    /// Add `amount`. The sign is not validated.
    pub fn deposit(&self, amount: Amount) {
        credit(&mut *self.balance.acquire(), amount);
    }

    /// Subtract `amount`. No non-negative check; `transfer` is the only
    /// caller that checks funds first.
    pub fn withdraw(&self, amount: Amount) {
        debit(&mut *self.balance.acquire(), amount);
    }

    /// Move `amount` to `to` if this account holds at least `amount`,
    /// otherwise do nothing. Both outcomes return `()`.
    pub fn transfer(&self, to: &Account<L>, amount: Amount) {
        info!(from = %self.name, to = %to.name, amount, "Transfer attempt");

        let mut source = self.balance.acquire();
        thread::sleep(self.processing_delay);

        if *source < amount {
            debug!(from = %self.name, balance = *source, amount, "Insufficient funds, skipped");
            return;
        }

        // Same mutex twice would self-deadlock; the net effect is zero anyway
        if ptr::eq(self, to) {
            return;
        }

        debit(&mut *source, amount);
        let mut destination = to.balance.acquire();
        credit(&mut *destination, amount);

        debug!(
            from = %self.name,
            to = %to.name,
            amount,
            source_balance = *source,
            destination_balance = *destination,
            "Transfer applied"
        );
    }
}

#[inline]
fn credit(balance: &mut Amount, amount: Amount) {
    *balance += amount;
}

#[inline]
fn debit(balance: &mut Amount, amount: Amount) {
    *balance -= amount;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast(name: &str, balance: Amount) -> Account {
        Account::new(name, balance).with_processing_delay(Duration::ZERO)
    }

    #[test]
    fn test_deposit_withdraw() {
        let acc = fast("Hangga", 1000);
        acc.deposit(250);
        assert_eq!(acc.balance(), 1250);
        acc.withdraw(2000);
        assert_eq!(acc.balance(), -750); // no non-negative check
        acc.deposit(-50);
        assert_eq!(acc.balance(), -800); // no sign check
    }

    #[test]
    fn test_transfer_moves_exact_amount() {
        let a = fast("Hangga", 1000);
        let b = fast("John", 1000);

        a.transfer(&b, 100);

        assert_eq!(a.balance(), 900);
        assert_eq!(b.balance(), 1100);
        assert_eq!(a.balance() + b.balance(), 2000);
    }

    #[test]
    fn test_transfer_whole_balance() {
        let a = fast("Hangga", 300);
        let b = fast("John", 0);
        a.transfer(&b, 300);
        assert_eq!(a.balance(), 0);
        assert_eq!(b.balance(), 300);
    }

    #[test]
    fn test_insufficient_funds_is_silent_noop() {
        let a = fast("Hangga", 50);
        let b = fast("John", 10);

        a.transfer(&b, 51);

        assert_eq!(a.balance(), 50);
        assert_eq!(b.balance(), 10);
    }

    #[test]
    fn test_self_transfer_leaves_balance() {
        let a = fast("Hangga", 500);
        a.transfer(&a, 200);
        assert_eq!(a.balance(), 500);
    }

    #[test]
    fn test_try_balance_while_locked() {
        let a = fast("Hangga", 42);
        let held = a.lock().acquire();
        assert_eq!(a.try_balance(), None);
        drop(held);
        assert_eq!(a.try_balance(), Some(42));
    }

    #[test]
    fn test_sequential_default_transfers() {
        let a = fast("Hangga", 1000);
        let b = fast("John", 1000);
        let c = fast("Alice", 2000);

        a.transfer(&b, 100);
        b.transfer(&a, 200);
        c.transfer(&a, 1000);

        assert_eq!(a.balance(), 2100);
        assert_eq!(b.balance(), 900);
        assert_eq!(c.balance(), 1000);
    }
}
