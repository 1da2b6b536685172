//! Race Conditions
//!
//! Memory-safe reproductions of the two classic races. Every individual
//! load, store and add is atomic; the bugs come from composing them.
//!
//! - [`RacyAccount`] - check-then-act: the funds check and the debit are two
//!   separate steps, so concurrent transfers can both pass the check and
//!   overdraw the source. Each step is atomic, so the total is still conserved.
//! - [`RacyCounter`] - read-modify-write split into load + store: concurrent
//!   increments overwrite each other and updates are lost.
//! - [`AtomicCounter`] - the fix for the counter: a single `fetch_add`.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::core_types::Amount;

/// Account with no lock at all: balance is a bare atomic
#[derive(Debug)]
pub struct RacyAccount {
    name: String,
    balance: AtomicI64,
    check_delay: Duration,
}

impl RacyAccount {
    pub fn new(name: impl Into<String>, balance: Amount) -> Self {
        Self {
            name: name.into(),
            balance: AtomicI64::new(balance),
            check_delay: Duration::ZERO,
        }
    }

    /// Time between the funds check and the debit
    pub fn with_check_delay(mut self, delay: Duration) -> Self {
        self.check_delay = delay;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn balance(&self) -> Amount {
        self.balance.load(Ordering::SeqCst)
    }

    pub fn deposit(&self, amount: Amount) {
        self.balance.fetch_add(amount, Ordering::SeqCst);
    }

    pub fn withdraw(&self, amount: Amount) {
        self.balance.fetch_sub(amount, Ordering::SeqCst);
    }

    /// Check-then-act transfer. Returns whether the check passed, which is
    /// not the same as the funds having been there when the debit happened.
    pub fn transfer(&self, to: &RacyAccount, amount: Amount) -> bool {
        let observed = self.balance();
        if observed < amount {
            return false;
        }
        // Window in which another transfer can pass the same check
        thread::sleep(self.check_delay);
        self.withdraw(amount);
        to.deposit(amount);
        debug!(from = %self.name, to = %to.name, amount, observed, "Racy transfer applied");
        true
    }
}

/// Counter whose increment is a separate load and store
#[derive(Debug, Default)]
pub struct RacyCounter {
    value: AtomicU64,
}

impl RacyCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self) {
        let current = self.value.load(Ordering::SeqCst);
        thread::yield_now();
        self.value.store(current + 1, Ordering::SeqCst);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
pub struct AtomicCounter {
    value: AtomicU64,
}

impl AtomicCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value after the increment
    pub fn increment(&self) -> u64 {
        self.value.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::SeqCst)
    }
}
