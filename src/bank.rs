//! Bank - a closed set of accounts whose total is conserved
//!
//! Lookup is by account name. Balances are read with `try_balance` so that
//! inspecting a bank whose threads are deadlocked never blocks, and never
//! yields a torn view: if any lock is held there is no snapshot at all.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::account::Account;
use crate::config::{AccountConfig, ScenarioConfig};
use crate::core_types::Amount;
use crate::error::LabError;
use crate::lock::{LockHandle, LockMonitor, MonitoredLock, PlainLock};

/// Balances of every account, in creation order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub balances: Vec<(String, Amount)>,
}

impl Snapshot {
    pub fn total(&self) -> Amount {
        self.balances.iter().map(|(_, b)| b).sum()
    }

    pub fn balance_of(&self, name: &str) -> Option<Amount> {
        self.balances
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, b)| *b)
    }
}

pub struct Bank<L = PlainLock> {
    accounts: Vec<Arc<Account<L>>>,
    index: FxHashMap<String, usize>,
    expected_total: Amount,
}

impl<L: LockHandle> Bank<L> {
    /// Build a bank from existing accounts. Names must be unique.
    pub fn from_accounts(accounts: Vec<Account<L>>) -> Result<Self, LabError> {
        let mut index = FxHashMap::default();
        for (i, account) in accounts.iter().enumerate() {
            if index.insert(account.name().to_string(), i).is_some() {
                return Err(LabError::DuplicateAccount(account.name().to_string()));
            }
        }
        let expected_total = accounts.iter().map(|a| a.balance()).sum();
        Ok(Self {
            accounts: accounts.into_iter().map(Arc::new).collect(),
            index,
            expected_total,
        })
    }

    /// Build a bank from config, creating each lock with `make_lock`
    pub fn from_config<F>(config: &ScenarioConfig, mut make_lock: F) -> Result<Self, LabError>
    where
        F: FnMut(&AccountConfig) -> L,
    {
        let accounts = config
            .accounts
            .iter()
            .map(|a| {
                Account::with_lock(a.name.clone(), make_lock(a))
                    .with_processing_delay(config.processing_delay())
            })
            .collect();
        Self::from_accounts(accounts)
    }

    pub fn account(&self, name: &str) -> Result<&Arc<Account<L>>, LabError> {
        self.index
            .get(name)
            .map(|&i| &self.accounts[i])
            .ok_or_else(|| LabError::UnknownAccount(name.to_string()))
    }

    pub fn accounts(&self) -> &[Arc<Account<L>>] {
        &self.accounts
    }

    /// Total of initial balances
    pub fn expected_total(&self) -> Amount {
        self.expected_total
    }

    /// Non-blocking snapshot; `None` while any account lock is held
    pub fn try_snapshot(&self) -> Option<Snapshot> {
        let guards: Option<Vec<_>> = self.accounts.iter().map(|a| a.lock().try_acquire()).collect();
        let guards = guards?;
        let balances = self
            .accounts
            .iter()
            .zip(guards.iter())
            .map(|(a, g)| (a.name().to_string(), **g))
            .collect();
        Some(Snapshot { balances })
    }

    /// Blocking snapshot. Deadlocks if called while transfers are deadlocked.
    pub fn snapshot(&self) -> Snapshot {
        let guards: Vec<_> = self.accounts.iter().map(|a| a.lock().acquire()).collect();
        let balances = self
            .accounts
            .iter()
            .zip(guards.iter())
            .map(|(a, g)| (a.name().to_string(), **g))
            .collect();
        Snapshot { balances }
    }

    /// Whether `snapshot` holds the same total the bank started with
    pub fn is_conserved(&self, snapshot: &Snapshot) -> bool {
        snapshot.total() == self.expected_total
    }
}

impl Bank<PlainLock> {
    pub fn plain(config: &ScenarioConfig) -> Result<Self, LabError> {
        Self::from_config(config, |a| PlainLock::new(a.balance))
    }
}

impl Bank<MonitoredLock> {
    pub fn monitored(config: &ScenarioConfig, monitor: &Arc<LockMonitor>) -> Result<Self, LabError> {
        Self::from_config(config, |a| MonitoredLock::new(monitor, &a.name, a.balance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bank() {
        let bank = Bank::plain(&ScenarioConfig::default()).unwrap();
        assert_eq!(bank.accounts().len(), 3);
        assert_eq!(bank.expected_total(), 4000);
        assert_eq!(bank.account("John").unwrap().balance(), 1000);

        let snap = bank.try_snapshot().unwrap();
        assert_eq!(snap.balance_of("Alice"), Some(2000));
        assert!(bank.is_conserved(&snap));
        assert_eq!(snap, bank.snapshot());
    }

    #[test]
    fn test_unknown_account() {
        let bank = Bank::plain(&ScenarioConfig::default()).unwrap();
        let err = bank.account("Bob").err().unwrap();
        assert_eq!(err.code(), "UNKNOWN_ACCOUNT");
    }

    #[test]
    fn test_duplicate_account_rejected() {
        let accounts = vec![Account::new("A", 1), Account::new("A", 2)];
        let err = Bank::from_accounts(accounts).err().unwrap();
        assert_eq!(err.code(), "DUPLICATE_ACCOUNT");
    }

    #[test]
    fn test_no_snapshot_while_locked() {
        let bank = Bank::plain(&ScenarioConfig::default()).unwrap();
        let john = bank.account("John").unwrap().clone();
        let held = john.lock().acquire();
        assert!(bank.try_snapshot().is_none());
        drop(held);
        assert!(bank.try_snapshot().is_some());
    }

    #[test]
    fn test_monitored_bank_registers_locks() {
        let monitor = Arc::new(LockMonitor::new());
        let bank = Bank::monitored(&ScenarioConfig::default(), &monitor).unwrap();
        let ids: Vec<_> = bank.accounts().iter().filter_map(|a| a.lock().lock_id()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(monitor.label(1).as_deref(), Some("Hangga"));
    }
}
