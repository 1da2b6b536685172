//! transfer_lab - Account Transfer Simulator
//!
//! Deadlocks, race conditions and their fixes, demonstrated on a toy bank.
//!
//! # Modules
//!
//! - [`core_types`] - Core type definitions (Amount, LockId)
//! - [`account`] - Account with per-instance lock and nested-lock transfer
//! - [`lock`] - Lock handles, lock monitor, deadlock watchdog
//! - [`bank`] - Closed account set and conserving snapshots
//! - [`scenario`] - Unguarded (deadlock-prone) and serialized runners
//! - [`race`] - Check-then-act and lost-update races
//! - [`collections`] - Thread-safe collection strategies
//! - [`config`] - YAML configuration
//! - [`logging`] - tracing setup

// Core types - must be first!
pub mod core_types;

pub mod error;

// Configuration
pub mod config;
pub mod logging;

// Transfer simulation
pub mod account;
pub mod bank;
pub mod lock;
pub mod scenario;

// Further demonstrations
pub mod collections;
pub mod race;

// Convenient re-exports at crate root
pub use account::Account;
pub use bank::{Bank, Snapshot};
pub use core_types::{Amount, LockId};
pub use error::LabError;
pub use lock::{DeadlockReport, DeadlockWatchdog, LockHandle, LockMonitor, MonitoredLock, PlainLock};
pub use scenario::{SerialExecutor, TransferPlan, UnguardedReport, UnguardedRunner};
