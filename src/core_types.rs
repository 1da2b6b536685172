//! Core types used throughout the lab
//!
//! These are fundamental type aliases used by all modules.

/// Money amount in the smallest unit.
///
/// # Constraints:
/// - **Signed**: balances may go negative in the racy demonstrations,
///   and `deposit`/`withdraw` never validate the sign of `amount`
pub type Amount = i64;

/// Lock ID - unique per lock handle registered with a `LockMonitor`.
///
/// Assigned sequentially (1, 2, 3, ...) by the monitor; 0 is never used.
pub type LockId = u64;

/// Processing delay applied inside the source critical section of a transfer,
/// the 10 ms simulated processing time of the default scenario.
pub const DEFAULT_PROCESSING_DELAY_MS: u64 = 10;
