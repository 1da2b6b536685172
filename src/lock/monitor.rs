//! Lock Monitor - wait-for graph over monitored locks
//!
//! Records, per lock, which thread holds it and, per thread, which lock it is
//! blocked on. `find_deadlocks` turns that into a wait-for graph
//! (waiter → owner) and reports its cycles.
//!
//! The monitor only observes. It never interrupts a blocked thread.

use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, ThreadId};

use dashmap::DashMap;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use tracing::{debug, warn};

use crate::core_types::LockId;

#[derive(Debug, Clone)]
struct ThreadInfo {
    id: ThreadId,
    name: String,
}

impl ThreadInfo {
    fn current() -> Self {
        let current = thread::current();
        Self {
            id: current.id(),
            name: current.name().unwrap_or("<unnamed>").to_string(),
        }
    }
}

/// A thread blocked on a monitored lock
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockedThread {
    pub thread: String,
    pub lock_id: LockId,
    pub lock_label: String,
    /// Thread currently holding the lock, if known
    pub owner: Option<String>,
}

/// One wait-for cycle: every thread waits on a lock held by the next one
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeadlockReport {
    pub threads: Vec<BlockedThread>,
}

impl DeadlockReport {
    /// Sorted lock ids of the cycle, stable across repeated scans
    pub fn key(&self) -> Vec<LockId> {
        let mut ids: Vec<LockId> = self.threads.iter().map(|t| t.lock_id).collect();
        ids.sort_unstable();
        ids
    }

    pub fn involves_lock(&self, label: &str) -> bool {
        self.threads.iter().any(|t| t.lock_label == label)
    }
}

#[derive(Debug, Default)]
pub struct LockMonitor {
    next_id: AtomicU64,
    labels: DashMap<LockId, String>,
    owners: DashMap<LockId, ThreadInfo>,
    waiting: DashMap<ThreadId, (ThreadInfo, LockId)>,
}

impl LockMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new lock and return its id
    pub fn register(&self, label: &str) -> LockId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.labels.insert(id, label.to_string());
        id
    }

    pub fn label(&self, lock: LockId) -> Option<String> {
        self.labels.get(&lock).map(|l| l.value().clone())
    }

    /// Name of the thread holding `lock`
    pub fn owner_of(&self, lock: LockId) -> Option<String> {
        self.owners.get(&lock).map(|o| o.name.clone())
    }

    pub(crate) fn begin_wait(&self, lock: LockId) {
        let info = ThreadInfo::current();
        self.waiting.insert(info.id, (info, lock));
    }

    pub(crate) fn end_wait(&self) {
        self.waiting.remove(&thread::current().id());
    }

    pub(crate) fn acquired(&self, lock: LockId) {
        self.owners.insert(lock, ThreadInfo::current());
    }

    pub(crate) fn released(&self, lock: LockId) {
        self.owners.remove(&lock);
    }

    /// Every thread currently blocked on a monitored lock
    pub fn blocked_threads(&self) -> Vec<BlockedThread> {
        self.waiting
            .iter()
            .map(|entry| {
                let (info, lock) = entry.value();
                self.describe(info, *lock)
            })
            .collect()
    }

    fn describe(&self, info: &ThreadInfo, lock: LockId) -> BlockedThread {
        BlockedThread {
            thread: info.name.clone(),
            lock_id: lock,
            lock_label: self.label(lock).unwrap_or_default(),
            owner: self.owner_of(lock),
        }
    }

    /// Find every cycle in the wait-for graph.
    ///
    /// A thread waits on at most one lock, so each node has at most one
    /// outgoing edge and a plain walk with path colouring finds all cycles.
    pub fn find_deadlocks(&self) -> Vec<DeadlockReport> {
        // waiter -> (waiter info, lock, owner thread)
        let mut edges: FxHashMap<ThreadId, (ThreadInfo, LockId, ThreadId)> = FxHashMap::default();
        for entry in self.waiting.iter() {
            let (info, lock) = entry.value();
            if let Some(owner) = self.owners.get(lock)
                && owner.id != info.id
            {
                edges.insert(info.id, (info.clone(), *lock, owner.id));
            }
        }

        let mut done: FxHashSet<ThreadId> = FxHashSet::default();
        let mut reports = Vec::new();

        for &start in edges.keys() {
            if done.contains(&start) {
                continue;
            }
            let mut path: Vec<ThreadId> = Vec::new();
            let mut on_path: FxHashSet<ThreadId> = FxHashSet::default();
            let mut node = start;

            while let Some((_, _, next)) = edges.get(&node) {
                if done.contains(&node) {
                    break;
                }
                if !on_path.insert(node) {
                    // Cycle: from the first occurrence of `node` to the end of the path
                    let begin = path.iter().position(|t| *t == node).unwrap_or(0);
                    let threads = path[begin..]
                        .iter()
                        .filter_map(|t| edges.get(t))
                        .map(|(info, lock, _)| self.describe(info, *lock))
                        .collect();
                    reports.push(DeadlockReport { threads });
                    break;
                }
                path.push(node);
                node = *next;
            }

            done.extend(path);
        }

        debug!(cycles = reports.len(), "Deadlock scan finished");
        reports
    }

    /// Scan once and log every blocked thread of every cycle
    pub fn log_deadlocks(&self) -> Vec<DeadlockReport> {
        let reports = self.find_deadlocks();
        for report in &reports {
            for blocked in &report.threads {
                warn!(
                    thread = %blocked.thread,
                    lock = %blocked.lock_label,
                    owner = blocked.owner.as_deref().unwrap_or("?"),
                    "Deadlock detected"
                );
            }
        }
        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};

    #[test]
    fn test_register_assigns_sequential_ids() {
        let monitor = LockMonitor::new();
        assert_eq!(monitor.register("Hangga"), 1);
        assert_eq!(monitor.register("John"), 2);
        assert_eq!(monitor.label(2).as_deref(), Some("John"));
        assert_eq!(monitor.label(3), None);
    }

    #[test]
    fn test_owner_tracking() {
        let monitor = LockMonitor::new();
        let lock = monitor.register("Hangga");
        assert_eq!(monitor.owner_of(lock), None);

        monitor.acquired(lock);
        assert!(monitor.owner_of(lock).is_some());

        monitor.released(lock);
        assert_eq!(monitor.owner_of(lock), None);
    }

    #[test]
    fn test_waiting_without_cycle_is_not_deadlock() {
        let monitor = LockMonitor::new();
        let lock = monitor.register("Hangga");

        // Another thread holds the lock, this thread waits on it
        let monitor = Arc::new(monitor);
        let owner = monitor.clone();
        std::thread::Builder::new()
            .name("holder".into())
            .spawn(move || owner.acquired(lock))
            .unwrap()
            .join()
            .unwrap();
        monitor.begin_wait(lock);

        let blocked = monitor.blocked_threads();
        assert_eq!(blocked.len(), 1);
        assert_eq!(blocked[0].owner.as_deref(), Some("holder"));
        assert!(monitor.find_deadlocks().is_empty());

        monitor.end_wait();
        assert!(monitor.blocked_threads().is_empty());
    }

    #[test]
    fn test_two_thread_cycle_is_reported_once() {
        let monitor = Arc::new(LockMonitor::new());
        let a = monitor.register("A");
        let b = monitor.register("B");

        // Record the bookkeeping of a deadlock without real mutexes:
        // t1 holds A and waits on B, t2 holds B and waits on A.
        let ready = Arc::new(Barrier::new(3));
        let finish = Arc::new(Barrier::new(3));
        let spawn = |name: &str, hold: LockId, wait: LockId| {
            let monitor = monitor.clone();
            let ready = ready.clone();
            let finish = finish.clone();
            std::thread::Builder::new()
                .name(name.into())
                .spawn(move || {
                    monitor.acquired(hold);
                    monitor.begin_wait(wait);
                    ready.wait();
                    finish.wait();
                    monitor.end_wait();
                })
                .unwrap()
        };
        let t1 = spawn("t1", a, b);
        let t2 = spawn("t2", b, a);

        ready.wait();
        let reports = monitor.find_deadlocks();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].threads.len(), 2);
        assert_eq!(reports[0].key(), vec![a, b]);
        assert!(reports[0].involves_lock("A"));
        assert_eq!(monitor.log_deadlocks().len(), 1);

        finish.wait();
        t1.join().unwrap();
        t2.join().unwrap();
        assert!(monitor.find_deadlocks().is_empty());
    }
}
