//! Thread-safe collections
//!
//! Shared containers filled from several threads at once. Each one is a
//! different answer to "many writers, one collection":
//!
//! | Type              | Strategy                                   |
//! |-------------------|--------------------------------------------|
//! | `SyncList<T>`     | one mutex around a `Vec`                   |
//! | `SnapshotList<T>` | copy-on-write, readers iterate a snapshot  |
//! | `SharedMap<K, V>` | sharded concurrent map (`dashmap`)         |
//! | `LockFreeLog<T>`  | lock-free unbounded queue (`SegQueue`)     |

use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crossbeam_queue::SegQueue;
use dashmap::DashMap;

/// `Vec` behind a single mutex
#[derive(Debug, Default)]
pub struct SyncList<T> {
    items: Mutex<Vec<T>>,
}

impl<T> SyncList<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, item: T) {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(item);
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Copy-on-write list.
///
/// Every mutation clones the backing `Vec` and swaps in the new one, so a
/// snapshot taken for iteration is never modified underneath its reader.
/// Removing items while iterating a snapshot is therefore safe.
#[derive(Debug)]
pub struct SnapshotList<T> {
    items: RwLock<Arc<Vec<T>>>,
}

impl<T> Default for SnapshotList<T> {
    fn default() -> Self {
        Self {
            items: RwLock::new(Arc::new(Vec::new())),
        }
    }
}

impl<T: Clone> SnapshotList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Arc<Vec<T>> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn push(&self, item: T) {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = Vec::with_capacity(items.len() + 1);
        next.extend(items.iter().cloned());
        next.push(item);
        *items = Arc::new(next);
    }

    /// Remove the first element equal to `item`; returns whether one was found
    pub fn remove(&self, item: &T) -> bool
    where
        T: PartialEq,
    {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        match items.iter().position(|x| x == item) {
            Some(pos) => {
                let mut next: Vec<T> = items.as_ref().clone();
                next.remove(pos);
                *items = Arc::new(next);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone> FromIterator<T> for SnapshotList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: RwLock::new(Arc::new(iter.into_iter().collect())),
        }
    }
}

/// Concurrent map, sharded internally
#[derive(Debug, Default)]
pub struct SharedMap<K: Eq + Hash, V> {
    inner: DashMap<K, V>,
}

impl<K: Eq + Hash, V: Clone> SharedMap<K, V> {
    pub fn new() -> Self {
        Self {
            inner: DashMap::new(),
        }
    }

    pub fn insert(&self, key: K, value: V) -> Option<V> {
        self.inner.insert(key, value)
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.inner.remove(key).map(|(_, v)| v)
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.get(key).map(|v| v.value().clone())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Append-only log over a lock-free queue
#[derive(Debug, Default)]
pub struct LockFreeLog<T> {
    queue: SegQueue<T>,
}

impl<T> LockFreeLog<T> {
    pub fn new() -> Self {
        Self {
            queue: SegQueue::new(),
        }
    }

    pub fn append(&self, item: T) {
        self.queue.push(item);
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Take every entry, in push order
    pub fn drain(&self) -> Vec<T> {
        std::iter::from_fn(|| self.queue.pop()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    fn fill_from_three_threads(push: impl Fn(i32) + Send + Sync + 'static) {
        let push = Arc::new(push);
        let handles: Vec<_> = [1..=100, 101..=200, 201..=300]
            .into_iter()
            .map(|range| {
                let push = push.clone();
                thread::spawn(move || range.for_each(|i| push(i)))
            })
            .collect();
        handles.into_iter().for_each(|h| h.join().unwrap());
    }

    #[test]
    fn test_sync_list_keeps_every_push() {
        let list = Arc::new(SyncList::new());
        let writer = list.clone();
        fill_from_three_threads(move |i| writer.push(i));

        assert_eq!(list.len(), 300);
        let list = Arc::try_unwrap(list).unwrap();
        let mut items = list.into_vec();
        items.sort_unstable();
        assert_eq!(items, (1..=300).collect::<Vec<_>>());
    }

    #[test]
    fn test_lock_free_log_keeps_every_append() {
        let log = Arc::new(LockFreeLog::new());
        let writer = log.clone();
        fill_from_three_threads(move |i| writer.append(i));

        assert_eq!(log.len(), 300);
        let drained = log.drain();
        assert_eq!(drained.len(), 300);
        assert!(log.is_empty());
    }

    #[test]
    fn test_remove_while_iterating_snapshot() {
        let list: SnapshotList<i32> = (1..=5).collect();

        let snapshot = list.snapshot();
        for item in snapshot.iter() {
            if *item == 3 {
                assert!(list.remove(item));
            }
        }

        assert_eq!(snapshot.as_slice(), &[1, 2, 3, 4, 5]);
        assert_eq!(list.snapshot().as_slice(), &[1, 2, 4, 5]);
        assert!(!list.remove(&3));
    }

    #[test]
    fn test_snapshot_list_concurrent_push() {
        let list = Arc::new(SnapshotList::new());
        let writer = list.clone();
        fill_from_three_threads(move |i| writer.push(i));
        assert_eq!(list.len(), 300);
    }

    #[test]
    fn test_shared_map_two_writers() {
        let map = Arc::new(SharedMap::new());

        let slow = map.clone();
        let t1 = thread::spawn(move || {
            for i in 1..=100 {
                slow.insert(i, format!("Thread 1 - {}", i));
                thread::sleep(Duration::from_micros(100));
            }
        });
        let fast = map.clone();
        let t2 = thread::spawn(move || {
            for i in 101..=200 {
                fast.insert(i, format!("Thread 2 - {}", i));
            }
        });
        t1.join().unwrap();
        t2.join().unwrap();

        assert_eq!(map.len(), 200);
        assert_eq!(map.get(&150).as_deref(), Some("Thread 2 - 150"));
    }

    #[test]
    fn test_shared_map_removals() {
        let map = SharedMap::new();
        for i in 1..=200 {
            map.insert(i, i * 2);
        }
        assert_eq!(map.remove(&1), Some(2));
        assert_eq!(map.remove(&200), Some(400));
        assert_eq!(map.remove(&200), None);
        assert_eq!(map.len(), 198);
    }
}
