//! Bounded memoization cache.
//!
//! [`Memo`] is shared by [`FragmentLocator`](crate::FragmentLocator) and
//! [`DraftRenderer`](crate::DraftRenderer). Entries are keyed by the full
//! argument tuple of the memoized call and evicted oldest-first once the
//! capacity is reached.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Key-value cache with FIFO eviction and explicit [`clear`](Self::clear).
#[derive(Debug)]
pub struct Memo<K, V> {
    capacity: usize,
    inner: Mutex<MemoInner<K, V>>,
}

#[derive(Debug)]
struct MemoInner<K, V> {
    entries: HashMap<K, V>,
    order: VecDeque<K>,
}

impl<K, V> Memo<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a cache holding at most `capacity` entries.
    ///
    /// A capacity of zero disables caching: every lookup misses.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(MemoInner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    /// Look up a cached value.
    pub fn get(&self, key: &K) -> Option<V> {
        self.lock().entries.get(key).cloned()
    }

    /// Store a value, evicting the oldest entry if the cache is full.
    pub fn insert(&self, key: K, value: V) {
        if self.capacity == 0 {
            return;
        }

        let mut inner = self.lock();
        if inner.entries.insert(key.clone(), value).is_some() {
            return;
        }

        inner.order.push_back(key);
        while inner.order.len() > self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.entries.remove(&oldest);
            }
        }
    }

    /// Return the cached value for `key`, computing and storing it on a miss.
    pub fn get_or_insert_with(&self, key: K, compute: impl FnOnce() -> V) -> V {
        if let Some(value) = self.get(&key) {
            return value;
        }
        let value = compute();
        self.insert(key, value.clone());
        value
    }

    /// Drop a single entry.
    pub fn remove(&self, key: &K) {
        let mut inner = self.lock();
        if inner.entries.remove(key).is_some() {
            inner.order.retain(|k| k != key);
        }
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, MemoInner<K, V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
