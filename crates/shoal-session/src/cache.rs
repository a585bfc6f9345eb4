use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
};

use serde_json::Value;

/// Default bound on retained entries.
pub const DEFAULT_CACHE_CAPACITY: usize = 512;

/// Bounded store of the last successful result per call fingerprint.
/// There is no TTL: staleness is the caller's concern, handled through
/// explicit invalidation. When full, the oldest insertion is evicted.
pub struct ResponseCache {
    inner: Mutex<Inner>,
}

struct Inner {
    capacity: usize,
    entries: HashMap<String, Value>,
    order: VecDeque<String>,
}

impl ResponseCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                capacity: capacity.max(1),
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.lock().entries.get(key).cloned()
    }

    pub fn insert(&self, key: String, value: Value) {
        let mut inner = self.lock();
        if inner.entries.insert(key.clone(), value).is_none() {
            inner.order.push_back(key);
            if inner.order.len() > inner.capacity {
                if let Some(oldest) = inner.order.pop_front() {
                    inner.entries.remove(&oldest);
                }
            }
        }
    }

    /// Removes one entry. Returns whether it existed.
    pub fn invalidate(&self, key: &str) -> bool {
        let mut inner = self.lock();
        inner.order.retain(|existing| existing != key);
        inner.entries.remove(key).is_some()
    }

    pub fn invalidate_all(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
