use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use super::models::NormalizedItem;

/// Identity keys of every item already delivered by a collector.
///
/// Keys are never evicted, so the set grows for the life of its owner.
#[derive(Debug, Default)]
pub struct SeenSet {
    keys: Mutex<HashSet<String>>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only items whose key has not been seen, recording those keys.
    ///
    /// Items without a usable key (empty `id` and `link`) are dropped.
    /// The lock is held for the whole batch, so concurrent callers can
    /// never both claim the same key.
    pub fn retain_new(&self, items: impl IntoIterator<Item = NormalizedItem>) -> Vec<NormalizedItem> {
        let mut keys = self.keys.lock().unwrap_or_else(PoisonError::into_inner);
        items
            .into_iter()
            .filter(|item| {
                let key = item.dedup_key();
                !key.is_empty() && keys.insert(key.to_string())
            })
            .collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
