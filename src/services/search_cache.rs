use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use tokio::time::Instant;

use crate::models::SearchPage;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub page: SearchPage,
    pub inserted_at: Instant,
}

/// Per-controller result cache.
///
/// Entries expire after `ttl` and the oldest-inserted entry goes first once
/// `capacity` is exceeded. Reads never change eviction order.
#[derive(Debug)]
pub struct SearchCache {
    entries: HashMap<String, CacheEntry>,
    order: VecDeque<String>,
    ttl: Duration,
    capacity: usize,
}

impl SearchCache {
    #[must_use]
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// Returns a fresh entry; an expired one is dropped on the way.
    pub fn get(&mut self, key: &str) -> Option<SearchPage> {
        let expired = match self.entries.get(key) {
            None => return None,
            Some(entry) => entry.inserted_at.elapsed() >= self.ttl,
        };

        if expired {
            self.remove(key);
            return None;
        }

        self.entries.get(key).map(|e| e.page.clone())
    }

    pub fn insert(&mut self, key: String, page: SearchPage) {
        self.purge_expired();

        // A refreshed key counts as a new insertion.
        if self.entries.contains_key(&key) {
            self.order.retain(|k| k != &key);
        }

        self.order.push_back(key.clone());
        self.entries.insert(
            key,
            CacheEntry {
                page,
                inserted_at: Instant::now(),
            },
        );

        while self.entries.len() > self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
        }
    }

    fn purge_expired(&mut self) {
        let ttl = self.ttl;
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, e)| e.inserted_at.elapsed() >= ttl)
            .map(|(k, _)| k.clone())
            .collect();

        for key in expired {
            self.remove(&key);
        }
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
        self.order.retain(|k| k != key);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
