use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// TTL and size bound for a [`QueryCache`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum age of a cached result.
    pub ttl: Duration,
    /// Maximum number of cached results.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            max_entries: 1000,
        }
    }
}

impl CacheConfig {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self { ttl, max_entries }
    }
}

/// Deterministic cache key for a query vector and `k`.
///
/// Hex SHA-256 over the little-endian bytes of every component followed by
/// the decimal form of `k`. Two queries share a key only if they are
/// bit-identical.
pub fn fingerprint(query: &[f32], k: usize) -> String {
    let mut hasher = Sha256::new();
    for x in query {
        hasher.update(x.to_le_bytes());
    }
    hasher.update(k.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

struct CacheEntry<T> {
    value: T,
    created_at: Instant,
}

/// Query result cache with TTL expiry and oldest-first eviction.
///
/// Not internally synchronized: each store keeps it inside the same lock
/// that guards its index, so a write and its invalidation are atomic.
pub struct QueryCache<T> {
    entries: HashMap<String, CacheEntry<T>>,
    config: CacheConfig,
}

impl<T: Clone> QueryCache<T> {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: HashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Purge expired and excess entries, then return a live hit for `key`.
    pub fn lookup(&mut self, key: &str) -> Option<T> {
        self.purge();
        let entry = self.entries.get(key)?;
        if entry.created_at.elapsed() < self.config.ttl {
            tracing::debug!(key = key.get(..8).unwrap_or(key), "query cache hit");
            Some(entry.value.clone())
        } else {
            None
        }
    }

    /// Store `value` under `key`, evicting the oldest entry first when full.
    pub fn insert(&mut self, key: String, value: T) {
        if self.config.max_entries == 0 {
            return;
        }
        if !self.entries.contains_key(&key) && self.entries.len() >= self.config.max_entries {
            self.evict_oldest(self.entries.len() + 1 - self.config.max_entries);
        }
        self.entries.insert(
            key,
            CacheEntry {
                value,
                created_at: Instant::now(),
            },
        );
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove expired entries, then the oldest ones beyond the size bound.
    pub fn purge(&mut self) {
        let ttl = self.config.ttl;
        self.entries.retain(|_, entry| entry.created_at.elapsed() < ttl);

        if self.entries.len() > self.config.max_entries {
            self.evict_oldest(self.entries.len() - self.config.max_entries);
        }
    }

    fn evict_oldest(&mut self, count: usize) {
        let mut by_age: Vec<(Instant, String)> = self
            .entries
            .iter()
            .map(|(key, entry)| (entry.created_at, key.clone()))
            .collect();
        by_age.sort_by_key(|(created_at, _)| *created_at);

        for (_, key) in by_age.into_iter().take(count) {
            self.entries.remove(&key);
        }
    }
}

impl<T: Clone> Default for QueryCache<T> {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
