//! In-process TTL cache for search responses.
//!
//! Entries expire lazily: a read that finds an expired entry removes it.
//! Nothing runs in the background; [`TtlCache::cleanup`] is meant to be
//! called from a periodic task.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::clock::SharedClock;
use crate::models::{CacheStats, SearchRequest};

#[cfg(test)]
mod tests;

pub const DEFAULT_TTL_SECS: u64 = 300;
const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 3600;

pub struct CacheEntry<V> {
    pub value: V,
    pub expires_at: DateTime<Utc>,
}

impl<V> CacheEntry<V> {
    /// Live iff `now < expires_at`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

pub struct TtlCache<V> {
    entries: HashMap<String, CacheEntry<V>>,
    default_ttl_secs: u64,
    clock: SharedClock,
    hits: u64,
    misses: u64,
}

/// Blank keys are never stored or found.
fn usable(key: &str) -> Option<&str> {
    if key.trim().is_empty() {
        None
    } else {
        Some(key)
    }
}

impl<V: Clone> TtlCache<V> {
    pub fn new(default_ttl_secs: u64, clock: SharedClock) -> Self {
        let default_ttl_secs = if default_ttl_secs == 0 {
            DEFAULT_TTL_SECS
        } else {
            default_ttl_secs
        };
        Self {
            entries: HashMap::new(),
            default_ttl_secs,
            clock,
            hits: 0,
            misses: 0,
        }
    }

    pub fn get(&mut self, key: &str) -> Option<V> {
        let Some(key) = usable(key) else {
            self.misses += 1;
            return None;
        };
        let now = self.clock.now();

        let expired = match self.entries.get(key) {
            None => {
                self.misses += 1;
                return None;
            }
            Some(entry) => entry.is_expired(now),
        };

        if expired {
            self.entries.remove(key);
            self.misses += 1;
            debug!("Cache expired and removed: {}", key);
            return None;
        }

        self.hits += 1;
        debug!("Cache hit: {}", key);
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Stores `value` under the default TTL.
    pub fn set(&mut self, key: &str, value: V) {
        self.set_with_ttl(key, value, self.default_ttl_secs);
    }

    /// Stores `value` for `ttl_secs`, replacing any previous entry. A zero
    /// TTL falls back to the default.
    pub fn set_with_ttl(&mut self, key: &str, value: V, ttl_secs: u64) {
        let Some(key) = usable(key) else {
            debug!("Ignoring cache set for blank key");
            return;
        };
        let ttl = if ttl_secs == 0 {
            self.default_ttl_secs
        } else {
            ttl_secs
        };
        let expires_at = self.clock.now() + Duration::seconds(ttl.min(MAX_TTL_SECS) as i64);

        self.entries
            .insert(key.to_string(), CacheEntry { value, expires_at });
        debug!("Cache set: {} (expires: {})", key, expires_at.to_rfc3339());
    }

    pub fn delete(&mut self, key: &str) -> bool {
        let Some(key) = usable(key) else {
            return false;
        };
        let deleted = self.entries.remove(key).is_some();
        if deleted {
            debug!("Cache deleted: {}", key);
        }
        deleted
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        info!("Cache cleared");
    }

    /// Same expiry semantics as [`get`](Self::get) without cloning the value.
    pub fn has(&mut self, key: &str) -> bool {
        let Some(key) = usable(key) else {
            return false;
        };
        let now = self.clock.now();
        match self.entries.get(key).map(|entry| entry.is_expired(now)) {
            None => false,
            Some(true) => {
                self.entries.remove(key);
                false
            }
            Some(false) => true,
        }
    }

    /// Removes every expired entry and returns how many were dropped.
    pub fn cleanup(&mut self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - self.entries.len();

        if removed > 0 {
            info!("Cleaned up {} expired cache items", removed);
        }
        removed
    }

    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let expired = self
            .entries
            .values()
            .filter(|entry| entry.is_expired(now))
            .count();
        let lookups = self.hits + self.misses;

        CacheStats {
            total: self.entries.len(),
            valid: self.entries.len() - expired,
            expired,
            hit_rate: if lookups == 0 {
                0.0
            } else {
                self.hits as f64 / lookups as f64
            },
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builds the memoization key for a search:
/// `search:<query>:<language>:<created>:<sort>:<order>:<per_page>:<page>`.
/// Absent options render as empty segments. `:` and `%` inside free-text
/// segments are percent-encoded so a qualifier such as `user:octo` in the
/// query cannot shift into the language segment.
pub fn generate_search_key(query: &str, options: &SearchRequest) -> String {
    format!(
        "search:{}:{}:{}:{}:{}:{}:{}",
        escape_segment(query),
        escape_segment(options.language.as_deref().unwrap_or("")),
        escape_segment(options.created.as_deref().unwrap_or("")),
        options.sort.map(|s| s.as_str()).unwrap_or(""),
        options.order.map(|o| o.as_str()).unwrap_or(""),
        options.per_page.map(|n| n.to_string()).unwrap_or_default(),
        options.page.map(|n| n.to_string()).unwrap_or_default(),
    )
}

fn escape_segment(segment: &str) -> String {
    segment.replace('%', "%25").replace(':', "%3A")
}
