//! Bounded, time-expiring memoization of access decisions.
//!
//! Decisions are expensive (several relationship lookups) but usually
//! stable for the life of a session, so the engine memoizes them keyed by
//! (principal, policy, entity). A short TTL bounds staleness from external
//! changes; capacity is enforced with least-recently-used eviction.
//!
//! The key is a struct with derived hashing, not a joined string, so
//! identifiers containing any delimiter cannot collide.
//!
//! Uses a sync [`Mutex`] since every critical section is short and contains
//! no await points; no interleaving can occur mid-mutation.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::types::AccessResult;

/// Structured cache key for one decision.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Principal id component.
    pub principal_id: String,
    /// Policy id component.
    pub policy_id: String,
    /// Entity id component.
    pub entity_id: String,
}

impl CacheKey {
    /// Convenience constructor.
    pub fn new(
        principal_id: impl Into<String>,
        policy_id: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        Self {
            principal_id: principal_id.into(),
            policy_id: policy_id.into(),
            entity_id: entity_id.into(),
        }
    }
}

/// Invalidation pattern. Unset fields act as wildcards.
///
/// An entirely empty pattern matches nothing: wiping the cache is
/// [`AccessCache::clear`]'s job, never an accidental side effect of a
/// field-less pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidatePattern {
    /// Match entries for this principal.
    pub principal_id: Option<String>,
    /// Match entries for this policy.
    pub policy_id: Option<String>,
    /// Match entries for this entity.
    pub entity_id: Option<String>,
}

impl InvalidatePattern {
    /// Whether no field is specified.
    pub fn is_empty(&self) -> bool {
        self.principal_id.is_none() && self.policy_id.is_none() && self.entity_id.is_none()
    }

    fn matches(&self, key: &CacheKey) -> bool {
        self.principal_id
            .as_ref()
            .is_none_or(|p| *p == key.principal_id)
            && self.policy_id.as_ref().is_none_or(|p| *p == key.policy_id)
            && self.entity_id.as_ref().is_none_or(|e| *e == key.entity_id)
    }
}

/// Point-in-time cache observability snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Live entry count.
    pub size: usize,
    /// Maximum entry count.
    pub capacity: usize,
    /// Entry time-to-live.
    pub ttl: Duration,
}

struct Entry {
    result: AccessResult,
    inserted_at: Instant,
    last_used: u64,
}

struct Inner {
    entries: HashMap<CacheKey, Entry>,
    /// Monotonic recency counter; bumped on every get/insert.
    tick: u64,
}

/// LRU + TTL decision cache.
///
/// Entries are replaced wholesale, never mutated in place: a decision is
/// either absent, fresh, or overwritten by a complete new result.
pub struct AccessCache {
    inner: Mutex<Inner>,
    capacity: usize,
    ttl: Duration,
}

/// Default maximum number of cached decisions.
pub const DEFAULT_CAPACITY: usize = 10_000;
/// Default entry time-to-live.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

impl Default for AccessCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TTL)
    }
}

impl AccessCache {
    /// Create a cache with the given capacity and TTL.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                tick: 0,
            }),
            capacity,
            ttl,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Fetch a fresh decision, refreshing its recency.
    ///
    /// Entries older than the TTL are evicted on the spot and reported as a
    /// miss.
    pub fn get(&self, key: &CacheKey) -> Option<AccessResult> {
        let mut inner = self.lock();
        let expired = match inner.entries.get(key) {
            Some(entry) => entry.inserted_at.elapsed() >= self.ttl,
            None => return None,
        };
        if expired {
            inner.entries.remove(key);
            return None;
        }
        inner.tick = inner.tick.wrapping_add(1);
        let tick = inner.tick;
        let entry = inner.entries.get_mut(key)?;
        entry.last_used = tick;
        Some(entry.result.clone())
    }

    /// Insert or replace a decision.
    ///
    /// At capacity, the single least-recently-used entry is evicted first.
    pub fn insert(&self, key: CacheKey, result: AccessResult) {
        let mut inner = self.lock();
        inner.tick = inner.tick.wrapping_add(1);
        let tick = inner.tick;

        if self.capacity == 0 {
            return;
        }
        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.capacity {
            let lru = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(k, _)| k.clone());
            if let Some(lru_key) = lru {
                inner.entries.remove(&lru_key);
            }
        }
        inner.entries.insert(
            key,
            Entry {
                result,
                inserted_at: Instant::now(),
                last_used: tick,
            },
        );
    }

    /// Remove every entry matching all specified pattern fields.
    ///
    /// Returns the number removed. An empty pattern removes nothing and
    /// returns 0.
    pub fn invalidate(&self, pattern: &InvalidatePattern) -> usize {
        if pattern.is_empty() {
            return 0;
        }
        let mut inner = self.lock();
        let before = inner.entries.len();
        inner.entries.retain(|key, _| !pattern.matches(key));
        before.saturating_sub(inner.entries.len())
    }

    /// Remove everything.
    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    /// Observability snapshot. Does not count expired-but-unevicted entries
    /// out; they age out lazily on access.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.lock().entries.len(),
            capacity: self.capacity,
            ttl: self.ttl,
        }
    }
}
