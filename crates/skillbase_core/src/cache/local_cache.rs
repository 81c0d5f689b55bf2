//! In-process key/value cache with per-entry TTL.
//!
//! # Responsibility
//! - Memoize expensive read paths (tag pages, distinct project lists).
//! - Support exact-key and prefix (namespace) invalidation.
//!
//! # Invariants
//! - An expired entry is never returned; it is purged by the read that finds
//!   it or by a capacity sweep.
//! - Reads share the lock; every structural change takes it exclusively.
//! - Invalidating a key or prefix that matches nothing removes nothing, but
//!   still advances the generation.
//! - A read-through load that overlaps an invalidation is returned to its
//!   caller and never stored.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[derive(Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Thread-safe TTL cache keyed by string.
///
/// `max_entries == 0` means unbounded. When bounded and full, admitting a
/// new key first sweeps expired entries; live entries are never evicted, so
/// the bound is best-effort.
pub struct LocalCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    /// Bumped under the write lock by every invalidation.
    generation: AtomicU64,
    max_entries: usize,
}

impl<V: Clone> LocalCache<V> {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            generation: AtomicU64::new(0),
            max_entries,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(0)
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Stores `value` under `key` for `ttl`, replacing any previous entry.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let mut entries = self.entries.write();
        self.insert_locked(&mut entries, key.into(), value, ttl);
    }

    /// Invalidation counter. Snapshot it before loading a value from the
    /// store and hand it to [`LocalCache::set_if_unchanged`].
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Stores `value` only if no invalidation ran since `seen` was taken.
    /// Returns whether the value was stored.
    pub fn set_if_unchanged(
        &self,
        key: impl Into<String>,
        value: V,
        ttl: Duration,
        seen: u64,
    ) -> bool {
        let mut entries = self.entries.write();
        if self.generation.load(Ordering::Acquire) != seen {
            return false;
        }
        self.insert_locked(&mut entries, key.into(), value, ttl);
        true
    }

    /// Returns a clone of the live value under `key`.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                None => return None,
                Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
                Some(_) => {}
            }
        }

        // Re-check under the write lock: a concurrent `set` may have
        // refreshed the key after the read lock was released.
        let mut entries = self.entries.write();
        if entries
            .get(key)
            .is_some_and(|entry| entry.is_expired(Instant::now()))
        {
            entries.remove(key);
        }
        None
    }

    /// Returns the cached value or loads, stores and returns a fresh one.
    ///
    /// Loader errors are returned as-is and nothing is cached. Concurrent
    /// misses may each run the loader; the last `set` wins. A load that
    /// overlaps an invalidation is returned but not cached.
    pub fn get_or_try_insert_with<E>(
        &self,
        key: &str,
        ttl: Duration,
        load: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }
        let seen = self.generation();
        let value = load()?;
        self.set_if_unchanged(key, value.clone(), ttl, seen);
        Ok(value)
    }

    /// Removes `key`. Returns whether an entry existed.
    pub fn delete(&self, key: &str) -> bool {
        let mut entries = self.entries.write();
        self.generation.fetch_add(1, Ordering::AcqRel);
        entries.remove(key).is_some()
    }

    /// Removes every key starting with `prefix`. Returns the removed count.
    pub fn delete_by_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.entries.write();
        self.generation.fetch_add(1, Ordering::AcqRel);
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        before - entries.len()
    }

    /// Drops every expired entry. Returns the removed count.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Number of stored entries, expired ones not yet purged included.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        let mut entries = self.entries.write();
        self.generation.fetch_add(1, Ordering::AcqRel);
        entries.clear();
    }

    fn insert_locked(
        &self,
        entries: &mut HashMap<String, CacheEntry<V>>,
        key: String,
        value: V,
        ttl: Duration,
    ) {
        let now = Instant::now();
        let expires_at = now.checked_add(ttl).unwrap_or_else(far_future);
        if self.max_entries > 0
            && entries.len() >= self.max_entries
            && !entries.contains_key(&key)
        {
            entries.retain(|_, entry| !entry.is_expired(now));
        }
        entries.insert(key, CacheEntry { value, expires_at });
    }
}

impl<V: Clone> Default for LocalCache<V> {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl<V> Debug for LocalCache<V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCache")
            .field("len", &self.entries.read().len())
            .field("generation", &self.generation.load(Ordering::Acquire))
            .field("max_entries", &self.max_entries)
            .finish()
    }
}

fn far_future() -> Instant {
    // ~100 years; only reached when `ttl` overflows `Instant`.
    Instant::now() + Duration::from_secs(100 * 365 * 24 * 60 * 60)
}

#[cfg(test)]
mod tests {
    use super::LocalCache;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    const LONG: Duration = Duration::from_secs(60);

    #[test]
    fn expired_entry_is_purged_by_the_read_that_finds_it() {
        let cache = LocalCache::new(0);
        cache.set("k", 1, Duration::from_millis(10));
        assert_eq!(cache.len(), 1);

        thread::sleep(Duration::from_millis(25));
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn set_overwrites_value_and_expiry() {
        let cache = LocalCache::new(0);
        cache.set("k", "old", Duration::from_millis(5));
        cache.set("k", "new", LONG);
        thread::sleep(Duration::from_millis(15));
        assert_eq!(cache.get("k"), Some("new"));
    }

    #[test]
    fn full_cache_sweeps_expired_entries_before_admitting() {
        let cache = LocalCache::new(2);
        cache.set("a", 1, Duration::from_millis(5));
        cache.set("b", 2, LONG);
        thread::sleep(Duration::from_millis(15));

        cache.set("c", 3, LONG);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("b"), Some(2));
        assert_eq!(cache.get("c"), Some(3));
    }

    #[test]
    fn bound_is_best_effort_when_nothing_expired() {
        let cache = LocalCache::new(1);
        cache.set("a", 1, LONG);
        cache.set("b", 2, LONG);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), Some(1));
    }

    #[test]
    fn purge_expired_reports_removed_count() {
        let cache = LocalCache::new(0);
        cache.set("a", 1, Duration::from_millis(1));
        cache.set("b", 2, Duration::from_millis(1));
        cache.set("c", 3, LONG);
        thread::sleep(Duration::from_millis(10));
        assert_eq!(cache.purge_expired(), 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn load_overlapping_an_invalidation_is_not_cached() {
        let cache = LocalCache::new(0);
        let loaded = cache
            .get_or_try_insert_with("tag:list", LONG, || {
                cache.delete_by_prefix("tag:");
                Ok::<_, ()>("stale")
            })
            .unwrap();

        assert_eq!(loaded, "stale");
        assert_eq!(cache.get("tag:list"), None);

        let fresh = cache
            .get_or_try_insert_with("tag:list", LONG, || Ok::<_, ()>("fresh"))
            .unwrap();
        assert_eq!(fresh, "fresh");
        assert_eq!(cache.get("tag:list"), Some("fresh"));
    }

    #[test]
    fn set_if_unchanged_rejects_a_stale_generation() {
        let cache = LocalCache::new(0);
        let seen = cache.generation();
        cache.delete("absent");

        assert!(!cache.set_if_unchanged("k", 1, LONG, seen));
        assert!(cache.set_if_unchanged("k", 2, LONG, cache.generation()));
        assert_eq!(cache.get("k"), Some(2));
    }

    #[test]
    fn huge_ttl_does_not_panic() {
        let cache = LocalCache::new(0);
        cache.set("k", 1, Duration::MAX);
        assert_eq!(cache.get("k"), Some(1));
    }

    #[test]
    fn concurrent_access_keeps_state_consistent() {
        let cache = Arc::new(LocalCache::new(64));
        let handles = (0..8)
            .map(|worker| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..200 {
                        let key = format!("w{worker}:{}", i % 16);
                        cache.set(key.clone(), i, LONG);
                        assert!(cache.get(&key).is_some());
                        if i % 10 == 0 {
                            cache.delete_by_prefix(&format!("w{worker}:"));
                        }
                    }
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(cache.len() <= 8 * 16);
    }
}
