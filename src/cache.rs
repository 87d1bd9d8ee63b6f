//! Thread-safe LFU cache with expiration, lifecycle hooks and deduplicated fills.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────────────┐
//! │                         LfuCache<K, V>  (Clone = shared)                   │
//! │                                                                            │
//! │   Arc<Shared>                                                              │
//! │    ├── core:   RwLock<LfuCore<K, V>>   primary lock: table + ledger + TTL  │
//! │    ├── codec:  Option<Arc<dyn ValueCodec>>      runs outside the lock      │
//! │    ├── loader: Option<Loader<K, V>>             cache-wide fill function   │
//! │    ├── loads:  LoadCoordinator<K, V>            own lock, one record/key   │
//! │    └── stats:  Stats                            atomics, no lock           │
//! └────────────────────────────────────────────────────────────────────────────┘
//!
//!   get(k) ──► write lock: promote ──► hit ──► decode ──► value
//!                                 └──► miss ──► LoadCoordinator (no cache lock held)
//!                                                └─► fill(k) ─► encode ─► write lock: store
//! ```
//!
//! ## Locking
//!
//! | Operation                      | Primary lock |
//! |--------------------------------|--------------|
//! | `get`, `get_if_present`        | write (promotion mutates the ledger) |
//! | `set`, `remove`, `purge`       | write        |
//! | `has`, `keys`, `get_all`, `len`| read         |
//!
//! The primary lock is never held while a fill function runs. Hooks run
//! while it is held and must not call back into the same cache.
//!
//! ## Example
//!
//! ```
//! use lfukit::builder::CacheBuilder;
//! use lfukit::error::CacheError;
//!
//! let cache = CacheBuilder::<&str, u32>::new(2).build().unwrap();
//! cache.set("a", 1).unwrap();
//! cache.set("b", 2).unwrap();
//! assert_eq!(cache.get(&"a").unwrap(), 1);
//!
//! cache.set("c", 3).unwrap(); // evicts "b", the least frequently used
//! assert!(cache.has(&"a"));
//! assert!(matches!(cache.get(&"b"), Err(CacheError::KeyNotFound)));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::trace;

use crate::codec::ValueCodec;
use crate::error::{CacheError, FillError, InvariantError};
use crate::load::{LoadCoordinator, Loaded, Loader};
use crate::policy::lfu::LfuCore;
use crate::stats::{CacheStatsSnapshot, Stats};

struct Shared<K, V> {
    core: RwLock<LfuCore<K, V>>,
    codec: Option<Arc<dyn ValueCodec<K, V>>>,
    loader: Option<Loader<K, V>>,
    loads: LoadCoordinator<K, V>,
    stats: Stats,
}

impl<K, V> Shared<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn encode(&self, key: &K, value: V) -> Result<V, CacheError> {
        match &self.codec {
            Some(codec) => codec.encode(key, value).map_err(CacheError::Encoding),
            None => Ok(value),
        }
    }

    fn decode(&self, key: &K, stored: V) -> Result<V, CacheError> {
        match &self.codec {
            Some(codec) => codec.decode(key, stored).map_err(CacheError::Decoding),
            None => Ok(stored),
        }
    }

    fn store(&self, key: K, value: V, ttl: Option<Duration>) -> Result<(), CacheError> {
        let stored = self.encode(&key, value)?;
        self.core.write().store(key, stored, ttl);
        Ok(())
    }

    /// Fill-leader body: re-check, fill, install. Returns the filled value
    /// as produced, not as stored.
    fn fill<F>(&self, key: &K, fill: F) -> Result<V, CacheError>
    where
        F: FnOnce(&K) -> Result<Loaded<V>, FillError>,
    {
        let resident = self.core.read().peek(key).cloned();
        if let Some(stored) = resident {
            trace!("fill skipped, value already resident");
            return self.decode(key, stored);
        }

        let Loaded { value, ttl } = fill(key)?;
        self.store(key.clone(), value.clone(), ttl)?;
        Ok(value)
    }
}

/// Thread-safe LFU cache handle.
///
/// Cloning is cheap; clones share the same entries, counters and in-flight
/// fills. Build one with [`CacheBuilder`](crate::builder::CacheBuilder) or
/// [`LfuCache::new`].
pub struct LfuCache<K, V> {
    shared: Arc<Shared<K, V>>,
}

impl<K, V> Clone for LfuCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<K, V> fmt::Debug for LfuCache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.shared.core.read();
        f.debug_struct("LfuCache")
            .field("len", &core.len(false))
            .field("capacity", &core.capacity())
            .field("codec", &self.shared.codec.is_some())
            .field("loader", &self.shared.loader.is_some())
            .field("loads", &self.shared.loads)
            .finish_non_exhaustive()
    }
}

impl<K, V> LfuCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates a cache with no expiration, hooks, codec or loader.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero. [`CacheBuilder::build`](crate::builder::CacheBuilder::build)
    /// reports that as an error instead.
    ///
    /// # Example
    ///
    /// ```
    /// use lfukit::cache::LfuCache;
    ///
    /// let cache: LfuCache<u32, String> = LfuCache::new(100);
    /// assert_eq!(cache.capacity(), 100);
    /// assert!(cache.is_empty());
    /// ```
    pub fn new(capacity: usize) -> Self {
        Self::from_parts(LfuCore::new(capacity), None, None)
    }

    pub(crate) fn from_parts(
        core: LfuCore<K, V>,
        codec: Option<Arc<dyn ValueCodec<K, V>>>,
        loader: Option<Loader<K, V>>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                core: RwLock::new(core),
                codec,
                loader,
                loads: LoadCoordinator::new(),
                stats: Stats::new(),
            }),
        }
    }

    /// Stores `value` under `key` with the default expiration.
    ///
    /// Overwriting keeps the key's frequency. Inserting a new key into a full
    /// cache evicts the least frequently used entry first. On an encoding
    /// error nothing changes.
    pub fn set(&self, key: K, value: V) -> Result<(), CacheError> {
        self.shared.store(key, value, None)
    }

    /// Like [`set`](Self::set), expiring `ttl` from now.
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    /// use lfukit::builder::CacheBuilder;
    /// use lfukit::clock::ManualClock;
    ///
    /// let clock = ManualClock::new();
    /// let cache = CacheBuilder::<u32, u32>::new(4).clock(clock.clone()).build().unwrap();
    /// cache.set_with_ttl(1, 10, Duration::from_millis(10)).unwrap();
    ///
    /// clock.advance(Duration::from_millis(20));
    /// assert!(!cache.has(&1));
    /// assert!(cache.get(&1).unwrap_err().is_not_found());
    /// ```
    pub fn set_with_ttl(&self, key: K, value: V, ttl: Duration) -> Result<(), CacheError> {
        self.shared.store(key, value, Some(ttl))
    }

    /// Returns the value for `key`, promoting it.
    ///
    /// On a miss with a loader configured, joins or runs a fill for `key`
    /// and returns its outcome. Concurrent callers missing on the same key
    /// share a single fill.
    ///
    /// # Example
    ///
    /// ```
    /// use lfukit::builder::CacheBuilder;
    /// use lfukit::load::Loaded;
    ///
    /// let cache = CacheBuilder::<u32, u64>::new(8)
    ///     .loader(|k: &u32| Ok(Loaded::new(u64::from(*k) * 10)))
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(cache.get(&4).unwrap(), 40);
    /// assert!(cache.has(&4));
    /// ```
    pub fn get(&self, key: &K) -> Result<V, CacheError> {
        match self.lookup(key) {
            Err(CacheError::KeyNotFound) => match self.shared.loader.clone() {
                Some(loader) => self.load(key, true, move |k: &K| loader(k)),
                None => Err(CacheError::KeyNotFound),
            },
            found => found,
        }
    }

    /// Returns the value for `key` without ever waiting on a fill.
    ///
    /// On a miss with a loader configured, starts a background fill unless
    /// one is already running for `key`, and returns
    /// [`CacheError::KeyNotFound`] either way.
    pub fn get_if_present(&self, key: &K) -> Result<V, CacheError> {
        match self.lookup(key) {
            Err(CacheError::KeyNotFound) => {
                if let Some(loader) = self.shared.loader.clone() {
                    let _ = self.load(key, false, move |k: &K| loader(k));
                }
                Err(CacheError::KeyNotFound)
            },
            found => found,
        }
    }

    /// Like [`get`](Self::get) with a per-call fill function in place of the
    /// configured loader.
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    /// use lfukit::cache::LfuCache;
    /// use lfukit::load::Loaded;
    ///
    /// let cache: LfuCache<&str, String> = LfuCache::new(8);
    /// let value = cache
    ///     .get_with(&"greeting", |_| Ok(Loaded::with_ttl("hello".to_string(), Duration::from_secs(60))))
    ///     .unwrap();
    /// assert_eq!(value, "hello");
    /// assert_eq!(cache.get(&"greeting").unwrap(), "hello");
    /// ```
    pub fn get_with<F>(&self, key: &K, fill: F) -> Result<V, CacheError>
    where
        F: FnOnce(&K) -> Result<Loaded<V>, FillError> + Send + 'static,
    {
        match self.lookup(key) {
            Err(CacheError::KeyNotFound) => self.load(key, true, fill),
            found => found,
        }
    }

    /// `true` if `key` is resident and not expired. Does not promote.
    pub fn has(&self, key: &K) -> bool {
        self.shared.core.read().contains(key)
    }

    /// Stored value for `key` without promoting it or touching the counters.
    pub fn peek(&self, key: &K) -> Result<V, CacheError> {
        let stored = self.shared.core.read().peek(key).cloned();
        match stored {
            Some(stored) => self.shared.decode(key, stored),
            None => Err(CacheError::KeyNotFound),
        }
    }

    /// Removes `key`, expired or not. Returns whether anything was removed.
    pub fn remove(&self, key: &K) -> bool {
        self.shared.core.write().remove(key).is_some()
    }

    /// Resident keys; with `check_expired`, expired ones are left out.
    pub fn keys(&self, check_expired: bool) -> Vec<K> {
        self.shared.core.read().keys(check_expired)
    }

    /// Resident entries with their values as stored (no codec applied).
    pub fn get_all(&self, check_expired: bool) -> HashMap<K, V> {
        self.shared.core.read().get_all(check_expired)
    }

    pub fn len(&self, check_expired: bool) -> usize {
        self.shared.core.read().len(check_expired)
    }

    pub fn is_empty(&self) -> bool {
        self.shared.core.read().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.shared.core.read().capacity()
    }

    /// Drops every entry, firing the purge hook once per entry.
    pub fn purge(&self) {
        self.shared.core.write().purge();
    }

    /// Evicts up to `count` entries in LFU order. Returns how many went.
    pub fn evict(&self, count: usize) -> usize {
        self.shared.core.write().evict(count)
    }

    /// Current access count of `key`. Does not promote.
    pub fn frequency(&self, key: &K) -> Option<u64> {
        self.shared.core.read().frequency(key)
    }

    /// `(frequency, member count)` for every band, ascending.
    pub fn band_frequencies(&self) -> Vec<(u64, usize)> {
        self.shared.core.read().band_frequencies()
    }

    /// Keys with a fill currently running.
    pub fn loads_in_flight(&self) -> usize {
        self.shared.loads.in_flight()
    }

    pub fn hit_count(&self) -> u64 {
        self.shared.stats.hit_count()
    }

    pub fn miss_count(&self) -> u64 {
        self.shared.stats.miss_count()
    }

    pub fn lookup_count(&self) -> u64 {
        self.shared.stats.lookup_count()
    }

    pub fn hit_rate(&self) -> f64 {
        self.shared.stats.hit_rate()
    }

    /// Counters plus current size, captured together.
    pub fn stats(&self) -> CacheStatsSnapshot {
        let core = self.shared.core.read();
        CacheStatsSnapshot {
            hits: self.shared.stats.hit_count(),
            misses: self.shared.stats.miss_count(),
            hit_rate: self.shared.stats.hit_rate(),
            len: core.len(false),
            capacity: core.capacity(),
        }
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.shared.core.read().check_invariants()
    }

    fn lookup(&self, key: &K) -> Result<V, CacheError> {
        let stored = self.shared.core.write().get(key).cloned();
        match stored {
            Some(stored) => {
                self.shared.stats.record_hit();
                trace!("lfu hit");
                self.shared.decode(key, stored)
            },
            None => {
                self.shared.stats.record_miss();
                trace!("lfu miss");
                Err(CacheError::KeyNotFound)
            },
        }
    }

    fn load<F>(&self, key: &K, wait: bool, fill: F) -> Result<V, CacheError>
    where
        F: FnOnce(&K) -> Result<Loaded<V>, FillError> + Send + 'static,
    {
        let shared = Arc::clone(&self.shared);
        let owned = key.clone();
        self.shared
            .loads
            .load(key.clone(), wait, move || shared.fill(&owned, fill))
    }
}
