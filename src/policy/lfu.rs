//! Least Frequently Used (LFU) engine core.
//!
//! `LfuCore` is the single-threaded heart of [`LfuCache`](crate::cache::LfuCache):
//! a key table pointing into a [`FrequencyLedger`], plus per-entry expiration
//! and lifecycle hooks. It performs no locking; the concurrent wrapper holds it
//! behind the primary lock.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────────────┐
//! │                          LfuCore<K, V> Layout                             │
//! │                                                                           │
//! │   ┌───────────────────────────┐      ┌──────────────────────────────────┐ │
//! │   │ index: FxHashMap<K, Slot> │      │ ledger: FrequencyLedger<Entry>   │ │
//! │   │                           │      │                                  │ │
//! │   │  "a" ──────────────────────────► │  freq 0: [c] ◄─► [d]             │ │
//! │   │  "b" ──────────────────────────► │  freq 2: [a]                     │ │
//! │   │  "c" ──────────────────────────► │  freq 5: [b]                     │ │
//! │   │  "d" ──────────────────────────► │                                  │ │
//! │   └───────────────────────────┘      └──────────────────────────────────┘ │
//! │                                                                           │
//! │   Entry { key, value, expires_at }      clock: Arc<dyn Clock>             │
//! └───────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Operations
//!
//! | Operation      | Promotes | Expired entry                          |
//! |----------------|----------|----------------------------------------|
//! | `get`          | yes      | removed (no hook), reported as absent  |
//! | `peek`         | no       | reported as absent, left in place      |
//! | `contains`     | no       | reported as absent, left in place      |
//! | `set`          | no       | overwritten in place                   |
//! | `remove`       | no       | removed, `on_delete` fires             |
//! | `keys`/`len`   | no       | skipped when `check_expired` is set    |
//!
//! Overwriting an existing key keeps its frequency. New keys start at
//! frequency 0; when the table is full the least frequently used entry is
//! evicted first (ties broken by arrival order within a band).
//!
//! ## Example
//!
//! ```
//! use lfukit::policy::lfu::LfuCore;
//!
//! let mut core = LfuCore::new(2);
//! core.set("a", 1);
//! core.set("b", 2);
//! core.get(&"a");
//!
//! core.set("c", 3); // "b" was never read, so it goes
//! assert!(core.contains(&"a"));
//! assert!(!core.contains(&"b"));
//! assert_eq!(core.frequency(&"a"), Some(1));
//! assert_eq!(core.frequency(&"c"), Some(0));
//! ```
//!
//! ## Thread Safety
//!
//! `LfuCore` is **not** thread-safe. Use [`LfuCache`](crate::cache::LfuCache)
//! for shared access.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::clock::{Clock, SystemClock};
use crate::ds::{FrequencyLedger, SlotId};
use crate::error::{ConfigError, InvariantError};
use crate::hooks::Hooks;

#[derive(Debug)]
struct Entry<K, V> {
    key: K,
    value: V,
    expires_at: Option<Instant>,
}

impl<K, V> Entry<K, V> {
    #[inline]
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at < now)
    }
}

/// Single-threaded LFU table with expiration and hooks.
#[derive(Debug)]
pub struct LfuCore<K, V> {
    index: FxHashMap<K, SlotId>,
    ledger: FrequencyLedger<Entry<K, V>>,
    capacity: usize,
    default_ttl: Option<Duration>,
    hooks: Hooks<K, V>,
    clock: Arc<dyn Clock>,
}

impl<K, V> LfuCore<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates an empty core holding at most `capacity` entries.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero. Use [`try_new`](Self::try_new) to get a
    /// [`ConfigError`] instead.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be greater than zero");
        Self::with_parts(capacity)
    }

    /// Fallible form of [`new`](Self::new).
    pub fn try_new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::new("capacity must be greater than zero"));
        }
        Ok(Self::with_parts(capacity))
    }

    fn with_parts(capacity: usize) -> Self {
        Self {
            index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            ledger: FrequencyLedger::with_capacity(capacity),
            capacity,
            default_ttl: None,
            hooks: Hooks::new(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Expiration applied to sets that don't carry their own TTL.
    pub fn with_default_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_hooks(mut self, hooks: Hooks<K, V>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }

    /// Stores `value` under `key` using the default TTL (if any).
    ///
    /// Returns the previous value when the key was already resident.
    pub fn set(&mut self, key: K, value: V) -> Option<V> {
        self.store(key, value, None)
    }

    /// Stores `value` under `key`, expiring `ttl` from now.
    pub fn set_with_ttl(&mut self, key: K, value: V, ttl: Duration) -> Option<V> {
        self.store(key, value, Some(ttl))
    }

    /// Shared write path. `ttl` wins over the default TTL. With neither, a
    /// new entry never expires and an overwrite keeps its old expiration.
    pub(crate) fn store(&mut self, key: K, value: V, ttl: Option<Duration>) -> Option<V> {
        let expires_at = ttl
            .or(self.default_ttl)
            .and_then(|ttl| self.clock.now().checked_add(ttl));

        if let Some(&id) = self.index.get(&key) {
            let entry = self.ledger.get_mut(id)?;
            let previous = std::mem::replace(&mut entry.value, value);
            if ttl.or(self.default_ttl).is_some() {
                entry.expires_at = expires_at;
            }
            self.hooks.added(&entry.key, &entry.value);
            return Some(previous);
        }

        if self.index.len() >= self.capacity {
            self.evict(1);
        }

        let id = self.ledger.insert(Entry {
            key: key.clone(),
            value,
            expires_at,
        });
        self.index.insert(key, id);
        if let Some(entry) = self.ledger.get(id) {
            self.hooks.added(&entry.key, &entry.value);
        }
        None
    }

    /// Looks up `key`, counting the access.
    ///
    /// An expired entry is dropped on the spot (no hook fires) and reported
    /// as absent.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let id = *self.index.get(key)?;
        if self.ledger.get(id)?.is_expired(self.clock.now()) {
            self.expire(key, id);
            return None;
        }
        if let Some(freq) = self.ledger.promote(id) {
            trace!(freq, "lfu promote");
        }
        self.ledger.get(id).map(|entry| &entry.value)
    }

    /// Looks up `key` without counting the access.
    pub fn peek(&self, key: &K) -> Option<&V> {
        let entry = self.ledger.get(*self.index.get(key)?)?;
        if entry.is_expired(self.clock.now()) {
            return None;
        }
        Some(&entry.value)
    }

    /// `true` if `key` is resident and not expired. Does not promote.
    pub fn contains(&self, key: &K) -> bool {
        self.peek(key).is_some()
    }

    /// Current frequency of `key`, expired or not. Does not promote.
    pub fn frequency(&self, key: &K) -> Option<u64> {
        self.ledger.frequency(*self.index.get(key)?)
    }

    /// Removes `key` and returns its value, firing `on_delete`.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let id = self.index.remove(key)?;
        let entry = self.ledger.remove(id)?;
        self.hooks.deleted(&entry.key, &entry.value);
        Some(entry.value)
    }

    /// Evicts up to `count` entries in LFU order, firing `on_evict` for each.
    pub fn evict(&mut self, count: usize) -> usize {
        let index = &mut self.index;
        let hooks = &self.hooks;
        let evicted = self.ledger.evict(count, |entry, freq| {
            index.remove(&entry.key);
            trace!(freq, "lfu evict");
            hooks.evicted(&entry.key, &entry.value);
        });
        if evicted > 0 {
            debug!(evicted, remaining = self.index.len(), "lfu eviction");
        }
        evicted
    }

    /// Resident keys. With `check_expired`, expired entries are skipped.
    pub fn keys(&self, check_expired: bool) -> Vec<K> {
        self.live(check_expired).map(|entry| entry.key.clone()).collect()
    }

    /// Snapshot of resident key/value pairs.
    pub fn get_all(&self, check_expired: bool) -> HashMap<K, V>
    where
        V: Clone,
    {
        self.live(check_expired)
            .map(|entry| (entry.key.clone(), entry.value.clone()))
            .collect()
    }

    /// Number of resident entries. With `check_expired`, expired entries
    /// are not counted.
    pub fn len(&self, check_expired: bool) -> usize {
        if check_expired {
            self.live(true).count()
        } else {
            self.index.len()
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Drops every entry, firing `on_purge` for each one first.
    pub fn purge(&mut self) {
        let purged = self.index.len();
        if self.hooks.on_purge.is_some() {
            for (_, entry) in self.ledger.iter() {
                self.hooks.purged(&entry.key, &entry.value);
            }
        }
        self.index.clear();
        self.ledger.reset();
        debug!(purged, "lfu purge");
    }

    /// `(frequency, member count)` for every band, ascending.
    pub fn band_frequencies(&self) -> Vec<(u64, usize)> {
        self.ledger.band_frequencies()
    }

    /// Verifies the ledger and that table and ledger describe the same entries.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.ledger.check_invariants()?;
        if self.index.len() != self.ledger.len() {
            return Err(InvariantError::new(format!(
                "table holds {} keys but ledger holds {} entries",
                self.index.len(),
                self.ledger.len()
            )));
        }
        if self.index.len() > self.capacity {
            return Err(InvariantError::new(format!(
                "{} entries exceed capacity {}",
                self.index.len(),
                self.capacity
            )));
        }
        for (key, &id) in &self.index {
            match self.ledger.get(id) {
                Some(entry) if entry.key == *key => {},
                Some(_) => return Err(InvariantError::new("table key points at another entry")),
                None => return Err(InvariantError::new("table key points at a vacant slot")),
            }
        }
        Ok(())
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        if let Err(err) = self.check_invariants() {
            panic!("lfu invariant violated: {err}");
        }
    }

    fn expire(&mut self, key: &K, id: SlotId) {
        self.index.remove(key);
        self.ledger.remove(id);
        debug!("lfu expired entry dropped");
    }

    fn live(&self, check_expired: bool) -> impl Iterator<Item = &Entry<K, V>> {
        let now = self.clock.now();
        self.ledger
            .iter()
            .map(|(_, entry)| entry)
            .filter(move |entry| !check_expired || !entry.is_expired(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use parking_lot::Mutex;

    type Log = Arc<Mutex<Vec<(&'static str, u32)>>>;

    fn recording_hooks(log: &Log) -> Hooks<&'static str, u32> {
        let mut hooks = Hooks::new();
        let add = Arc::clone(log);
        hooks.on_add = Some(Arc::new(move |_: &&str, v: &u32| add.lock().push(("add", *v))));
        let evict = Arc::clone(log);
        hooks.on_evict = Some(Arc::new(move |_: &&str, v: &u32| evict.lock().push(("evict", *v))));
        let delete = Arc::clone(log);
        hooks.on_delete = Some(Arc::new(move |_: &&str, v: &u32| delete.lock().push(("delete", *v))));
        let purge = Arc::clone(log);
        hooks.on_purge = Some(Arc::new(move |_: &&str, v: &u32| purge.lock().push(("purge", *v))));
        hooks
    }

    fn manual_core(capacity: usize) -> (LfuCore<&'static str, u32>, ManualClock) {
        let clock = ManualClock::new();
        let core = LfuCore::new(capacity).with_clock(Arc::new(clock.clone()));
        (core, clock)
    }

    mod basic_behavior {
        use super::*;

        #[test]
        fn test_new_entries_start_at_frequency_zero() {
            let mut core = LfuCore::new(4);
            core.set("a", 1);
            assert_eq!(core.frequency(&"a"), Some(0));
            assert_eq!(core.get(&"a"), Some(&1));
            assert_eq!(core.frequency(&"a"), Some(1));
            assert_eq!(core.get(&"missing"), None);
        }

        #[test]
        fn test_least_frequent_is_evicted_first() {
            let log: Log = Arc::default();
            let mut core = LfuCore::new(2).with_hooks(recording_hooks(&log));
            core.set("a", 1);
            core.set("b", 2);
            core.get(&"a");
            core.get(&"a");
            core.get(&"b");
            core.set("c", 3);

            assert!(core.contains(&"a"));
            assert!(!core.contains(&"b"));
            assert!(core.contains(&"c"));
            assert_eq!(core.frequency(&"a"), Some(2));
            assert_eq!(core.frequency(&"c"), Some(0));
            assert!(log.lock().contains(&("evict", 2)));
            core.debug_validate_invariants();
        }

        #[test]
        fn test_overwrite_keeps_frequency_and_fires_add() {
            let log: Log = Arc::default();
            let mut core = LfuCore::new(3).with_hooks(recording_hooks(&log));
            core.set("k", 1);
            core.get(&"k");
            core.get(&"k");
            core.get(&"k");
            assert_eq!(core.set("k", 9), Some(1));

            assert_eq!(core.frequency(&"k"), Some(3));
            assert_eq!(core.peek(&"k"), Some(&9));
            assert_eq!(core.len(false), 1);
            let adds = log.lock().iter().filter(|(what, _)| *what == "add").count();
            assert_eq!(adds, 2);
        }

        #[test]
        fn test_ties_break_by_arrival_order() {
            let mut core = LfuCore::new(3);
            core.set("x", 1);
            core.set("y", 2);
            core.set("z", 3);
            core.set("w", 4);
            assert!(!core.contains(&"x"));
            assert_eq!(core.len(false), 3);
        }

        #[test]
        fn test_peek_and_contains_do_not_promote() {
            let mut core = LfuCore::new(2);
            core.set("a", 1);
            assert_eq!(core.peek(&"a"), Some(&1));
            assert!(core.contains(&"a"));
            assert_eq!(core.frequency(&"a"), Some(0));
        }

        #[test]
        fn test_try_new_rejects_zero_capacity() {
            let err = LfuCore::<u32, u32>::try_new(0).unwrap_err();
            assert!(err.message().contains("capacity"));
            assert!(LfuCore::<u32, u32>::try_new(1).is_ok());
        }

        #[test]
        #[should_panic(expected = "capacity")]
        fn test_new_panics_on_zero_capacity() {
            let _ = LfuCore::<u32, u32>::new(0);
        }
    }

    mod removal {
        use super::*;

        #[test]
        fn test_remove_fires_delete_and_frees_room() {
            let log: Log = Arc::default();
            let mut core = LfuCore::new(2).with_hooks(recording_hooks(&log));
            core.set("a", 10);
            core.set("b", 20);
            assert_eq!(core.remove(&"a"), Some(10));
            assert_eq!(core.remove(&"a"), None);
            core.set("c", 30);

            assert!(core.contains(&"b"));
            assert!(core.contains(&"c"));
            let entries = log.lock().clone();
            assert!(entries.contains(&("delete", 10)));
            assert!(!entries.iter().any(|(what, _)| *what == "evict"));
        }

        #[test]
        fn test_purge_fires_per_entry_and_empties() {
            let log: Log = Arc::default();
            let mut core = LfuCore::new(4).with_hooks(recording_hooks(&log));
            core.set("a", 1);
            core.set("b", 2);
            core.set("c", 3);
            core.get(&"b");
            core.purge();

            assert!(core.is_empty());
            assert_eq!(core.band_frequencies(), vec![(0, 0)]);
            let mut purged: Vec<u32> = log
                .lock()
                .iter()
                .filter(|(what, _)| *what == "purge")
                .map(|(_, v)| *v)
                .collect();
            purged.sort_unstable();
            assert_eq!(purged, vec![1, 2, 3]);
            core.debug_validate_invariants();
        }

        #[test]
        fn test_explicit_evict_count() {
            let mut core = LfuCore::new(5);
            for (i, key) in ["a", "b", "c", "d"].into_iter().enumerate() {
                core.set(key, i as u32);
            }
            core.get(&"a");
            assert_eq!(core.evict(2), 2);
            assert_eq!(core.keys(false).len(), 2);
            assert!(core.contains(&"a"));
            assert_eq!(core.evict(10), 2);
            assert!(core.is_empty());
        }
    }

    mod expiration {
        use super::*;

        #[test]
        fn test_expired_get_is_a_miss_and_drops_silently() {
            let log: Log = Arc::default();
            let (core, clock) = manual_core(4);
            let mut core = core.with_hooks(recording_hooks(&log));
            core.set_with_ttl("k", 1, Duration::from_secs(10));
            clock.advance(Duration::from_secs(5));
            assert_eq!(core.get(&"k"), Some(&1));

            clock.advance(Duration::from_secs(6));
            assert!(!core.contains(&"k"));
            assert_eq!(core.len(false), 1);
            assert_eq!(core.get(&"k"), None);
            assert_eq!(core.len(false), 0);
            assert!(log.lock().iter().all(|(what, _)| *what == "add"));
            core.debug_validate_invariants();
        }

        #[test]
        fn test_expiry_is_strictly_after_deadline() {
            let (mut core, clock) = manual_core(2);
            core.set_with_ttl("k", 1, Duration::from_secs(1));
            clock.advance(Duration::from_secs(1));
            assert!(core.contains(&"k"));
            clock.advance(Duration::from_nanos(1));
            assert!(!core.contains(&"k"));
        }

        #[test]
        fn test_default_ttl_applies_and_explicit_ttl_wins() {
            let (core, clock) = manual_core(4);
            let mut core = core.with_default_ttl(Some(Duration::from_secs(2)));
            core.set("short", 1);
            core.set_with_ttl("long", 2, Duration::from_secs(60));
            clock.advance(Duration::from_secs(3));

            assert!(!core.contains(&"short"));
            assert!(core.contains(&"long"));
        }

        #[test]
        fn test_plain_overwrite_keeps_expiration() {
            let (mut core, clock) = manual_core(2);
            core.set_with_ttl("k", 1, Duration::from_secs(1));
            assert_eq!(core.set("k", 2), Some(1));
            assert_eq!(core.peek(&"k"), Some(&2));

            clock.advance(Duration::from_secs(2));
            assert!(!core.contains(&"k"));
            assert_eq!(core.get(&"k"), None);
            assert_eq!(core.len(false), 0);
        }

        #[test]
        fn test_overwrite_with_ttl_replaces_expiration() {
            let (mut core, clock) = manual_core(2);
            core.set_with_ttl("k", 1, Duration::from_secs(1));
            core.set_with_ttl("k", 2, Duration::from_secs(10));
            clock.advance(Duration::from_secs(5));
            assert_eq!(core.get(&"k"), Some(&2));
        }

        #[test]
        fn test_enumeration_respects_check_expired() {
            let (mut core, clock) = manual_core(4);
            core.set_with_ttl("old", 1, Duration::from_secs(1));
            core.set("fresh", 2);
            clock.advance(Duration::from_secs(2));

            assert_eq!(core.len(true), 1);
            assert_eq!(core.len(false), 2);
            assert_eq!(core.keys(true), vec!["fresh"]);
            let all = core.get_all(true);
            assert_eq!(all.len(), 1);
            assert_eq!(all.get(&"fresh"), Some(&2));
            assert_eq!(core.get_all(false).len(), 2);
        }

        #[test]
        fn test_expired_entry_still_counts_toward_capacity() {
            let (mut core, clock) = manual_core(2);
            core.set_with_ttl("a", 1, Duration::from_secs(1));
            core.set("b", 2);
            core.get(&"b");
            clock.advance(Duration::from_secs(2));
            core.set("c", 3);

            assert_eq!(core.len(false), 2);
            assert!(core.contains(&"b"));
            assert!(core.contains(&"c"));
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Set(u8, u16),
            Get(u8),
            Remove(u8),
            Evict(u8),
            Advance(u8),
            Purge,
        }

        fn op_strategy() -> impl Strategy<Value = Op> {
            prop_oneof![
                4 => (0u8..24, any::<u16>()).prop_map(|(k, v)| Op::Set(k, v)),
                4 => (0u8..24).prop_map(Op::Get),
                1 => (0u8..24).prop_map(Op::Remove),
                1 => (0u8..4).prop_map(Op::Evict),
                1 => (0u8..5).prop_map(Op::Advance),
                1 => Just(Op::Purge),
            ]
        }

        proptest! {
            /// Arbitrary operation sequences never exceed capacity or break invariants.
            #[cfg_attr(miri, ignore)]
            #[test]
            fn prop_capacity_and_invariants_hold(
                capacity in 1usize..12,
                ops in prop::collection::vec(op_strategy(), 1..200),
            ) {
                let clock = ManualClock::new();
                let mut core: LfuCore<u8, u16> = LfuCore::new(capacity)
                    .with_clock(Arc::new(clock.clone()))
                    .with_default_ttl(Some(Duration::from_secs(3)));
                for op in ops {
                    match op {
                        Op::Set(k, v) => {
                            core.set(k, v);
                            prop_assert_eq!(core.peek(&k), Some(&v));
                        },
                        Op::Get(k) => {
                            core.get(&k);
                        },
                        Op::Remove(k) => {
                            core.remove(&k);
                            prop_assert!(!core.contains(&k));
                        },
                        Op::Evict(n) => {
                            core.evict(n as usize);
                        },
                        Op::Advance(secs) => clock.advance(Duration::from_secs(secs as u64)),
                        Op::Purge => core.purge(),
                    }
                    prop_assert!(core.len(false) <= capacity);
                    prop_assert!(core.check_invariants().is_ok());
                }
            }
        }
    }
}
