//! Per-key fill deduplication.
//!
//! When several callers miss on the same key at once, only one of them (the
//! *leader*) runs the fill function. Blocking callers that arrive while the
//! fill is in flight park on the key's in-flight record and all receive the
//! leader's outcome, success or error. Non-blocking callers never wait: the
//! first one starts the fill on a background thread, later ones return
//! immediately.
//!
//! ```text
//!   caller A ──miss──► claim(key) ──► Leader ──► fill() ──► complete ──┐
//!   caller B ──miss──► claim(key) ──► Follower ─► wait on condvar ◄────┤ notify_all
//!   caller C ──miss──► claim(key) ──► Follower ─► wait on condvar ◄────┘
//!
//!   inflight: Mutex<FxHashMap<K, Arc<InflightLoad<V>>>>
//!             at most one record per key; removed exactly once, by the leader
//! ```
//!
//! Outcomes are never cached here. Once a fill finishes its record is gone,
//! so the next miss on that key starts a fresh fill. A fill that panics is
//! reported to waiters as a [`CacheError::Fill`] and the panic then resumes
//! on the leader's thread.

use std::fmt;
use std::hash::Hash;
use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};

use crate::error::{CacheError, FillError};

/// A value produced by a fill function, with an optional expiration that
/// overrides the cache's default TTL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loaded<V> {
    pub value: V,
    pub ttl: Option<Duration>,
}

impl<V> Loaded<V> {
    /// A value that uses the cache's default expiration.
    pub fn new(value: V) -> Self {
        Self { value, ttl: None }
    }

    /// A value that expires `ttl` after it is stored.
    pub fn with_ttl(value: V, ttl: Duration) -> Self {
        Self {
            value,
            ttl: Some(ttl),
        }
    }
}

impl<V> From<V> for Loaded<V> {
    fn from(value: V) -> Self {
        Self::new(value)
    }
}

/// Cache-wide fill function.
pub type Loader<K, V> = Arc<dyn Fn(&K) -> Result<Loaded<V>, FillError> + Send + Sync>;

struct InflightLoad<V> {
    outcome: Mutex<Option<Result<V, CacheError>>>,
    done: Condvar,
}

impl<V> InflightLoad<V> {
    fn new() -> Self {
        Self {
            outcome: Mutex::new(None),
            done: Condvar::new(),
        }
    }
}

enum Role<V> {
    Leader(Arc<InflightLoad<V>>),
    Follower(Arc<InflightLoad<V>>),
}

/// Tracks which keys have a fill in flight.
pub struct LoadCoordinator<K, V> {
    inflight: Arc<Mutex<FxHashMap<K, Arc<InflightLoad<V>>>>>,
}

impl<K, V> LoadCoordinator<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self {
            inflight: Arc::new(Mutex::new(FxHashMap::default())),
        }
    }

    /// Number of keys with a fill currently in flight.
    pub fn in_flight(&self) -> usize {
        self.inflight.lock().len()
    }

    pub fn is_loading(&self, key: &K) -> bool {
        self.inflight.lock().contains_key(key)
    }

    /// Runs `fill` for `key` unless a fill for it is already in flight.
    ///
    /// With `wait`, the caller receives the outcome of whichever fill ran,
    /// its own or the one it joined. Without `wait`, the caller always
    /// receives [`CacheError::KeyNotFound`]; if no fill was in flight, one is
    /// started on a background thread.
    pub fn load<F>(&self, key: K, wait: bool, fill: F) -> Result<V, CacheError>
    where
        F: FnOnce() -> Result<V, CacheError> + Send + 'static,
    {
        match self.claim(&key) {
            Role::Follower(slot) if wait => Self::wait_on(&slot),
            Role::Follower(_) => {
                trace!("fill already in flight");
                Err(CacheError::KeyNotFound)
            },
            Role::Leader(slot) if wait => self.run(&key, &slot, fill),
            Role::Leader(slot) => {
                self.spawn(key, slot, fill);
                Err(CacheError::KeyNotFound)
            },
        }
    }

    fn claim(&self, key: &K) -> Role<V> {
        let mut inflight = self.inflight.lock();
        if let Some(existing) = inflight.get(key) {
            return Role::Follower(Arc::clone(existing));
        }
        let slot = Arc::new(InflightLoad::new());
        inflight.insert(key.clone(), Arc::clone(&slot));
        Role::Leader(slot)
    }

    fn run<F>(&self, key: &K, slot: &Arc<InflightLoad<V>>, fill: F) -> Result<V, CacheError>
    where
        F: FnOnce() -> Result<V, CacheError>,
    {
        debug!("fill started");
        match catch_unwind(AssertUnwindSafe(fill)) {
            Ok(outcome) => {
                match &outcome {
                    Ok(_) => debug!("fill finished"),
                    Err(err) => warn!(error = %err, "fill failed"),
                }
                self.complete(key, slot, outcome.clone());
                outcome
            },
            Err(payload) => {
                warn!("fill panicked");
                let err = CacheError::Fill(FillError::msg("fill function panicked"));
                self.complete(key, slot, Err(err));
                resume_unwind(payload)
            },
        }
    }

    fn spawn<F>(&self, key: K, slot: Arc<InflightLoad<V>>, fill: F)
    where
        F: FnOnce() -> Result<V, CacheError> + Send + 'static,
    {
        let coordinator = self.clone();
        let (failed_key, failed_slot) = (key.clone(), Arc::clone(&slot));
        let spawned = thread::Builder::new()
            .name("lfukit-fill".into())
            .spawn(move || {
                let _ = coordinator.run(&key, &slot, fill);
            });
        if let Err(err) = spawned {
            warn!(error = %err, "could not start background fill");
            let err = CacheError::Fill(FillError::new(err));
            self.complete(&failed_key, &failed_slot, Err(err));
        }
    }

    fn wait_on(slot: &InflightLoad<V>) -> Result<V, CacheError> {
        let mut outcome = slot.outcome.lock();
        while outcome.is_none() {
            slot.done.wait(&mut outcome);
        }
        outcome.clone().unwrap_or(Err(CacheError::KeyNotFound))
    }

    fn complete(&self, key: &K, slot: &Arc<InflightLoad<V>>, outcome: Result<V, CacheError>) {
        *slot.outcome.lock() = Some(outcome);
        slot.done.notify_all();

        let mut inflight = self.inflight.lock();
        if inflight.get(key).is_some_and(|current| Arc::ptr_eq(current, slot)) {
            inflight.remove(key);
        }
    }
}

impl<K, V> Clone for LoadCoordinator<K, V> {
    fn clone(&self) -> Self {
        Self {
            inflight: Arc::clone(&self.inflight),
        }
    }
}

impl<K, V> Default for LoadCoordinator<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for LoadCoordinator<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadCoordinator")
            .field("in_flight", &self.inflight.lock().len())
            .finish()
    }
}
