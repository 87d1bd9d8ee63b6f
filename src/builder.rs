//! Cache builder.
//!
//! Collects capacity, default expiration, hooks, codec, loader and clock, and
//! validates them once in [`CacheBuilder::build`].
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//! use lfukit::builder::CacheBuilder;
//! use lfukit::load::Loaded;
//!
//! let cache = CacheBuilder::<u64, String>::new(100)
//!     .expiration(Duration::from_secs(30))
//!     .loader(|id: &u64| Ok(Loaded::new(format!("user-{id}"))))
//!     .on_evict(|id, _| println!("evicted {id}"))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(cache.get(&7).unwrap(), "user-7");
//! ```

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::LfuCache;
use crate::clock::{Clock, SystemClock};
use crate::codec::ValueCodec;
use crate::error::{ConfigError, FillError};
use crate::hooks::Hooks;
use crate::load::{Loaded, Loader};
use crate::policy::lfu::LfuCore;

/// Builder for [`LfuCache`] instances.
pub struct CacheBuilder<K, V> {
    capacity: usize,
    expiration: Option<Duration>,
    hooks: Hooks<K, V>,
    codec: Option<Arc<dyn ValueCodec<K, V>>>,
    loader: Option<Loader<K, V>>,
    clock: Arc<dyn Clock>,
}

impl<K, V> CacheBuilder<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create a new cache builder with the specified capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            expiration: None,
            hooks: Hooks::new(),
            codec: None,
            loader: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Default time-to-live for entries stored without their own.
    pub fn expiration(mut self, ttl: Duration) -> Self {
        self.expiration = Some(ttl);
        self
    }

    /// Cache-wide fill function used by `get` and `get_if_present` on a miss.
    pub fn loader<F>(mut self, loader: F) -> Self
    where
        F: Fn(&K) -> Result<Loaded<V>, FillError> + Send + Sync + 'static,
    {
        self.loader = Some(Arc::new(loader));
        self
    }

    pub fn on_add<F>(mut self, hook: F) -> Self
    where
        F: Fn(&K, &V) + Send + Sync + 'static,
    {
        self.hooks.on_add = Some(Arc::new(hook));
        self
    }

    pub fn on_evict<F>(mut self, hook: F) -> Self
    where
        F: Fn(&K, &V) + Send + Sync + 'static,
    {
        self.hooks.on_evict = Some(Arc::new(hook));
        self
    }

    pub fn on_delete<F>(mut self, hook: F) -> Self
    where
        F: Fn(&K, &V) + Send + Sync + 'static,
    {
        self.hooks.on_delete = Some(Arc::new(hook));
        self
    }

    pub fn on_purge<F>(mut self, hook: F) -> Self
    where
        F: Fn(&K, &V) + Send + Sync + 'static,
    {
        self.hooks.on_purge = Some(Arc::new(hook));
        self
    }

    /// Replaces all four hooks at once.
    pub fn hooks(mut self, hooks: Hooks<K, V>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn codec<C>(mut self, codec: C) -> Self
    where
        C: ValueCodec<K, V> + 'static,
    {
        self.codec = Some(Arc::new(codec));
        self
    }

    /// Time source for expiration checks. Defaults to [`SystemClock`].
    pub fn clock<C>(mut self, clock: C) -> Self
    where
        C: Clock + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    /// Validates the configuration and builds the cache.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `capacity` is zero or the default
    /// expiration is zero.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use lfukit::builder::CacheBuilder;
    ///
    /// assert!(CacheBuilder::<u64, u64>::new(0).build().is_err());
    /// assert!(CacheBuilder::<u64, u64>::new(8).expiration(Duration::ZERO).build().is_err());
    /// assert!(CacheBuilder::<u64, u64>::new(8).build().is_ok());
    /// ```
    pub fn build(self) -> Result<LfuCache<K, V>, ConfigError> {
        if self.expiration.is_some_and(|ttl| ttl.is_zero()) {
            return Err(ConfigError::new("expiration must be greater than zero"));
        }
        let core = LfuCore::try_new(self.capacity)?
            .with_default_ttl(self.expiration)
            .with_hooks(self.hooks)
            .with_clock(self.clock);
        Ok(LfuCache::from_parts(core, self.codec, self.loader))
    }
}

impl<K, V> fmt::Debug for CacheBuilder<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheBuilder")
            .field("capacity", &self.capacity)
            .field("expiration", &self.expiration)
            .field("hooks", &self.hooks)
            .field("codec", &self.codec.is_some())
            .field("loader", &self.loader.is_some())
            .field("clock", &self.clock)
            .finish()
    }
}
