//! lfukit: a thread-safe LFU cache with frequency bands, lazy expiration and
//! deduplicated fills.
//!
//! ## Layout
//!
//! - [`ds`]: the [`FrequencyLedger`](ds::FrequencyLedger) and the slot arena
//!   it is built on.
//! - [`policy::lfu`]: [`LfuCore`](policy::lfu::LfuCore), the single-threaded
//!   engine (key table, ledger, expiration, hooks).
//! - [`load`]: [`LoadCoordinator`](load::LoadCoordinator), per-key fill
//!   deduplication.
//! - [`cache`]: [`LfuCache`](cache::LfuCache), the shared handle tying the
//!   above together behind one primary lock.
//! - [`builder`]: [`CacheBuilder`](builder::CacheBuilder) for configuration.
//!
//! ## Quick start
//!
//! ```
//! use lfukit::prelude::*;
//!
//! let cache = CacheBuilder::<&str, u32>::new(2).build().unwrap();
//! cache.set("a", 1).unwrap();
//! cache.set("b", 2).unwrap();
//! cache.get(&"a").unwrap();
//! cache.set("c", 3).unwrap();
//!
//! let mut keys = cache.keys(false);
//! keys.sort_unstable();
//! assert_eq!(keys, vec!["a", "c"]);
//! ```

pub mod builder;
pub mod cache;
pub mod clock;
pub mod codec;
pub mod ds;
pub mod error;
pub mod hooks;
pub mod load;
pub mod policy;
pub mod prelude;
pub mod stats;
