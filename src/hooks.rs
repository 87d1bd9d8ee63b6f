//! Lifecycle callbacks.
//!
//! Hooks run synchronously on the thread performing the mutation, while the
//! cache's primary lock is held. They must not call back into the same
//! cache and must not block for long.
//!
//! | Hook        | Fires when                                         |
//! |-------------|----------------------------------------------------|
//! | `on_add`    | every successful set (insert or overwrite)         |
//! | `on_evict`  | an entry is removed to make room                   |
//! | `on_delete` | an entry is removed by an explicit `remove`        |
//! | `on_purge`  | once per resident entry during `purge`             |
//!
//! Lazy expiration fires none of them.

use std::fmt;
use std::sync::Arc;

/// Callback receiving the key and the stored value.
pub type Hook<K, V> = Arc<dyn Fn(&K, &V) + Send + Sync>;

/// Optional set of lifecycle callbacks.
pub struct Hooks<K, V> {
    pub on_add: Option<Hook<K, V>>,
    pub on_evict: Option<Hook<K, V>>,
    pub on_delete: Option<Hook<K, V>>,
    pub on_purge: Option<Hook<K, V>>,
}

impl<K, V> Hooks<K, V> {
    pub fn new() -> Self {
        Self {
            on_add: None,
            on_evict: None,
            on_delete: None,
            on_purge: None,
        }
    }

    #[inline]
    pub(crate) fn added(&self, key: &K, value: &V) {
        if let Some(hook) = &self.on_add {
            hook(key, value);
        }
    }

    #[inline]
    pub(crate) fn evicted(&self, key: &K, value: &V) {
        if let Some(hook) = &self.on_evict {
            hook(key, value);
        }
    }

    #[inline]
    pub(crate) fn deleted(&self, key: &K, value: &V) {
        if let Some(hook) = &self.on_delete {
            hook(key, value);
        }
    }

    #[inline]
    pub(crate) fn purged(&self, key: &K, value: &V) {
        if let Some(hook) = &self.on_purge {
            hook(key, value);
        }
    }
}

impl<K, V> Default for Hooks<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Clone for Hooks<K, V> {
    fn clone(&self) -> Self {
        Self {
            on_add: self.on_add.clone(),
            on_evict: self.on_evict.clone(),
            on_delete: self.on_delete.clone(),
            on_purge: self.on_purge.clone(),
        }
    }
}

impl<K, V> fmt::Debug for Hooks<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("on_add", &self.on_add.is_some())
            .field("on_evict", &self.on_evict.is_some())
            .field("on_delete", &self.on_delete.is_some())
            .field("on_purge", &self.on_purge.is_some())
            .finish()
    }
}
