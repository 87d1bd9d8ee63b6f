//! Error types for the lfukit library.
//!
//! ## Key Components
//!
//! - [`CacheError`]: What cache operations return: a miss, a codec failure,
//!   or the error produced by a fill function.
//! - [`FillError`]: Shared, cloneable wrapper around a fill function's error.
//!   Every caller waiting on the same fill receives the same underlying error.
//! - [`CodecError`]: Returned by [`ValueCodec`](crate::codec::ValueCodec)
//!   implementations.
//! - [`ConfigError`]: Returned when cache configuration is invalid
//!   (e.g. zero capacity).
//! - [`InvariantError`]: Returned by `check_invariants` when internal
//!   bookkeeping is inconsistent. Seeing one is a bug in this crate.
//!
//! ## Example Usage
//!
//! ```
//! use lfukit::builder::CacheBuilder;
//! use lfukit::error::{CacheError, ConfigError};
//!
//! let bad = CacheBuilder::<u64, u64>::new(0).build();
//! assert!(matches!(bad, Err(ConfigError { .. })));
//!
//! let cache = CacheBuilder::<u64, u64>::new(8).build().unwrap();
//! assert!(matches!(cache.get(&1), Err(CacheError::KeyNotFound)));
//! ```

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Error returned when internal cache invariants are violated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{msg}")]
pub struct InvariantError {
    msg: String,
}

impl InvariantError {
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.msg
    }
}

/// Error returned when cache configuration parameters are invalid.
///
/// # Example
///
/// ```
/// use lfukit::builder::CacheBuilder;
///
/// let err = CacheBuilder::<u64, u64>::new(0).build().unwrap_err();
/// assert!(err.to_string().contains("capacity"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{msg}")]
pub struct ConfigError {
    msg: String,
}

impl ConfigError {
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.msg
    }
}

/// Error produced by a value codec while encoding or decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{msg}")]
pub struct CodecError {
    msg: String,
}

impl CodecError {
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.msg
    }
}

/// Error returned by a fill function.
///
/// Cloning is cheap and keeps the same underlying error, so all callers that
/// waited on one fill observe one error object (see [`ptr_eq`](Self::ptr_eq)).
#[derive(Clone)]
pub struct FillError(Arc<dyn StdError + Send + Sync>);

impl FillError {
    /// Wraps an arbitrary error.
    pub fn new<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self(Arc::new(err))
    }

    /// Builds a fill error from a plain message.
    pub fn msg(msg: impl Into<String>) -> Self {
        Self(Arc::new(FillMessage(msg.into())))
    }

    /// The wrapped error.
    pub fn inner(&self) -> &(dyn StdError + Send + Sync + 'static) {
        &*self.0
    }

    /// `true` when both values share the same underlying error.
    pub fn ptr_eq(&self, other: &FillError) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for FillError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FillError").field(&self.0.to_string()).finish()
    }
}

impl fmt::Display for FillError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl StdError for FillError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&*self.0)
    }
}

#[derive(Debug, Error)]
#[error("{0}")]
struct FillMessage(String);

/// Errors surfaced by cache operations.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// The key is absent or expired and no value was produced for this call.
    #[error("key not found")]
    KeyNotFound,

    /// The configured codec rejected a value on its way into the cache.
    #[error("encoding error: {0}")]
    Encoding(#[source] CodecError),

    /// The configured codec rejected a stored value on its way out.
    #[error("decoding error: {0}")]
    Decoding(#[source] CodecError),

    /// The fill function failed.
    #[error("fill error: {0}")]
    Fill(#[from] FillError),
}

impl CacheError {
    /// `true` for [`CacheError::KeyNotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::KeyNotFound)
    }
}
