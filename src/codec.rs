//! Value transformation on the way into and out of the cache.
//!
//! A [`ValueCodec`] runs outside the primary lock: `encode` before a value is
//! stored, `decode` after a stored value is read. An encode failure aborts
//! the write and leaves the cache untouched.
//!
//! ```
//! use lfukit::codec::ValueCodec;
//! use lfukit::error::CodecError;
//!
//! /// Stores strings upper-cased, hands them back lower-cased.
//! struct Shout;
//!
//! impl ValueCodec<u32, String> for Shout {
//!     fn encode(&self, _key: &u32, value: String) -> Result<String, CodecError> {
//!         Ok(value.to_uppercase())
//!     }
//!     fn decode(&self, _key: &u32, stored: String) -> Result<String, CodecError> {
//!         Ok(stored.to_lowercase())
//!     }
//! }
//!
//! assert_eq!(Shout.encode(&1, "hi".into()).unwrap(), "HI");
//! ```

use crate::error::CodecError;

/// Encode/decode hook applied to every stored value.
pub trait ValueCodec<K, V>: Send + Sync {
    fn encode(&self, key: &K, value: V) -> Result<V, CodecError>;

    fn decode(&self, key: &K, stored: V) -> Result<V, CodecError>;
}
