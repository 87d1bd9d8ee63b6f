pub use crate::builder::CacheBuilder;
pub use crate::cache::LfuCache;
pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::codec::ValueCodec;
pub use crate::ds::{FrequencyLedger, SlotId};
pub use crate::error::{CacheError, CodecError, ConfigError, FillError, InvariantError};
pub use crate::hooks::{Hook, Hooks};
pub use crate::load::{Loaded, Loader};
pub use crate::policy::lfu::LfuCore;
pub use crate::stats::CacheStatsSnapshot;
