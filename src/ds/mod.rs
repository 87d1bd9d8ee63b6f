pub mod frequency_ledger;
pub mod slot_arena;

pub use frequency_ledger::{BandIter, FrequencyLedger};
pub use slot_arena::{SlotArena, SlotId};
