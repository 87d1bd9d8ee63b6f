#![no_main]

use libfuzzer_sys::fuzz_target;
use lfukit::ds::{FrequencyLedger, SlotId};

// Fuzz arbitrary operation sequences on FrequencyLedger
//
// Tests random sequences of insert, promote, remove, pop_min, evict and
// reset, validating band ordering and membership after every step.
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let mut ledger: FrequencyLedger<u32> = FrequencyLedger::new();
    let mut live: Vec<SlotId> = Vec::new();

    let mut idx = 0;
    while idx + 1 < data.len() {
        let op = data[idx] % 7;
        let arg = data[idx + 1];

        match op {
            0 => {
                // Insert
                let id = ledger.insert(u32::from(arg));
                assert_eq!(ledger.frequency(id), Some(0));
                live.push(id);
            }
            1 | 2 => {
                // Promote (weighted so higher bands appear)
                if !live.is_empty() {
                    let id = live[arg as usize % live.len()];
                    let before = ledger.frequency(id).unwrap();
                    assert_eq!(ledger.promote(id), Some(before + 1));
                }
            }
            3 => {
                // Remove
                if !live.is_empty() {
                    let id = live.swap_remove(arg as usize % live.len());
                    assert!(ledger.remove(id).is_some());
                    assert_eq!(ledger.frequency(id), None);
                }
            }
            4 => {
                // Pop min must agree with peek min
                let peeked = ledger.peek_min().map(|(id, v, f)| (id, *v, f));
                let popped = ledger.pop_min();
                match (peeked, popped) {
                    (Some((id, v, f)), Some((pv, pf))) => {
                        assert_eq!((v, f), (pv, pf));
                        live.retain(|live_id| *live_id != id);
                    }
                    (None, None) => {}
                    other => panic!("peek/pop disagree: {other:?}"),
                }
            }
            5 => {
                // Evict a batch; frequencies must come out non-decreasing
                let mut last = 0u64;
                let mut freqs = Vec::new();
                let n = ledger.evict(usize::from(arg % 4), |_, f| freqs.push(f));
                assert_eq!(n, freqs.len());
                for f in freqs {
                    assert!(f >= last);
                    last = f;
                }
                live.retain(|id| ledger.get(*id).is_some());
            }
            6 => {
                // Reset
                if arg % 8 == 0 {
                    ledger.reset();
                    live.clear();
                    assert_eq!(ledger.band_frequencies(), vec![(0, 0)]);
                }
            }
            _ => unreachable!(),
        }

        ledger.debug_validate_invariants();
        assert_eq!(ledger.len(), live.len());
        assert!(ledger.band_count() <= ledger.len() + 1);

        idx += 2;
    }
});
