#![no_main]

use std::sync::Arc;
use std::time::Duration;

use libfuzzer_sys::fuzz_target;
use lfukit::clock::ManualClock;
use lfukit::policy::lfu::LfuCore;

// Fuzz arbitrary operation sequences on LfuCore
//
// First byte picks the capacity; the rest is (op, key) pairs covering set,
// set with ttl, get, remove, evict, purge and clock advances.
fuzz_target!(|data: &[u8]| {
    let Some((&cap, ops)) = data.split_first() else {
        return;
    };
    let capacity = usize::from(cap % 16) + 1;
    let clock = ManualClock::new();
    let mut core: LfuCore<u8, u8> = LfuCore::new(capacity).with_clock(Arc::new(clock.clone()));

    for pair in ops.chunks_exact(2) {
        let (op, key) = (pair[0] % 8, pair[1] % 32);
        match op {
            0 | 1 => {
                let was_resident = core.keys(false).contains(&key);
                core.set(key, op);
                // an overwrite keeps the old expiration, so only a fresh key must be live
                assert_eq!(core.get_all(false).get(&key), Some(&op));
                if !was_resident {
                    assert!(core.contains(&key));
                }
            }
            2 => {
                core.set_with_ttl(key, op, Duration::from_millis(u64::from(pair[1])));
            }
            3 | 4 => {
                let before = core.frequency(&key);
                if core.get(&key).is_some() {
                    assert_eq!(core.frequency(&key), before.map(|f| f + 1));
                }
            }
            5 => {
                core.remove(&key);
                assert!(!core.contains(&key));
            }
            6 => {
                core.evict(usize::from(key % 3));
            }
            7 => {
                if key == 0 {
                    core.purge();
                } else {
                    clock.advance(Duration::from_millis(u64::from(key)));
                }
            }
            _ => unreachable!(),
        }

        assert!(core.len(false) <= capacity);
        core.debug_validate_invariants();
    }
});
