//! Frequency ledger: ordered frequency bands for O(1) LFU promotion and eviction.
//!
//! The ledger stores values in frequency *bands*. Every value enters the
//! permanent frequency-0 band; each promotion moves it to the band whose
//! frequency is exactly one higher, creating that band right after the current
//! one if it does not exist yet. Eviction walks bands from the lowest
//! frequency upward.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │                       FrequencyLedger<T> Layout                          │
//! │                                                                          │
//! │  bands: SlotArena<Band>   (linked in ascending frequency order)          │
//! │                                                                          │
//! │    root                                                                  │
//! │     │                                                                    │
//! │     ▼                                                                    │
//! │  ┌────────┐ next ┌────────┐ next ┌────────┐                              │
//! │  │ freq 0 │ ───► │ freq 1 │ ───► │ freq 4 │ ───► None                    │
//! │  │ (perm) │ ◄─── │        │ ◄─── │        │                              │
//! │  └───┬────┘ prev └───┬────┘ prev └───┬────┘                              │
//! │      │ head/tail     │               │                                   │
//! │      ▼               ▼               ▼                                   │
//! │   [n7]◄─►[n2]      [n5]            [n1]◄─►[n3]                           │
//! │   newest  oldest                   newest  oldest (evicted first)        │
//! │                                                                          │
//! │  nodes: SlotArena<Node<T>>  (each node stores its band's SlotId)         │
//! └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nodes reference their band by [`SlotId`] rather than by pointer, so there
//! are no ownership cycles; the index is resolved against the band arena at
//! use time.
//!
//! ## Operations
//!
//! | Operation   | Time      | Notes                                         |
//! |-------------|-----------|-----------------------------------------------|
//! | `insert`    | O(1)      | Joins the frequency-0 band                    |
//! | `promote`   | O(1)      | Moves to `freq + 1`, splicing a band if absent |
//! | `remove`    | O(1)      | Detaches from its band                        |
//! | `pop_min`   | O(1)      | Oldest arrival in the lowest non-empty band   |
//! | `evict(n)`  | O(n)      | `n` repeated `pop_min` calls                  |
//! | `reset`     | O(n)      | Back to a single empty frequency-0 band       |
//!
//! ## Band lifecycle
//!
//! - The frequency-0 band always exists and is always first, even when empty.
//! - A non-zero band that becomes empty is unlinked and its slot recycled, so
//!   the walk to the lowest non-empty band never passes more than one empty
//!   band (the root).
//! - Within a band, members are ordered by arrival: the member that entered
//!   the band earliest is evicted first. A promotion counts as an arrival in
//!   the destination band.
//!
//! ## Example
//!
//! ```
//! use lfukit::ds::FrequencyLedger;
//!
//! let mut ledger = FrequencyLedger::new();
//! let a = ledger.insert("a");
//! let _b = ledger.insert("b");
//!
//! assert_eq!(ledger.promote(a), Some(1));
//! assert_eq!(ledger.band_frequencies(), vec![(0, 1), (1, 1)]);
//!
//! // "b" never left frequency 0, so it goes first.
//! assert_eq!(ledger.pop_min(), Some(("b", 0)));
//! assert_eq!(ledger.pop_min(), Some(("a", 1)));
//! assert_eq!(ledger.pop_min(), None);
//! ```

use crate::ds::slot_arena::{SlotArena, SlotId};
use crate::error::InvariantError;

/// Link fields first; they are touched on every promotion.
#[derive(Debug)]
#[repr(C)]
struct Node<T> {
    /// Neighbour towards the band head (newer arrival).
    prev: Option<SlotId>,
    /// Neighbour towards the band tail (older arrival).
    next: Option<SlotId>,
    band: SlotId,
    value: T,
}

#[derive(Debug)]
struct Band {
    freq: u64,
    head: Option<SlotId>,
    tail: Option<SlotId>,
    len: usize,
    prev: Option<SlotId>,
    next: Option<SlotId>,
}

impl Band {
    fn new(freq: u64, prev: Option<SlotId>, next: Option<SlotId>) -> Self {
        Self {
            freq,
            head: None,
            tail: None,
            len: 0,
            prev,
            next,
        }
    }
}

/// Ordered frequency bands holding values of type `T`.
///
/// Values are addressed by the [`SlotId`] returned from
/// [`insert`](Self::insert); the handle stays valid across promotions until
/// the value is removed, popped, or the ledger is reset.
#[derive(Debug)]
pub struct FrequencyLedger<T> {
    nodes: SlotArena<Node<T>>,
    bands: SlotArena<Band>,
    root: SlotId,
}

impl<T> FrequencyLedger<T> {
    /// Creates an empty ledger holding only the frequency-0 band.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty ledger with room for `capacity` values.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut bands = SlotArena::new();
        let root = bands.insert(Band::new(0, None, None));
        Self {
            nodes: SlotArena::with_capacity(capacity),
            bands,
            root,
        }
    }

    /// Number of values across all bands.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of linked bands, including the frequency-0 band.
    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    /// Adds `value` to the frequency-0 band as its newest member.
    pub fn insert(&mut self, value: T) -> SlotId {
        let id = self.nodes.insert(Node {
            prev: None,
            next: None,
            band: self.root,
            value,
        });
        self.push_front(self.root, id);
        id
    }

    #[inline]
    pub fn get(&self, id: SlotId) -> Option<&T> {
        self.nodes.get(id).map(|node| &node.value)
    }

    #[inline]
    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        self.nodes.get_mut(id).map(|node| &mut node.value)
    }

    /// Current frequency of `id`, or `None` for a stale handle.
    pub fn frequency(&self, id: SlotId) -> Option<u64> {
        let band = self.nodes.get(id)?.band;
        self.bands.get(band).map(|band| band.freq)
    }

    /// Moves `id` to the band for `frequency + 1` and returns the new frequency.
    ///
    /// The destination band is reused when it directly follows the current
    /// one, otherwise a new band is spliced in right after the current band.
    /// At `u64::MAX` the value stays put and becomes the band's newest member.
    pub fn promote(&mut self, id: SlotId) -> Option<u64> {
        let current = self.nodes.get(id)?.band;
        let (freq, following) = {
            let band = self.bands.get(current)?;
            (band.freq, band.next)
        };

        if freq == u64::MAX {
            self.unlink_node(current, id);
            self.push_front(current, id);
            return Some(freq);
        }

        let next_freq = freq + 1;
        let target = match following {
            Some(next) if self.bands.get(next).is_some_and(|band| band.freq == next_freq) => next,
            _ => self.splice_band_after(current, next_freq),
        };

        self.unlink_node(current, id);
        self.push_front(target, id);
        self.release_if_empty(current);
        Some(next_freq)
    }

    /// Detaches `id` from its band and returns its value.
    pub fn remove(&mut self, id: SlotId) -> Option<T> {
        let band = self.nodes.get(id)?.band;
        self.unlink_node(band, id);
        self.release_if_empty(band);
        self.nodes.remove(id).map(|node| node.value)
    }

    /// The next eviction candidate: `(handle, value, frequency)`.
    pub fn peek_min(&self) -> Option<(SlotId, &T, u64)> {
        let band = self.bands.get(self.min_band()?)?;
        let id = band.tail?;
        self.nodes.get(id).map(|node| (id, &node.value, band.freq))
    }

    /// Removes and returns the oldest member of the lowest non-empty band.
    pub fn pop_min(&mut self) -> Option<(T, u64)> {
        let (id, freq) = {
            let band = self.bands.get(self.min_band()?)?;
            (band.tail?, band.freq)
        };
        self.remove(id).map(|value| (value, freq))
    }

    /// Pops up to `count` values in eviction order, handing each to `on_evict`.
    ///
    /// Stops early when the ledger runs dry. Returns how many were removed.
    pub fn evict<F>(&mut self, count: usize, mut on_evict: F) -> usize
    where
        F: FnMut(T, u64),
    {
        let mut evicted = 0;
        while evicted < count {
            let Some((value, freq)) = self.pop_min() else {
                break;
            };
            on_evict(value, freq);
            evicted += 1;
        }
        evicted
    }

    /// Drops every value and band, leaving a single empty frequency-0 band.
    pub fn reset(&mut self) {
        self.nodes.clear();
        self.bands.clear();
        self.root = self.bands.insert(Band::new(0, None, None));
    }

    /// All values in slot order (not eviction order).
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &T)> {
        self.nodes.iter().map(|(id, node)| (id, &node.value))
    }

    /// `(frequency, member count)` for every band, ascending.
    pub fn band_frequencies(&self) -> Vec<(u64, usize)> {
        let mut out = Vec::with_capacity(self.bands.len());
        let mut cursor = Some(self.root);
        while let Some(band) = cursor.and_then(|id| self.bands.get(id)) {
            out.push((band.freq, band.len));
            cursor = band.next;
        }
        out
    }

    /// Members of the band at `freq` in eviction order (oldest arrival first).
    ///
    /// Yields nothing when no such band exists.
    pub fn iter_band(&self, freq: u64) -> BandIter<'_, T> {
        let mut cursor = Some(self.root);
        while let Some(band) = cursor.and_then(|id| self.bands.get(id)) {
            if band.freq == freq {
                return BandIter {
                    nodes: &self.nodes,
                    cursor: band.tail,
                };
            }
            if band.freq > freq {
                break;
            }
            cursor = band.next;
        }
        BandIter {
            nodes: &self.nodes,
            cursor: None,
        }
    }

    /// Verifies band ordering, list links and node/band membership.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let root = self
            .bands
            .get(self.root)
            .ok_or_else(|| InvariantError::new("frequency-0 band missing"))?;
        if root.freq != 0 || root.prev.is_some() {
            return Err(InvariantError::new("root band is not the first frequency-0 band"));
        }

        let mut cursor = Some(self.root);
        let mut prev_band: Option<SlotId> = None;
        let mut prev_freq: Option<u64> = None;
        let mut bands_seen = 0usize;
        let mut members_seen = 0usize;

        while let Some(band_id) = cursor {
            let band = self
                .bands
                .get(band_id)
                .ok_or_else(|| InvariantError::new("band link points at a vacant slot"))?;
            if band.prev != prev_band {
                return Err(InvariantError::new(format!(
                    "band {} has a broken prev link",
                    band.freq
                )));
            }
            if prev_freq.is_some_and(|p| p >= band.freq) {
                return Err(InvariantError::new(format!(
                    "band frequencies not strictly increasing at {}",
                    band.freq
                )));
            }
            if band_id != self.root && band.len == 0 {
                return Err(InvariantError::new(format!(
                    "empty band {} left linked",
                    band.freq
                )));
            }

            let mut node_cursor = band.head;
            let mut last = None;
            let mut count = 0usize;
            while let Some(id) = node_cursor {
                let node = self
                    .nodes
                    .get(id)
                    .ok_or_else(|| InvariantError::new("band member missing from arena"))?;
                if node.band != band_id {
                    return Err(InvariantError::new(format!(
                        "node in band {} carries a different band handle",
                        band.freq
                    )));
                }
                if node.prev != last {
                    return Err(InvariantError::new("member list has a broken prev link"));
                }
                last = Some(id);
                node_cursor = node.next;
                count += 1;
            }
            if band.tail != last || band.len != count {
                return Err(InvariantError::new(format!(
                    "band {} length/tail mismatch",
                    band.freq
                )));
            }

            members_seen += count;
            bands_seen += 1;
            prev_band = Some(band_id);
            prev_freq = Some(band.freq);
            cursor = band.next;
        }

        if bands_seen != self.bands.len() {
            return Err(InvariantError::new("unlinked band left in arena"));
        }
        if members_seen != self.nodes.len() {
            return Err(InvariantError::new("node not reachable from any band"));
        }
        Ok(())
    }

    /// Panics with the violated invariant. Debug and test builds only.
    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        if let Err(err) = self.check_invariants() {
            panic!("frequency ledger invariant violated: {err}");
        }
    }

    fn min_band(&self) -> Option<SlotId> {
        let mut cursor = Some(self.root);
        while let Some(id) = cursor {
            let band = self.bands.get(id)?;
            if band.len > 0 {
                return Some(id);
            }
            cursor = band.next;
        }
        None
    }

    fn splice_band_after(&mut self, after: SlotId, freq: u64) -> SlotId {
        let next = self.bands.get(after).and_then(|band| band.next);
        let id = self.bands.insert(Band::new(freq, Some(after), next));
        if let Some(band) = self.bands.get_mut(after) {
            band.next = Some(id);
        }
        if let Some(next) = next
            && let Some(band) = self.bands.get_mut(next)
        {
            band.prev = Some(id);
        }
        id
    }

    fn release_if_empty(&mut self, band_id: SlotId) {
        if band_id == self.root {
            return;
        }
        let (prev, next) = match self.bands.get(band_id) {
            Some(band) if band.len == 0 => (band.prev, band.next),
            _ => return,
        };
        if let Some(prev) = prev
            && let Some(band) = self.bands.get_mut(prev)
        {
            band.next = next;
        }
        if let Some(next) = next
            && let Some(band) = self.bands.get_mut(next)
        {
            band.prev = prev;
        }
        self.bands.remove(band_id);
    }

    fn push_front(&mut self, band_id: SlotId, id: SlotId) {
        let Some(band) = self.bands.get_mut(band_id) else {
            return;
        };
        let old_head = band.head.replace(id);
        if old_head.is_none() {
            band.tail = Some(id);
        }
        band.len += 1;

        if let Some(node) = self.nodes.get_mut(id) {
            node.prev = None;
            node.next = old_head;
            node.band = band_id;
        }
        if let Some(old) = old_head
            && let Some(node) = self.nodes.get_mut(old)
        {
            node.prev = Some(id);
        }
    }

    fn unlink_node(&mut self, band_id: SlotId, id: SlotId) {
        let Some((prev, next)) = self.nodes.get(id).map(|node| (node.prev, node.next)) else {
            return;
        };
        let Some(band) = self.bands.get_mut(band_id) else {
            return;
        };

        match prev {
            Some(prev) => {
                if let Some(node) = self.nodes.get_mut(prev) {
                    node.next = next;
                }
            },
            None => band.head = next,
        }
        match next {
            Some(next) => {
                if let Some(node) = self.nodes.get_mut(next) {
                    node.prev = prev;
                }
            },
            None => band.tail = prev,
        }
        band.len -= 1;

        if let Some(node) = self.nodes.get_mut(id) {
            node.prev = None;
            node.next = None;
        }
    }
}

impl<T> Default for FrequencyLedger<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over one band's members, oldest arrival first.
#[derive(Debug)]
pub struct BandIter<'a, T> {
    nodes: &'a SlotArena<Node<T>>,
    cursor: Option<SlotId>,
}

impl<'a, T> Iterator for BandIter<'a, T> {
    type Item = (SlotId, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let node = self.nodes.get(id)?;
        self.cursor = node.prev;
        Some((id, &node.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn members<T: Copy>(ledger: &FrequencyLedger<T>, freq: u64) -> Vec<T> {
        ledger.iter_band(freq).map(|(_, v)| *v).collect()
    }

    #[test]
    fn new_ledger_has_single_empty_root_band() {
        let ledger: FrequencyLedger<u32> = FrequencyLedger::new();
        assert!(ledger.is_empty());
        assert_eq!(ledger.band_frequencies(), vec![(0, 0)]);
        assert_eq!(ledger.peek_min(), None);
        ledger.check_invariants().unwrap();
    }

    #[test]
    fn insert_lands_in_frequency_zero() {
        let mut ledger = FrequencyLedger::new();
        let a = ledger.insert('a');
        assert_eq!(ledger.frequency(a), Some(0));
        assert_eq!(ledger.band_frequencies(), vec![(0, 1)]);
    }

    #[test]
    fn promote_creates_next_band_once() {
        let mut ledger = FrequencyLedger::new();
        let a = ledger.insert('a');
        let b = ledger.insert('b');

        assert_eq!(ledger.promote(a), Some(1));
        assert_eq!(ledger.band_frequencies(), vec![(0, 1), (1, 1)]);

        // Second promotion into freq 1 reuses the band.
        assert_eq!(ledger.promote(b), Some(1));
        assert_eq!(ledger.band_frequencies(), vec![(0, 0), (1, 2)]);
        assert_eq!(ledger.band_count(), 2);
        ledger.check_invariants().unwrap();
    }

    #[test]
    fn promote_splices_between_non_adjacent_bands() {
        let mut ledger = FrequencyLedger::new();
        let hot = ledger.insert("hot");
        let warm = ledger.insert("warm");
        for _ in 0..3 {
            ledger.promote(hot);
        }
        assert_eq!(ledger.band_frequencies(), vec![(0, 1), (3, 1)]);

        // warm goes 0 -> 1, and band 1 must sit between 0 and 3.
        assert_eq!(ledger.promote(warm), Some(1));
        assert_eq!(ledger.band_frequencies(), vec![(0, 0), (1, 1), (3, 1)]);
        ledger.check_invariants().unwrap();
    }

    #[test]
    fn emptied_nonzero_band_is_released() {
        let mut ledger = FrequencyLedger::new();
        let a = ledger.insert(1);
        ledger.promote(a);
        ledger.promote(a);
        ledger.promote(a);
        assert_eq!(ledger.band_frequencies(), vec![(0, 0), (3, 1)]);
        assert_eq!(ledger.band_count(), 2);
        ledger.check_invariants().unwrap();
    }

    #[test]
    fn root_band_survives_becoming_empty() {
        let mut ledger = FrequencyLedger::new();
        let a = ledger.insert(1);
        assert_eq!(ledger.remove(a), Some(1));
        assert_eq!(ledger.band_frequencies(), vec![(0, 0)]);
        ledger.check_invariants().unwrap();
    }

    #[test]
    fn pop_min_prefers_lowest_band_then_oldest_arrival() {
        let mut ledger = FrequencyLedger::new();
        let a = ledger.insert('a');
        let _b = ledger.insert('b');
        let _c = ledger.insert('c');
        let d = ledger.insert('d');
        ledger.promote(a);
        ledger.promote(d);

        assert_eq!(members(&ledger, 0), vec!['b', 'c']);
        assert_eq!(members(&ledger, 1), vec!['a', 'd']);

        assert_eq!(ledger.pop_min(), Some(('b', 0)));
        assert_eq!(ledger.pop_min(), Some(('c', 0)));
        assert_eq!(ledger.pop_min(), Some(('a', 1)));
        assert_eq!(ledger.pop_min(), Some(('d', 1)));
        assert_eq!(ledger.pop_min(), None);
        assert_eq!(ledger.band_frequencies(), vec![(0, 0)]);
    }

    #[test]
    fn promotion_counts_as_new_arrival() {
        let mut ledger = FrequencyLedger::new();
        let a = ledger.insert('a');
        let b = ledger.insert('b');
        ledger.promote(b);
        ledger.promote(a);
        // b reached band 1 first, so it is older there.
        assert_eq!(members(&ledger, 1), vec!['b', 'a']);
    }

    #[test]
    fn evict_stops_at_count_or_empty() {
        let mut ledger = FrequencyLedger::new();
        for i in 0..5 {
            ledger.insert(i);
        }
        let mut seen = Vec::new();
        assert_eq!(ledger.evict(2, |v, f| seen.push((v, f))), 2);
        assert_eq!(seen, vec![(0, 0), (1, 0)]);

        assert_eq!(ledger.evict(10, |_, _| {}), 3);
        assert!(ledger.is_empty());
        assert_eq!(ledger.evict(1, |_, _| {}), 0);
    }

    #[test]
    fn evict_walks_upward_across_bands() {
        let mut ledger = FrequencyLedger::new();
        let a = ledger.insert("a");
        let b = ledger.insert("b");
        let _c = ledger.insert("c");
        ledger.promote(a);
        ledger.promote(a);
        ledger.promote(b);

        let mut order = Vec::new();
        ledger.evict(3, |v, f| order.push((v, f)));
        assert_eq!(order, vec![("c", 0), ("b", 1), ("a", 2)]);
    }

    #[test]
    fn remove_from_middle_keeps_links() {
        let mut ledger = FrequencyLedger::new();
        let _a = ledger.insert('a');
        let b = ledger.insert('b');
        let _c = ledger.insert('c');
        assert_eq!(ledger.remove(b), Some('b'));
        assert_eq!(members(&ledger, 0), vec!['a', 'c']);
        assert_eq!(ledger.remove(b), None);
        ledger.check_invariants().unwrap();
    }

    #[test]
    fn frequency_saturates_at_max() {
        let mut ledger = FrequencyLedger::new();
        let a = ledger.insert('a');
        // Jump straight to the top band without 2^64 promotions.
        let top = ledger.splice_band_after(ledger.root, u64::MAX);
        ledger.unlink_node(ledger.root, a);
        ledger.push_front(top, a);

        assert_eq!(ledger.promote(a), Some(u64::MAX));
        assert_eq!(ledger.frequency(a), Some(u64::MAX));
        ledger.check_invariants().unwrap();
    }

    #[test]
    fn reset_restores_initial_shape() {
        let mut ledger = FrequencyLedger::new();
        let a = ledger.insert(1);
        ledger.insert(2);
        ledger.promote(a);
        ledger.reset();
        assert!(ledger.is_empty());
        assert_eq!(ledger.band_frequencies(), vec![(0, 0)]);
        ledger.check_invariants().unwrap();

        let b = ledger.insert(3);
        assert_eq!(ledger.frequency(b), Some(0));
    }

    #[test]
    fn peek_min_matches_pop_min() {
        let mut ledger = FrequencyLedger::new();
        let x = ledger.insert("x");
        ledger.insert("y");
        ledger.promote(x);
        let (id, value, freq) = ledger.peek_min().unwrap();
        assert_eq!((*value, freq), ("y", 0));
        assert_eq!(ledger.get(id), Some(&"y"));
        assert_eq!(ledger.pop_min(), Some(("y", 0)));
    }

    #[test]
    fn iter_band_for_missing_frequency_is_empty() {
        let mut ledger = FrequencyLedger::new();
        ledger.insert(1);
        assert_eq!(ledger.iter_band(7).count(), 0);
    }
}
