//! Least-recently-used ring pinning the K most-recently-touched indices of an
//! [`RcMap`](super::rc_map::RcMap).
//!
//! The ring holds one extra retain on each index it currently pins; `touch` rotates
//! the write cursor and swaps out whichever index used to occupy that slot.

use crate::primitive::rc_map::RcMap;

const EMPTY: usize = usize::MAX;

pub struct Lru {
    ring: Vec<usize>,
    cursor: usize,
}

impl Lru {
    /// `size == 0` is a valid, permanent no-op: no admission, no retention.
    pub fn new(size: usize) -> Self {
        Self { ring: vec![EMPTY; size], cursor: 0 }
    }

    /// Mark `index` as most-recently-used, retaining it in `map` and releasing
    /// whatever index it evicts from the ring.
    pub fn touch<T: ?Sized>(&mut self, index: usize, map: &RcMap<T>) {
        if self.ring.is_empty() {
            return;
        }

        let slot = &mut self.ring[self.cursor];
        self.cursor = (self.cursor + 1) % self.ring.len();

        if *slot == index {
            // already the most recent occupant of this ring slot, no churn.
            return;
        }

        let previous = std::mem::replace(slot, index);
        if previous != EMPTY {
            map.release_index(previous);
        }
        // `touch` admits a *new* pin; the caller is assumed to already hold its own
        // retain on `index` (from the `get`/`set` that produced it), so the LRU takes
        // a second one here for its own bookkeeping.
        map.retain(index);
    }

    /// Release every index currently pinned by the ring, e.g. on `close`.
    pub fn drain<T: ?Sized>(&mut self, map: &RcMap<T>) {
        for slot in self.ring.iter_mut() {
            if *slot != EMPTY {
                map.release_index(*slot);
                *slot = EMPTY;
            }
        }
    }

    pub fn capacity(&self) -> usize {
        self.ring.len()
    }
}
