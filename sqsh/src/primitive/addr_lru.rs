//! Address-keyed counterpart to [`Lru`](super::lru::Lru), pinning the K
//! most-recently-touched addresses of an [`AddrRcMap`](super::addr_rc_map::AddrRcMap).

use crate::primitive::addr_rc_map::AddrRcMap;

pub struct AddrLru {
    ring: Vec<Option<u64>>,
    cursor: usize,
}

impl AddrLru {
    pub fn new(size: usize) -> Self {
        Self { ring: vec![None; size], cursor: 0 }
    }

    pub fn touch<T: ?Sized>(&mut self, address: u64, map: &AddrRcMap<T>) {
        if self.ring.is_empty() {
            return;
        }

        let slot = &mut self.ring[self.cursor];
        self.cursor = (self.cursor + 1) % self.ring.len();

        if *slot == Some(address) {
            return;
        }

        let previous = std::mem::replace(slot, Some(address));
        if let Some(previous) = previous {
            map.release(previous);
        }
        map.retain(address);
    }

    pub fn drain<T: ?Sized>(&mut self, map: &AddrRcMap<T>) {
        for slot in self.ring.iter_mut() {
            if let Some(address) = slot.take() {
                map.release(address);
            }
        }
    }

    pub fn capacity(&self) -> usize {
        self.ring.len()
    }
}
