//! Reference-counted map keyed by source byte-address rather than a dense integer
//! index -- the shape the extract manager needs, since uncompressed buffers are
//! memoised by the compressed address they came from, not by a contiguous slot
//! number.
//!
//! Built on `std::collections::HashMap` instead of hand-rolled open addressing
//! sized to a probable prime: the standard map already amortises growth and
//! probing, and there is nothing about the address-keyed cache that benefits from
//! rolling our own.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

struct Slot<T: ?Sized> {
    payload: Arc<T>,
    refcount: usize,
}

struct Inner<T: ?Sized> {
    slots: HashMap<u64, Slot<T>>,
}

pub struct AddrRcMap<T: ?Sized> {
    inner: Mutex<Inner<T>>,
}

impl<T: ?Sized> AddrRcMap<T> {
    pub fn new() -> Self {
        Self { inner: Mutex::new(Inner { slots: HashMap::new() }) }
    }

    /// Install `data` at `address` with a starting refcount of 1, unless an entry is
    /// already present, in which case the existing payload wins (first-writer-wins)
    /// and `data` is simply dropped.
    pub fn set(&self, address: u64, data: Arc<T>) -> Arc<T> {
        let mut inner = self.inner.lock();
        if let Some(slot) = inner.slots.get_mut(&address) {
            slot.refcount += 1;
            return slot.payload.clone();
        }
        inner.slots.insert(address, Slot { payload: data.clone(), refcount: 1 });
        data
    }

    pub fn retain(&self, address: u64) -> Option<Arc<T>> {
        let mut inner = self.inner.lock();
        let slot = inner.slots.get_mut(&address)?;
        slot.refcount += 1;
        Some(slot.payload.clone())
    }

    pub fn get(&self, address: u64) -> Option<Arc<T>> {
        let inner = self.inner.lock();
        inner.slots.get(&address).map(|slot| slot.payload.clone())
    }

    pub fn release(&self, address: u64) {
        let mut inner = self.inner.lock();
        let Some(slot) = inner.slots.get_mut(&address) else {
            debug_assert!(false, "release of an address with no outstanding retains");
            return;
        };
        debug_assert!(slot.refcount > 0);
        if slot.refcount > 0 {
            slot.refcount -= 1;
        }
        if slot.refcount == 0 {
            inner.slots.remove(&address);
        }
    }

    pub fn refcount(&self, address: u64) -> usize {
        let inner = self.inner.lock();
        inner.slots.get(&address).map(|slot| slot.refcount).unwrap_or(0)
    }

    pub fn clear(&self) {
        self.inner.lock().slots.clear();
    }
}

impl<T: ?Sized> Default for AddrRcMap<T> {
    fn default() -> Self {
        Self::new()
    }
}
