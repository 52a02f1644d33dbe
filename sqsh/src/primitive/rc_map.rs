//! Reference-counted, fixed-size indexed pool.
//!
//! This is the primitive every cache in the library (the block mapper, both extract
//! managers) is built from: a `Vec` of slots, each holding an optional payload, a
//! refcount, and an optional alias link. Slots store the `Arc<T>` callers hand in
//! directly -- this is what lets the LRU ring address slots by plain integer index
//! instead of chasing pointers, and what avoids wrapping an already-shared payload
//! (such as the block mapper's `Arc<[u8]>`) in a second layer of `Arc`.

use std::sync::Arc;

use parking_lot::Mutex;

struct Slot<T: ?Sized> {
    payload: Option<Arc<T>>,
    refcount: usize,
    /// `Some(k)` with `k < own index` means "forward retains to slot k instead".
    /// Only honored by `retain`, never by `set`.
    alias_of: Option<usize>,
}

impl<T: ?Sized> Slot<T> {
    fn empty() -> Self {
        Self { payload: None, refcount: 0, alias_of: None }
    }
}

struct Inner<T: ?Sized> {
    slots: Vec<Slot<T>>,
}

/// A fixed-size, mutex-protected, reference-counted map from integer index to payload.
pub struct RcMap<T: ?Sized> {
    inner: Mutex<Inner<T>>,
}

impl<T: ?Sized> RcMap<T> {
    pub fn new(size: usize) -> Self {
        let mut slots = Vec::with_capacity(size);
        slots.resize_with(size, Slot::empty);
        Self { inner: Mutex::new(Inner { slots }) }
    }

    pub fn size(&self) -> usize {
        self.inner.lock().slots.len()
    }

    pub fn is_empty(&self, index: usize) -> bool {
        let inner = self.inner.lock();
        inner.slots[index].refcount == 0
    }

    /// Install `data` at `index` with a starting refcount of 1 and return it retained.
    ///
    /// If the slot is already occupied, `data` is dropped and the existing payload
    /// wins (first-writer-wins) -- this is what lets two racing extract calls for the
    /// same address both run their decompression but only the first install survives.
    ///
    /// `span > 1` marks the following `span - 1` slots (if currently empty) as
    /// aliases of `index`, so that a later `retain` on any of them is redirected here.
    pub fn set(&self, index: usize, data: Arc<T>, span: usize) -> Arc<T> {
        let mut inner = self.inner.lock();
        if inner.slots[index].refcount > 0 {
            // first-writer-wins: drop `data`, return the existing payload retained.
            inner.slots[index].refcount += 1;
            return inner.slots[index].payload.clone().expect("occupied slot has a payload");
        }

        inner.slots[index] = Slot { payload: Some(data.clone()), refcount: 1, alias_of: None };

        for offset in 1..span {
            let alias_index = index + offset;
            if alias_index >= inner.slots.len() {
                break;
            }
            if inner.slots[alias_index].refcount == 0 {
                inner.slots[alias_index].alias_of = Some(index);
            }
        }

        data
    }

    /// Retain the slot at `index`, following an alias chain if one exists, and
    /// return the resolved index together with its payload.
    pub fn retain(&self, index: usize) -> Option<(usize, Arc<T>)> {
        let mut inner = self.inner.lock();
        let resolved = Self::resolve_alias(&inner, index);
        let slot = &mut inner.slots[resolved];
        let payload = slot.payload.clone()?;
        slot.refcount += 1;
        Some((resolved, payload))
    }

    /// Look up a slot without changing its refcount.
    pub fn get(&self, index: usize) -> Option<Arc<T>> {
        let inner = self.inner.lock();
        let resolved = Self::resolve_alias(&inner, index);
        inner.slots[resolved].payload.clone()
    }

    fn resolve_alias(inner: &Inner<T>, index: usize) -> usize {
        let mut i = index;
        while let Some(target) = inner.slots[i].alias_of {
            i = target;
        }
        i
    }

    /// Release one reference on the (already-resolved) slot at `index`. When the
    /// refcount reaches zero the payload is dropped.
    pub fn release_index(&self, index: usize) {
        let mut inner = self.inner.lock();
        let resolved = Self::resolve_alias(&inner, index);
        let slot = &mut inner.slots[resolved];
        debug_assert!(slot.refcount > 0, "release of a slot with no outstanding retains");
        if slot.refcount > 0 {
            slot.refcount -= 1;
        }
        if slot.refcount == 0 {
            slot.payload = None;
        }
    }

    pub fn refcount(&self, index: usize) -> usize {
        let inner = self.inner.lock();
        let resolved = Self::resolve_alias(&inner, index);
        inner.slots[resolved].refcount
    }

    /// Drop every payload, regardless of outstanding refcount. Used by `close`.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        for slot in inner.slots.iter_mut() {
            *slot = Slot::empty();
        }
    }
}
