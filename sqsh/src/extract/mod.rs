//! Extract manager: memoises uncompressed buffers behind an address-keyed
//! [`AddrRcMap`] + [`AddrLru`].
//!
//! Two instances exist per archive: one for the metablock compression used by every
//! metadata table, one for datablock compression used by file contents. Both speak
//! the same [`Compressor`] in SquashFS 4.0 but see very different access patterns,
//! hence separate caches with independently configurable sizes.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::compressor::{to_buffer, Compressor};
use crate::error::Result;
use crate::primitive::addr_lru::AddrLru;
use crate::primitive::addr_rc_map::AddrRcMap;

pub struct ExtractManager {
    compressor: Compressor,
    cache: AddrRcMap<[u8]>,
    lru: Mutex<AddrLru>,
}

impl ExtractManager {
    pub fn new(compressor: Compressor, lru_size: usize) -> Self {
        Self { compressor, cache: AddrRcMap::new(), lru: Mutex::new(AddrLru::new(lru_size)) }
    }

    pub fn compressor(&self) -> Compressor {
        self.compressor
    }

    /// Return the decompressed bytes for the compressed slice `input`, which was
    /// read from source address `address`. A cache hit skips decompression entirely;
    /// a miss runs the extractor and installs the result under `address` (subject to
    /// first-writer-wins if another caller raced us to the same address).
    pub fn uncompress(&self, address: u64, input: &[u8], size_hint: usize) -> Result<Arc<[u8]>> {
        if let Some(hit) = self.cache.retain(address) {
            self.lru.lock().touch(address, &self.cache);
            return Ok(hit);
        }

        let mut out = Vec::with_capacity(size_hint);
        to_buffer(self.compressor, input, &mut out)?;
        let buf: Arc<[u8]> = self.cache.set(address, Arc::from(out.into_boxed_slice()));
        self.lru.lock().touch(address, &self.cache);
        Ok(buf)
    }

    pub fn release(&self, address: u64) {
        self.cache.release(address);
    }

    pub fn close(&self) {
        self.lru.lock().drain(&self.cache);
        self.cache.clear();
    }
}
