//! Block mapper: caches fixed-size blocks from a [`Source`] behind an
//! [`RcMap`](crate::primitive::rc_map::RcMap) + [`Lru`](crate::primitive::lru::Lru).

pub mod map_reader;

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Result, SqshError};
use crate::primitive::lru::Lru;
use crate::primitive::rc_map::RcMap;
use crate::source::Source;

/// A single block of the archive, mapped from the source driver.
pub type Block = Arc<[u8]>;

/// A retained block, released on `Drop`... except we can't easily hand back a
/// self-releasing guard without entangling the mapper's lifetime, so callers
/// explicitly pair `get`/`release` the way every other cache in this library does.
pub struct BlockHandle {
    pub index: usize,
    pub data: Block,
}

pub struct BlockMapper {
    source: Arc<Source>,
    block_size: u32,
    blocks: RcMap<[u8]>,
    lru: Mutex<Lru>,
}

impl BlockMapper {
    pub fn new(source: Arc<Source>, block_size: u32, lru_size: usize) -> Self {
        let size = source.size();
        let block_count = size.div_ceil(block_size as u64).max(1) as usize;
        Self {
            source,
            block_size,
            blocks: RcMap::new(block_count),
            lru: Mutex::new(Lru::new(lru_size)),
        }
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    pub fn block_count(&self) -> usize {
        self.blocks.size()
    }

    fn block_len_at(&self, index: usize) -> usize {
        let start = index as u64 * self.block_size as u64;
        let remaining = self.source.size().saturating_sub(start);
        remaining.min(self.block_size as u64) as usize
    }

    /// Retain the block at `index`, fetching and caching it from the source on a
    /// miss. `span` lets a caller that knows it will sequentially touch `span`
    /// contiguous blocks seed alias links in one call (used by the map reader when
    /// it pre-fetches a multi-block run).
    pub fn get(&self, index: usize, span: usize) -> Result<BlockHandle> {
        if index >= self.blocks.size() {
            return Err(SqshError::OutOfBounds);
        }

        let data = if let Some((_, data)) = self.blocks.retain(index) {
            data
        } else {
            let offset = index as u64 * self.block_size as u64;
            let len = self.block_len_at(index);
            let mapping = self.source.map(offset, len).map_err(|_| SqshError::MapperMap)?;
            let block: Block = Arc::from(mapping.as_slice());
            self.blocks.set(index, block, span)
        };

        self.lru.lock().touch(index, &self.blocks);
        Ok(BlockHandle { index, data })
    }

    pub fn release(&self, handle: BlockHandle) {
        self.blocks.release_index(handle.index);
    }

    pub fn close(&self) {
        self.lru.lock().drain(&self.blocks);
        self.blocks.clear();
    }
}
