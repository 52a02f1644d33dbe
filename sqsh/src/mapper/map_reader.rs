//! Byte cursor over the block mapper.
//!
//! A single read either aliases one block directly (zero-copy) or, when it spans a
//! block boundary, copies the covered subranges into a scratch buffer. Either way the
//! reader releases whatever block handle it held before the previous `advance`.

use std::sync::Arc;

use crate::error::{Result, SqshError};
use crate::mapper::{BlockHandle, BlockMapper};

pub struct MapReader {
    mapper: Arc<BlockMapper>,
    start_addr: u64,
    end_addr: u64,
    upper_limit: u64,
    direct: Option<(BlockHandle, usize)>,
    scratch: Vec<u8>,
    using_scratch: bool,
}

impl MapReader {
    pub fn new(mapper: Arc<BlockMapper>, start_addr: u64, upper_limit: u64) -> Self {
        Self {
            mapper,
            start_addr,
            end_addr: start_addr,
            upper_limit,
            direct: None,
            scratch: Vec::new(),
            using_scratch: false,
        }
    }

    pub fn position(&self) -> u64 {
        self.start_addr
    }

    fn release_direct(&mut self) {
        if let Some((handle, _)) = self.direct.take() {
            self.mapper.release(handle);
        }
    }

    /// Move the cursor forward by `offset` bytes and expose the following `size`
    /// bytes, either as a zero-copy block alias or a freshly assembled scratch copy.
    pub fn advance(&mut self, offset: u64, size: usize) -> Result<()> {
        self.release_direct();
        self.using_scratch = false;

        let start = self.start_addr.checked_add(offset).ok_or(SqshError::IntegerOverflow)?;
        let end = start.checked_add(size as u64).ok_or(SqshError::IntegerOverflow)?;
        if end > self.upper_limit {
            return Err(SqshError::OutOfBounds);
        }

        self.start_addr = start;
        self.end_addr = end;

        if size == 0 {
            return Ok(());
        }

        let block_size = self.mapper.block_size() as u64;
        let start_block = (start / block_size) as usize;
        let last_block = ((end - 1) / block_size) as usize;

        if start_block == last_block {
            let handle = self.mapper.get(start_block, 1)?;
            let direct_offset = (start % block_size) as usize;
            self.direct = Some((handle, direct_offset));
        } else {
            self.scratch.clear();
            for block_index in start_block..=last_block {
                let handle = self.mapper.get(block_index, 1)?;
                let block_start = block_index as u64 * block_size;
                let lo = start.max(block_start) - block_start;
                let hi = end.min(block_start + handle.data.len() as u64) - block_start;
                if lo as usize > hi as usize || hi as usize > handle.data.len() {
                    self.mapper.release(handle);
                    return Err(SqshError::OutOfBounds);
                }
                self.scratch.extend_from_slice(&handle.data[lo as usize..hi as usize]);
                self.mapper.release(handle);
            }
            self.using_scratch = true;
        }

        Ok(())
    }

    pub fn data(&self) -> &[u8] {
        if self.using_scratch {
            &self.scratch
        } else if let Some((handle, offset)) = &self.direct {
            &handle.data[*offset..*offset + self.size()]
        } else {
            &[]
        }
    }

    pub fn size(&self) -> usize {
        (self.end_addr - self.start_addr) as usize
    }

    /// Bytes remaining until the next block boundary from the current start
    /// position; a heuristic the file iterator uses to batch zero-copy runs.
    pub fn remaining_direct(&self) -> usize {
        let block_size = self.mapper.block_size() as u64;
        (block_size - (self.start_addr % block_size)) as usize
    }
}

impl Drop for MapReader {
    fn drop(&mut self) {
        self.release_direct();
    }
}
