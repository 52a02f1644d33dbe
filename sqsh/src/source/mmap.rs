//! Local-file source driver, backed by a read-only memory map.
//!
//! Mapping a range is lock-free: `mmap` happens once at open time, and every
//! subsequent `map()` is plain user-space slice access, matching the "lock-free for
//! memory-mapped files" rule from the concurrency model.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use memmap2::Mmap;

use crate::error::{Result, SqshError};
use crate::source::{Mapping, SourceImpl};

pub struct MmapSource {
    mmap: Mmap,
}

impl MmapSource {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        // SAFETY: the archive is opened read-only for the lifetime of this handle;
        // the library never writes to the backing file and treats external
        // truncation/mutation as the caller's problem, same as every other mmap-backed
        // reader in this ecosystem.
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self { mmap })
    }
}

impl SourceImpl for MmapSource {
    fn size(&self) -> u64 {
        self.mmap.len() as u64
    }

    fn map(&self, offset: u64, len: usize) -> Result<Mapping> {
        let start = offset as usize;
        let end = start.checked_add(len).ok_or(SqshError::IntegerOverflow)?;
        if end as u64 > self.size() {
            return Err(SqshError::OutOfBounds);
        }
        Ok(Mapping(Arc::from(&self.mmap[start..end])))
    }

    fn block_size_hint(&self) -> u32 {
        // The whole file is already resident behind the mapping; a huge hint keeps
        // the map manager's cache from churning over a file that costs nothing to
        // "fetch" again.
        self.mmap.len().try_into().unwrap_or(u32::MAX).max(4096)
    }
}
