//! Maps an inode number to the packed inode reference needed to load it.
//!
//! When the archive carries an export table, that table already performs this
//! mapping and is used directly. Otherwise entries are filled in lazily as tree
//! traversal discovers them, backed by a flat array of atomics so concurrent
//! readers never need to take a lock to populate or consult it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{Result, SqshError};
use crate::export::Export;
use crate::table::Table;

/// Sentinel meaning "not yet discovered"; inode reference 0 is never a valid
/// location since the inode table always starts past the superblock.
const UNSET: u64 = 0;

pub enum InodeMap {
    ExportTable(Arc<Table<Export>>),
    Local(Vec<AtomicU64>),
}

impl InodeMap {
    pub fn from_export_table(table: Arc<Table<Export>>) -> Self {
        Self::ExportTable(table)
    }

    pub fn new_local(inode_count: u32) -> Self {
        Self::Local((0..inode_count).map(|_| AtomicU64::new(UNSET)).collect())
    }

    /// Returns the inode reference for `inode_number`, or `0` if it hasn't been
    /// recorded yet (process-local mode) -- callers must discover it via tree
    /// traversal before it can be loaded directly.
    pub fn get(&self, inode_number: u32) -> Result<u64> {
        if inode_number == 0 {
            return Ok(UNSET);
        }
        match self {
            InodeMap::ExportTable(table) => Ok(table.get((inode_number - 1) as usize)?.num),
            InodeMap::Local(refs) => {
                let slot = refs.get((inode_number - 1) as usize).ok_or(SqshError::OutOfBounds)?;
                Ok(slot.load(Ordering::Acquire))
            }
        }
    }

    /// Records the reference for `inode_number`, discovered while walking a
    /// directory. A no-op when backed by an export table, which is already
    /// complete and read-only.
    pub fn set(&self, inode_number: u32, inode_ref: u64) -> Result<()> {
        if inode_number == 0 {
            return Ok(());
        }
        match self {
            InodeMap::ExportTable(_) => Ok(()),
            InodeMap::Local(refs) => {
                let slot = refs.get((inode_number - 1) as usize).ok_or(SqshError::OutOfBounds)?;
                slot.store(inode_ref, Ordering::Release);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_map_roundtrips() {
        let map = InodeMap::new_local(4);
        assert_eq!(map.get(1).unwrap(), 0);
        map.set(1, 0x1234).unwrap();
        assert_eq!(map.get(1).unwrap(), 0x1234);
    }

    #[test]
    fn inode_number_zero_is_always_unset() {
        let map = InodeMap::new_local(4);
        map.set(0, 0xffff).unwrap();
        assert_eq!(map.get(0).unwrap(), 0);
    }
}
