//! Directory table: a linear run of entries per directory, grouped under 12-byte
//! fragment headers that each cover at most 256 entries, plus the sorted index
//! embedded in an extended directory inode that lets [`DirectoryIterator::lookup`]
//! skip past fragment headers it can prove don't contain the name being searched for.

use std::sync::Arc;

use deku::prelude::*;

use crate::error::{Result, SqshError};
use crate::extract::ExtractManager;
use crate::inode::{DirectoryIndexEntry, FileType, InodeId, InodeRef};
use crate::mapper::BlockMapper;
use crate::metablock::MetablockReader;

const ENTRY_HEADER_SIZE: u64 = 8;
const FRAGMENT_HEADER_SIZE: u64 = 12;

#[derive(Debug, Copy, Clone, DekuRead)]
#[deku(endian = "little")]
struct FragmentHeader {
    #[deku(assert = "*count <= 256")]
    count: u32,
    start: u32,
    inode_num: u32,
}

#[derive(Debug, Clone, DekuRead)]
#[deku(endian = "little")]
struct EntryRecord {
    offset: u16,
    inode_offset: i16,
    t: InodeId,
    name_size: u16,
    #[deku(count = "*name_size as u32 + 1")]
    name: Vec<u8>,
}

/// One yielded directory entry: enough to either load its inode or recurse without
/// re-reading the directory table.
#[derive(Debug, Clone)]
pub struct DirectoryEntryView {
    pub inode_ref: InodeRef,
    pub inode_number: u32,
    pub file_type: FileType,
    pub name: Vec<u8>,
}

/// Walks a directory's entry list in on-disk order.
pub struct DirectoryIterator {
    mapper: Arc<BlockMapper>,
    extract: Arc<ExtractManager>,
    directory_table_start: u64,
    upper_limit: u64,
    metablock: MetablockReader,
    remaining_size: u64,
    remaining_entries: u32,
    next_offset: u64,
    start_base: u32,
    inode_base: u32,
    dir_index: Vec<DirectoryIndexEntry>,
}

impl DirectoryIterator {
    /// `outer_offset`/`inner_offset` are the directory's location as stored in its
    /// inode; `file_size` is the inode's reported directory size, which counts 3
    /// bytes more than the entries actually occupy (an artifact of the on-disk
    /// format carried over unchanged).
    pub fn new(
        mapper: Arc<BlockMapper>,
        extract: Arc<ExtractManager>,
        directory_table_start: u64,
        upper_limit: u64,
        outer_offset: u32,
        inner_offset: u16,
        file_size: u64,
        dir_index: Vec<DirectoryIndexEntry>,
    ) -> Result<Self> {
        let start_address =
            directory_table_start.checked_add(outer_offset as u64).ok_or(SqshError::IntegerOverflow)?;
        let remaining_size = file_size.checked_sub(3).ok_or(SqshError::CorruptedDirectoryEntry)?;
        Ok(Self {
            metablock: MetablockReader::new(mapper.clone(), extract.clone(), start_address, upper_limit),
            mapper,
            extract,
            directory_table_start,
            upper_limit,
            remaining_size,
            remaining_entries: 0,
            next_offset: inner_offset as u64,
            start_base: 0,
            inode_base: 0,
            dir_index,
        })
    }

    fn process_fragment(&mut self) -> Result<()> {
        self.metablock.advance(self.next_offset, FRAGMENT_HEADER_SIZE as usize)?;
        let mut cursor = deku::reader::Reader::new(std::io::Cursor::new(self.metablock.data()));
        let header = FragmentHeader::from_reader_with_ctx(&mut cursor, ())?;

        self.remaining_entries = header.count.checked_add(1).ok_or(SqshError::IntegerOverflow)?;
        self.start_base = header.start;
        self.inode_base = header.inode_num;
        self.next_offset = FRAGMENT_HEADER_SIZE;
        self.remaining_size =
            self.remaining_size.checked_sub(FRAGMENT_HEADER_SIZE).ok_or(SqshError::IntegerOverflow)?;
        Ok(())
    }

    /// Returns the next entry, or `None` once the directory is exhausted.
    pub fn next(&mut self) -> Result<Option<DirectoryEntryView>> {
        if self.remaining_size == 0 {
            return Ok(None);
        }
        if self.remaining_entries == 0 {
            self.process_fragment()?;
        }
        self.remaining_entries -= 1;

        let mut size = ENTRY_HEADER_SIZE;
        self.metablock.advance(self.next_offset, size as usize)?;
        let name_size = u16::from_le_bytes([self.metablock.data()[6], self.metablock.data()[7]]) as u64;
        size = size.checked_add(name_size + 1).ok_or(SqshError::IntegerOverflow)?;
        self.metablock.advance(0, size as usize)?;

        let mut cursor = deku::reader::Reader::new(std::io::Cursor::new(self.metablock.data()));
        let entry = EntryRecord::from_reader_with_ctx(&mut cursor, ())?;

        if entry.name.is_empty() || entry.name.contains(&b'/') || entry.name.contains(&0u8) {
            return Err(SqshError::CorruptedDirectoryEntry);
        }

        let inode_ref = InodeRef::new(self.start_base as u64, entry.offset);
        let inode_number = self.inode_base.wrapping_add(entry.inode_offset as i32 as u32);

        self.next_offset = size;
        self.remaining_size = self.remaining_size.checked_sub(size).ok_or(SqshError::IntegerOverflow)?;

        Ok(Some(DirectoryEntryView {
            inode_ref,
            inode_number,
            file_type: entry.t.into_base_type().into(),
            name: entry.name,
        }))
    }

    /// Finds the entry named `name`, skipping past fragment headers the directory
    /// index can prove come strictly before it.
    ///
    /// Entries in the index are sorted by name, so the first pass walks the index
    /// comparing full names (not a length-truncated prefix) and remembers the last
    /// fragment header whose first name sorts at or before `name`; that header is
    /// where the linear scan resumes instead of the very start of the directory.
    pub fn lookup(&mut self, name: &[u8]) -> Result<DirectoryEntryView> {
        let mut seek_to: Option<u32> = None;
        for entry in &self.dir_index {
            if entry.name.as_slice() > name {
                break;
            }
            seek_to = Some(entry.start);
        }

        if let Some(start) = seek_to {
            let addr =
                self.directory_table_start.checked_add(start as u64).ok_or(SqshError::IntegerOverflow)?;
            self.metablock =
                MetablockReader::new(self.mapper.clone(), self.extract.clone(), addr, self.upper_limit);
            self.next_offset = 0;
            self.remaining_entries = 0;
        }

        while let Some(entry) = self.next()? {
            if entry.name == name {
                return Ok(entry);
            }
        }
        Err(SqshError::NoSuchFile)
    }
}
