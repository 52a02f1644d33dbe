//! Two-level table lookup shared by the id, fragment, export, and xattr-id tables.
//!
//! Layout: a plain (uncompressed) array of 64-bit metablock addresses -- the *outer
//! table* -- stored directly in the archive at a superblock-given offset; each outer
//! entry points at a metablock holding up to `8192 / entry_size` fixed-size records.

use std::marker::PhantomData;
use std::sync::Arc;

use deku::prelude::*;

use crate::error::{Result, SqshError};
use crate::extract::ExtractManager;
use crate::mapper::map_reader::MapReader;
use crate::mapper::BlockMapper;
use crate::metablock::MetablockReader;

pub struct Table<T> {
    outer: Vec<u64>,
    entry_count: usize,
    entry_size: usize,
    entries_per_block: usize,
    mapper: Arc<BlockMapper>,
    extract: Arc<ExtractManager>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Table<T>
where
    for<'a> T: DekuReader<'a, ()>,
{
    /// Load the outer table. `source_size` bounds reads of the plain u64 array.
    pub fn load(
        mapper: Arc<BlockMapper>,
        extract: Arc<ExtractManager>,
        table_location: u64,
        entry_count: usize,
        entry_size: usize,
        source_size: u64,
    ) -> Result<Self> {
        let entries_per_block = 8192 / entry_size;
        let outer_len = entry_count.div_ceil(entries_per_block.max(1));

        let mut reader = MapReader::new(mapper.clone(), table_location, source_size);
        let mut outer = Vec::with_capacity(outer_len);
        for _ in 0..outer_len {
            reader.advance(0, 8)?;
            let bytes: [u8; 8] = reader.data().try_into().map_err(|_| SqshError::CorruptedInode)?;
            outer.push(u64::from_le_bytes(bytes));
        }

        Ok(Self { outer, entry_count, entry_size, entries_per_block, mapper, extract, _marker: PhantomData })
    }

    pub fn len(&self) -> usize {
        self.entry_count
    }

    pub fn is_empty(&self) -> bool {
        self.entry_count == 0
    }

    /// Fetch the `index`-th fixed-size entry, decoding it with [`DekuReader`].
    pub fn get(&self, index: usize) -> Result<T> {
        if index >= self.entry_count {
            return Err(SqshError::OutOfBounds);
        }
        let outer_index = index / self.entries_per_block;
        let inner_index = index % self.entries_per_block;

        let mut reader = MetablockReader::new(
            self.mapper.clone(),
            self.extract.clone(),
            self.outer[outer_index],
            u64::MAX,
        );
        reader.advance((inner_index * self.entry_size) as u64, self.entry_size)?;

        let mut cursor = deku::reader::Reader::new(std::io::Cursor::new(reader.data()));
        let value = T::from_reader_with_ctx(&mut cursor, ())?;
        Ok(value)
    }
}
