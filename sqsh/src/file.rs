//! Regular file content: a [`FileIterator`] walks a file's data blocks and
//! shared fragment tail one chunk at a time, batching adjacent stored-uncompressed
//! blocks and reconstructing sparse holes as zero-filled runs; [`FileReader`]
//! adapts that chunk stream to [`std::io::Read`] for ordinary sequential
//! consumption.

use std::io;
use std::sync::Arc;

use crate::compressor::DataSize;
use crate::error::{Result, SqshError};
use crate::extract::ExtractManager;
use crate::fragment::Fragment;
use crate::inode::NO_FRAGMENT;
use crate::mapper::map_reader::MapReader;
use crate::mapper::BlockMapper;
use crate::table::Table;

/// Largest single run of reconstructed zero bytes yielded for a sparse hole;
/// larger holes are split across multiple `next()` calls.
const ZERO_BLOCK_SIZE: u64 = 16384;

/// Walks a regular file's content block by block, in on-disk order: every entry
/// in its block-size table, then its fragment tail if it has one.
pub struct FileIterator {
    mapper: Arc<BlockMapper>,
    extract: Arc<ExtractManager>,
    fragment_table: Option<Arc<Table<Fragment>>>,
    map_reader: MapReader,
    block_sizes: Vec<DataSize>,
    block_size: u32,
    block_index: usize,
    sparse_size: u64,
    has_fragment: bool,
    frag_index: u32,
    frag_block_offset: u32,
    file_size: u64,
    fragment_done: bool,
}

impl FileIterator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        mapper: Arc<BlockMapper>,
        extract: Arc<ExtractManager>,
        fragment_table: Option<Arc<Table<Fragment>>>,
        upper_limit: u64,
        blocks_start: u64,
        block_sizes: Vec<DataSize>,
        block_size: u32,
        frag_index: u32,
        frag_block_offset: u32,
        file_size: u64,
    ) -> Self {
        Self {
            map_reader: MapReader::new(mapper.clone(), blocks_start, upper_limit),
            mapper,
            extract,
            fragment_table,
            block_sizes,
            block_size,
            block_index: 0,
            sparse_size: 0,
            has_fragment: frag_index != NO_FRAGMENT,
            frag_index,
            frag_block_offset,
            file_size,
            fragment_done: false,
        }
    }

    /// Returns the next chunk of file content, or `None` once the file is
    /// exhausted. `desired_size` is a batching hint for runs of adjacent
    /// stored-uncompressed blocks; it is never honored for compressed blocks,
    /// whose natural unit is one whole block.
    pub fn next(&mut self, desired_size: usize) -> Result<Option<Arc<[u8]>>> {
        let desired_size = desired_size.max(1);

        if self.fragment_done {
            return Ok(None);
        }
        if self.sparse_size > 0 {
            return Ok(Some(self.zero_block()));
        }
        if self.block_index < self.block_sizes.len() {
            return self.map_block(desired_size);
        }
        if self.has_fragment {
            return self.map_fragment();
        }
        Ok(None)
    }

    fn zero_block(&mut self) -> Arc<[u8]> {
        let size = if self.file_size == 0 {
            0
        } else if self.sparse_size > 0 {
            let take = ZERO_BLOCK_SIZE.min(self.sparse_size);
            self.sparse_size -= take;
            take
        } else if self.has_fragment || self.block_index + 1 != self.block_sizes.len() {
            self.block_size as u64
        } else {
            let rem = self.file_size % self.block_size as u64;
            if rem == 0 {
                self.block_size as u64
            } else {
                rem
            }
        };
        Arc::from(vec![0u8; size as usize])
    }

    fn map_block(&mut self, desired_size: usize) -> Result<Option<Arc<[u8]>>> {
        let ds = self.block_sizes[self.block_index];
        if ds.is_sparse() {
            let data = self.zero_block();
            self.block_index += 1;
            Ok(Some(data))
        } else if ds.is_uncompressed() {
            self.map_block_uncompressed(desired_size)
        } else {
            self.map_block_compressed()
        }
    }

    fn map_block_compressed(&mut self) -> Result<Option<Arc<[u8]>>> {
        let idx = self.block_index;
        let ds = self.block_sizes[idx];
        let next_offset = self.map_reader.size() as u64;
        self.map_reader.advance(next_offset, ds.size() as usize)?;

        let address = self.map_reader.position();
        let buf = self.extract.uncompress(address, self.map_reader.data(), self.block_size as usize)?;

        self.block_index = idx.checked_add(1).ok_or(SqshError::IntegerOverflow)?;
        Ok(Some(buf))
    }

    /// Batches a run of adjacent stored-uncompressed blocks into one read, up to
    /// `desired_size` bytes or the next block-mapper boundary, whichever comes
    /// first. A block shorter than the nominal block size implies a sparse pad
    /// afterward unless it's the file's last block.
    fn map_block_uncompressed(&mut self, desired_size: usize) -> Result<Option<Arc<[u8]>>> {
        let next_offset = self.map_reader.size() as u64;
        let remaining_direct = self.map_reader.remaining_direct() as u64;
        let block_count = self.block_sizes.len();

        let mut outer_size: u64 = 0;
        let mut idx = self.block_index;

        while self.sparse_size == 0 && idx < block_count {
            let ds = self.block_sizes[idx];
            if !ds.is_uncompressed() || ds.is_sparse() {
                break;
            }
            if outer_size >= desired_size as u64 {
                break;
            }

            let data_block_size = ds.size() as u64;
            if idx + 1 != block_count {
                self.sparse_size =
                    (self.block_size as u64).checked_sub(data_block_size).ok_or(SqshError::CorruptedInode)?;
            }

            let new_outer = outer_size.checked_add(data_block_size).ok_or(SqshError::IntegerOverflow)?;
            if new_outer > remaining_direct && outer_size > 0 {
                break;
            }
            outer_size = new_outer;
            idx += 1;
        }

        self.map_reader.advance(next_offset, outer_size as usize)?;
        self.block_index = idx;
        Ok(Some(Arc::from(self.map_reader.data())))
    }

    /// Coarsely advances the iterator forward by whole data blocks so that the
    /// block containing `*offset` becomes current, decrementing `*offset` down to
    /// its residual within that block, then yields the next chunk the way `next`
    /// would. Skipped blocks are never decompressed: a skipped compressed block is
    /// passed over by advancing the map reader alone. Meant to be called before any
    /// `next()` has run (i.e. while `sparse_size == 0`); [`FileReader`] is the only
    /// caller.
    pub fn skip(&mut self, offset: &mut u64, desired_size: usize) -> Result<Option<Arc<[u8]>>> {
        while *offset >= self.block_size as u64 && self.block_index < self.block_sizes.len() {
            let ds = self.block_sizes[self.block_index];
            if !ds.is_sparse() {
                let next_offset = self.map_reader.size() as u64;
                self.map_reader.advance(next_offset, ds.size() as usize)?;
            }
            self.block_index += 1;
            *offset -= self.block_size as u64;
        }
        self.next(desired_size)
    }

    fn map_fragment(&mut self) -> Result<Option<Arc<[u8]>>> {
        let table = self.fragment_table.as_ref().ok_or(SqshError::NoFragmentTable)?;
        let frag = table.get(self.frag_index as usize)?;

        let mut reader = MapReader::new(self.mapper.clone(), frag.start, u64::MAX);
        reader.advance(0, frag.size.size() as usize)?;

        let block_bytes = if frag.size.is_uncompressed() {
            Arc::from(reader.data())
        } else {
            self.extract.uncompress(frag.start, reader.data(), self.block_size as usize)?
        };

        let tail_len = {
            let rem = self.file_size % self.block_size as u64;
            if rem == 0 {
                self.block_size as u64
            } else {
                rem
            }
        };

        let start = self.frag_block_offset as usize;
        let end = start.checked_add(tail_len as usize).ok_or(SqshError::IntegerOverflow)?;
        if end > block_bytes.len() {
            return Err(SqshError::OutOfBounds);
        }

        self.fragment_done = true;
        Ok(Some(Arc::from(&block_bytes[start..end])))
    }
}

/// Random-access reader over a [`FileIterator`]'s chunk stream, plus a plain
/// [`io::Read`] impl for ordinary sequential consumption on top of it.
///
/// `advance(offset, size)` moves the window forward by `offset` bytes from the
/// *start* of the previously returned window (mirroring [`crate::mapper::map_reader::MapReader::advance`]:
/// sequential callers pass `offset == size` of the previous read to keep
/// moving forward) and exposes the following `size` bytes -- zero-copy when
/// they fall entirely within one iterator yield, gathered into a scratch
/// buffer otherwise. The iterator only runs forward, so `offset` may not move
/// the window before the start of the chunk currently held.
pub struct FileReader {
    iterator: FileIterator,
    chunk: Arc<[u8]>,
    chunk_start: u64,
    /// Start/end of the most recently produced window -- the basis `advance`'s
    /// next `offset` is relative to, and the cursor a subsequent sequential
    /// `read` resumes from.
    window_start: u64,
    window_end: u64,
    scratch: Vec<u8>,
}

impl FileReader {
    pub fn new(iterator: FileIterator) -> Self {
        Self {
            iterator,
            chunk: Arc::from(Vec::new().into_boxed_slice()),
            chunk_start: 0,
            window_start: 0,
            window_end: 0,
            scratch: Vec::new(),
        }
    }

    fn chunk_end(&self) -> u64 {
        self.chunk_start + self.chunk.len() as u64
    }

    /// Pulls the iterator's next chunk, appending it after the one currently held.
    /// Returns `false` once the iterator is exhausted.
    fn pull_next(&mut self, desired_size: usize) -> Result<bool> {
        let start = self.chunk_end();
        match self.iterator.next(desired_size)? {
            Some(chunk) => {
                self.chunk_start = start;
                self.chunk = chunk;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Random-access read of `size` bytes starting `offset` bytes after the start
    /// of the window returned by the previous call (`0` initially). Fails with
    /// `OutOfBounds` if the file ends before `size` bytes are available, or if
    /// `offset` would move the window backward past already-discarded content.
    pub fn advance(&mut self, offset: u64, size: usize) -> Result<&[u8]> {
        let target = self.window_start.checked_add(offset).ok_or(SqshError::IntegerOverflow)?;
        let end = target.checked_add(size as u64).ok_or(SqshError::IntegerOverflow)?;
        if target < self.chunk_start {
            return Err(SqshError::OutOfBounds);
        }

        self.window_start = target;
        self.window_end = end;

        if size == 0 {
            self.scratch.clear();
            return Ok(&self.scratch);
        }

        while target >= self.chunk_end() {
            if !self.pull_next(size)? {
                return Err(SqshError::OutOfBounds);
            }
        }

        let start_in_chunk = (target - self.chunk_start) as usize;
        if start_in_chunk + size <= self.chunk.len() {
            return Ok(&self.chunk[start_in_chunk..start_in_chunk + size]);
        }

        self.scratch.clear();
        self.scratch.extend_from_slice(&self.chunk[start_in_chunk..]);
        while self.scratch.len() < size {
            let need = size - self.scratch.len();
            if !self.pull_next(need)? {
                return Err(SqshError::OutOfBounds);
            }
            let take = need.min(self.chunk.len());
            self.scratch.extend_from_slice(&self.chunk[..take]);
        }
        Ok(&self.scratch[..size])
    }
}

impl io::Read for FileReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        if self.window_end >= self.chunk_end() {
            if !self.pull_next(buf.len()).map_err(|e| io::Error::new(io::ErrorKind::Other, e))? {
                return Ok(0);
            }
        }

        let offset_in_chunk = (self.window_end - self.chunk_start) as usize;
        let n = buf.len().min(self.chunk.len() - offset_in_chunk);
        buf[..n].copy_from_slice(&self.chunk[offset_in_chunk..offset_in_chunk + n]);
        self.window_start = self.window_end;
        self.window_end += n as u64;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compressor::Compressor;
    use crate::source::{MemorySource, Source};
    use std::io::Read;

    fn setup(data: Vec<u8>, block_size: u32) -> (Arc<BlockMapper>, Arc<ExtractManager>, u64) {
        let len = data.len() as u64;
        let source = Arc::new(Source::Memory(MemorySource::new(data)));
        let mapper = Arc::new(BlockMapper::new(source, block_size.max(8192), 8));
        let extract = Arc::new(ExtractManager::new(Compressor::Gzip, 8));
        (mapper, extract, len)
    }

    #[test]
    fn reads_two_uncompressed_blocks() {
        let block_size = 4u32;
        let data = vec![1, 2, 3, 4, 5, 6, 7, 8];
        let (mapper, extract, len) = setup(data, block_size);

        let ds_flag = 1u32 << 24;
        let block_sizes = vec![DataSize::new(ds_flag | 4), DataSize::new(ds_flag | 4)];

        let it = FileIterator::new(mapper, extract, None, len, 0, block_sizes, block_size, NO_FRAGMENT, 0, 8);

        let mut reader = FileReader::new(it);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn sparse_block_yields_zeros() {
        let block_size = 4u32;
        let data = vec![9, 9, 9, 9];
        let (mapper, extract, len) = setup(data, block_size);

        let ds_flag = 1u32 << 24;
        let block_sizes = vec![DataSize::new(0), DataSize::new(ds_flag | 4)];

        let mut it = FileIterator::new(mapper, extract, None, len, 0, block_sizes, block_size, NO_FRAGMENT, 0, 8);

        let first = it.next(4096).unwrap().unwrap();
        assert_eq!(&*first, &[0, 0, 0, 0]);
        let second = it.next(4096).unwrap().unwrap();
        assert_eq!(&*second, &[9, 9, 9, 9]);
        assert!(it.next(4096).unwrap().is_none());
    }

    #[test]
    fn skip_jumps_past_whole_blocks_without_decompressing_them() {
        let block_size = 4u32;
        let data = vec![1, 2, 3, 4, 5, 6, 7, 8];
        let (mapper, extract, len) = setup(data, block_size);

        let ds_flag = 1u32 << 24;
        let block_sizes = vec![DataSize::new(ds_flag | 4), DataSize::new(ds_flag | 4)];
        let mut it = FileIterator::new(mapper, extract, None, len, 0, block_sizes, block_size, NO_FRAGMENT, 0, 8);

        let mut residual = 4u64;
        let chunk = it.skip(&mut residual, 4096).unwrap().unwrap();
        assert_eq!(residual, 0);
        assert_eq!(&*chunk, &[5, 6, 7, 8]);
    }

    #[test]
    fn random_access_advance_reads_whole_file_in_one_window() {
        let block_size = 4u32;
        let data = vec![1, 2, 3, 4, 5, 6, 7, 8];
        let (mapper, extract, len) = setup(data, block_size);

        let ds_flag = 1u32 << 24;
        let block_sizes = vec![DataSize::new(ds_flag | 4), DataSize::new(ds_flag | 4)];
        let it = FileIterator::new(mapper, extract, None, len, 0, block_sizes, block_size, NO_FRAGMENT, 0, 8);

        let mut reader = FileReader::new(it);
        let out = reader.advance(0, 8).unwrap();
        assert_eq!(out, &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn random_access_advance_can_be_chained_sequentially() {
        let block_size = 4u32;
        let data = vec![1, 2, 3, 4, 5, 6, 7, 8];
        let (mapper, extract, len) = setup(data, block_size);

        let ds_flag = 1u32 << 24;
        let block_sizes = vec![DataSize::new(ds_flag | 4), DataSize::new(ds_flag | 4)];
        let it = FileIterator::new(mapper, extract, None, len, 0, block_sizes, block_size, NO_FRAGMENT, 0, 8);

        let mut reader = FileReader::new(it);
        let first = reader.advance(0, 3).unwrap().to_vec();
        assert_eq!(first, vec![1, 2, 3]);
        let second = reader.advance(3, 5).unwrap().to_vec();
        assert_eq!(second, vec![4, 5, 6, 7, 8]);
    }

    #[test]
    fn random_access_advance_past_eof_is_out_of_bounds() {
        let block_size = 4u32;
        let data = vec![1, 2, 3, 4, 5, 6, 7, 8];
        let (mapper, extract, len) = setup(data, block_size);

        let ds_flag = 1u32 << 24;
        let block_sizes = vec![DataSize::new(ds_flag | 4), DataSize::new(ds_flag | 4)];
        let it = FileIterator::new(mapper, extract, None, len, 0, block_sizes, block_size, NO_FRAGMENT, 0, 8);

        let mut reader = FileReader::new(it);
        assert!(matches!(reader.advance(0, 9), Err(SqshError::OutOfBounds)));
    }
}
