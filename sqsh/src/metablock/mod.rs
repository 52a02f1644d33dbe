//! Metablock stream: the 8 KiB individually-compressed chunk scheme backing every
//! SquashFS metadata table (inodes, directories, the id/fragment/export/xattr
//! tables). [`MetablockIterator`] walks the stream chunk by chunk; [`MetablockReader`]
//! sits on top and exposes ordinary random-access `advance(offset, size)` semantics
//! over the concatenation of decompressed chunks.

use std::sync::Arc;

use crate::error::{Result, SqshError};
use crate::extract::ExtractManager;
use crate::mapper::map_reader::MapReader;
use crate::mapper::BlockMapper;

const UNCOMPRESSED_FLAG: u16 = 0x8000;
const SIZE_MASK: u16 = 0x7fff;

/// Walks a metablock stream starting at `start_address`, yielding one decompressed
/// chunk (at most 8192 bytes) per call to [`next`](Self::next).
pub struct MetablockIterator {
    map_reader: MapReader,
    extract: Arc<ExtractManager>,
}

impl MetablockIterator {
    pub fn new(mapper: Arc<BlockMapper>, extract: Arc<ExtractManager>, start_address: u64, upper_limit: u64) -> Self {
        Self { map_reader: MapReader::new(mapper, start_address, upper_limit), extract }
    }

    /// Returns the next decompressed chunk, or `None` once the stream's upper limit
    /// has been reached.
    pub fn next(&mut self) -> Result<Option<Arc<[u8]>>> {
        let header_addr = self.map_reader.position();
        if self.map_reader.advance(0, 2).is_err() {
            return Ok(None);
        }
        let header = u16::from_le_bytes([self.map_reader.data()[0], self.map_reader.data()[1]]);
        let uncompressed = header & UNCOMPRESSED_FLAG != 0;
        let size = (header & SIZE_MASK) as usize;

        self.map_reader.advance(0, size)?;

        if uncompressed {
            Ok(Some(Arc::from(self.map_reader.data())))
        } else {
            let buf = self.extract.uncompress(header_addr, self.map_reader.data(), 8192)?;
            Ok(Some(buf))
        }
    }
}

struct LoadedChunk {
    logical_start: u64,
    data: Arc<[u8]>,
}

/// Random-access reader over a metablock stream. Every table lookup and every inode
/// or directory read is built on one of these.
pub struct MetablockReader {
    iter: MetablockIterator,
    logical_pos: u64,
    exhausted_at: Option<u64>,
    current: Option<LoadedChunk>,
    scratch: Vec<u8>,
}

impl MetablockReader {
    pub fn new(mapper: Arc<BlockMapper>, extract: Arc<ExtractManager>, start_address: u64, upper_limit: u64) -> Self {
        Self {
            iter: MetablockIterator::new(mapper, extract, start_address, upper_limit),
            logical_pos: 0,
            exhausted_at: None,
            current: None,
            scratch: Vec::new(),
        }
    }

    fn pull_next_chunk(&mut self) -> Result<bool> {
        let logical_start = self.current.as_ref().map(|c| c.logical_start + c.data.len() as u64).unwrap_or(0);
        match self.iter.next()? {
            Some(data) => {
                self.current = Some(LoadedChunk { logical_start, data });
                Ok(true)
            }
            None => {
                self.exhausted_at = Some(logical_start);
                Ok(false)
            }
        }
    }

    /// Skip `offset` bytes from the current position and expose the following
    /// `size` bytes, pulling additional chunks from the stream as needed.
    pub fn advance(&mut self, offset: u64, size: usize) -> Result<()> {
        let target_start = self.logical_pos.checked_add(offset).ok_or(SqshError::IntegerOverflow)?;
        let target_end = target_start.checked_add(size as u64).ok_or(SqshError::IntegerOverflow)?;
        self.logical_pos = target_end;

        if size == 0 {
            self.scratch.clear();
            return Ok(());
        }

        // advance the loaded window forward until it covers target_start
        loop {
            match &self.current {
                Some(chunk) if target_start < chunk.logical_start + chunk.data.len() as u64 => break,
                _ => {
                    if let Some(exhausted_at) = self.exhausted_at {
                        if target_start >= exhausted_at {
                            return Err(SqshError::OutOfBounds);
                        }
                    }
                    if !self.pull_next_chunk()? {
                        return Err(SqshError::OutOfBounds);
                    }
                }
            }
        }

        let chunk = self.current.as_ref().expect("loop only exits with a loaded chunk");
        let inner_start = (target_start - chunk.logical_start) as usize;

        self.scratch.clear();
        if target_end <= chunk.logical_start + chunk.data.len() as u64 {
            // fits entirely inside the chunk already loaded: one copy, no further pulls.
            self.scratch.extend_from_slice(&chunk.data[inner_start..inner_start + size]);
            return Ok(());
        }

        self.scratch.extend_from_slice(&chunk.data[inner_start..]);

        while (self.scratch.len() as u64) < target_end - target_start {
            if !self.pull_next_chunk()? {
                return Err(SqshError::OutOfBounds);
            }
            let chunk = self.current.as_ref().expect("just pulled");
            let need = (target_end - target_start) as usize - self.scratch.len();
            let take = need.min(chunk.data.len());
            self.scratch.extend_from_slice(&chunk.data[..take]);
        }

        Ok(())
    }

    pub fn data(&self) -> &[u8] {
        &self.scratch
    }

    pub fn position(&self) -> u64 {
        self.logical_pos
    }

    /// A `std::io::Read` view over the rest of the stream from the current
    /// position, for callers (like inode parsing) that don't know their record's
    /// length up front and need deku to pull bytes incrementally.
    pub fn as_read(&mut self) -> MetablockStream<'_> {
        MetablockStream { reader: self }
    }
}

/// See [`MetablockReader::as_read`].
pub struct MetablockStream<'a> {
    reader: &'a mut MetablockReader,
}

impl std::io::Read for MetablockStream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        match self.reader.advance(0, buf.len()) {
            Ok(()) => {
                buf.copy_from_slice(self.reader.data());
                Ok(buf.len())
            }
            Err(SqshError::OutOfBounds) => Ok(0),
            Err(e) => Err(std::io::Error::new(std::io::ErrorKind::Other, e)),
        }
    }
}
