//! Source drivers: the polymorphic byte backend an archive is opened over.
//!
//! A [`Source`] exposes only `size()` and `map(offset, len)`; everything above this
//! layer -- the block mapper, extract managers, metablock reader -- is written against
//! that small capability set and never needs to know whether the bytes came from a
//! local file, an in-memory buffer, or an HTTP range request.

mod http;
mod mmap;

pub use http::HttpSource;
pub use mmap::MmapSource;

use std::sync::Arc;

use crate::error::{Result, SqshError};

/// A single owned byte range pulled from a [`Source`].
#[derive(Clone)]
pub struct Mapping(pub(crate) Arc<[u8]>);

impl Mapping {
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Capability set every source backend must provide.
pub trait SourceImpl: Send + Sync {
    fn size(&self) -> u64;
    fn map(&self, offset: u64, len: usize) -> Result<Mapping>;
    /// Natural mapping granularity for the block mapper's cache, absent an
    /// explicit `mapper_block_size` override. A local/memory backend is
    /// already resident, so it hints one giant block; HTTP hints a small
    /// range so opening an archive doesn't pull megabytes for a superblock read.
    fn block_size_hint(&self) -> u32;
}

/// A plain in-memory buffer, handed to `open` by the caller.
pub struct MemorySource {
    buf: Arc<[u8]>,
}

impl MemorySource {
    pub fn new(buf: Vec<u8>) -> Self {
        Self { buf: Arc::from(buf) }
    }
}

impl SourceImpl for MemorySource {
    fn size(&self) -> u64 {
        self.buf.len() as u64
    }

    fn map(&self, offset: u64, len: usize) -> Result<Mapping> {
        let start = offset as usize;
        let end = start.checked_add(len).ok_or(SqshError::IntegerOverflow)?;
        if end as u64 > self.size() {
            return Err(SqshError::OutOfBounds);
        }
        Ok(Mapping(Arc::from(&self.buf[start..end])))
    }

    fn block_size_hint(&self) -> u32 {
        // Already fully resident; one block covering the whole buffer means the
        // mapper's RcMap degenerates to (at most) a single cached slice.
        self.buf.len().try_into().unwrap_or(u32::MAX).max(4096)
    }
}

/// Tagged variant over the closed set of source backends.
///
/// Kept as a sum type rather than a trait object because the set of backends is
/// closed and known at compile time; `dyn SourceImpl` remains available for callers
/// who bring their own backend via [`Source::Custom`].
pub enum Source {
    Memory(MemorySource),
    Mmap(MmapSource),
    Http(HttpSource),
    Custom(Box<dyn SourceImpl>),
    /// Clips an inner source's reported size, e.g. when an archive is embedded
    /// as a prefix of a larger buffer (`source_size` in [`Config`]).
    Bounded(Box<Source>, u64),
}

impl Source {
    pub fn size(&self) -> u64 {
        match self {
            Source::Memory(s) => s.size(),
            Source::Mmap(s) => s.size(),
            Source::Http(s) => s.size(),
            Source::Custom(s) => s.size(),
            Source::Bounded(inner, bound) => inner.size().min(*bound),
        }
    }

    pub fn map(&self, offset: u64, len: usize) -> Result<Mapping> {
        match self {
            Source::Memory(s) => s.map(offset, len),
            Source::Mmap(s) => s.map(offset, len),
            Source::Http(s) => s.map(offset, len),
            Source::Custom(s) => s.map(offset, len),
            Source::Bounded(inner, bound) => {
                let end = offset.checked_add(len as u64).ok_or(SqshError::IntegerOverflow)?;
                if end > *bound {
                    return Err(SqshError::OutOfBounds);
                }
                inner.map(offset, len)
            }
        }
    }

    pub fn block_size_hint(&self) -> u32 {
        match self {
            Source::Memory(s) => s.block_size_hint(),
            Source::Mmap(s) => s.block_size_hint(),
            Source::Http(s) => s.block_size_hint(),
            Source::Custom(s) => s.block_size_hint(),
            Source::Bounded(inner, _) => inner.block_size_hint(),
        }
    }
}

/// A locator selects the source implementation by its prefix: `http://` or `https://`
/// pick the HTTP driver, an explicit in-memory buffer picks [`MemorySource`], and
/// anything else is treated as a local filesystem path opened via `mmap`.
pub enum Locator<'a> {
    Path(&'a std::path::Path),
    Url(&'a str),
    Buffer(Vec<u8>),
}

impl<'a> Locator<'a> {
    pub fn parse_str(s: &'a str) -> Locator<'a> {
        if s.starts_with("http://") || s.starts_with("https://") {
            Locator::Url(s)
        } else {
            Locator::Path(std::path::Path::new(s))
        }
    }
}

/// Configuration knobs from spec §6.
#[derive(Clone, Debug)]
pub struct Config {
    /// Overrides the size probe; required when opening a [`MemorySource`] without a
    /// concrete locator.
    pub source_size: Option<u64>,
    /// Overrides the source driver's block-size hint for the block mapper.
    pub mapper_block_size: Option<u32>,
    /// Blocks retained in the map manager's LRU.
    pub mapper_lru_size: usize,
    /// Uncompressed buffers retained per extract manager's LRU.
    pub compression_lru_size: usize,
    /// Limit for symlink chains followed while resolving a path.
    pub max_symlink_depth: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_size: None,
            mapper_block_size: None,
            mapper_lru_size: 32,
            compression_lru_size: 128,
            max_symlink_depth: 100,
        }
    }
}

pub fn open(locator: Locator<'_>, config: &Config) -> Result<Source> {
    let source = match locator {
        Locator::Url(url) => Source::Http(HttpSource::open(url)?),
        Locator::Path(path) => Source::Mmap(MmapSource::open(path)?),
        Locator::Buffer(buf) => Source::Memory(MemorySource::new(buf)),
    };
    // `source_size` is authoritative when given, e.g. to describe a short read-only
    // view into a larger buffer than the backend itself would report.
    Ok(match config.source_size {
        Some(bound) => Source::Bounded(Box::new(source), bound),
        None => source,
    })
}
