//! HTTP byte-range source driver.
//!
//! One blocking request per `map()` call, serialized behind an internal mutex (`ureq`'s
//! agent is not `Sync` across concurrent in-flight requests on the same connection
//! pool slot). The archive's `Last-Modified` is fixed on the first request and every
//! later response is checked against it; once a mismatch is seen the source latches
//! into a permanently failing state, since the bytes already cached elsewhere in the
//! archive can no longer be trusted to describe the same file.

use std::io::Read;

use parking_lot::Mutex;

use crate::error::{Result, SqshError};
use crate::source::{Mapping, SourceImpl};

struct Inner {
    agent: ureq::Agent,
    total_size: Option<u64>,
    expected_mtime: Option<String>,
    tripped: bool,
}

pub struct HttpSource {
    url: String,
    inner: Mutex<Inner>,
    /// The first requested slice (typically the superblock) is cached so that
    /// opening an archive never issues the same range request twice.
    first_slice: Mutex<Option<(u64, usize, Mapping)>>,
}

impl HttpSource {
    pub fn open(url: &str) -> Result<Self> {
        Ok(Self {
            url: url.to_string(),
            inner: Mutex::new(Inner {
                agent: ureq::AgentBuilder::new().build(),
                total_size: None,
                expected_mtime: None,
                tripped: false,
            }),
            first_slice: Mutex::new(None),
        })
    }

    fn fetch(&self, offset: u64, len: usize) -> Result<Mapping> {
        let mut inner = self.inner.lock();
        if inner.tripped {
            return Err(SqshError::MapperMap);
        }

        let end = offset.checked_add(len as u64).ok_or(SqshError::IntegerOverflow)?;
        let range = format!("bytes={}-{}", offset, end.saturating_sub(1));

        let response = inner
            .agent
            .get(&self.url)
            .set("Range", &range)
            .call()
            .map_err(|_| SqshError::MapperMap)?;

        if response.status() != 206 {
            return Err(SqshError::MapperMap);
        }

        let content_range =
            response.header("Content-Range").ok_or(SqshError::CurlInvalidRangeHeader)?;
        let total = content_range
            .rsplit('/')
            .next()
            .and_then(|t| t.parse::<u64>().ok())
            .ok_or(SqshError::CurlInvalidRangeHeader)?;

        match inner.total_size {
            None => inner.total_size = Some(total),
            Some(known) if known != total => return Err(SqshError::MapperMap),
            _ => {}
        }

        let mtime = response.header("Last-Modified").map(str::to_string);
        match (&inner.expected_mtime, &mtime) {
            (None, Some(m)) => inner.expected_mtime = Some(m.clone()),
            (Some(expected), Some(m)) if expected != m => {
                inner.tripped = true;
                return Err(SqshError::MapperMap);
            }
            _ => {}
        }

        let mut buf = Vec::with_capacity(len);
        response
            .into_reader()
            .take(len as u64)
            .read_to_end(&mut buf)
            .map_err(|_| SqshError::MapperMap)?;

        if buf.len() != len {
            return Err(SqshError::MapperMap);
        }

        Ok(Mapping(std::sync::Arc::from(buf)))
    }
}

impl SourceImpl for HttpSource {
    fn size(&self) -> u64 {
        if let Some(size) = self.inner.lock().total_size {
            return size;
        }
        // Probe with a minimal range request; also warms `first_slice`.
        self.map(0, 1).ok();
        self.inner.lock().total_size.unwrap_or(0)
    }

    fn map(&self, offset: u64, len: usize) -> Result<Mapping> {
        let mut first_slice = self.first_slice.lock();
        if let Some((cached_offset, cached_len, mapping)) = first_slice.as_ref() {
            if *cached_offset == offset && *cached_len == len {
                return Ok(mapping.clone());
            }
        }

        let mapping = self.fetch(offset, len)?;
        if first_slice.is_none() {
            *first_slice = Some((offset, len, mapping.clone()));
        }
        Ok(mapping)
    }

    fn block_size_hint(&self) -> u32 {
        // Small: every map() call is a network round trip, so opening an archive
        // should only pull the superblock's worth of bytes, not a whole block.
        4096
    }
}
