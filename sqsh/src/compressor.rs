//! Streaming decompression contract and the closed set of supported algorithms.
//!
//! Every metablock and every data block in a SquashFS image is an independently
//! compressed unit: there is never a dictionary or window carried across blocks.
//! That lets every [`Extractor`] implementation below accumulate `write()`ed bytes
//! into a scratch buffer and do the actual decompression once, in `finish()` --
//! which is both simpler than juggling six different incremental decoder APIs and
//! exactly what the one-shot nature of a SquashFS block requires.

use deku::prelude::*;

use crate::error::{Result, SqshError};

/// Compressor id, as stored in the superblock. Closed set: SquashFS 4.0 defines no others.
#[derive(Copy, Clone, Debug, PartialEq, Eq, DekuRead)]
#[deku(endian = "endian", ctx = "endian: deku::ctx::Endian")]
#[deku(id_type = "u16")]
pub enum Compressor {
    None = 0,
    Gzip = 1,
    Lzma = 2,
    Lzo = 3,
    Xz = 4,
    Lz4 = 5,
    Zstd = 6,
}

/// A data- or fragment-block size as stored in a block table entry: the low 24 bits
/// are the on-disk size, bit 24 flags the block as stored uncompressed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, DekuRead)]
#[deku(endian = "little")]
pub struct DataSize(u32);

const DATA_STORED_UNCOMPRESSED: u32 = 1 << 24;

impl DataSize {
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub fn size(&self) -> u32 {
        self.0 & !DATA_STORED_UNCOMPRESSED
    }

    pub fn is_uncompressed(&self) -> bool {
        self.0 & DATA_STORED_UNCOMPRESSED != 0
    }

    /// A data size of zero bytes marks the block as a sparse hole.
    pub fn is_sparse(&self) -> bool {
        self.size() == 0
    }
}

/// Streaming decompressor context: `init` fixes the output capacity, each `write`
/// advances the context with another slice of compressed input (input chunk
/// boundaries are arbitrary and must be tolerated), `finish` yields the final
/// uncompressed size written into the caller's buffer.
pub trait Extractor {
    fn init(&mut self, out_capacity: usize);
    fn write(&mut self, input: &[u8]);
    fn finish(&mut self, out: &mut Vec<u8>) -> Result<usize>;
}

#[derive(Default)]
struct BufferedInput {
    input: Vec<u8>,
}

impl BufferedInput {
    fn init(&mut self) {
        self.input.clear();
    }

    fn write(&mut self, input: &[u8]) {
        self.input.extend_from_slice(input);
    }
}

macro_rules! buffered_extractor {
    ($name:ident) => {
        #[derive(Default)]
        pub struct $name {
            buf: BufferedInput,
        }

        impl $name {
            pub fn new() -> Self {
                Self::default()
            }
        }
    };
}

buffered_extractor!(GzipExtractor);
buffered_extractor!(XzExtractor);
buffered_extractor!(LzmaExtractor);
buffered_extractor!(Lz4Extractor);
buffered_extractor!(LzoExtractor);
buffered_extractor!(ZstdExtractor);

impl Extractor for GzipExtractor {
    fn init(&mut self, out_capacity: usize) {
        self.buf.init();
        let _ = out_capacity;
    }

    fn write(&mut self, input: &[u8]) {
        self.buf.write(input)
    }

    #[cfg(feature = "gzip")]
    fn finish(&mut self, out: &mut Vec<u8>) -> Result<usize> {
        use std::io::Read;
        let mut decoder = flate2::read::ZlibDecoder::new(self.buf.input.as_slice());
        let start = out.len();
        decoder.read_to_end(out).map_err(|_| SqshError::CompressionDecompress)?;
        Ok(out.len() - start)
    }

    #[cfg(not(feature = "gzip"))]
    fn finish(&mut self, _out: &mut Vec<u8>) -> Result<usize> {
        Err(SqshError::CompressionUnsupported(Compressor::Gzip))
    }
}

impl Extractor for XzExtractor {
    fn init(&mut self, out_capacity: usize) {
        self.buf.init();
        let _ = out_capacity;
    }

    fn write(&mut self, input: &[u8]) {
        self.buf.write(input)
    }

    #[cfg(feature = "xz")]
    fn finish(&mut self, out: &mut Vec<u8>) -> Result<usize> {
        use std::io::Read;
        let mut decoder = xz2::read::XzDecoder::new(self.buf.input.as_slice());
        let start = out.len();
        decoder.read_to_end(out).map_err(|_| SqshError::CompressionDecompress)?;
        Ok(out.len() - start)
    }

    #[cfg(not(feature = "xz"))]
    fn finish(&mut self, _out: &mut Vec<u8>) -> Result<usize> {
        Err(SqshError::CompressionUnsupported(Compressor::Xz))
    }
}

impl Extractor for LzmaExtractor {
    fn init(&mut self, out_capacity: usize) {
        self.buf.init();
        let _ = out_capacity;
    }

    fn write(&mut self, input: &[u8]) {
        self.buf.write(input)
    }

    #[cfg(feature = "xz")]
    fn finish(&mut self, out: &mut Vec<u8>) -> Result<usize> {
        use std::io::Read;
        // SquashFS "lzma" is the legacy alone-format stream; xz2's lzma decoder reads it directly.
        let mut decoder = xz2::read::XzDecoder::new_lzma(self.buf.input.as_slice());
        let start = out.len();
        decoder.read_to_end(out).map_err(|_| SqshError::CompressionDecompress)?;
        Ok(out.len() - start)
    }

    #[cfg(not(feature = "xz"))]
    fn finish(&mut self, _out: &mut Vec<u8>) -> Result<usize> {
        Err(SqshError::CompressionUnsupported(Compressor::Lzma))
    }
}

impl Extractor for Lz4Extractor {
    fn init(&mut self, out_capacity: usize) {
        self.buf.init();
        let _ = out_capacity;
    }

    fn write(&mut self, input: &[u8]) {
        self.buf.write(input)
    }

    #[cfg(feature = "lz4")]
    fn finish(&mut self, out: &mut Vec<u8>) -> Result<usize> {
        // SquashFS lz4 blocks are raw (block-format), never framed.
        let start = out.len();
        let mut scratch = vec![0u8; out.capacity().max(self.buf.input.len() * 4).max(4096)];
        loop {
            match lz4_flex::decompress_into(&self.buf.input, &mut scratch) {
                Ok(n) => {
                    out.extend_from_slice(&scratch[..n]);
                    return Ok(n);
                }
                Err(_) if scratch.len() < (1 << 24) => {
                    scratch.resize(scratch.len() * 2, 0);
                }
                Err(_) => return Err(SqshError::CompressionDecompress),
            }
        }
    }

    #[cfg(not(feature = "lz4"))]
    fn finish(&mut self, _out: &mut Vec<u8>) -> Result<usize> {
        Err(SqshError::CompressionUnsupported(Compressor::Lz4))
    }
}

impl Extractor for LzoExtractor {
    fn init(&mut self, out_capacity: usize) {
        self.buf.init();
        let _ = out_capacity;
    }

    fn write(&mut self, input: &[u8]) {
        self.buf.write(input)
    }

    #[cfg(feature = "lzo")]
    fn finish(&mut self, out: &mut Vec<u8>) -> Result<usize> {
        let start = out.len();
        let cap = out.capacity().max(self.buf.input.len() * 8).max(4096);
        out.resize(start + cap, 0);
        let (written, error) =
            rust_lzo::LZOContext::decompress_to_slice(&self.buf.input, &mut out[start..]);
        let n = written.len();
        out.truncate(start + n);
        if error != rust_lzo::LZOError::OK {
            return Err(SqshError::CompressionDecompress);
        }
        Ok(n)
    }

    #[cfg(not(feature = "lzo"))]
    fn finish(&mut self, _out: &mut Vec<u8>) -> Result<usize> {
        Err(SqshError::CompressionUnsupported(Compressor::Lzo))
    }
}

impl Extractor for ZstdExtractor {
    fn init(&mut self, out_capacity: usize) {
        self.buf.init();
        let _ = out_capacity;
    }

    fn write(&mut self, input: &[u8]) {
        self.buf.write(input)
    }

    #[cfg(feature = "zstd")]
    fn finish(&mut self, out: &mut Vec<u8>) -> Result<usize> {
        let start = out.len();
        let mut decoder = zstd::bulk::Decompressor::new().map_err(|_| SqshError::CompressionInit)?;
        decoder
            .decompress_to_buffer(&self.buf.input, out)
            .map_err(|_| SqshError::CompressionDecompress)?;
        Ok(out.len() - start)
    }

    #[cfg(not(feature = "zstd"))]
    fn finish(&mut self, _out: &mut Vec<u8>) -> Result<usize> {
        Err(SqshError::CompressionUnsupported(Compressor::Zstd))
    }
}

/// Per-algorithm compressor-specific tuning, stored in a metadata block immediately
/// following the superblock when `CompressorOptionsArePresent` is set. None of these
/// fields affect how an already-written block is decompressed -- mksquashfs only
/// needs them to reproduce its own encoder settings -- but a reader still exposes
/// them for tools like `sqsh-cli stat` that want to show how an archive was built.
#[derive(Debug, Copy, Clone, PartialEq, Eq, DekuRead)]
#[deku(endian = "little", ctx = "compressor: Compressor", id = "compressor")]
pub enum CompressionOptions {
    #[deku(id = "Compressor::Gzip")]
    Gzip(GzipOptions),
    #[deku(id = "Compressor::Lzo")]
    Lzo(LzoOptions),
    #[deku(id = "Compressor::Xz")]
    Xz(XzOptions),
    #[deku(id = "Compressor::Lz4")]
    Lz4(Lz4Options),
    #[deku(id = "Compressor::Zstd")]
    Zstd(ZstdOptions),
    #[deku(id = "Compressor::Lzma")]
    Lzma,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, DekuRead)]
#[deku(endian = "little")]
pub struct GzipOptions {
    pub compression_level: u32,
    pub window_size: u16,
    pub strategies: u16,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, DekuRead)]
#[deku(endian = "little")]
pub struct LzoOptions {
    pub algorithm: u32,
    pub compression_level: u32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, DekuRead)]
#[deku(endian = "little")]
pub struct XzOptions {
    pub dictionary_size: u32,
    pub filters: u32,
    // The kernel ignores these trailing fields when present and writers may omit
    // them entirely; absent a read-to-EOF context here we just don't parse them.
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, DekuRead)]
#[deku(endian = "little")]
pub struct Lz4Options {
    pub version: u32,
    pub flags: u32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, DekuRead)]
#[deku(endian = "little")]
pub struct ZstdOptions {
    pub compression_level: u32,
}

/// Build a new streaming extractor context for `compressor`.
///
/// Returns `CompressionUnsupported` for [`Compressor::None`] (callers should never
/// decompress uncompressed data) and for any id not in the closed algorithm set.
pub fn new_extractor(compressor: Compressor) -> Result<Box<dyn Extractor>> {
    match compressor {
        Compressor::Gzip => Ok(Box::new(GzipExtractor::new())),
        Compressor::Xz => Ok(Box::new(XzExtractor::new())),
        Compressor::Lzma => Ok(Box::new(LzmaExtractor::new())),
        Compressor::Lz4 => Ok(Box::new(Lz4Extractor::new())),
        Compressor::Lzo => Ok(Box::new(LzoExtractor::new())),
        Compressor::Zstd => Ok(Box::new(ZstdExtractor::new())),
        Compressor::None => Err(SqshError::CompressionUnsupported(compressor)),
    }
}

/// Convenience one-shot: `init` + `write(input)` + `finish` into a growing owned buffer.
/// Used by the metablock reader, which only ever decompresses a single whole chunk at a time.
pub fn to_buffer(compressor: Compressor, input: &[u8], out: &mut Vec<u8>) -> Result<usize> {
    let mut ctx = new_extractor(compressor)?;
    ctx.init(out.capacity());
    ctx.write(input);
    ctx.finish(out)
}
