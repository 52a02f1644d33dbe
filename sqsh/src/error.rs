//! Errors

use std::io;

use thiserror::Error;

use crate::compressor::Compressor;

/// Errors generated from the library
#[derive(Error, Debug)]
pub enum SqshError {
    #[error("std io error: {0}")]
    StdIo(#[from] io::Error),

    #[error("deku error: {0:?}")]
    Deku(#[from] deku::DekuError),

    #[error("string error: {0:?}")]
    StringUtf8(#[from] std::string::FromUtf8Error),

    #[error("superblock is smaller than the minimum size")]
    SuperblockTooSmall,

    #[error("wrong magic bytes, not a squashfs image")]
    WrongMagic,

    #[error("unsupported squashfs version, only 4.0 is supported")]
    UnsupportedVersion,

    #[error("unknown inode file type: {0}")]
    UnknownFileType(u8),

    #[error("corrupted inode")]
    CorruptedInode,

    #[error("corrupted directory entry")]
    CorruptedDirectoryEntry,

    #[error("not a directory")]
    NotADirectory,

    #[error("no such file or directory")]
    NoSuchFile,

    #[error("cannot go up from the root inode")]
    WalkerCannotGoUp,

    #[error("current entry is not a directory, cannot descend")]
    WalkerCannotGoDown,

    #[error("too many symlinks were followed while resolving a path")]
    TooManySymlinks,

    #[error("size mismatch between expected and actual data")]
    SizeMismatch,

    #[error("access out of bounds of the archive or requested range")]
    OutOfBounds,

    #[error("integer overflow while computing an offset or size")]
    IntegerOverflow,

    #[error("archive has no fragment table")]
    NoFragmentTable,

    #[error("archive has no export table")]
    NoExportTable,

    #[error("archive has no xattr table")]
    NoXattrTable,

    #[error("compressor has no compression options block")]
    NoCompressionOptions,

    #[error("unsupported compression algorithm: {0:?}")]
    CompressionUnsupported(Compressor),

    #[error("failed to initialize the compression context")]
    CompressionInit,

    #[error("failed to decompress a block")]
    CompressionDecompress,

    #[error("failed to initialize a source mapper")]
    MapperInit,

    #[error("failed to map a byte range from the source")]
    MapperMap,

    #[error("http source returned an invalid or missing Content-Range header")]
    CurlInvalidRangeHeader,

    #[error("allocation failure")]
    MallocFailed,

    #[error("a mutex was poisoned")]
    MutexLock,

    #[error("internal error: {0}")]
    Internal(&'static str),
}

impl SqshError {
    /// The error-kind name used in CLI diagnostics (spec §6): the bare variant
    /// name, independent of any `{0}`-formatted payload in its message.
    pub fn kind_name(&self) -> &'static str {
        match self {
            SqshError::StdIo(_) => "StdIo",
            SqshError::Deku(_) => "Deku",
            SqshError::StringUtf8(_) => "StringUtf8",
            SqshError::SuperblockTooSmall => "SuperblockTooSmall",
            SqshError::WrongMagic => "WrongMagic",
            SqshError::UnsupportedVersion => "UnsupportedVersion",
            SqshError::UnknownFileType(_) => "UnknownFileType",
            SqshError::CorruptedInode => "CorruptedInode",
            SqshError::CorruptedDirectoryEntry => "CorruptedDirectoryEntry",
            SqshError::NotADirectory => "NotADirectory",
            SqshError::NoSuchFile => "NoSuchFile",
            SqshError::WalkerCannotGoUp => "WalkerCannotGoUp",
            SqshError::WalkerCannotGoDown => "WalkerCannotGoDown",
            SqshError::TooManySymlinks => "TooManySymlinks",
            SqshError::SizeMismatch => "SizeMismatch",
            SqshError::OutOfBounds => "OutOfBounds",
            SqshError::IntegerOverflow => "IntegerOverflow",
            SqshError::NoFragmentTable => "NoFragmentTable",
            SqshError::NoExportTable => "NoExportTable",
            SqshError::NoXattrTable => "NoXattrTable",
            SqshError::NoCompressionOptions => "NoCompressionOptions",
            SqshError::CompressionUnsupported(_) => "CompressionUnsupported",
            SqshError::CompressionInit => "CompressionInit",
            SqshError::CompressionDecompress => "CompressionDecompress",
            SqshError::MapperInit => "MapperInit",
            SqshError::MapperMap => "MapperMap",
            SqshError::CurlInvalidRangeHeader => "CurlInvalidRangeHeader",
            SqshError::MallocFailed => "MallocFailed",
            SqshError::MutexLock => "MutexLock",
            SqshError::Internal(_) => "Internal",
        }
    }
}

pub type Result<T> = std::result::Result<T, SqshError>;
