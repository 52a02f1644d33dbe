//! On-disk inode records: the closed set of basic/extended inode kinds SquashFS
//! 4.0 defines, plus the packed 48+16-bit inode reference that addresses one of
//! them inside the inode table's metablock stream.

use deku::prelude::*;

use crate::compressor::DataSize;
use crate::error::{Result, SqshError};

/// `frag_index` sentinel meaning "this file has no fragment tail".
pub const NO_FRAGMENT: u32 = 0xffff_ffff;

/// Packed `(outer_offset_from_table_start << 16) | inner_offset_within_chunk`
/// location of an inode inside a metablock stream. Kept as an opaque value type;
/// the shift is never exposed past this module and [`crate::directory`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct InodeRef(u64);

impl InodeRef {
    pub fn new(outer: u64, inner: u16) -> Self {
        Self((outer << 16) | inner as u64)
    }

    pub fn outer(&self) -> u64 {
        self.0 >> 16
    }

    pub fn inner(&self) -> u16 {
        (self.0 & 0xffff) as u16
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl From<u64> for InodeRef {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<InodeRef> for u64 {
    fn from(r: InodeRef) -> u64 {
        r.0
    }
}

#[derive(Debug, Copy, Clone, DekuRead, PartialEq, Eq)]
#[deku(endian = "little", id_type = "u16")]
pub enum InodeId {
    BasicDirectory = 1,
    BasicFile = 2,
    BasicSymlink = 3,
    BasicBlockDevice = 4,
    BasicCharDevice = 5,
    BasicFifo = 6,
    BasicSocket = 7,
    ExtendedDirectory = 8,
    ExtendedFile = 9,
    ExtendedSymlink = 10,
    ExtendedBlockDevice = 11,
    ExtendedCharDevice = 12,
    ExtendedFifo = 13,
    ExtendedSocket = 14,
}

impl InodeId {
    /// The type reported in a directory entry is always the *basic* id, even for
    /// an inode that is actually stored as an extended record.
    pub fn into_base_type(self) -> Self {
        use InodeId::*;
        match self {
            ExtendedDirectory => BasicDirectory,
            ExtendedFile => BasicFile,
            ExtendedSymlink => BasicSymlink,
            ExtendedBlockDevice => BasicBlockDevice,
            ExtendedCharDevice => BasicCharDevice,
            ExtendedFifo => BasicFifo,
            ExtendedSocket => BasicSocket,
            other => other,
        }
    }
}

/// The type of a file, independent of whether its inode record happens to be a
/// basic or extended variant.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FileType {
    Directory,
    File,
    Symlink,
    BlockDevice,
    CharDevice,
    Fifo,
    Socket,
}

impl From<InodeId> for FileType {
    fn from(id: InodeId) -> Self {
        use InodeId::*;
        match id.into_base_type() {
            BasicDirectory => FileType::Directory,
            BasicFile => FileType::File,
            BasicSymlink => FileType::Symlink,
            BasicBlockDevice => FileType::BlockDevice,
            BasicCharDevice => FileType::CharDevice,
            BasicFifo => FileType::Fifo,
            BasicSocket => FileType::Socket,
            _ => unreachable!("into_base_type always returns a basic id"),
        }
    }
}

#[derive(Debug, Copy, Clone, DekuRead, PartialEq, Eq, Default)]
#[deku(endian = "little")]
pub struct InodeHeader {
    pub permissions: u16,
    /// Index into the id table.
    pub uid_idx: u16,
    /// Index into the id table.
    pub gid_idx: u16,
    pub mtime: u32,
    pub inode_number: u32,
}

#[derive(Debug, Copy, Clone, DekuRead, PartialEq, Eq)]
#[deku(endian = "little")]
pub struct BasicDirectory {
    pub block_index: u32,
    pub link_count: u32,
    pub file_size: u16,
    pub block_offset: u16,
    pub parent_inode: u32,
}

#[derive(Debug, Copy, Clone, DekuRead, PartialEq, Eq)]
#[deku(endian = "little")]
pub struct DirectoryIndexEntry {
    /// Byte offset of this header from the first directory header, as if every
    /// uncompressed directory metadata chunk were laid out contiguously.
    pub index: u32,
    /// Start offset of a directory-table metablock, relative to the table start.
    pub start: u32,
    #[deku(assert = "*name_size < 8192")]
    pub name_size: u32,
    #[deku(count = "*name_size + 1")]
    pub name: Vec<u8>,
}

#[derive(Debug, Clone, DekuRead, PartialEq, Eq)]
#[deku(endian = "little")]
pub struct ExtendedDirectory {
    pub link_count: u32,
    pub file_size: u32,
    pub block_index: u32,
    pub parent_inode: u32,
    #[deku(assert = "*index_count < 256")]
    pub index_count: u16,
    pub block_offset: u16,
    pub xattr_index: u32,
    #[deku(count = "*index_count")]
    pub dir_index: Vec<DirectoryIndexEntry>,
}

fn block_count(block_size: u32, block_log: u16, frag_index: u32, file_size: u64) -> u64 {
    if frag_index == NO_FRAGMENT {
        (file_size + u64::from(block_size) - 1) >> block_log
    } else {
        file_size >> block_log
    }
}

#[derive(Debug, Clone, DekuRead, PartialEq, Eq)]
#[deku(endian = "little", ctx = "block_size: u32, block_log: u16")]
pub struct BasicFile {
    pub blocks_start: u32,
    pub frag_index: u32,
    pub block_offset: u32,
    pub file_size: u32,
    #[deku(count = "block_count(block_size, block_log, *frag_index, *file_size as u64)")]
    pub block_sizes: Vec<DataSize>,
}

#[derive(Debug, Clone, DekuRead, PartialEq, Eq)]
#[deku(endian = "little", ctx = "block_size: u32, block_log: u16")]
pub struct ExtendedFile {
    pub blocks_start: u64,
    pub file_size: u64,
    pub sparse: u64,
    pub link_count: u32,
    pub frag_index: u32,
    pub block_offset: u32,
    pub xattr_index: u32,
    #[deku(count = "block_count(block_size, block_log, *frag_index, *file_size)")]
    pub block_sizes: Vec<DataSize>,
}

#[derive(Debug, Clone, DekuRead, PartialEq, Eq)]
#[deku(endian = "little")]
pub struct BasicSymlink {
    pub link_count: u32,
    #[deku(assert = "*target_size < 65536")]
    pub target_size: u32,
    #[deku(count = "*target_size")]
    pub target_path: Vec<u8>,
}

#[derive(Debug, Clone, DekuRead, PartialEq, Eq)]
#[deku(endian = "little")]
pub struct ExtendedSymlink {
    pub link_count: u32,
    #[deku(assert = "*target_size < 65536")]
    pub target_size: u32,
    #[deku(count = "*target_size")]
    pub target_path: Vec<u8>,
    pub xattr_index: u32,
}

#[derive(Debug, Copy, Clone, DekuRead, PartialEq, Eq)]
#[deku(endian = "little")]
pub struct BasicDevice {
    pub link_count: u32,
    pub device_number: u32,
}

#[derive(Debug, Copy, Clone, DekuRead, PartialEq, Eq)]
#[deku(endian = "little")]
pub struct ExtendedDevice {
    pub link_count: u32,
    pub device_number: u32,
    pub xattr_index: u32,
}

#[derive(Debug, Copy, Clone, DekuRead, PartialEq, Eq)]
#[deku(endian = "little")]
pub struct BasicIpc {
    pub link_count: u32,
}

#[derive(Debug, Copy, Clone, DekuRead, PartialEq, Eq)]
#[deku(endian = "little")]
pub struct ExtendedIpc {
    pub link_count: u32,
    pub xattr_index: u32,
}

#[derive(Debug, Clone, DekuRead, PartialEq, Eq)]
#[deku(ctx = "id: InodeId, block_size: u32, block_log: u16")]
#[deku(id = "id")]
pub enum InodeInner {
    #[deku(id = "InodeId::BasicDirectory")]
    BasicDirectory(BasicDirectory),
    #[deku(id = "InodeId::BasicFile")]
    BasicFile(#[deku(ctx = "block_size, block_log")] BasicFile),
    #[deku(id = "InodeId::BasicSymlink")]
    BasicSymlink(BasicSymlink),
    #[deku(id = "InodeId::BasicBlockDevice")]
    BasicBlockDevice(BasicDevice),
    #[deku(id = "InodeId::BasicCharDevice")]
    BasicCharDevice(BasicDevice),
    #[deku(id = "InodeId::BasicFifo")]
    BasicFifo(BasicIpc),
    #[deku(id = "InodeId::BasicSocket")]
    BasicSocket(BasicIpc),
    #[deku(id = "InodeId::ExtendedDirectory")]
    ExtendedDirectory(ExtendedDirectory),
    #[deku(id = "InodeId::ExtendedFile")]
    ExtendedFile(#[deku(ctx = "block_size, block_log")] ExtendedFile),
    #[deku(id = "InodeId::ExtendedSymlink")]
    ExtendedSymlink(ExtendedSymlink),
    #[deku(id = "InodeId::ExtendedBlockDevice")]
    ExtendedBlockDevice(ExtendedDevice),
    #[deku(id = "InodeId::ExtendedCharDevice")]
    ExtendedCharDevice(ExtendedDevice),
    #[deku(id = "InodeId::ExtendedFifo")]
    ExtendedFifo(ExtendedIpc),
    #[deku(id = "InodeId::ExtendedSocket")]
    ExtendedSocket(ExtendedIpc),
}

#[derive(Debug, Clone, DekuRead, PartialEq, Eq)]
#[deku(ctx = "block_size: u32, block_log: u16")]
pub struct Inode {
    pub id: InodeId,
    pub header: InodeHeader,
    #[deku(ctx = "*id, block_size, block_log")]
    pub inner: InodeInner,
}

impl Inode {
    pub fn parse(bytes: &[u8], block_size: u32, block_log: u16) -> Result<Self> {
        Self::read_from(std::io::Cursor::new(bytes), block_size, block_log)
    }

    /// Parses an inode from any byte stream, pulling only as many bytes as its
    /// actual on-disk shape turns out to need -- callers don't need to know a
    /// record's length up front, which varies per inode kind and, for files, with
    /// the number of data blocks.
    pub fn read_from<R: std::io::Read>(src: R, block_size: u32, block_log: u16) -> Result<Self> {
        let mut src = src;
        let mut cursor = deku::reader::Reader::new(&mut src);
        Ok(Self::from_reader_with_ctx(&mut cursor, (block_size, block_log))?)
    }

    pub fn file_type(&self) -> FileType {
        self.id.into_base_type().into()
    }

    pub fn is_extended(&self) -> bool {
        matches!(
            self.id,
            InodeId::ExtendedDirectory
                | InodeId::ExtendedFile
                | InodeId::ExtendedSymlink
                | InodeId::ExtendedBlockDevice
                | InodeId::ExtendedCharDevice
                | InodeId::ExtendedFifo
                | InodeId::ExtendedSocket
        )
    }

    pub fn size(&self) -> u64 {
        match &self.inner {
            InodeInner::BasicDirectory(d) => d.file_size as u64,
            InodeInner::ExtendedDirectory(d) => d.file_size as u64,
            InodeInner::BasicFile(f) => f.file_size as u64,
            InodeInner::ExtendedFile(f) => f.file_size,
            InodeInner::BasicSymlink(s) => s.target_size as u64,
            InodeInner::ExtendedSymlink(s) => s.target_size as u64,
            _ => 0,
        }
    }

    pub fn permissions(&self) -> u16 {
        self.header.permissions
    }

    pub fn mtime(&self) -> u32 {
        self.header.mtime
    }

    pub fn inode_number(&self) -> u32 {
        self.header.inode_number
    }

    pub fn xattr_index(&self) -> Option<u32> {
        let idx = match &self.inner {
            InodeInner::ExtendedDirectory(d) => d.xattr_index,
            InodeInner::ExtendedFile(f) => f.xattr_index,
            InodeInner::ExtendedSymlink(s) => s.xattr_index,
            InodeInner::ExtendedBlockDevice(d) | InodeInner::ExtendedCharDevice(d) => {
                d.xattr_index
            }
            InodeInner::ExtendedFifo(i) | InodeInner::ExtendedSocket(i) => i.xattr_index,
            _ => return None,
        };
        const NO_XATTR: u32 = 0xffff_ffff;
        (idx != NO_XATTR).then_some(idx)
    }

    /// `(directory_table_start_offset, directory_table_inner_offset, parent_inode_number)`.
    pub fn directory_location(&self) -> Result<(u32, u16, u32)> {
        match &self.inner {
            InodeInner::BasicDirectory(d) => Ok((d.block_index, d.block_offset, d.parent_inode)),
            InodeInner::ExtendedDirectory(d) => {
                Ok((d.block_index, d.block_offset, d.parent_inode))
            }
            _ => Err(SqshError::NotADirectory),
        }
    }

    pub fn directory_index(&self) -> &[DirectoryIndexEntry] {
        match &self.inner {
            InodeInner::ExtendedDirectory(d) => &d.dir_index,
            _ => &[],
        }
    }

    pub fn symlink_target(&self) -> Option<&[u8]> {
        match &self.inner {
            InodeInner::BasicSymlink(s) => Some(&s.target_path),
            InodeInner::ExtendedSymlink(s) => Some(&s.target_path),
            _ => None,
        }
    }

    pub fn device_number(&self) -> Option<u32> {
        match &self.inner {
            InodeInner::BasicBlockDevice(d) | InodeInner::BasicCharDevice(d) => {
                Some(d.device_number)
            }
            InodeInner::ExtendedBlockDevice(d) | InodeInner::ExtendedCharDevice(d) => {
                Some(d.device_number)
            }
            _ => None,
        }
    }

    pub fn blocks_start(&self) -> u64 {
        match &self.inner {
            InodeInner::BasicFile(f) => f.blocks_start as u64,
            InodeInner::ExtendedFile(f) => f.blocks_start,
            _ => 0,
        }
    }

    pub fn block_sizes(&self) -> &[DataSize] {
        match &self.inner {
            InodeInner::BasicFile(f) => &f.block_sizes,
            InodeInner::ExtendedFile(f) => &f.block_sizes,
            _ => &[],
        }
    }

    pub fn frag_index(&self) -> u32 {
        match &self.inner {
            InodeInner::BasicFile(f) => f.frag_index,
            InodeInner::ExtendedFile(f) => f.frag_index,
            _ => NO_FRAGMENT,
        }
    }

    pub fn has_fragment(&self) -> bool {
        self.frag_index() != NO_FRAGMENT
    }

    pub fn frag_block_offset(&self) -> u32 {
        match &self.inner {
            InodeInner::BasicFile(f) => f.block_offset,
            InodeInner::ExtendedFile(f) => f.block_offset,
            _ => 0,
        }
    }
}
