//! Extended attributes: a two-level id table (reusing [`Table`]) pointing each
//! xattr-bearing inode at a run of key/value records in a separate metadata
//! stream, with large values stored out-of-line and deduplicated across inodes.

use std::sync::Arc;

use deku::prelude::*;

use crate::error::{Result, SqshError};
use crate::extract::ExtractManager;
use crate::mapper::map_reader::MapReader;
use crate::mapper::BlockMapper;
use crate::metablock::MetablockReader;
use crate::table::Table;

/// Set on an entry's `kind` field when its value is an out-of-line pointer into
/// the key/value stream rather than an inline value.
const OOL_FLAG: u16 = 0x0100;
const KIND_MASK: u16 = 0x00ff;

#[derive(Debug, Copy, Clone, DekuRead, PartialEq, Eq)]
#[deku(endian = "little")]
pub struct XattrIdEntry {
    /// Packed `(outer << 16) | inner` location of this inode's first xattr
    /// record in the key/value stream.
    pub xattr_ref: u64,
    pub count: u32,
    pub size: u32,
}

impl XattrIdEntry {
    pub const SIZE: usize = 16;
}

/// The namespace an xattr name is stored under.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Prefix {
    User,
    Trusted,
    Security,
}

impl Prefix {
    pub fn as_str(self) -> &'static str {
        match self {
            Prefix::User => "user.",
            Prefix::Trusted => "trusted.",
            Prefix::Security => "security.",
        }
    }

    fn from_kind(kind: u16) -> Result<Self> {
        match kind {
            0 => Ok(Prefix::User),
            1 => Ok(Prefix::Trusted),
            2 => Ok(Prefix::Security),
            _ => Err(SqshError::CorruptedInode),
        }
    }
}

/// A single decoded xattr: full name (prefix + suffix) and value bytes.
#[derive(Debug, Clone)]
pub struct XattrEntry {
    pub prefix: Prefix,
    pub name: Vec<u8>,
    pub value: Vec<u8>,
}

impl XattrEntry {
    pub fn fullname(&self) -> Vec<u8> {
        let mut out = self.prefix.as_str().as_bytes().to_vec();
        out.extend_from_slice(&self.name);
        out
    }
}

#[derive(Debug, Copy, Clone, DekuRead)]
#[deku(endian = "little")]
struct EntryHeader {
    kind: u16,
    name_size: u16,
}

#[derive(Debug, Copy, Clone, DekuRead)]
#[deku(endian = "little")]
struct ValueHeader {
    value_size: u32,
}

/// The full xattr subsystem: id table plus the key/value metadata stream.
pub struct XattrTable {
    ids: Table<XattrIdEntry>,
    mapper: Arc<BlockMapper>,
    extract: Arc<ExtractManager>,
    kv_start: u64,
    source_size: u64,
}

impl XattrTable {
    /// `location` is the superblock's `xattr_table` field: the address of a
    /// 16-byte header (`kv_start: u64, xattr_ids: u32, unused: u32`) immediately
    /// followed by the id table's outer address array.
    pub fn load(
        mapper: Arc<BlockMapper>,
        extract: Arc<ExtractManager>,
        location: u64,
        source_size: u64,
    ) -> Result<Self> {
        let mut header_reader = MapReader::new(mapper.clone(), location, source_size);
        header_reader.advance(0, 16)?;
        let bytes = header_reader.data();
        let kv_start = u64::from_le_bytes(bytes[0..8].try_into().unwrap());
        let xattr_ids = u32::from_le_bytes(bytes[8..12].try_into().unwrap());

        let outer_table_location = location.checked_add(16).ok_or(SqshError::IntegerOverflow)?;
        let ids = Table::load(
            mapper.clone(),
            extract.clone(),
            outer_table_location,
            xattr_ids as usize,
            XattrIdEntry::SIZE,
            source_size,
        )?;

        Ok(Self { ids, mapper, extract, kv_start, source_size })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// All xattrs attached to the inode whose extended-inode `xattr_index` field
    /// names entry `index` in this table.
    pub fn entries(&self, index: u32) -> Result<Vec<XattrEntry>> {
        let id_entry = self.ids.get(index as usize)?;
        let outer = id_entry.xattr_ref >> 16;
        let inner = (id_entry.xattr_ref & 0xffff) as u16;
        let start_address = self.kv_start.checked_add(outer).ok_or(SqshError::IntegerOverflow)?;

        let mut reader =
            MetablockReader::new(self.mapper.clone(), self.extract.clone(), start_address, u64::MAX);
        reader.advance(inner as u64, 0)?;

        let mut entries = Vec::with_capacity(id_entry.count as usize);
        for _ in 0..id_entry.count {
            entries.push(self.read_one(&mut reader)?);
        }
        Ok(entries)
    }

    fn read_one(&self, reader: &mut MetablockReader) -> Result<XattrEntry> {
        reader.advance(0, 4)?;
        let mut cursor = deku::reader::Reader::new(std::io::Cursor::new(reader.data()));
        let header = EntryHeader::from_reader_with_ctx(&mut cursor, ())?;

        reader.advance(0, header.name_size as usize)?;
        let name = reader.data().to_vec();

        reader.advance(0, 4)?;
        let mut cursor = deku::reader::Reader::new(std::io::Cursor::new(reader.data()));
        let value_header = ValueHeader::from_reader_with_ctx(&mut cursor, ())?;

        let indirect = header.kind & OOL_FLAG != 0;
        let prefix = Prefix::from_kind(header.kind & KIND_MASK)?;

        let value = if indirect {
            reader.advance(0, value_header.value_size as usize)?;
            if reader.data().len() != 8 {
                return Err(SqshError::CorruptedInode);
            }
            let ool_ref = u64::from_le_bytes(reader.data().try_into().unwrap());
            self.read_ool_value(ool_ref)?
        } else {
            reader.advance(0, value_header.value_size as usize)?;
            reader.data().to_vec()
        };

        Ok(XattrEntry { prefix, name, value })
    }

    fn read_ool_value(&self, ool_ref: u64) -> Result<Vec<u8>> {
        let outer = ool_ref >> 16;
        let inner = (ool_ref & 0xffff) as u16;
        let start_address = self.kv_start.checked_add(outer).ok_or(SqshError::IntegerOverflow)?;
        let mut reader =
            MetablockReader::new(self.mapper.clone(), self.extract.clone(), start_address, u64::MAX);
        reader.advance(inner as u64, 4)?;
        let size = u32::from_le_bytes(reader.data().try_into().unwrap());
        reader.advance(0, size as usize)?;
        Ok(reader.data().to_vec())
    }
}
