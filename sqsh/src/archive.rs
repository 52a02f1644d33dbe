//! Archive façade: opens a source, validates and parses the superblock, wires up
//! the block mapper, the two extract managers (metadata vs. data), the id/fragment/
//! export/xattr tables, and the inode map, then exposes everything a resolver or
//! tree traversal needs to load an inode and read its content.

use std::sync::Arc;

use deku::prelude::*;
use tracing::debug;

use crate::compressor::CompressionOptions;
use crate::directory::DirectoryIterator;
use crate::error::{Result, SqshError};
use crate::export::Export;
use crate::extract::ExtractManager;
use crate::file::FileIterator;
use crate::fragment::Fragment;
use crate::id::Id;
use crate::inode::{Inode, InodeRef};
use crate::inode_map::InodeMap;
use crate::mapper::map_reader::MapReader;
use crate::mapper::BlockMapper;
use crate::metablock::MetablockReader;
use crate::source::{self, Config, Locator};
use crate::superblock::{Flags, SuperBlock};
use crate::table::Table;
use crate::xattr::{XattrEntry, XattrTable};

/// A fully-opened, read-only SquashFS archive.
pub struct Archive {
    superblock: SuperBlock,
    mapper: Arc<BlockMapper>,
    metadata_extract: Arc<ExtractManager>,
    data_extract: Arc<ExtractManager>,
    id_table: Table<Id>,
    fragment_table: Option<Arc<Table<Fragment>>>,
    export_table: Option<Arc<Table<Export>>>,
    xattr_table: Option<XattrTable>,
    inode_map: InodeMap,
    config: Config,
}

impl Archive {
    /// Opens `locator`, validates the superblock, and loads every table the
    /// archive declares. Table loading only reads each table's outer address
    /// array, not its contents, so this stays cheap even for large archives.
    pub fn open(locator: Locator<'_>, config: Config) -> Result<Arc<Self>> {
        let source = Arc::new(source::open(locator, &config)?);
        let source_size = source.size();

        let block_size = config.mapper_block_size.unwrap_or_else(|| source.block_size_hint());
        let mapper = Arc::new(BlockMapper::new(source, block_size, config.mapper_lru_size));

        let mut sb_reader = MapReader::new(mapper.clone(), 0, source_size);
        sb_reader.advance(0, SuperBlock::SIZE)?;
        let superblock = SuperBlock::parse(sb_reader.data())?;
        debug!(block_size = superblock.block_size, compressor = ?superblock.compressor, "opened squashfs superblock");

        let metadata_extract =
            Arc::new(ExtractManager::new(superblock.compressor, config.compression_lru_size));
        let data_extract =
            Arc::new(ExtractManager::new(superblock.compressor, config.compression_lru_size));

        let id_table = Table::load(
            mapper.clone(),
            metadata_extract.clone(),
            superblock.id_table,
            superblock.id_count as usize,
            Id::SIZE,
            source_size,
        )?;

        let fragment_table = if superblock.has_fragment_table() {
            Some(Arc::new(Table::load(
                mapper.clone(),
                metadata_extract.clone(),
                superblock.frag_table,
                superblock.frag_count as usize,
                Fragment::SIZE,
                source_size,
            )?))
        } else {
            None
        };

        let export_table = if superblock.has_export_table() {
            Some(Arc::new(Table::load(
                mapper.clone(),
                metadata_extract.clone(),
                superblock.export_table,
                superblock.inode_count as usize,
                Export::SIZE,
                source_size,
            )?))
        } else {
            None
        };

        let xattr_table = if superblock.has_xattr_table() {
            Some(XattrTable::load(
                mapper.clone(),
                metadata_extract.clone(),
                superblock.xattr_table,
                source_size,
            )?)
        } else {
            None
        };

        let inode_map = match &export_table {
            Some(table) => InodeMap::from_export_table(table.clone()),
            None => InodeMap::new_local(superblock.inode_count),
        };

        Ok(Arc::new(Self {
            superblock,
            mapper,
            metadata_extract,
            data_extract,
            id_table,
            fragment_table,
            export_table,
            xattr_table,
            inode_map,
            config,
        }))
    }

    pub fn superblock(&self) -> &SuperBlock {
        &self.superblock
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The inode reference of the archive's root directory.
    pub fn root_inode_ref(&self) -> InodeRef {
        InodeRef::from(self.superblock.root_inode)
    }

    /// Parses compressor-specific tuning from the metadata block directly after
    /// the superblock, if the archive carries one.
    pub fn compression_options(&self) -> Result<Option<CompressionOptions>> {
        if self.superblock.flags & Flags::CompressorOptionsArePresent as u16 == 0 {
            return Ok(None);
        }
        let mut reader = MetablockReader::new(
            self.mapper.clone(),
            self.metadata_extract.clone(),
            SuperBlock::SIZE as u64,
            u64::MAX,
        );
        let mut cursor = deku::reader::Reader::new(reader.as_read());
        let opts = CompressionOptions::from_reader_with_ctx(&mut cursor, self.superblock.compressor)?;
        Ok(Some(opts))
    }

    /// Loads and parses the inode at `inode_ref` from the inode table.
    pub fn load_inode(&self, inode_ref: InodeRef) -> Result<Inode> {
        let start_address =
            self.superblock.inode_table.checked_add(inode_ref.outer()).ok_or(SqshError::IntegerOverflow)?;
        let mut reader = MetablockReader::new(
            self.mapper.clone(),
            self.metadata_extract.clone(),
            start_address,
            self.superblock.bytes_used,
        );
        reader.advance(inode_ref.inner() as u64, 0)?;
        Inode::read_from(reader.as_read(), self.superblock.block_size, self.superblock.block_log)
    }

    /// Resolves a uid/gid table index (as stored in an inode header) to the real
    /// numeric id.
    pub fn resolve_id(&self, index: u16) -> Result<u32> {
        Ok(self.id_table.get(index as usize)?.num)
    }

    /// All xattrs attached to an inode, or an empty list if it has none.
    pub fn xattrs_for(&self, inode: &Inode) -> Result<Vec<XattrEntry>> {
        match inode.xattr_index() {
            None => Ok(Vec::new()),
            Some(index) => {
                let table = self.xattr_table.as_ref().ok_or(SqshError::NoXattrTable)?;
                table.entries(index)
            }
        }
    }

    /// A directory iterator positioned at the start of `inode`'s entries.
    pub fn directory_iterator(&self, inode: &Inode) -> Result<DirectoryIterator> {
        let (block_index, block_offset, _parent) = inode.directory_location()?;
        DirectoryIterator::new(
            self.mapper.clone(),
            self.metadata_extract.clone(),
            self.superblock.dir_table,
            self.superblock.bytes_used,
            block_index as u64,
            block_offset,
            inode.size(),
            inode.directory_index().to_vec(),
        )
    }

    /// A content iterator walking `inode`'s data blocks and fragment tail.
    pub fn file_iterator(&self, inode: &Inode) -> Result<FileIterator> {
        Ok(FileIterator::new(
            self.mapper.clone(),
            self.data_extract.clone(),
            self.fragment_table.clone(),
            self.superblock.bytes_used,
            inode.blocks_start(),
            inode.block_sizes().to_vec(),
            self.superblock.block_size,
            inode.frag_index(),
            inode.frag_block_offset(),
            inode.size(),
        ))
    }

    /// Looks up the packed inode reference for an inode *number*, as recorded by
    /// the export table or discovered so far during tree traversal.
    pub fn inode_ref_for_number(&self, inode_number: u32) -> Result<Option<InodeRef>> {
        let raw = self.inode_map.get(inode_number)?;
        Ok((raw != 0).then(|| InodeRef::from(raw)))
    }

    /// Records the reference for an inode number discovered while walking a
    /// directory. A no-op when the archive carries an export table.
    pub fn record_inode_ref(&self, inode_number: u32, inode_ref: InodeRef) -> Result<()> {
        self.inode_map.set(inode_number, inode_ref.raw())
    }

    pub fn has_fragment_table(&self) -> bool {
        self.fragment_table.is_some()
    }

    pub fn has_export_table(&self) -> bool {
        self.export_table.is_some()
    }

    pub fn has_xattr_table(&self) -> bool {
        self.xattr_table.is_some()
    }

    /// Drains both extract managers' and the block mapper's LRU caches,
    /// releasing every block still only pinned by the LRU.
    pub fn close(&self) {
        self.mapper.close();
        self.metadata_extract.close();
        self.data_extract.close();
    }
}
