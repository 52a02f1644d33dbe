//! Hand-rolled SquashFS 4.0 archive builder for integration tests.
//!
//! Every metadata table in the format is a stream of fixed 8 KiB logical chunks,
//! chunked without regard to record boundaries -- a record may straddle two
//! chunks, and [`sqsh::metablock::MetablockReader`] pulls subsequent chunks
//! transparently to satisfy a read that crosses one. That means a builder never
//! needs to reason about where chunk boundaries fall: pack the logical bytes of
//! a table flat, split every 8192 bytes, done. The only format rule this builder
//! actually has to honor is the 256-entries-per-header cap on directory
//! fragments (`directory.rs`'s `FragmentHeader` asserts it).
//!
//! To keep every directory-entry / inode-reference pair simple, this builder
//! always uses `start_base = 0` for both inode and directory references (i.e.
//! every reference's "outer" is the very start of its table) and lets the
//! `offset`/`block_offset` field carry the full logical byte offset directly --
//! valid as long as each table stays under 64 KiB, comfortably true here.

#![allow(dead_code)]

use sqsh::{Archive, Config, Locator};
use std::sync::Arc;

pub const BLOCK_SIZE: u32 = 4096;
pub const BLOCK_LOG: u16 = 12;
const SB_SIZE: usize = 96;
const NOT_SET: u64 = u64::MAX;
const NO_FRAGMENT: u32 = 0xffff_ffff;
const UNCOMPRESSED_BLOCK_FLAG: u32 = 1 << 24;

const INODE_BASIC_DIRECTORY: u16 = 1;
const INODE_BASIC_FILE: u16 = 2;
const INODE_BASIC_SYMLINK: u16 = 3;

/// Packs `flat` into the on-disk metablock-stream encoding: every 8192 logical
/// bytes becomes one chunk, each chunk prefixed by a little-endian `u16` header
/// with the uncompressed-flag bit (0x8000) set and the remaining bits holding
/// the chunk's logical length.
fn pack_metablock_stream(flat: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    for chunk in flat.chunks(8192) {
        let header = (chunk.len() as u16) | 0x8000;
        out.extend_from_slice(&header.to_le_bytes());
        out.extend_from_slice(chunk);
    }
    out
}

fn basic_directory_inode(
    inode_number: u32,
    block_index: u32,
    block_offset: u16,
    file_size: u16,
    parent_inode: u32,
) -> Vec<u8> {
    let mut v = Vec::with_capacity(32);
    v.extend_from_slice(&INODE_BASIC_DIRECTORY.to_le_bytes());
    v.extend_from_slice(&0o755u16.to_le_bytes());
    v.extend_from_slice(&0u16.to_le_bytes()); // uid_idx
    v.extend_from_slice(&0u16.to_le_bytes()); // gid_idx
    v.extend_from_slice(&0u32.to_le_bytes()); // mtime
    v.extend_from_slice(&inode_number.to_le_bytes());
    v.extend_from_slice(&block_index.to_le_bytes());
    v.extend_from_slice(&1u32.to_le_bytes()); // link_count
    v.extend_from_slice(&file_size.to_le_bytes());
    v.extend_from_slice(&block_offset.to_le_bytes());
    v.extend_from_slice(&parent_inode.to_le_bytes());
    v
}

/// A basic-file inode with no data blocks and no fragment, i.e. an empty file.
fn basic_file_inode_empty(inode_number: u32) -> Vec<u8> {
    basic_file_inode_with_blocks(inode_number, 0, 0, &[])
}

/// A basic-file inode whose content lives in `block_sizes.len()` explicit data
/// blocks starting at `blocks_start`, with no fragment tail.
fn basic_file_inode_with_blocks(
    inode_number: u32,
    blocks_start: u32,
    file_size: u32,
    block_sizes: &[u32],
) -> Vec<u8> {
    let mut v = Vec::with_capacity(32 + block_sizes.len() * 4);
    v.extend_from_slice(&INODE_BASIC_FILE.to_le_bytes());
    v.extend_from_slice(&0o644u16.to_le_bytes());
    v.extend_from_slice(&0u16.to_le_bytes());
    v.extend_from_slice(&0u16.to_le_bytes());
    v.extend_from_slice(&0u32.to_le_bytes());
    v.extend_from_slice(&inode_number.to_le_bytes());
    v.extend_from_slice(&blocks_start.to_le_bytes());
    v.extend_from_slice(&NO_FRAGMENT.to_le_bytes());
    v.extend_from_slice(&0u32.to_le_bytes()); // block_offset (fragment tail offset; unused, no fragment)
    v.extend_from_slice(&file_size.to_le_bytes());
    for size in block_sizes {
        v.extend_from_slice(&size.to_le_bytes());
    }
    v
}

/// A basic-file inode with one fragment-backed tail and no explicit data blocks.
fn basic_file_inode_fragment_only(
    inode_number: u32,
    frag_index: u32,
    frag_block_offset: u32,
    file_size: u32,
) -> Vec<u8> {
    let mut v = Vec::with_capacity(32);
    v.extend_from_slice(&INODE_BASIC_FILE.to_le_bytes());
    v.extend_from_slice(&0o644u16.to_le_bytes());
    v.extend_from_slice(&0u16.to_le_bytes());
    v.extend_from_slice(&0u16.to_le_bytes());
    v.extend_from_slice(&0u32.to_le_bytes());
    v.extend_from_slice(&inode_number.to_le_bytes());
    v.extend_from_slice(&0u32.to_le_bytes()); // blocks_start
    v.extend_from_slice(&frag_index.to_le_bytes());
    v.extend_from_slice(&frag_block_offset.to_le_bytes());
    v.extend_from_slice(&file_size.to_le_bytes());
    v
}

fn basic_symlink_inode(inode_number: u32, target: &[u8]) -> Vec<u8> {
    let mut v = Vec::with_capacity(20 + target.len());
    v.extend_from_slice(&INODE_BASIC_SYMLINK.to_le_bytes());
    v.extend_from_slice(&0o777u16.to_le_bytes());
    v.extend_from_slice(&0u16.to_le_bytes());
    v.extend_from_slice(&0u16.to_le_bytes());
    v.extend_from_slice(&0u32.to_le_bytes());
    v.extend_from_slice(&inode_number.to_le_bytes());
    v.extend_from_slice(&1u32.to_le_bytes()); // link_count
    v.extend_from_slice(&(target.len() as u32).to_le_bytes());
    v.extend_from_slice(target);
    v
}

/// One directory entry: `offset` is the referenced inode's full logical byte
/// offset within the inode table (valid because every inode-table reference in
/// this builder shares `start_base = 0`).
fn dir_entry(offset: u16, inode_number: u32, type_id: u16, name: &[u8]) -> Vec<u8> {
    let mut v = Vec::with_capacity(8 + name.len());
    v.extend_from_slice(&offset.to_le_bytes());
    v.extend_from_slice(&(inode_number as i16).to_le_bytes());
    v.extend_from_slice(&type_id.to_le_bytes());
    v.extend_from_slice(&((name.len() - 1) as u16).to_le_bytes());
    v.extend_from_slice(name);
    v
}

fn dir_fragment_header(count: u32) -> Vec<u8> {
    assert!(count >= 1 && count <= 256);
    let mut v = Vec::with_capacity(12);
    v.extend_from_slice(&(count - 1).to_le_bytes());
    v.extend_from_slice(&0u32.to_le_bytes()); // start_base
    v.extend_from_slice(&0u32.to_le_bytes()); // inode_base
    v
}

/// One directory's entries (logical-offset, inode_number, type_id, name),
/// pre-split into <=256-entry fragment groups.
fn build_directory_bytes(entries: &[(u16, u32, u16, &[u8])]) -> Vec<u8> {
    let mut out = Vec::new();
    for group in entries.chunks(256) {
        out.extend_from_slice(&dir_fragment_header(group.len() as u32));
        for &(offset, inode_number, type_id, name) in group {
            out.extend_from_slice(&dir_entry(offset, inode_number, type_id, name));
        }
    }
    out
}

struct SuperBlockFields {
    inode_count: u32,
    root_inode: u64,
    id_table: u64,
    inode_table: u64,
    dir_table: u64,
    frag_table: u64,
    frag_count: u32,
}

fn write_superblock(f: &SuperBlockFields) -> Vec<u8> {
    write_superblock_with_block_size(f, BLOCK_SIZE, BLOCK_LOG)
}

fn write_superblock_with_block_size(f: &SuperBlockFields, block_size: u32, block_log: u16) -> Vec<u8> {
    let mut sb = vec![0u8; SB_SIZE];
    sb[0..4].copy_from_slice(b"hsqs");
    sb[4..8].copy_from_slice(&f.inode_count.to_le_bytes());
    sb[8..12].copy_from_slice(&0u32.to_le_bytes()); // mod_time
    sb[12..16].copy_from_slice(&block_size.to_le_bytes());
    sb[16..20].copy_from_slice(&f.frag_count.to_le_bytes());
    sb[20..22].copy_from_slice(&1u16.to_le_bytes()); // compressor = Gzip (never invoked: everything is stored uncompressed)
    sb[22..24].copy_from_slice(&block_log.to_le_bytes());
    let fragments_not_used: u16 = if f.frag_count == 0 { 0x0010 } else { 0 };
    let flags: u16 = fragments_not_used | 0x0200; // + NoXattrsInArchive
    sb[24..26].copy_from_slice(&flags.to_le_bytes());
    sb[26..28].copy_from_slice(&1u16.to_le_bytes()); // id_count
    sb[28..30].copy_from_slice(&4u16.to_le_bytes()); // version_major
    sb[30..32].copy_from_slice(&0u16.to_le_bytes()); // version_minor
    sb[32..40].copy_from_slice(&f.root_inode.to_le_bytes());
    sb[40..48].copy_from_slice(&NOT_SET.to_le_bytes()); // bytes_used: unbounded for these tests
    sb[48..56].copy_from_slice(&f.id_table.to_le_bytes());
    sb[56..64].copy_from_slice(&NOT_SET.to_le_bytes()); // xattr_table
    sb[64..72].copy_from_slice(&f.inode_table.to_le_bytes());
    sb[72..80].copy_from_slice(&f.dir_table.to_le_bytes());
    sb[80..88].copy_from_slice(&f.frag_table.to_le_bytes());
    sb[88..96].copy_from_slice(&NOT_SET.to_le_bytes()); // export_table
    sb
}

/// Single-entry id table (uid/gid 0 at index 0), returned as on-disk bytes
/// ready to place at `table_location`. The one outer-array slot holds an
/// *absolute* archive address, pointing just past the 8-byte outer array
/// itself.
fn id_table_bytes(table_location: u64) -> Vec<u8> {
    let mut out = Vec::new();
    let outer_addr = table_location + 8;
    out.extend_from_slice(&outer_addr.to_le_bytes());
    out.extend_from_slice(&pack_metablock_stream(&0u32.to_le_bytes()));
    out
}

/// A fully-built test archive, ready to open.
pub struct BuiltArchive {
    pub bytes: Vec<u8>,
}

impl BuiltArchive {
    pub fn open(self) -> Arc<Archive> {
        let mut config = Config::default();
        config.mapper_block_size = Some(8192);
        Archive::open(Locator::Buffer(self.bytes), config).expect("archive opens")
    }
}

/// Accumulates the pieces of an archive (data blocks, inode table, directory
/// table, fragment table) before being flattened by `finish`.
struct Layout {
    data: Vec<u8>,
    inode_flat: Vec<u8>,
    dir_flat: Vec<u8>,
    frag_flat: Vec<u8>,
    inode_count: u32,
}

impl Layout {
    fn new() -> Self {
        Layout { data: Vec::new(), inode_flat: Vec::new(), dir_flat: Vec::new(), frag_flat: Vec::new(), inode_count: 0 }
    }

    fn data_addr(&self) -> u32 {
        SB_SIZE as u32 + self.data.len() as u32
    }

    fn push_inode(&mut self, bytes: Vec<u8>) -> u16 {
        assert!(self.inode_flat.len() < 65536);
        let off = self.inode_flat.len() as u16;
        self.inode_flat.extend(bytes);
        self.inode_count += 1;
        off
    }

    fn finish(self, root_inode_off: u16, frag_count: u32) -> BuiltArchive {
        assert!(self.dir_flat.len() < 65536, "directory table must fit a u16 offset for this builder");

        let inode_stream = pack_metablock_stream(&self.inode_flat);
        let dir_stream = pack_metablock_stream(&self.dir_flat);
        let frag_stream = pack_metablock_stream(&self.frag_flat);

        let id_table_location = SB_SIZE as u64 + self.data.len() as u64;
        let id_bytes = id_table_bytes(id_table_location);
        let inode_table_location = id_table_location + id_bytes.len() as u64;
        let dir_table_location = inode_table_location + inode_stream.len() as u64;
        let frag_table_payload_location = dir_table_location + dir_stream.len() as u64;
        let frag_table_location = frag_table_payload_location + frag_stream.len() as u64;

        let root_inode_ref = root_inode_off as u64; // outer = 0

        let frag_table_bytes = if frag_count > 0 {
            frag_table_payload_location.to_le_bytes().to_vec()
        } else {
            Vec::new()
        };

        let sb = write_superblock(&SuperBlockFields {
            inode_count: self.inode_count,
            root_inode: root_inode_ref,
            id_table: id_table_location,
            inode_table: inode_table_location,
            dir_table: dir_table_location,
            frag_table: if frag_count > 0 { frag_table_location } else { NOT_SET },
            frag_count,
        });

        let mut bytes = Vec::new();
        bytes.extend_from_slice(&sb);
        bytes.extend_from_slice(&self.data);
        bytes.extend_from_slice(&id_bytes);
        bytes.extend_from_slice(&inode_stream);
        bytes.extend_from_slice(&dir_stream);
        bytes.extend_from_slice(&frag_stream);
        bytes.extend_from_slice(&frag_table_bytes);

        BuiltArchive { bytes }
    }
}

/// `/a` (2 bytes `"a\n"`), `/b` (two full blocks of `'b'`, block-aligned, no
/// fragment), `/large_dir/NNN` for `NNN` in `0..count` (empty files), zero-padded
/// to 3 digits. Exercises a directory large enough to need more than one
/// 256-entry fragment header.
pub fn build_large_dir_archive(count: u32) -> BuiltArchive {
    let mut layout = Layout::new();

    let a_start = layout.data_addr();
    layout.data.extend_from_slice(b"a\n");
    let b_start = layout.data_addr();
    layout.data.extend_from_slice(&vec![b'b'; (BLOCK_SIZE * 2) as usize]);

    let root_off = layout.push_inode(vec![0u8; 32]); // placeholder, patched below
    let a_off = layout.push_inode(basic_file_inode_with_blocks(2, a_start, 2, &[2 | UNCOMPRESSED_BLOCK_FLAG]));
    let b_off = layout.push_inode(basic_file_inode_with_blocks(
        3,
        b_start,
        BLOCK_SIZE * 2,
        &[BLOCK_SIZE | UNCOMPRESSED_BLOCK_FLAG, BLOCK_SIZE | UNCOMPRESSED_BLOCK_FLAG],
    ));
    let large_dir_off = layout.push_inode(vec![0u8; 32]); // placeholder, patched below

    let children_start_inode = 5u32;
    let names: Vec<String> = (0..count).map(|i| format!("{:03}", i)).collect();
    let mut child_offsets = Vec::with_capacity(count as usize);
    for i in 0..count {
        child_offsets.push(layout.push_inode(basic_file_inode_empty(children_start_inode + i)));
    }

    let root_entries: Vec<(u16, u32, u16, &[u8])> = vec![
        (a_off, 2, INODE_BASIC_FILE, b"a"),
        (b_off, 3, INODE_BASIC_FILE, b"b"),
        (large_dir_off, 4, INODE_BASIC_DIRECTORY, b"large_dir"),
    ];
    let root_dir_off = layout.dir_flat.len() as u16;
    let root_bytes = build_directory_bytes(&root_entries);
    layout.dir_flat.extend_from_slice(&root_bytes);
    let root_file_size = 3 + root_bytes.len() as u16;

    let child_entries: Vec<(u16, u32, u16, &[u8])> = (0..count as usize)
        .map(|i| (child_offsets[i], children_start_inode + i as u32, INODE_BASIC_FILE, names[i].as_bytes()))
        .collect();
    let large_dir_table_off = layout.dir_flat.len() as u16;
    let large_dir_bytes = build_directory_bytes(&child_entries);
    layout.dir_flat.extend_from_slice(&large_dir_bytes);
    let large_dir_file_size = 3 + large_dir_bytes.len() as u32;

    let root_inode = basic_directory_inode(1, 0, root_dir_off, root_file_size, 1);
    layout.inode_flat[root_off as usize..root_off as usize + 32].copy_from_slice(&root_inode);
    let large_dir_inode = basic_directory_inode(4, 0, large_dir_table_off, large_dir_file_size as u16, 1);
    layout.inode_flat[large_dir_off as usize..large_dir_off as usize + 32].copy_from_slice(&large_dir_inode);

    layout.finish(root_off, 0)
}

/// `/src` -> symlink pointing at `"tgt"`, and (if `with_target`) `/tgt` a regular
/// 8-byte file.
pub fn build_symlink_archive(with_target: bool) -> BuiltArchive {
    let mut layout = Layout::new();

    let root_off = layout.push_inode(vec![0u8; 32]);
    let src_off = layout.push_inode(basic_symlink_inode(2, b"tgt"));

    let mut root_entries: Vec<(u16, u32, u16, &[u8])> = vec![(src_off, 2, INODE_BASIC_SYMLINK, b"src")];

    if with_target {
        let tgt_start = layout.data_addr();
        layout.data.extend_from_slice(b"12345678");
        let tgt_off = layout.push_inode(basic_file_inode_with_blocks(3, tgt_start, 8, &[8 | UNCOMPRESSED_BLOCK_FLAG]));
        root_entries.push((tgt_off, 3, INODE_BASIC_FILE, b"tgt"));
    }

    let root_dir_off = layout.dir_flat.len() as u16;
    let root_bytes = build_directory_bytes(&root_entries);
    layout.dir_flat.extend_from_slice(&root_bytes);
    let root_file_size = 3 + root_bytes.len() as u16;

    let root_inode = basic_directory_inode(1, 0, root_dir_off, root_file_size, 1);
    layout.inode_flat[root_off as usize..root_off as usize + 32].copy_from_slice(&root_inode);

    layout.finish(root_off, 0)
}

/// `/loop` -> a symlink pointing at itself, to exercise the resolver's cycle
/// bound.
pub fn build_self_symlink_archive() -> BuiltArchive {
    let mut layout = Layout::new();

    let root_off = layout.push_inode(vec![0u8; 32]);
    let loop_off = layout.push_inode(basic_symlink_inode(2, b"loop"));

    let root_entries: Vec<(u16, u32, u16, &[u8])> = vec![(loop_off, 2, INODE_BASIC_SYMLINK, b"loop")];
    let root_dir_off = layout.dir_flat.len() as u16;
    let root_bytes = build_directory_bytes(&root_entries);
    layout.dir_flat.extend_from_slice(&root_bytes);
    let root_file_size = 3 + root_bytes.len() as u16;

    let root_inode = basic_directory_inode(1, 0, root_dir_off, root_file_size, 1);
    layout.inode_flat[root_off as usize..root_off as usize + 32].copy_from_slice(&root_inode);

    layout.finish(root_off, 0)
}

/// A basic-file inode whose content lives in `block_sizes.len()` explicit data
/// blocks starting at `blocks_start`, plus a fragment-backed tail.
fn basic_file_inode_blocks_and_fragment(
    inode_number: u32,
    blocks_start: u32,
    frag_index: u32,
    frag_block_offset: u32,
    file_size: u32,
    block_sizes: &[u32],
) -> Vec<u8> {
    let mut v = Vec::with_capacity(32 + block_sizes.len() * 4);
    v.extend_from_slice(&INODE_BASIC_FILE.to_le_bytes());
    v.extend_from_slice(&0o644u16.to_le_bytes());
    v.extend_from_slice(&0u16.to_le_bytes());
    v.extend_from_slice(&0u16.to_le_bytes());
    v.extend_from_slice(&0u32.to_le_bytes());
    v.extend_from_slice(&inode_number.to_le_bytes());
    v.extend_from_slice(&blocks_start.to_le_bytes());
    v.extend_from_slice(&frag_index.to_le_bytes());
    v.extend_from_slice(&frag_block_offset.to_le_bytes());
    v.extend_from_slice(&file_size.to_le_bytes());
    for size in block_sizes {
        v.extend_from_slice(&size.to_le_bytes());
    }
    v
}

/// `/a` (2 bytes `"a\n"`), `/b` (1,050,000 bytes of `'b'`: 256 full uncompressed
/// 4096-byte blocks plus a 1,424-byte fragment tail), `/large_dir/NNN` for `NNN`
/// in `0..count` (empty files). Exercises a file whose content crosses the
/// block/fragment boundary alongside a directory needing more than one
/// 256-entry fragment header.
pub fn build_large_file_with_fragment_archive(count: u32) -> BuiltArchive {
    let mut layout = Layout::new();

    const B_BLOCKS: u32 = 256;
    const B_TAIL: u32 = 1424;
    let b_size = BLOCK_SIZE * B_BLOCKS + B_TAIL;

    let a_start = layout.data_addr();
    layout.data.extend_from_slice(b"a\n");
    let b_start = layout.data_addr();
    layout.data.extend_from_slice(&vec![b'b'; (BLOCK_SIZE * B_BLOCKS) as usize]);
    let frag_block_start = layout.data_addr();
    layout.data.extend_from_slice(&vec![b'b'; B_TAIL as usize]);

    let root_off = layout.push_inode(vec![0u8; 32]); // placeholder, patched below
    let a_off = layout.push_inode(basic_file_inode_with_blocks(2, a_start, 2, &[2 | UNCOMPRESSED_BLOCK_FLAG]));
    let b_block_sizes: Vec<u32> = (0..B_BLOCKS).map(|_| BLOCK_SIZE | UNCOMPRESSED_BLOCK_FLAG).collect();
    let b_off = layout.push_inode(basic_file_inode_blocks_and_fragment(3, b_start, 0, 0, b_size, &b_block_sizes));
    let large_dir_off = layout.push_inode(vec![0u8; 32]); // placeholder, patched below

    let children_start_inode = 5u32;
    let names: Vec<String> = (0..count).map(|i| format!("{:03}", i)).collect();
    let mut child_offsets = Vec::with_capacity(count as usize);
    for i in 0..count {
        child_offsets.push(layout.push_inode(basic_file_inode_empty(children_start_inode + i)));
    }

    let root_entries: Vec<(u16, u32, u16, &[u8])> = vec![
        (a_off, 2, INODE_BASIC_FILE, b"a"),
        (b_off, 3, INODE_BASIC_FILE, b"b"),
        (large_dir_off, 4, INODE_BASIC_DIRECTORY, b"large_dir"),
    ];
    let root_dir_off = layout.dir_flat.len() as u16;
    let root_bytes = build_directory_bytes(&root_entries);
    layout.dir_flat.extend_from_slice(&root_bytes);
    let root_file_size = 3 + root_bytes.len() as u16;

    let child_entries: Vec<(u16, u32, u16, &[u8])> = (0..count as usize)
        .map(|i| (child_offsets[i], children_start_inode + i as u32, INODE_BASIC_FILE, names[i].as_bytes()))
        .collect();
    let large_dir_table_off = layout.dir_flat.len() as u16;
    let large_dir_bytes = build_directory_bytes(&child_entries);
    layout.dir_flat.extend_from_slice(&large_dir_bytes);
    let large_dir_file_size = 3 + large_dir_bytes.len() as u32;

    let root_inode = basic_directory_inode(1, 0, root_dir_off, root_file_size, 1);
    layout.inode_flat[root_off as usize..root_off as usize + 32].copy_from_slice(&root_inode);
    let large_dir_inode = basic_directory_inode(4, 0, large_dir_table_off, large_dir_file_size as u16, 1);
    layout.inode_flat[large_dir_off as usize..large_dir_off as usize + 32].copy_from_slice(&large_dir_inode);

    layout.frag_flat.extend_from_slice(&(frag_block_start as u64).to_le_bytes());
    layout.frag_flat.extend_from_slice(&(B_TAIL | UNCOMPRESSED_BLOCK_FLAG).to_le_bytes());
    layout.frag_flat.extend_from_slice(&0u32.to_le_bytes());

    layout.finish(root_off, 1)
}

/// `/small` is a 5-byte file stored entirely as a fragment tail (no explicit
/// data blocks), backed by a single fragment table entry.
pub fn build_fragment_archive() -> BuiltArchive {
    let mut layout = Layout::new();

    let frag_block_start = layout.data_addr();
    layout.data.extend_from_slice(b"hello");

    let root_off = layout.push_inode(vec![0u8; 32]);
    let small_off = layout.push_inode(basic_file_inode_fragment_only(2, 0, 0, 5));

    let root_entries: Vec<(u16, u32, u16, &[u8])> = vec![(small_off, 2, INODE_BASIC_FILE, b"small")];
    let root_dir_off = layout.dir_flat.len() as u16;
    let root_bytes = build_directory_bytes(&root_entries);
    layout.dir_flat.extend_from_slice(&root_bytes);
    let root_file_size = 3 + root_bytes.len() as u16;

    let root_inode = basic_directory_inode(1, 0, root_dir_off, root_file_size, 1);
    layout.inode_flat[root_off as usize..root_off as usize + 32].copy_from_slice(&root_inode);

    // fragment table entry: (block_start: u64, size_with_uncompressed_flag: u32, unused pad: u32)
    layout.frag_flat.extend_from_slice(&(frag_block_start as u64).to_le_bytes());
    layout.frag_flat.extend_from_slice(&((5u32) | UNCOMPRESSED_BLOCK_FLAG).to_le_bytes());
    layout.frag_flat.extend_from_slice(&0u32.to_le_bytes());

    layout.finish(root_off, 1)
}

/// `/big`, a two-block file with a 32768-byte block size: the first block
/// stores only 1000 bytes of `0xa1` (the rest of the block is implied zero
/// padding, since its stored size is short of `block_size` and it isn't the
/// last block); the second, final block stores 5 bytes `1, 2, 3, 4, 5`. Built
/// by hand rather than through [`Layout`], since it needs a block size other
/// than the `BLOCK_SIZE` constant every other builder in this module shares.
pub fn build_two_block_sparse_archive() -> BuiltArchive {
    const SB_SIZE_U64: u64 = SB_SIZE as u64;
    const FILE_BLOCK_SIZE: u32 = 32768;
    const FILE_BLOCK_LOG: u16 = 15;

    let mut first_block = vec![0xa1u8; 1000];
    let second_block = vec![1u8, 2, 3, 4, 5];

    let data_start = SB_SIZE_U64 as u32;
    let mut data = Vec::new();
    data.append(&mut first_block);
    data.extend_from_slice(&second_block);

    let id_table_location = SB_SIZE_U64 + data.len() as u64;
    let id_bytes = id_table_bytes(id_table_location);
    let inode_table_location = id_table_location + id_bytes.len() as u64;

    let file_size = FILE_BLOCK_SIZE as u64 + second_block.len() as u64;
    let file_inode = basic_file_inode_with_blocks(
        2,
        data_start,
        file_size as u32,
        &[1000 | UNCOMPRESSED_BLOCK_FLAG, (second_block.len() as u32) | UNCOMPRESSED_BLOCK_FLAG],
    );
    let root_inode = basic_directory_inode(1, 0, 0, 0, 1); // file_size patched below

    let mut inode_flat = Vec::new();
    inode_flat.extend_from_slice(&root_inode);
    let file_inode_off = inode_flat.len() as u16;
    inode_flat.extend_from_slice(&file_inode);

    let root_entries: Vec<(u16, u32, u16, &[u8])> = vec![(file_inode_off, 2, INODE_BASIC_FILE, b"big")];
    let root_bytes = build_directory_bytes(&root_entries);
    let root_file_size = 3 + root_bytes.len() as u16;
    // Patch the root inode's file_size field (bytes 24..26) now that it's known.
    inode_flat[24..26].copy_from_slice(&root_file_size.to_le_bytes());

    let inode_stream = pack_metablock_stream(&inode_flat);
    let dir_table_location = inode_table_location + inode_stream.len() as u64;
    let dir_stream = pack_metablock_stream(&root_bytes);

    let sb = write_superblock_with_block_size(
        &SuperBlockFields {
            inode_count: 2,
            root_inode: 0,
            id_table: id_table_location,
            inode_table: inode_table_location,
            dir_table: dir_table_location,
            frag_table: NOT_SET,
            frag_count: 0,
        },
        FILE_BLOCK_SIZE,
        FILE_BLOCK_LOG,
    );

    let mut bytes = Vec::new();
    bytes.extend_from_slice(&sb);
    bytes.extend_from_slice(&data);
    bytes.extend_from_slice(&id_bytes);
    bytes.extend_from_slice(&inode_stream);
    bytes.extend_from_slice(&dir_stream);

    BuiltArchive { bytes }
}

/// `/sparse`, a fully-sparse 10 MiB file: every data block is a zero-size
/// ("sparse hole") table entry and none of them have any bytes on disk at all.
/// Block size is 16384 so the file divides evenly into 640 blocks, each
/// reconstructed by [`sqsh::file::FileIterator`] as one all-zero chunk.
pub fn build_fully_sparse_file_archive() -> BuiltArchive {
    const SB_SIZE_U64: u64 = SB_SIZE as u64;
    const FILE_BLOCK_SIZE: u32 = 16384;
    const FILE_BLOCK_LOG: u16 = 14;
    const FILE_SIZE: u32 = 10 * 1024 * 1024;
    const BLOCK_COUNT: u32 = FILE_SIZE / FILE_BLOCK_SIZE;

    let id_table_location = SB_SIZE_U64;
    let id_bytes = id_table_bytes(id_table_location);
    let inode_table_location = id_table_location + id_bytes.len() as u64;

    let block_sizes = vec![0u32; BLOCK_COUNT as usize];
    let file_inode = basic_file_inode_with_blocks(2, 0, FILE_SIZE, &block_sizes);
    let root_inode = basic_directory_inode(1, 0, 0, 0, 1); // file_size patched below

    let mut inode_flat = Vec::new();
    inode_flat.extend_from_slice(&root_inode);
    let file_inode_off = inode_flat.len() as u16;
    inode_flat.extend_from_slice(&file_inode);

    let root_entries: Vec<(u16, u32, u16, &[u8])> = vec![(file_inode_off, 2, INODE_BASIC_FILE, b"sparse")];
    let root_bytes = build_directory_bytes(&root_entries);
    let root_file_size = 3 + root_bytes.len() as u16;
    inode_flat[24..26].copy_from_slice(&root_file_size.to_le_bytes());

    let inode_stream = pack_metablock_stream(&inode_flat);
    let dir_table_location = inode_table_location + inode_stream.len() as u64;
    let dir_stream = pack_metablock_stream(&root_bytes);

    let sb = write_superblock_with_block_size(
        &SuperBlockFields {
            inode_count: 2,
            root_inode: 0,
            id_table: id_table_location,
            inode_table: inode_table_location,
            dir_table: dir_table_location,
            frag_table: NOT_SET,
            frag_count: 0,
        },
        FILE_BLOCK_SIZE,
        FILE_BLOCK_LOG,
    );

    let mut bytes = Vec::new();
    bytes.extend_from_slice(&sb);
    bytes.extend_from_slice(&id_bytes);
    bytes.extend_from_slice(&inode_stream);
    bytes.extend_from_slice(&dir_stream);

    BuiltArchive { bytes }
}
