//! `sqsh`: a read-only, lazily-decompressing library for SquashFS 4.0 filesystem
//! images, backed by a local file (via memory map), an in-memory buffer, or an
//! HTTP server that supports byte-range requests.
//!
//! The entry point is [`archive::Archive::open`]. From there, [`easy`] offers
//! allocation-owning one-shot helpers (`easy_file_content`, `easy_directory_list`,
//! ...) for callers that just want a path in and bytes out; [`resolver`] exposes
//! the underlying cursor-based path walker and stack-based tree traversal for
//! callers that want to stream or interleave work across many entries.
//!
//! Every other module is the layered cache/decompression stack those two
//! surfaces are built from: [`source`] abstracts the byte backend, [`mapper`]
//! caches fixed-size blocks pulled from it, [`extract`] memoises decompressed
//! buffers, [`metablock`] implements the 8 KiB chunked stream every metadata
//! table rides on, and [`file`] / [`directory`] / [`table`] read file content,
//! directory entries, and the id/fragment/export/xattr tables respectively.

pub mod archive;
pub mod compressor;
pub mod directory;
pub mod easy;
pub mod error;
pub mod export;
pub mod extract;
pub mod file;
pub mod fragment;
pub mod id;
pub mod inode;
pub mod inode_map;
pub mod mapper;
pub mod metablock;
pub mod primitive;
pub mod resolver;
pub mod source;
pub mod superblock;
pub mod table;
pub mod xattr;

pub use archive::Archive;
pub use compressor::Compressor;
pub use error::{Result, SqshError};
pub use inode::{FileType, Inode, InodeRef};
pub use resolver::{PathResolver, TraversalEntry, TraversalEvent, TreeTraversal};
pub use source::{Config, Locator};
