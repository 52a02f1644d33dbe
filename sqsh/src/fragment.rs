//! Fragment table: one entry per shared tail block, addressed by the `frag_index`
//! stored in a regular file's inode.

use deku::prelude::*;

use crate::compressor::DataSize;

#[derive(Debug, Copy, Clone, DekuRead, PartialEq, Eq)]
#[deku(endian = "little")]
pub struct Fragment {
    pub start: u64,
    pub size: DataSize,
    pub unused: u32,
}

impl Fragment {
    pub const SIZE: usize = 16;
}
