//! Export table: maps an inode *number* to its packed inode reference, for NFS
//! export support. Entries are indexed `inode_number - 1`.

use deku::prelude::*;

#[derive(Debug, Copy, Clone, DekuRead, PartialEq, Eq)]
#[deku(endian = "little")]
pub struct Export {
    pub num: u64,
}

impl Export {
    pub const SIZE: usize = 8;
}
