//! Id table: maps an inode's uid/gid *index* (stored in the inode header) to a
//! real 32-bit uid or gid.

use deku::prelude::*;

#[derive(Debug, Copy, Clone, DekuRead, PartialEq, Eq)]
#[deku(endian = "little")]
pub struct Id {
    pub num: u32,
}

impl Id {
    pub const SIZE: usize = 4;
}
