//! Concurrency and caching primitives shared by every layer above the source driver.

pub mod addr_lru;
pub mod addr_rc_map;
pub mod lru;
pub mod rc_map;
