//! Shared argument parsing and archive-opening glue for the `sqsh-cat`,
//! `sqsh-ls`, and `sqsh-stat` binaries.
//!
//! These tools are deliberately thin: they resolve a path through
//! [`sqsh::resolver::PathResolver`] or walk [`sqsh::resolver::TreeTraversal`] and
//! print what they find. All the actual archive logic lives in the `sqsh` crate.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Args;
use sqsh::{Archive, Locator, SqshError};

/// Options shared by every binary: the archive locator and the tuning knobs from
/// the library's `Config`.
#[derive(Args, Debug)]
pub struct CommonArgs {
    /// Path to a local SquashFS image, or an `http(s)://` URL to one served with
    /// byte-range support.
    pub archive: String,

    /// Overrides the size probe; required when the archive locator cannot report
    /// its own size.
    #[arg(long)]
    pub source_size: Option<u64>,

    /// Overrides the source driver's block-size hint for the block mapper.
    #[arg(long)]
    pub mapper_block_size: Option<u32>,

    /// Blocks retained in the map manager's LRU.
    #[arg(long, default_value_t = 32)]
    pub mapper_lru_size: usize,

    /// Uncompressed buffers retained per extract manager's LRU.
    #[arg(long, default_value_t = 128)]
    pub compression_lru_size: usize,

    /// Limit for symlink chains followed while resolving a path.
    #[arg(long, default_value_t = 100)]
    pub max_symlink_depth: u32,
}

impl CommonArgs {
    pub fn config(&self) -> sqsh::Config {
        sqsh::Config {
            source_size: self.source_size,
            mapper_block_size: self.mapper_block_size,
            mapper_lru_size: self.mapper_lru_size,
            compression_lru_size: self.compression_lru_size,
            max_symlink_depth: self.max_symlink_depth,
        }
    }

    pub fn open(&self) -> sqsh::Result<Arc<Archive>> {
        let locator = Locator::parse_str(&self.archive);
        Archive::open(locator, self.config())
    }
}

pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .init();
}

/// Prints `err`'s error-kind name to stderr (the diagnostic format spec §6
/// prescribes) and maps it to a non-zero process exit code.
pub fn report_error(err: SqshError) -> ExitCode {
    eprintln!("sqsh: {}: {err}", err.kind_name());
    ExitCode::FAILURE
}
