//! `sqsh-stat archive path...`: prints an inode's metadata, one entry per line,
//! the way `stat(1)` does for a real filesystem.

use std::process::ExitCode;

use clap::Parser;
use sqsh::resolver::PathResolver;
use sqsh::FileType;
use sqsh_cli::{init_logging, report_error, CommonArgs};

#[derive(Parser, Debug)]
#[command(about = "Print inode metadata for a path inside a SquashFS image")]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[arg(required = true)]
    path: Vec<String>,

    /// Do not follow a trailing symlink chain when resolving each path.
    #[arg(long)]
    no_follow_symlinks: bool,
}

fn type_name(t: FileType) -> &'static str {
    match t {
        FileType::Directory => "directory",
        FileType::File => "regular file",
        FileType::Symlink => "symbolic link",
        FileType::BlockDevice => "block device",
        FileType::CharDevice => "character device",
        FileType::Fifo => "fifo",
        FileType::Socket => "socket",
    }
}

fn run(cli: Cli) -> sqsh::Result<()> {
    let archive = cli.common.open()?;

    for path in &cli.path {
        let mut resolver = PathResolver::new(archive.clone())?;
        resolver.resolve(path.as_bytes(), !cli.no_follow_symlinks)?;
        let inode = resolver.open_file()?;

        println!("  File: {path}");
        println!("  Type: {}", type_name(inode.file_type()));
        println!("  Size: {}", inode.size());
        println!("  Mode: {:o}", inode.permissions());
        println!("   Uid: {}", archive.resolve_id(inode.header.uid_idx)?);
        println!("   Gid: {}", archive.resolve_id(inode.header.gid_idx)?);
        println!(" Inode: {}", inode.inode_number());
        println!(" Mtime: {}", inode.mtime());

        if let Some(target) = inode.symlink_target() {
            println!("Target: {}", String::from_utf8_lossy(target));
        }

        let xattrs = archive.xattrs_for(&inode)?;
        if !xattrs.is_empty() {
            println!(" Xattr:");
            for entry in xattrs {
                println!("    {}: {} bytes", String::from_utf8_lossy(&entry.fullname()), entry.value.len());
            }
        }
        println!();
    }

    archive.close();
    Ok(())
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report_error(e),
    }
}
