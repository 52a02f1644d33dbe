//! `sqsh-ls archive path...`: lists directory entries, or recurses with `-R`.

use std::process::ExitCode;

use clap::Parser;
use sqsh::resolver::{PathResolver, TraversalEvent, TreeTraversal};
use sqsh::FileType;
use sqsh_cli::{init_logging, report_error, CommonArgs};

#[derive(Parser, Debug)]
#[command(about = "List directory entries inside a SquashFS image")]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// Directories to list; defaults to the archive root.
    path: Vec<String>,

    /// Recurse into subdirectories, printing one path per line.
    #[arg(short = 'R', long)]
    recursive: bool,
}

fn run(cli: Cli) -> sqsh::Result<()> {
    let archive = cli.common.open()?;
    let paths = if cli.path.is_empty() { vec!["/".to_string()] } else { cli.path };

    for path in &paths {
        if cli.recursive {
            let mut resolver = PathResolver::new(archive.clone())?;
            resolver.resolve(path.as_bytes(), true)?;
            let root_ref = resolver.current_inode_ref();
            let root_type = resolver.current_file_type();
            let mut traversal = TreeTraversal::new(archive.clone(), root_ref, root_type, usize::MAX);
            while let Some(entry) = traversal.next()? {
                if matches!(entry.event, TraversalEvent::File | TraversalEvent::DirectoryBegin) && !entry.path.is_empty() {
                    println!("{}", String::from_utf8_lossy(&entry.path));
                }
            }
        } else {
            let mut resolver = PathResolver::new(archive.clone())?;
            resolver.resolve(path.as_bytes(), true)?;
            let inode = resolver.open_file()?;
            if inode.file_type() != FileType::Directory {
                println!("{path}");
                continue;
            }
            for name in sqsh::easy::easy_directory_list(&archive, path.as_bytes())? {
                println!("{name}");
            }
        }
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
