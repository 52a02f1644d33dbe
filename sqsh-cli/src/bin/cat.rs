//! `sqsh-cat [-o offset] archive path...`: writes the content of one or more
//! files to stdout, concatenated in argument order.

use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use sqsh_cli::{init_logging, report_error, CommonArgs};

#[derive(Parser, Debug)]
#[command(about = "Print the content of files inside a SquashFS image")]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// Byte offset into each file to start reading from.
    #[arg(short = 'o', long, default_value_t = 0)]
    offset: u64,

    /// Paths inside the archive, each resolved independently.
    #[arg(required = true)]
    path: Vec<String>,

    /// Do not follow a trailing symlink chain when resolving each path.
    #[arg(long)]
    no_follow_symlinks: bool,
}

fn run(cli: Cli) -> sqsh::Result<()> {
    let archive = cli.common.open()?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for path in &cli.path {
        let content = sqsh::easy::easy_file_content(&archive, path.as_bytes(), !cli.no_follow_symlinks)?;
        let offset = cli.offset as usize;
        let slice = content.get(offset..).unwrap_or(&[]);
        out.write_all(slice).map_err(sqsh::SqshError::StdIo)?;
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
