//! Command-line front end for s-pack.

mod cli;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use cli::{Cli, Command, CompressArgs, DecompressArgs};
use s_pack::{ArchiveFormat, PackOptions};

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_env("S_PACK_LOG")
        .format_timestamp(None)
        .init();

    match &cli.command {
        Command::Compress(args) => compress(args),
        Command::Decompress(args) => decompress(args),
        Command::List { archive } => {
            let entries = s_pack::list(archive)
                .with_context(|| format!("failed to list {}", archive.display()))?;
            for entry in entries {
                match entry.size {
                    Some(size) if !entry.is_directory => println!("{:>12}  {}", size, entry.name),
                    _ => println!("{:>12}  {}", "", entry.name),
                }
            }
            Ok(())
        }
    }
}

fn compress(args: &CompressArgs) -> Result<()> {
    let (sources, archive) = args
        .sources_and_archive()
        .ok_or_else(|| anyhow!("expected at least one source and an archive path"))?;
    if sources.is_empty() {
        bail!("nothing to pack: give at least one source before the archive path");
    }
    let format = match args.format {
        Some(format) => format,
        None => ArchiveFormat::from_path(archive).ok_or_else(|| {
            anyhow!(
                "cannot tell the format of {} from its extension; pass --format",
                archive.display()
            )
        })?,
    };

    s_pack::compress_all(sources, archive, format, &args.options())
        .with_context(|| format!("failed to create {}", archive.display()))?;
    Ok(())
}

fn decompress(args: &DecompressArgs) -> Result<()> {
    let files = match args.format {
        Some(format) => {
            s_pack::decompress_with(&args.archive, &args.dest, format, &PackOptions::default())
        }
        None => s_pack::decompress(&args.archive, &args.dest),
    }
    .with_context(|| format!("failed to extract {}", args.archive.display()))?;

    for path in files {
        println!("{}", path.display());
    }
    Ok(())
}
