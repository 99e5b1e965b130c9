use clap::{Args, Parser, Subcommand};
use s_pack::{ArchiveFormat, CompressionMethod, PackOptions};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "s-pack")]
#[command(version)]
#[command(about = "Pack directory trees into 7z or ZIP archives and unpack them", long_about = None)]
#[command(after_help = "Examples:\n  \
  s-pack compress /opt/image /opt/image.7z     pack a directory into a 7z archive\n  \
  s-pack compress a.txt logs/ bundle.zip       pack several roots into one ZIP\n  \
  s-pack decompress /opt/image.zip /opt/test   unpack and print the extracted files")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// More log output (-v info, -vv debug)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only print errors
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Pack files and directories into an archive
    Compress(CompressArgs),
    /// Unpack an archive into a directory
    Decompress(DecompressArgs),
    /// List the entries of an archive
    List {
        /// Archive to inspect
        #[arg(value_name = "ARCHIVE")]
        archive: PathBuf,
    },
}

#[derive(Args, Debug)]
pub struct CompressArgs {
    /// Files or directories to pack, followed by the archive path
    #[arg(value_name = "PATH", num_args = 2.., required = true)]
    pub paths: Vec<PathBuf>,

    /// Archive format (default: from the archive extension)
    #[arg(short = 'f', long, value_name = "7z|zip")]
    pub format: Option<ArchiveFormat>,

    /// ZIP compression level (0-9)
    #[arg(short = 'l', long, value_name = "LEVEL", default_value_t = 6)]
    pub level: u32,

    /// Store ZIP entries without compression
    #[arg(long)]
    pub store: bool,

    /// Streaming buffer size in bytes
    #[arg(long, value_name = "BYTES")]
    pub chunk_size: Option<usize>,
}

#[derive(Args, Debug)]
pub struct DecompressArgs {
    /// Archive to unpack
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Destination directory (created if missing)
    #[arg(value_name = "DEST")]
    pub dest: PathBuf,

    /// Archive format (default: from extension, then file signature)
    #[arg(short = 'f', long, value_name = "7z|zip")]
    pub format: Option<ArchiveFormat>,
}

impl CompressArgs {
    /// Split the positional paths into sources and the archive
    pub fn sources_and_archive(&self) -> Option<(&[PathBuf], &PathBuf)> {
        let (archive, sources) = self.paths.split_last()?;
        Some((sources, archive))
    }

    pub fn options(&self) -> PackOptions {
        let mut options = if self.store {
            PackOptions::default().with_zip_method(CompressionMethod::Stored, 0)
        } else {
            PackOptions::default().with_zip_method(CompressionMethod::Deflate, self.level)
        };
        if let Some(chunk_size) = self.chunk_size {
            options = options.with_chunk_size(chunk_size);
        }
        options
    }
}

impl Cli {
    /// Log filter implied by -q / -v
    pub fn log_level(&self) -> log::LevelFilter {
        if self.quiet {
            return log::LevelFilter::Error;
        }
        match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        }
    }
}
