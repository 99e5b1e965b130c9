//! # s-pack: Recursive Archive Packer
//!
//! `s-pack` packs a file or a whole directory tree into a single 7z or ZIP
//! archive, and unpacks such an archive back into a directory.
//!
//! ## Features
//!
//! - **Recursive**: Every regular file becomes one entry named by its path
//!   relative to the source root's parent
//! - **Empty Directories**: Kept as explicit directory markers and restored
//! - **Streaming**: File bodies move in fixed-size chunks (5 MiB by default),
//!   never loaded whole
//! - **Fixed Codepage**: ZIP entry names are always written and read as GBK
//! - **Safe Extraction**: Entry names that would escape the destination are
//!   refused
//!
//! ## Quick Start
//!
//! ### Packing a directory
//!
//! ```no_run
//! s_pack::compress("/opt/image", "/opt/image.7z")?;
//! s_pack::compress("/opt/image", "/opt/image.zip")?;
//! # Ok::<(), s_pack::ArchiveError>(())
//! ```
//!
//! ### Unpacking an archive
//!
//! ```no_run
//! let files = s_pack::decompress("/opt/image.zip", "/opt/test")?;
//! for path in &files {
//!     println!("{}", path.display());
//! }
//! # Ok::<(), s_pack::ArchiveError>(())
//! ```
//!
//! ### Tuning a call
//!
//! ```no_run
//! use s_pack::{ArchiveFormat, CompressionMethod, PackOptions};
//!
//! let options = PackOptions::default()
//!     .with_chunk_size(1 << 20)
//!     .with_zip_method(CompressionMethod::Stored, 0);
//! s_pack::compress_all(&["/opt/a", "/opt/b"], "/opt/both.zip", ArchiveFormat::Zip, &options)?;
//! # Ok::<(), s_pack::ArchiveError>(())
//! ```

pub mod chunk;
pub mod entry;
pub mod error;
pub mod format;
pub mod options;
pub mod pack;
pub mod sevenz;
pub mod unpack;
pub mod walk;
pub mod zip;

pub use chunk::CHUNK_SIZE;
pub use entry::{sanitize_entry_name, ArchiveEntry, ListedEntry};
pub use error::{ArchiveError, Result};
pub use format::{ArchiveFormat, EntrySink, EntrySource};
pub use options::PackOptions;
pub use pack::{compress, compress_all, compress_with};
pub use sevenz::{SevenZSink, SevenZSource};
pub use unpack::{decompress, decompress_with, list};
pub use walk::{SourceNode, SourceWalk};
pub use zip::{
    CompressionMethod, StreamingZipReader, StreamingZipWriter, ZipEntry, ZipError, ZipSink,
    ZipSource, NAME_ENCODING,
};
