//! Container formats and the entry adapter seam
//!
//! [`EntrySink`] and [`EntrySource`] are the only things the walker and the
//! extractor know about a container. The 7z and ZIP adapters implement them.

use crate::entry::ArchiveEntry;
use crate::error::{ArchiveError, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// 7z signature: `'7' 'z' BC AF 27 1C`
const SEVENZ_MAGIC: [u8; 6] = [0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C];

/// Supported container formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveFormat {
    SevenZ,
    Zip,
}

impl ArchiveFormat {
    /// Pick the format from the archive extension (case-insensitive)
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "7z" => Some(ArchiveFormat::SevenZ),
            "zip" => Some(ArchiveFormat::Zip),
            _ => None,
        }
    }

    /// Identify a container from its leading bytes
    pub fn from_magic(header: &[u8]) -> Option<Self> {
        if header.starts_with(&SEVENZ_MAGIC) {
            Some(ArchiveFormat::SevenZ)
        } else if header.starts_with(b"PK\x03\x04") || header.starts_with(b"PK\x05\x06") {
            Some(ArchiveFormat::Zip)
        } else {
            None
        }
    }

    /// Resolve the format of an existing archive: extension first, then magic bytes.
    pub fn detect(path: &Path) -> Result<Self> {
        if let Some(format) = Self::from_path(path) {
            return Ok(format);
        }
        let mut header = Vec::with_capacity(SEVENZ_MAGIC.len());
        File::open(path)
            .and_then(|f| f.take(SEVENZ_MAGIC.len() as u64).read_to_end(&mut header))
            .map_err(|e| ArchiveError::io(path, e))?;
        Self::from_magic(&header).ok_or_else(|| ArchiveError::UnknownFormat(path.to_path_buf()))
    }

    /// Conventional file extension, without the dot
    pub fn extension(self) -> &'static str {
        match self {
            ArchiveFormat::SevenZ => "7z",
            ArchiveFormat::Zip => "zip",
        }
    }
}

impl std::fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for ArchiveFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "7z" | "sevenz" => Ok(ArchiveFormat::SevenZ),
            "zip" => Ok(ArchiveFormat::Zip),
            other => Err(format!("unknown archive format '{}' (expected 7z or zip)", other)),
        }
    }
}

/// Write side of a container.
///
/// A sink exclusively owns its output file. `finish` consumes it, so the
/// container trailer is written exactly once; a sink dropped without
/// `finish` leaves an unreadable archive behind.
pub trait EntrySink {
    /// Append one entry. `origin` is the filesystem path the entry was read
    /// from; adapters use it for metadata and to attribute read failures.
    fn put_entry(&mut self, entry: ArchiveEntry<'_>, origin: &Path) -> Result<()>;

    /// Write the container trailer and close the file.
    fn finish(self) -> Result<()>;
}

/// Read side of a container: sequential iteration over its entries.
pub trait EntrySource {
    /// Call `visit` for each entry in archive order. The entry's content
    /// stream is only valid during the call. The first error stops iteration
    /// and is returned.
    fn for_each_entry(
        &mut self,
        visit: &mut dyn FnMut(ArchiveEntry<'_>) -> Result<()>,
    ) -> Result<()>;
}
