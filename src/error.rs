//! Error types for s-pack

use std::io;
use std::path::{Path, PathBuf};

/// Result type for s-pack operations
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Error types that can occur while packing or unpacking an archive
///
/// A failed call leaves the filesystem exactly as it was when the error was
/// hit: partial archives and already extracted files are not cleaned up.
#[derive(Debug)]
pub enum ArchiveError {
    /// The path to pack or the archive to unpack does not exist
    SourceNotFound(PathBuf),
    /// Reading or writing a specific file failed
    Io { path: PathBuf, source: io::Error },
    /// The container is malformed, truncated, or fails its checksums
    CorruptArchive { path: PathBuf, reason: String },
    /// The entry cannot be represented by the format or safely extracted
    UnsupportedEntry { name: String, reason: String },
    /// Neither the extension nor the leading bytes identify a known container
    UnknownFormat(PathBuf),
}

impl ArchiveError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ArchiveError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(path: &Path, reason: impl ToString) -> Self {
        ArchiveError::CorruptArchive {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn unsupported(name: impl Into<String>, reason: impl Into<String>) -> Self {
        ArchiveError::UnsupportedEntry {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Classify an error raised while reading archive bytes.
    ///
    /// Decoders report damaged input as `InvalidData` or `UnexpectedEof`; those
    /// become [`ArchiveError::CorruptArchive`], anything else stays an I/O error.
    pub(crate) fn archive_read(path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => {
                ArchiveError::corrupt(path, source)
            }
            _ => ArchiveError::io(path, source),
        }
    }
}

/// Reclassify an error coming out of a decompressor.
///
/// Only errors from the operating system describe the device; anything a
/// decoder raises on its own (flate2 uses `InvalidInput` for a corrupt
/// stream) means the compressed bytes are damaged.
pub(crate) fn decode_error(err: io::Error) -> io::Error {
    if err.raw_os_error().is_some()
        || matches!(
            err.kind(),
            io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof | io::ErrorKind::Interrupted
        )
    {
        err
    } else {
        io::Error::new(io::ErrorKind::InvalidData, err)
    }
}

/// Read adapter applying [`decode_error`] to every failed read
pub(crate) struct DecodeErrors<R>(pub(crate) R);

impl<R: io::Read> io::Read for DecodeErrors<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf).map_err(decode_error)
    }
}

impl std::fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArchiveError::SourceNotFound(path) => {
                write!(f, "Source not found: {}", path.display())
            }
            ArchiveError::Io { path, source } => {
                write!(f, "I/O error on '{}': {}", path.display(), source)
            }
            ArchiveError::CorruptArchive { path, reason } => {
                write!(f, "Corrupt archive '{}': {}", path.display(), reason)
            }
            ArchiveError::UnsupportedEntry { name, reason } => {
                write!(f, "Unsupported entry '{}': {}", name, reason)
            }
            ArchiveError::UnknownFormat(path) => {
                write!(f, "Unknown archive format: {}", path.display())
            }
        }
    }
}

impl std::error::Error for ArchiveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ArchiveError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncated_reads_are_corruption() {
        let err = ArchiveError::archive_read(
            Path::new("a.zip"),
            io::Error::new(io::ErrorKind::UnexpectedEof, "short read"),
        );
        assert!(matches!(err, ArchiveError::CorruptArchive { .. }));

        let err = ArchiveError::archive_read(
            Path::new("a.zip"),
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, ArchiveError::Io { .. }));
    }

    #[test]
    fn decoder_complaints_become_invalid_data() {
        let err = decode_error(io::Error::new(
            io::ErrorKind::InvalidInput,
            "corrupt deflate stream",
        ));
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(matches!(
            ArchiveError::archive_read(Path::new("a.zip"), err),
            ArchiveError::CorruptArchive { .. }
        ));

        let os = decode_error(io::Error::from_raw_os_error(5));
        assert_eq!(os.raw_os_error(), Some(5));
    }

    #[test]
    fn display_names_the_path() {
        let err = ArchiveError::io("dir/file.bin", io::Error::other("disk full"));
        assert_eq!(err.to_string(), "I/O error on 'dir/file.bin': disk full");
        assert!(std::error::Error::source(&err).is_some());
    }
}
