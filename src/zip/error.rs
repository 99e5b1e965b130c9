//! Error types for the ZIP codec

use std::io;

/// Result type for ZIP codec operations
pub type Result<T> = std::result::Result<T, ZipError>;

/// Errors raised while encoding or decoding the ZIP container itself.
///
/// These carry no path context; the ZIP adapter maps them into
/// [`ArchiveError`](crate::ArchiveError) once it knows which file was involved.
#[derive(Debug)]
pub enum ZipError {
    /// I/O error
    Io(io::Error),
    /// Invalid ZIP format or structure
    InvalidFormat(String),
    /// Entry not found in ZIP archive
    EntryNotFound(String),
    /// Unsupported compression method
    UnsupportedCompression(u16),
    /// Entry name cannot be represented in the name codepage
    UnmappableName(String),
    /// Entry is encrypted; passwords are not supported
    Encrypted(String),
}

impl ZipError {
    /// True when the error means the archive bytes are damaged rather than
    /// the underlying device failing.
    pub fn is_corruption(&self) -> bool {
        match self {
            ZipError::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::UnexpectedEof | io::ErrorKind::InvalidData
            ),
            ZipError::InvalidFormat(_) => true,
            ZipError::EntryNotFound(_)
            | ZipError::UnsupportedCompression(_)
            | ZipError::UnmappableName(_)
            | ZipError::Encrypted(_) => false,
        }
    }
}

impl std::fmt::Display for ZipError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ZipError::Io(e) => write!(f, "I/O error: {}", e),
            ZipError::InvalidFormat(msg) => write!(f, "Invalid ZIP format: {}", msg),
            ZipError::EntryNotFound(name) => write!(f, "Entry not found: {}", name),
            ZipError::UnsupportedCompression(method) => {
                write!(f, "Unsupported compression method: {}", method)
            }
            ZipError::UnmappableName(name) => {
                write!(f, "Entry name not representable in GBK: {}", name)
            }
            ZipError::Encrypted(name) => write!(f, "Entry is encrypted: {}", name),
        }
    }
}

impl std::error::Error for ZipError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ZipError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ZipError {
    fn from(err: io::Error) -> Self {
        ZipError::Io(err)
    }
}
