//! Per-call configuration

use crate::chunk::CHUNK_SIZE;
use crate::zip::CompressionMethod;

/// Options shared by packing and unpacking.
///
/// There is no global configuration; every call takes its options explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackOptions {
    /// Buffer size for streaming file bodies (bytes, at least 1)
    pub chunk_size: usize,
    /// Compression method for ZIP file entries (directory markers are always stored)
    pub zip_method: CompressionMethod,
    /// Compression level for ZIP file entries (0-9 for DEFLATE, 1-21 for Zstd)
    pub zip_level: u32,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            zip_method: CompressionMethod::Deflate,
            zip_level: 6,
        }
    }
}

impl PackOptions {
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_zip_method(mut self, method: CompressionMethod, level: u32) -> Self {
        self.zip_method = method;
        self.zip_level = level;
        self
    }

    /// Allocate the per-call transfer buffer
    pub(crate) fn chunk_buffer(&self) -> Vec<u8> {
        vec![0u8; self.chunk_size.max(1)]
    }
}
