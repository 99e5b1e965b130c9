//! ZIP container support
//!
//! [`StreamingZipWriter`] and [`StreamingZipReader`] are a self-contained
//! streaming ZIP codec (DEFLATE, STORED, optional Zstd, ZIP64). [`ZipSink`] and
//! [`ZipSource`] adapt it to the generic entry model.
//!
//! Entry names are encoded in [`NAME_ENCODING`] (GBK), on write and on read.

pub mod codepage;
pub mod error;
pub mod reader;
pub mod writer;

pub use codepage::NAME_ENCODING;
pub use error::ZipError;
pub use reader::{StreamingZipReader, ZipEntry};
pub use writer::{CompressionMethod, StreamingZipWriter};

use crate::chunk::{for_each_chunk, ChunkError};
use crate::entry::ArchiveEntry;
use crate::error::{ArchiveError, Result};
use crate::format::{EntrySink, EntrySource};
use crate::options::PackOptions;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Map a codec error onto the archive error model, attributing it to `path`.
fn zip_error(path: &Path, name: &str, err: ZipError) -> ArchiveError {
    match err {
        ZipError::Io(e) => ArchiveError::io(path, e),
        ZipError::UnmappableName(_) => {
            ArchiveError::unsupported(name, "name cannot be encoded in GBK")
        }
        ZipError::UnsupportedCompression(method) => {
            ArchiveError::unsupported(name, format!("compression method {}", method))
        }
        ZipError::Encrypted(_) => ArchiveError::unsupported(name, "encrypted entry"),
        err @ (ZipError::InvalidFormat(_) | ZipError::EntryNotFound(_)) => {
            ArchiveError::corrupt(path, err)
        }
    }
}

/// Same as [`zip_error`] for the read side, where truncation means corruption
fn zip_read_error(path: &Path, name: &str, err: ZipError) -> ArchiveError {
    if err.is_corruption() {
        ArchiveError::corrupt(path, err)
    } else {
        zip_error(path, name, err)
    }
}

/// Writes entries into a ZIP file
pub struct ZipSink {
    path: PathBuf,
    writer: StreamingZipWriter<File>,
    buf: Vec<u8>,
}

impl ZipSink {
    /// Create (or truncate) the archive at `path`
    pub fn create(path: &Path, options: &PackOptions) -> Result<Self> {
        let writer = StreamingZipWriter::with_method(path, options.zip_method, options.zip_level)
            .map_err(|e| zip_error(path, "", e))?;
        Ok(Self {
            path: path.to_path_buf(),
            writer,
            buf: options.chunk_buffer(),
        })
    }
}

impl EntrySink for ZipSink {
    fn put_entry(&mut self, mut entry: ArchiveEntry<'_>, origin: &Path) -> Result<()> {
        let modified = fs::metadata(origin).and_then(|m| m.modified()).ok();
        let name = entry.name().to_string();
        let size_hint = entry.size_hint();

        let Some(content) = entry.content() else {
            return self
                .writer
                .add_directory(&name, modified)
                .map_err(|e| zip_error(&self.path, &name, e));
        };

        self.writer
            .start_entry_with_hint(&name, size_hint, modified)
            .map_err(|e| zip_error(&self.path, &name, e))?;

        let writer = &mut self.writer;
        for_each_chunk(content, &mut self.buf, |chunk| writer.write_data(chunk)).map_err(
            |e| match e {
                ChunkError::Read(e) => ArchiveError::io(origin, e),
                ChunkError::Sink(e) => zip_error(&self.path, &name, e),
            },
        )?;
        Ok(())
    }

    fn finish(self) -> Result<()> {
        let path = self.path;
        self.writer
            .finish()
            .map(drop)
            .map_err(|e| zip_error(&path, "", e))
    }
}

/// Reads entries from a ZIP file in central-directory order
pub struct ZipSource {
    path: PathBuf,
    reader: StreamingZipReader<BufReader<File>>,
}

impl ZipSource {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| ArchiveError::io(path, e))?;
        let reader = StreamingZipReader::from_reader(BufReader::new(file))
            .map_err(|e| zip_read_error(path, "", e))?;
        Ok(Self {
            path: path.to_path_buf(),
            reader,
        })
    }

    pub fn entries(&self) -> &[ZipEntry] {
        self.reader.entries()
    }
}

impl EntrySource for ZipSource {
    fn for_each_entry(
        &mut self,
        visit: &mut dyn FnMut(ArchiveEntry<'_>) -> Result<()>,
    ) -> Result<()> {
        let entries = self.reader.entries().to_vec();
        for zip_entry in &entries {
            if zip_entry.is_directory() {
                visit(ArchiveEntry::directory(zip_entry.name.as_str()))?;
                continue;
            }
            let mut content = self
                .reader
                .read_entry_streaming(zip_entry)
                .map_err(|e| zip_read_error(&self.path, &zip_entry.name, e))?;
            visit(
                ArchiveEntry::file(zip_entry.name.as_str(), &mut content)
                    .with_size_hint(Some(zip_entry.uncompressed_size)),
            )?;
        }
        Ok(())
    }
}
