//! 7z container support, backed by `sevenz-rust`
//!
//! Entry metadata (size, timestamps, attributes) is taken from the source path
//! when the entry is written. There is no name-encoding concern: 7z stores
//! names as UTF-16.

use crate::entry::ArchiveEntry;
use crate::error::{ArchiveError, DecodeErrors, Result};
use crate::format::{EntrySink, EntrySource};
use crate::options::PackOptions;
use sevenz_rust::{Password, SevenZArchiveEntry, SevenZReader, SevenZWriter};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

fn write_error(path: &Path, err: impl std::fmt::Display) -> ArchiveError {
    ArchiveError::io(path, io::Error::other(err.to_string()))
}

/// Remembers the first read error so a failure inside the 7z encoder can be
/// blamed on the source file instead of the archive.
struct TrackedRead<R> {
    inner: R,
    failure: Option<io::Error>,
}

impl<R: Read> Read for TrackedRead<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf).inspect_err(|e| {
            if self.failure.is_none() {
                self.failure = Some(io::Error::new(e.kind(), e.to_string()));
            }
        })
    }
}

/// Turns a panic inside the LZMA decoder into an `InvalidData` read error.
///
/// `sevenz-rust` indexes its buffers without bounds checks on damaged input;
/// after a caught panic the decoder state is discarded with the entry.
struct ContainPanics<R>(R);

impl<R: Read> Read for ContainPanics<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        panic::catch_unwind(AssertUnwindSafe(|| self.0.read(buf))).unwrap_or_else(|_| {
            Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "7z decoder failed on damaged data",
            ))
        })
    }
}

/// Writes entries into a 7z file
pub struct SevenZSink {
    path: PathBuf,
    writer: SevenZWriter<File>,
    chunk_size: usize,
}

impl SevenZSink {
    /// Create (or truncate) the archive at `path`
    pub fn create(path: &Path, options: &PackOptions) -> Result<Self> {
        let file = File::create(path).map_err(|e| ArchiveError::io(path, e))?;
        let writer = SevenZWriter::new(file).map_err(|e| write_error(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            writer,
            chunk_size: options.chunk_size.max(1),
        })
    }
}

impl EntrySink for SevenZSink {
    fn put_entry(&mut self, mut entry: ArchiveEntry<'_>, origin: &Path) -> Result<()> {
        // 7z flags directories with an attribute, not a trailing slash
        let name = entry.name().trim_end_matches('/').to_string();
        let archive_entry = SevenZArchiveEntry::from_path(origin, name);

        let Some(content) = entry.content() else {
            return self
                .writer
                .push_archive_entry::<&[u8]>(archive_entry, None)
                .map(drop)
                .map_err(|e| write_error(&self.path, e));
        };

        let mut source = TrackedRead {
            inner: BufReader::with_capacity(self.chunk_size, content),
            failure: None,
        };
        let result = self
            .writer
            .push_archive_entry(archive_entry, Some(&mut source))
            .map(drop);
        match (result, source.failure) {
            (Ok(()), _) => Ok(()),
            (Err(_), Some(read_failure)) => Err(ArchiveError::io(origin, read_failure)),
            (Err(e), None) => Err(write_error(&self.path, e)),
        }
    }

    fn finish(self) -> Result<()> {
        let path = self.path;
        self.writer
            .finish()
            .map(drop)
            .map_err(|e| write_error(&path, e))
    }
}

/// Reads entries from a 7z file in archive order
pub struct SevenZSource {
    path: PathBuf,
    reader: SevenZReader<File>,
}

impl SevenZSource {
    pub fn open(path: &Path) -> Result<Self> {
        // Surface permission problems as I/O errors before the decoder sees the file
        File::open(path).map_err(|e| ArchiveError::io(path, e))?;
        let reader = panic::catch_unwind(|| SevenZReader::open(path, Password::empty()))
            .map_err(|_| ArchiveError::corrupt(path, "7z header decoder failed on damaged data"))?
            .map_err(|e| ArchiveError::corrupt(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            reader,
        })
    }
}

impl EntrySource for SevenZSource {
    fn for_each_entry(
        &mut self,
        visit: &mut dyn FnMut(ArchiveEntry<'_>) -> Result<()>,
    ) -> Result<()> {
        let mut failure: Option<ArchiveError> = None;
        let mut in_visit = false;
        let caught = panic::catch_unwind(AssertUnwindSafe(|| {
            self.reader.for_each_entries(|sz_entry, content| {
                in_visit = true;
                let outcome = if sz_entry.is_directory() {
                    visit(ArchiveEntry::directory(sz_entry.name()))
                } else {
                    let mut content = DecodeErrors(ContainPanics(content));
                    visit(
                        ArchiveEntry::file(sz_entry.name(), &mut content)
                            .with_size_hint(Some(sz_entry.size())),
                    )
                };
                in_visit = false;
                match outcome {
                    Ok(()) => Ok(true),
                    Err(e) => {
                        failure = Some(e);
                        Ok(false)
                    }
                }
            })
        }));
        let result = match caught {
            Ok(result) => result,
            // Panics raised by the visitor itself are not ours to swallow
            Err(payload) if in_visit => panic::resume_unwind(payload),
            Err(_) => {
                return Err(ArchiveError::corrupt(
                    &self.path,
                    "7z decoder failed on damaged data",
                ))
            }
        };

        if let Some(err) = failure {
            return Err(err);
        }
        result.map_err(|e| ArchiveError::corrupt(&self.path, e))
    }
}
