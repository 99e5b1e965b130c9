//! Streaming ZIP writer that compresses data on-the-fly without temp files
//!
//! Each entry is written as a local header with the data-descriptor flag set,
//! followed by the compressed bytes and a data descriptor, so the writer never
//! seeks backwards. The central directory (with ZIP64 records when needed) is
//! written by [`StreamingZipWriter::finish`].
//!
//! Entry names are encoded with [`NAME_ENCODING`](super::NAME_ENCODING).

use super::codepage::encode_name;
use super::error::{Result, ZipError};
use chrono::{DateTime, Datelike, Local, Timelike};
use crc32fast::Hasher as Crc32;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{Seek, Write};
use std::path::Path;
use std::time::SystemTime;

/// MS-DOS directory attribute, stored in the external attributes field
const DOS_DIRECTORY_ATTRIBUTE: u32 = 0x10;

/// Entries hinted above this size get a ZIP64 local header. The margin covers
/// DEFLATE output growing past the input on incompressible data.
const ZIP64_HINT_THRESHOLD: u64 = u32::MAX as u64 - 64 * 1024 * 1024;

/// Compression method to use for ZIP file entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    /// No compression (stored)
    Stored,
    /// DEFLATE compression (most common)
    Deflate,
    /// Zstd compression (requires zstd-support feature)
    #[cfg(feature = "zstd-support")]
    Zstd,
}

impl CompressionMethod {
    pub(crate) fn to_zip_method(self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
            #[cfg(feature = "zstd-support")]
            CompressionMethod::Zstd => 93,
        }
    }
}

/// Central directory record of a finished entry
struct ZipEntry {
    name: Vec<u8>,
    local_header_offset: u64,
    crc32: u32,
    compressed_size: u64,
    uncompressed_size: u64,
    compression_method: u16,
    dos_time: u16,
    dos_date: u16,
    external_attributes: u32,
}

/// Streaming ZIP writer that compresses data on-the-fly
pub struct StreamingZipWriter<W: Write + Seek> {
    output: W,
    entries: Vec<ZipEntry>,
    current_entry: Option<CurrentEntry>,
    compression_level: u32,
    compression_method: CompressionMethod,
}

struct CurrentEntry {
    name: Vec<u8>,
    local_header_offset: u64,
    encoder: Box<dyn CompressorWrite>,
    counter: CrcCounter,
    compression_method: u16,
    dos_time: u16,
    dos_date: u16,
    external_attributes: u32,
    /// Local header carries a ZIP64 extra field; the descriptor uses 8-byte sizes
    zip64: bool,
}

trait CompressorWrite: Write {
    fn finish_compression(self: Box<Self>) -> Result<CompressedBuffer>;
    fn get_buffer_mut(&mut self) -> &mut CompressedBuffer;
}

struct DeflateCompressor {
    encoder: DeflateEncoder<CompressedBuffer>,
}

impl Write for DeflateCompressor {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.encoder.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.encoder.flush()
    }
}

impl CompressorWrite for DeflateCompressor {
    fn finish_compression(self: Box<Self>) -> Result<CompressedBuffer> {
        Ok(self.encoder.finish()?)
    }

    fn get_buffer_mut(&mut self) -> &mut CompressedBuffer {
        self.encoder.get_mut()
    }
}

/// Pass-through "compressor" for STORED entries and directory markers
struct StoredCompressor {
    buffer: CompressedBuffer,
}

impl Write for StoredCompressor {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl CompressorWrite for StoredCompressor {
    fn finish_compression(self: Box<Self>) -> Result<CompressedBuffer> {
        Ok(self.buffer)
    }

    fn get_buffer_mut(&mut self) -> &mut CompressedBuffer {
        &mut self.buffer
    }
}

#[cfg(feature = "zstd-support")]
struct ZstdCompressor {
    encoder: zstd::Encoder<'static, CompressedBuffer>,
}

#[cfg(feature = "zstd-support")]
impl Write for ZstdCompressor {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.encoder.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.encoder.flush()
    }
}

#[cfg(feature = "zstd-support")]
impl CompressorWrite for ZstdCompressor {
    fn finish_compression(self: Box<Self>) -> Result<CompressedBuffer> {
        Ok(self.encoder.finish()?)
    }

    fn get_buffer_mut(&mut self) -> &mut CompressedBuffer {
        self.encoder.get_mut()
    }
}

/// Metadata tracker for CRC and byte counts
struct CrcCounter {
    crc: Crc32,
    uncompressed_count: u64,
    compressed_count: u64,
}

impl CrcCounter {
    fn new() -> Self {
        Self {
            crc: Crc32::new(),
            uncompressed_count: 0,
            compressed_count: 0,
        }
    }

    fn update_uncompressed(&mut self, data: &[u8]) {
        self.crc.update(data);
        self.uncompressed_count += data.len() as u64;
    }

    fn add_compressed(&mut self, count: u64) {
        self.compressed_count += count;
    }

    fn finalize(&self) -> u32 {
        self.crc.clone().finalize()
    }
}

/// Buffered writer for compressed data with adaptive sizing
///
/// Capacity and flush threshold follow the expected entry size so small files
/// do not reserve megabytes and large files are not flushed in tiny pieces.
struct CompressedBuffer {
    buffer: Vec<u8>,
    flush_threshold: usize,
}

impl CompressedBuffer {
    fn with_size_hint(size_hint: Option<u64>) -> Self {
        let (initial_capacity, flush_threshold) = match size_hint {
            Some(0) => (0, 256 * 1024),
            Some(size) if size < 10_000 => (8 * 1024, 256 * 1024),
            Some(size) if size < 100_000 => (32 * 1024, 512 * 1024),
            Some(size) if size < 1_000_000 => (128 * 1024, 2 * 1024 * 1024),
            Some(size) if size < 10_000_000 => (256 * 1024, 4 * 1024 * 1024),
            _ => (512 * 1024, 8 * 1024 * 1024),
        };

        Self {
            buffer: Vec::with_capacity(initial_capacity),
            flush_threshold,
        }
    }

    fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }

    fn should_flush(&self) -> bool {
        self.buffer.len() >= self.flush_threshold
    }
}

impl Write for CompressedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Convert a timestamp to MS-DOS `(time, date)` in local time.
///
/// DOS dates cannot express anything before 1980; earlier times clamp to
/// 1980-01-01 00:00:00.
pub(crate) fn dos_datetime(time: SystemTime) -> (u16, u16) {
    let local: DateTime<Local> = time.into();
    if local.year() < 1980 {
        return (0, (1 << 5) | 1);
    }
    let year = (local.year() - 1980).min(127) as u16;
    let date = (year << 9) | ((local.month() as u16) << 5) | local.day() as u16;
    let time = ((local.hour() as u16) << 11)
        | ((local.minute() as u16) << 5)
        | (local.second() as u16 / 2);
    (time, date)
}

impl StreamingZipWriter<File> {
    /// Create a new ZIP writer with default compression level (6) using DEFLATE
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_method(path, CompressionMethod::Deflate, 6)
    }

    /// Create a new ZIP writer with specified compression method and level
    ///
    /// # Arguments
    /// * `path` - Path to the output ZIP file (created or truncated)
    /// * `method` - Compression method for file entries
    /// * `compression_level` - Compression level (0-9 for DEFLATE, 1-21 for Zstd)
    pub fn with_method<P: AsRef<Path>>(
        path: P,
        method: CompressionMethod,
        compression_level: u32,
    ) -> Result<Self> {
        let output = File::create(path)?;
        Self::from_writer_with_method(output, method, compression_level)
    }
}

impl<W: Write + Seek> StreamingZipWriter<W> {
    /// Create a new ZIP writer from an arbitrary writer with default compression level (6) using DEFLATE
    pub fn from_writer(writer: W) -> Result<Self> {
        Self::from_writer_with_method(writer, CompressionMethod::Deflate, 6)
    }

    /// Create a new ZIP writer from an arbitrary writer with specified compression method and level
    pub fn from_writer_with_method(
        writer: W,
        method: CompressionMethod,
        compression_level: u32,
    ) -> Result<Self> {
        Ok(Self {
            output: writer,
            entries: Vec::new(),
            current_entry: None,
            compression_level,
            compression_method: method,
        })
    }

    /// Start a new file entry in the ZIP
    pub fn start_entry(&mut self, name: &str) -> Result<()> {
        self.start_entry_with_hint(name, None, None)
    }

    /// Start a new file entry with a size hint and modification time
    ///
    /// # Arguments
    /// * `name` - The `/`-separated name of the entry in the ZIP
    /// * `size_hint` - Optional uncompressed size, used to size internal buffers
    /// * `modified` - Modification time recorded in the headers (zero when `None`)
    ///
    /// A hint close to or above 4 GiB makes the local header ZIP64. Entries
    /// that grow past 4 GiB without such a hint still get 8-byte sizes in the
    /// data descriptor and the central directory, which most readers accept,
    /// but their local header stays in the 32-bit form.
    pub fn start_entry_with_hint(
        &mut self,
        name: &str,
        size_hint: Option<u64>,
        modified: Option<SystemTime>,
    ) -> Result<()> {
        let encoder: Box<dyn CompressorWrite> = match self.compression_method {
            CompressionMethod::Deflate => Box::new(DeflateCompressor {
                encoder: DeflateEncoder::new(
                    CompressedBuffer::with_size_hint(size_hint),
                    Compression::new(self.compression_level.min(9)),
                ),
            }),
            #[cfg(feature = "zstd-support")]
            CompressionMethod::Zstd => {
                let mut encoder = zstd::Encoder::new(
                    CompressedBuffer::with_size_hint(size_hint),
                    self.compression_level as i32,
                )?;
                encoder.include_checksum(false)?; // ZIP uses CRC32, not zstd checksum
                Box::new(ZstdCompressor { encoder })
            }
            CompressionMethod::Stored => Box::new(StoredCompressor {
                buffer: CompressedBuffer::with_size_hint(size_hint),
            }),
        };
        let method = self.compression_method.to_zip_method();
        let zip64 = size_hint.is_some_and(|size| size > ZIP64_HINT_THRESHOLD);
        self.open_entry(name, encoder, method, modified, 0, zip64)
    }

    /// Write a directory marker entry. A trailing `/` is appended when missing.
    pub fn add_directory(&mut self, name: &str, modified: Option<SystemTime>) -> Result<()> {
        let name = if name.ends_with('/') {
            name.to_string()
        } else {
            format!("{}/", name)
        };
        let encoder = Box::new(StoredCompressor {
            buffer: CompressedBuffer::with_size_hint(Some(0)),
        });
        self.open_entry(
            &name,
            encoder,
            CompressionMethod::Stored.to_zip_method(),
            modified,
            DOS_DIRECTORY_ATTRIBUTE,
            false,
        )?;
        self.finish_current_entry()
    }

    fn open_entry(
        &mut self,
        name: &str,
        encoder: Box<dyn CompressorWrite>,
        compression_method: u16,
        modified: Option<SystemTime>,
        external_attributes: u32,
        zip64: bool,
    ) -> Result<()> {
        // Finish previous entry if any
        self.finish_current_entry()?;

        let encoded_name = encode_name(name)?.into_owned();
        if encoded_name.len() > u16::MAX as usize {
            return Err(ZipError::InvalidFormat(format!(
                "entry name too long: {} bytes",
                encoded_name.len()
            )));
        }
        let (dos_time, dos_date) = modified.map(dos_datetime).unwrap_or((0, 0));
        let local_header_offset = self.output.stream_position()?;

        // ZIP64 extra field with zeroed sizes; real values follow in the descriptor
        let mut extra_field: Vec<u8> = Vec::new();
        if zip64 {
            extra_field.extend_from_slice(&0x0001u16.to_le_bytes());
            extra_field.extend_from_slice(&16u16.to_le_bytes());
            extra_field.extend_from_slice(&0u64.to_le_bytes()); // uncompressed size
            extra_field.extend_from_slice(&0u64.to_le_bytes()); // compressed size
        }
        let (version, size_placeholder): (u8, u32) = if zip64 { (45, 0xFFFFFFFF) } else { (20, 0) };

        // Local file header with data descriptor flag (bit 3); sizes follow the data
        self.output.write_all(&[0x50, 0x4b, 0x03, 0x04])?; // signature
        self.output.write_all(&[version, 0])?; // version needed
        self.output.write_all(&[8, 0])?; // general purpose bit flag
        self.output.write_all(&compression_method.to_le_bytes())?;
        self.output.write_all(&dos_time.to_le_bytes())?;
        self.output.write_all(&dos_date.to_le_bytes())?;
        self.output.write_all(&0u32.to_le_bytes())?; // crc32 placeholder
        self.output.write_all(&size_placeholder.to_le_bytes())?; // compressed size
        self.output.write_all(&size_placeholder.to_le_bytes())?; // uncompressed size
        self.output
            .write_all(&(encoded_name.len() as u16).to_le_bytes())?;
        self.output
            .write_all(&(extra_field.len() as u16).to_le_bytes())?; // extra len
        self.output.write_all(&encoded_name)?;
        self.output.write_all(&extra_field)?;

        self.current_entry = Some(CurrentEntry {
            name: encoded_name,
            local_header_offset,
            encoder,
            counter: CrcCounter::new(),
            compression_method,
            dos_time,
            dos_date,
            external_attributes,
            zip64,
        });

        Ok(())
    }

    /// Write uncompressed data to the current entry (compressed on-the-fly)
    pub fn write_data(&mut self, data: &[u8]) -> Result<()> {
        let entry = self
            .current_entry
            .as_mut()
            .ok_or_else(|| ZipError::InvalidFormat("No entry started".to_string()))?;

        entry.counter.update_uncompressed(data);
        entry.encoder.write_all(data)?;
        entry.encoder.flush()?;

        // Hand compressed bytes to the output once enough have accumulated
        let buffer = entry.encoder.get_buffer_mut();
        if buffer.should_flush() {
            let compressed_data = buffer.take();
            self.output.write_all(&compressed_data)?;
            entry.counter.add_compressed(compressed_data.len() as u64);
        }

        Ok(())
    }

    /// Finish current entry and write data descriptor
    fn finish_current_entry(&mut self) -> Result<()> {
        if let Some(mut entry) = self.current_entry.take() {
            let mut buffer = entry.encoder.finish_compression()?;

            let remaining_data = buffer.take();
            if !remaining_data.is_empty() {
                self.output.write_all(&remaining_data)?;
                entry.counter.add_compressed(remaining_data.len() as u64);
            }

            let crc = entry.counter.finalize();
            let compressed_size = entry.counter.compressed_count;
            let uncompressed_size = entry.counter.uncompressed_count;

            // Data descriptor; 64-bit sizes for ZIP64 local headers or once either exceeds 32 bits
            self.output.write_all(&[0x50, 0x4b, 0x07, 0x08])?;
            self.output.write_all(&crc.to_le_bytes())?;
            if entry.zip64
                || compressed_size > u32::MAX as u64
                || uncompressed_size > u32::MAX as u64
            {
                self.output.write_all(&compressed_size.to_le_bytes())?;
                self.output.write_all(&uncompressed_size.to_le_bytes())?;
            } else {
                self.output
                    .write_all(&(compressed_size as u32).to_le_bytes())?;
                self.output
                    .write_all(&(uncompressed_size as u32).to_le_bytes())?;
            }

            self.entries.push(ZipEntry {
                name: entry.name,
                local_header_offset: entry.local_header_offset,
                crc32: crc,
                compressed_size,
                uncompressed_size,
                compression_method: entry.compression_method,
                dos_time: entry.dos_time,
                dos_date: entry.dos_date,
                external_attributes: entry.external_attributes,
            });
        }
        Ok(())
    }

    /// Finish ZIP file (write central directory and return the writer)
    pub fn finish(mut self) -> Result<W> {
        self.finish_current_entry()?;

        let central_dir_offset = self.output.stream_position()?;

        for entry in &self.entries {
            let needs_zip64 = entry.uncompressed_size > u32::MAX as u64
                || entry.compressed_size > u32::MAX as u64
                || entry.local_header_offset > u32::MAX as u64;
            let version: u8 = if needs_zip64 { 45 } else { 20 };

            self.output.write_all(&[0x50, 0x4b, 0x01, 0x02])?; // central dir sig
            self.output.write_all(&[version, 0])?; // version made by (MS-DOS)
            self.output.write_all(&[version, 0])?; // version needed
            self.output.write_all(&[8, 0])?; // general purpose bit flag (bit 3 set)
            self.output
                .write_all(&entry.compression_method.to_le_bytes())?;
            self.output.write_all(&entry.dos_time.to_le_bytes())?;
            self.output.write_all(&entry.dos_date.to_le_bytes())?;
            self.output.write_all(&entry.crc32.to_le_bytes())?;

            if entry.compressed_size > u32::MAX as u64 {
                self.output.write_all(&0xFFFFFFFFu32.to_le_bytes())?;
            } else {
                self.output
                    .write_all(&(entry.compressed_size as u32).to_le_bytes())?;
            }

            if entry.uncompressed_size > u32::MAX as u64 {
                self.output.write_all(&0xFFFFFFFFu32.to_le_bytes())?;
            } else {
                self.output
                    .write_all(&(entry.uncompressed_size as u32).to_le_bytes())?;
            }

            self.output
                .write_all(&(entry.name.len() as u16).to_le_bytes())?;

            // ZIP64 extra field (0x0001) holds whichever values overflowed, in APPNOTE order
            let mut extra_field: Vec<u8> = Vec::new();
            if needs_zip64 {
                extra_field.extend_from_slice(&0x0001u16.to_le_bytes());
                let mut data: Vec<u8> = Vec::new();
                if entry.uncompressed_size > u32::MAX as u64 {
                    data.extend_from_slice(&entry.uncompressed_size.to_le_bytes());
                }
                if entry.compressed_size > u32::MAX as u64 {
                    data.extend_from_slice(&entry.compressed_size.to_le_bytes());
                }
                if entry.local_header_offset > u32::MAX as u64 {
                    data.extend_from_slice(&entry.local_header_offset.to_le_bytes());
                }
                extra_field.extend_from_slice(&(data.len() as u16).to_le_bytes());
                extra_field.extend_from_slice(&data);
            }

            self.output
                .write_all(&(extra_field.len() as u16).to_le_bytes())?; // extra len
            self.output.write_all(&0u16.to_le_bytes())?; // file comment len
            self.output.write_all(&0u16.to_le_bytes())?; // disk number start
            self.output.write_all(&0u16.to_le_bytes())?; // internal attrs
            self.output
                .write_all(&entry.external_attributes.to_le_bytes())?;

            if entry.local_header_offset > u32::MAX as u64 {
                self.output.write_all(&0xFFFFFFFFu32.to_le_bytes())?;
            } else {
                self.output
                    .write_all(&(entry.local_header_offset as u32).to_le_bytes())?;
            }

            self.output.write_all(&entry.name)?;
            if !extra_field.is_empty() {
                self.output.write_all(&extra_field)?;
            }
        }

        let central_dir_size = self.output.stream_position()? - central_dir_offset;

        let need_zip64 = self.entries.len() >= u16::MAX as usize
            || central_dir_size >= u32::MAX as u64
            || central_dir_offset >= u32::MAX as u64;

        if need_zip64 {
            // ZIP64 end of central directory record
            self.output.write_all(&[0x50, 0x4b, 0x06, 0x06])?;
            // size of the remaining record: versions(4) + disks(8) + counts(16) + cd size/offset(16)
            let zip64_eocd_size: u64 = 44;
            self.output.write_all(&zip64_eocd_size.to_le_bytes())?;
            self.output.write_all(&[45, 0])?; // version made by
            self.output.write_all(&[45, 0])?; // version needed
            self.output.write_all(&0u32.to_le_bytes())?; // disk number
            self.output.write_all(&0u32.to_le_bytes())?; // disk where central dir starts
            self.output
                .write_all(&(self.entries.len() as u64).to_le_bytes())?;
            self.output
                .write_all(&(self.entries.len() as u64).to_le_bytes())?;
            self.output.write_all(&central_dir_size.to_le_bytes())?;
            self.output.write_all(&central_dir_offset.to_le_bytes())?;

            // ZIP64 end of central directory locator
            self.output.write_all(&[0x50, 0x4b, 0x06, 0x07])?;
            self.output.write_all(&0u32.to_le_bytes())?; // disk with ZIP64 EOCD
            let zip64_eocd_pos = central_dir_offset + central_dir_size;
            self.output.write_all(&zip64_eocd_pos.to_le_bytes())?;
            self.output.write_all(&1u32.to_le_bytes())?; // total number of disks
        }

        // Classic end of central directory
        self.output.write_all(&[0x50, 0x4b, 0x05, 0x06])?;
        self.output.write_all(&0u16.to_le_bytes())?; // disk number
        self.output.write_all(&0u16.to_le_bytes())?; // disk with central dir

        if self.entries.len() >= u16::MAX as usize {
            self.output.write_all(&0xFFFFu16.to_le_bytes())?;
            self.output.write_all(&0xFFFFu16.to_le_bytes())?;
        } else {
            self.output
                .write_all(&(self.entries.len() as u16).to_le_bytes())?;
            self.output
                .write_all(&(self.entries.len() as u16).to_le_bytes())?;
        }

        if central_dir_size >= u32::MAX as u64 {
            self.output.write_all(&0xFFFFFFFFu32.to_le_bytes())?;
        } else {
            self.output
                .write_all(&(central_dir_size as u32).to_le_bytes())?;
        }

        if central_dir_offset >= u32::MAX as u64 {
            self.output.write_all(&0xFFFFFFFFu32.to_le_bytes())?;
        } else {
            self.output
                .write_all(&(central_dir_offset as u32).to_le_bytes())?;
        }

        self.output.write_all(&0u16.to_le_bytes())?; // comment len

        self.output.flush()?;
        Ok(self.output)
    }
}
