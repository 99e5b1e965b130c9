//! Streaming ZIP reader
//!
//! Loads the central directory once, then decompresses individual entries
//! on demand through a bounded reader. Every entry is checked against the
//! CRC-32 and size recorded in the central directory as it is read.

use super::codepage::decode_entry_name;
use super::error::{Result, ZipError};
use crate::error::DecodeErrors;
use crc32fast::Hasher as Crc32;
use flate2::read::DeflateDecoder;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// ZIP local file header signature
const LOCAL_FILE_HEADER_SIGNATURE: u32 = 0x04034b50;

/// ZIP central directory signature
const CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x02014b50;

/// ZIP end of central directory signature
const END_OF_CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x06054b50;

/// ZIP64 end of central directory record signature
const ZIP64_END_OF_CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x06064b50;

/// ZIP64 end of central directory locator signature
const ZIP64_LOCATOR_SIGNATURE: u32 = 0x07064b50;

/// Minimum size of a central directory file header
const CENTRAL_HEADER_LEN: u64 = 46;

/// Largest possible EOCD record: fixed part plus a maximal comment
const EOCD_SEARCH_WINDOW: u64 = 22 + u16::MAX as u64;

/// Entry in the ZIP central directory
#[derive(Debug, Clone)]
pub struct ZipEntry {
    /// Name decoded from the GBK codepage
    pub name: String,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub compression_method: u16,
    pub crc32: u32,
    pub offset: u64,
    pub flags: u16,
    pub external_attributes: u32,
}

impl ZipEntry {
    /// Directory markers end with `/` (some tools only set the DOS attribute)
    pub fn is_directory(&self) -> bool {
        self.name.ends_with('/') || self.external_attributes & 0x10 != 0
    }

    fn is_encrypted(&self) -> bool {
        self.flags & 0x0001 != 0
    }
}

/// Streaming ZIP archive reader
pub struct StreamingZipReader<R: Read + Seek> {
    file: R,
    entries: Vec<ZipEntry>,
}

impl StreamingZipReader<BufReader<File>> {
    /// Open a ZIP file and read its central directory
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }
}

impl<R: Read + Seek> StreamingZipReader<R> {
    /// Read the central directory from an arbitrary seekable reader
    pub fn from_reader(mut file: R) -> Result<Self> {
        let entries = read_central_directory(&mut file)?;
        Ok(StreamingZipReader { file, entries })
    }

    /// Get list of all entries in the ZIP
    pub fn entries(&self) -> &[ZipEntry] {
        &self.entries
    }

    /// Find an entry by name
    pub fn find_entry(&self, name: &str) -> Option<&ZipEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Read an entry's decompressed data into a vector
    pub fn read_entry(&mut self, entry: &ZipEntry) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity(entry.uncompressed_size.min(1 << 20) as usize);
        self.read_entry_streaming(entry)?.read_to_end(&mut data)?;
        Ok(data)
    }

    /// Read an entry by name
    pub fn read_entry_by_name(&mut self, name: &str) -> Result<Vec<u8>> {
        let entry = self
            .find_entry(name)
            .ok_or_else(|| ZipError::EntryNotFound(name.to_string()))?
            .clone();

        self.read_entry(&entry)
    }

    /// Get a streaming reader for an entry (for large files)
    ///
    /// The returned reader decompresses on-the-fly and fails with
    /// `InvalidData` at end of stream if the CRC-32 or size does not match the
    /// central directory.
    pub fn read_entry_streaming(&mut self, entry: &ZipEntry) -> Result<Box<dyn Read + '_>> {
        if entry.is_encrypted() {
            return Err(ZipError::Encrypted(entry.name.clone()));
        }

        self.file.seek(SeekFrom::Start(entry.offset))?;

        let signature = read_u32_le(&mut self.file)?;
        if signature != LOCAL_FILE_HEADER_SIGNATURE {
            return Err(ZipError::InvalidFormat(format!(
                "Invalid local file header signature for '{}'",
                entry.name
            )));
        }

        // Skip version, flags, method, time, date, CRC-32 and both sizes;
        // the central directory values are authoritative
        self.file.seek(SeekFrom::Current(22))?;

        let filename_len = read_u16_le(&mut self.file)? as i64;
        let extra_len = read_u16_le(&mut self.file)? as i64;
        self.file
            .seek(SeekFrom::Current(filename_len + extra_len))?;

        let limited_reader = (&mut self.file).take(entry.compressed_size);

        let decoder: Box<dyn Read + '_> = match entry.compression_method {
            8 => Box::new(DecodeErrors(DeflateDecoder::new(limited_reader))),
            0 => Box::new(limited_reader),
            #[cfg(feature = "zstd-support")]
            93 => Box::new(DecodeErrors(zstd::Decoder::new(limited_reader)?)),
            method => return Err(ZipError::UnsupportedCompression(method)),
        };

        Ok(Box::new(VerifyingReader::new(
            decoder,
            entry.crc32,
            entry.uncompressed_size,
        )))
    }

    /// Get a streaming reader for an entry by name
    pub fn read_entry_streaming_by_name(&mut self, name: &str) -> Result<Box<dyn Read + '_>> {
        let entry = self
            .find_entry(name)
            .ok_or_else(|| ZipError::EntryNotFound(name.to_string()))?
            .clone();

        self.read_entry_streaming(&entry)
    }
}

/// Checks CRC-32 and length of decompressed data against the central directory
struct VerifyingReader<R> {
    inner: R,
    crc: Crc32,
    expected_crc: u32,
    expected_size: u64,
    seen: u64,
    verified: bool,
}

impl<R: Read> VerifyingReader<R> {
    fn new(inner: R, expected_crc: u32, expected_size: u64) -> Self {
        Self {
            inner,
            crc: Crc32::new(),
            expected_crc,
            expected_size,
            seen: 0,
            verified: false,
        }
    }
}

impl<R: Read> Read for VerifyingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n == 0 {
            if !buf.is_empty() && !self.verified {
                self.verified = true;
                if self.seen != self.expected_size {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!(
                            "entry size mismatch: expected {} bytes, got {}",
                            self.expected_size, self.seen
                        ),
                    ));
                }
                let actual = self.crc.clone().finalize();
                if actual != self.expected_crc {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!(
                            "CRC-32 mismatch: expected {:08x}, got {:08x}",
                            self.expected_crc, actual
                        ),
                    ));
                }
            }
            return Ok(0);
        }

        self.seen += n as u64;
        if self.seen > self.expected_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "entry decompresses past its recorded size",
            ));
        }
        self.crc.update(&buf[..n]);
        Ok(n)
    }
}

/// Read the central directory from the ZIP file
fn read_central_directory<R: Read + Seek>(file: &mut R) -> Result<Vec<ZipEntry>> {
    let eocd_offset = find_eocd(file)?;

    file.seek(SeekFrom::Start(eocd_offset))?;
    let signature = read_u32_le(file)?;
    if signature != END_OF_CENTRAL_DIRECTORY_SIGNATURE {
        return Err(ZipError::InvalidFormat(format!(
            "Invalid end of central directory signature: 0x{:08x}",
            signature
        )));
    }

    // Skip disk number fields (4 bytes)
    file.seek(SeekFrom::Current(4))?;
    let _entries_on_disk = read_u16_le(file)?;

    // These values may be placeholder 0xFFFF/0xFFFFFFFF when ZIP64 is used
    let total_entries_16 = read_u16_le(file)?;
    let cd_size_32 = read_u32_le(file)?;
    let cd_offset_32 = read_u32_le(file)?;

    let mut total_entries = total_entries_16 as u64;
    let mut cd_size = cd_size_32 as u64;
    let mut cd_offset = cd_offset_32 as u64;
    let mut cd_end_limit = eocd_offset;

    if total_entries_16 == 0xFFFF || cd_size_32 == 0xFFFFFFFF || cd_offset_32 == 0xFFFFFFFF {
        let (zip64_total_entries, zip64_cd_size, zip64_cd_offset, zip64_eocd_offset) =
            read_zip64_eocd(file, eocd_offset)?;
        total_entries = zip64_total_entries;
        cd_size = zip64_cd_size;
        cd_offset = zip64_cd_offset;
        cd_end_limit = zip64_eocd_offset;
    }

    if cd_offset
        .checked_add(cd_size)
        .map_or(true, |end| end > cd_end_limit)
    {
        return Err(ZipError::InvalidFormat(format!(
            "Central directory ({} bytes at {}) extends past its end record",
            cd_size, cd_offset
        )));
    }
    if total_entries > cd_size / CENTRAL_HEADER_LEN {
        return Err(ZipError::InvalidFormat(format!(
            "{} entries cannot fit in a {} byte central directory",
            total_entries, cd_size
        )));
    }

    file.seek(SeekFrom::Start(cd_offset))?;

    let mut entries = Vec::with_capacity(total_entries as usize);
    for _ in 0..total_entries {
        let signature = read_u32_le(file)?;
        if signature != CENTRAL_DIRECTORY_SIGNATURE {
            return Err(ZipError::InvalidFormat(format!(
                "Invalid central directory header signature: 0x{:08x}",
                signature
            )));
        }

        // Skip version made by, version needed
        file.seek(SeekFrom::Current(4))?;
        let flags = read_u16_le(file)?;
        let compression_method = read_u16_le(file)?;
        // Skip modification time and date
        file.seek(SeekFrom::Current(4))?;
        let crc32 = read_u32_le(file)?;

        // Sizes may be 0xFFFFFFFF placeholders meaning ZIP64
        let compressed_size_32 = read_u32_le(file)?;
        let uncompressed_size_32 = read_u32_le(file)?;
        let filename_len = read_u16_le(file)? as usize;
        let extra_len = read_u16_le(file)? as usize;
        let comment_len = read_u16_le(file)? as usize;

        // Skip disk number, internal attributes
        file.seek(SeekFrom::Current(4))?;
        let external_attributes = read_u32_le(file)?;
        let offset_32 = read_u32_le(file)?;

        let mut filename_buf = vec![0u8; filename_len];
        file.read_exact(&mut filename_buf)?;
        let name = decode_entry_name(&filename_buf, flags)?;

        let mut extra_buf = vec![0u8; extra_len];
        file.read_exact(&mut extra_buf)?;

        let mut compressed_size = compressed_size_32 as u64;
        let mut uncompressed_size = uncompressed_size_32 as u64;
        let mut offset = offset_32 as u64;

        if compressed_size_32 == 0xFFFFFFFF
            || uncompressed_size_32 == 0xFFFFFFFF
            || offset_32 == 0xFFFFFFFF
        {
            let zip64 = find_extra_field(&extra_buf, 0x0001).ok_or_else(|| {
                ZipError::InvalidFormat(format!("Missing ZIP64 extra field for '{}'", name))
            })?;
            // Values appear in fixed order, only for the fields that overflowed
            let mut values = zip64
                .chunks_exact(8)
                .map(|b| u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]));
            let mut next = |field: &str| {
                values.next().ok_or_else(|| {
                    ZipError::InvalidFormat(format!(
                        "ZIP64 extra field for '{}' lacks {}",
                        name, field
                    ))
                })
            };
            if uncompressed_size_32 == 0xFFFFFFFF {
                uncompressed_size = next("uncompressed size")?;
            }
            if compressed_size_32 == 0xFFFFFFFF {
                compressed_size = next("compressed size")?;
            }
            if offset_32 == 0xFFFFFFFF {
                offset = next("header offset")?;
            }
        }

        if comment_len > 0 {
            file.seek(SeekFrom::Current(comment_len as i64))?;
        }

        if offset >= cd_offset {
            return Err(ZipError::InvalidFormat(format!(
                "Local header of '{}' points into the central directory",
                name
            )));
        }

        entries.push(ZipEntry {
            name,
            compressed_size,
            uncompressed_size,
            compression_method,
            crc32,
            offset,
            flags,
            external_attributes,
        });
    }

    Ok(entries)
}

/// Return the payload of the extra field with the given header ID
fn find_extra_field(extra: &[u8], id: u16) -> Option<&[u8]> {
    let mut i = 0usize;
    while i + 4 <= extra.len() {
        let field_id = u16::from_le_bytes([extra[i], extra[i + 1]]);
        let data_len = u16::from_le_bytes([extra[i + 2], extra[i + 3]]) as usize;
        i += 4;
        if i + data_len > extra.len() {
            return None;
        }
        if field_id == id {
            return Some(&extra[i..i + data_len]);
        }
        i += data_len;
    }
    None
}

/// Read the ZIP64 locator that sits directly before the classic EOCD, then the
/// ZIP64 EOCD record it points to. Returns (entries, cd size, cd offset,
/// record offset).
fn read_zip64_eocd<R: Read + Seek>(file: &mut R, eocd_offset: u64) -> Result<(u64, u64, u64, u64)> {
    let locator_offset = eocd_offset.checked_sub(20).ok_or_else(|| {
        ZipError::InvalidFormat("ZIP64 EOCD locator not found".to_string())
    })?;
    file.seek(SeekFrom::Start(locator_offset))?;
    if read_u32_le(file)? != ZIP64_LOCATOR_SIGNATURE {
        return Err(ZipError::InvalidFormat(
            "ZIP64 EOCD locator not found".to_string(),
        ));
    }
    // disk with the start of the ZIP64 EOCD (4)
    file.seek(SeekFrom::Current(4))?;
    let zip64_eocd_offset = read_u64_le(file)?;
    if zip64_eocd_offset >= locator_offset {
        return Err(ZipError::InvalidFormat(
            "ZIP64 EOCD record overlaps its locator".to_string(),
        ));
    }

    file.seek(SeekFrom::Start(zip64_eocd_offset))?;
    let sig = read_u32_le(file)?;
    if sig != ZIP64_END_OF_CENTRAL_DIRECTORY_SIGNATURE {
        return Err(ZipError::InvalidFormat(format!(
            "Invalid ZIP64 EOCD signature: 0x{:08x}",
            sig
        )));
    }

    let _record_size = read_u64_le(file)?;
    // version made by (2), version needed (2), disk number (4), disk where central dir starts (4)
    file.seek(SeekFrom::Current(12))?;
    let _entries_on_disk = read_u64_le(file)?;
    let total_entries = read_u64_le(file)?;
    let cd_size = read_u64_le(file)?;
    let cd_offset = read_u64_le(file)?;

    Ok((total_entries, cd_size, cd_offset, zip64_eocd_offset))
}

/// Find the end of central directory record by scanning from the end of the file
fn find_eocd<R: Read + Seek>(file: &mut R) -> Result<u64> {
    let file_size = file.seek(SeekFrom::End(0))?;

    let search_start = file_size.saturating_sub(EOCD_SEARCH_WINDOW);
    file.seek(SeekFrom::Start(search_start))?;

    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)?;

    // The record is 22 bytes plus its comment; take the last signature that fits
    for i in (0..buffer.len().saturating_sub(21)).rev() {
        if buffer[i..i + 4] == [0x50, 0x4b, 0x05, 0x06] {
            let comment_len = u16::from_le_bytes([buffer[i + 20], buffer[i + 21]]) as usize;
            if i + 22 + comment_len <= buffer.len() {
                return Ok(search_start + i as u64);
            }
        }
    }

    Err(ZipError::InvalidFormat(
        "End of central directory not found".to_string(),
    ))
}

fn read_u16_le<R: Read>(file: &mut R) -> Result<u16> {
    let mut buf = [0u8; 2];
    file.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

fn read_u32_le<R: Read>(file: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    file.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64_le<R: Read>(file: &mut R) -> Result<u64> {
    let mut buf = [0u8; 8];
    file.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}
