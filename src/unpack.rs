//! Archive reader: materializes archive entries under a destination directory

use crate::chunk::{copy_chunked, CopyError};
use crate::entry::{sanitize_entry_name, ArchiveEntry, ListedEntry};
use crate::error::{ArchiveError, Result};
use crate::format::{ArchiveFormat, EntrySource};
use crate::options::PackOptions;
use crate::sevenz::SevenZSource;
use crate::zip::ZipSource;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Extract `archive` into `dest_dir` and return the paths of the files written.
///
/// Directory markers are created but not reported, for both formats. The
/// destination is created when missing. On failure, files extracted so far
/// stay on disk.
///
/// ```no_run
/// let files = s_pack::decompress("/opt/image.7z", "/opt/test")?;
/// println!("extracted {} files", files.len());
/// # Ok::<(), s_pack::ArchiveError>(())
/// ```
pub fn decompress<P: AsRef<Path>, Q: AsRef<Path>>(archive: P, dest_dir: Q) -> Result<Vec<PathBuf>> {
    let archive = archive.as_ref();
    ensure_archive(archive)?;
    let format = ArchiveFormat::detect(archive)?;
    decompress_with(archive, dest_dir, format, &PackOptions::default())
}

/// Extract `archive` with an explicit format and options
pub fn decompress_with<P: AsRef<Path>, Q: AsRef<Path>>(
    archive: P,
    dest_dir: Q,
    format: ArchiveFormat,
    options: &PackOptions,
) -> Result<Vec<PathBuf>> {
    let archive = archive.as_ref();
    let dest_dir = dest_dir.as_ref();
    ensure_archive(archive)?;

    let extracted = match format {
        ArchiveFormat::SevenZ => {
            extract_all(&mut SevenZSource::open(archive)?, archive, dest_dir, options)?
        }
        ArchiveFormat::Zip => {
            extract_all(&mut ZipSource::open(archive)?, archive, dest_dir, options)?
        }
    };
    log::info!(
        "extracted {} files from {} into {}",
        extracted.len(),
        archive.display(),
        dest_dir.display()
    );
    Ok(extracted)
}

/// List the entries of `archive` without extracting anything
pub fn list<P: AsRef<Path>>(archive: P) -> Result<Vec<ListedEntry>> {
    let archive = archive.as_ref();
    ensure_archive(archive)?;
    let mut listed = Vec::new();
    let mut record = |entry: ArchiveEntry<'_>| -> Result<()> {
        listed.push(ListedEntry {
            name: entry.name().to_string(),
            is_directory: entry.is_directory(),
            size: entry.size_hint(),
        });
        Ok(())
    };
    match ArchiveFormat::detect(archive)? {
        ArchiveFormat::SevenZ => SevenZSource::open(archive)?.for_each_entry(&mut record)?,
        ArchiveFormat::Zip => ZipSource::open(archive)?.for_each_entry(&mut record)?,
    }
    Ok(listed)
}

fn ensure_archive(archive: &Path) -> Result<()> {
    match fs::metadata(archive) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ArchiveError::SourceNotFound(archive.to_path_buf()))
        }
        Err(e) => Err(ArchiveError::io(archive, e)),
    }
}

/// Drain every entry of `source` into `dest_dir`.
pub fn extract_all<S: EntrySource>(
    source: &mut S,
    archive: &Path,
    dest_dir: &Path,
    options: &PackOptions,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dest_dir).map_err(|e| ArchiveError::io(dest_dir, e))?;

    let mut buf = options.chunk_buffer();
    let mut extracted = Vec::new();
    source.for_each_entry(&mut |entry| {
        if let Some(path) = extract_entry(entry, archive, dest_dir, &mut buf)? {
            extracted.push(path);
        }
        Ok(())
    })?;
    Ok(extracted)
}

fn extract_entry(
    mut entry: ArchiveEntry<'_>,
    archive: &Path,
    dest_dir: &Path,
    buf: &mut [u8],
) -> Result<Option<PathBuf>> {
    let target = dest_dir.join(sanitize_entry_name(entry.name())?);

    let Some(content) = entry.content() else {
        fs::create_dir_all(&target).map_err(|e| ArchiveError::io(&target, e))?;
        log::debug!("created {}", target.display());
        return Ok(None);
    };

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| ArchiveError::io(parent, e))?;
    }
    let mut file = File::create(&target).map_err(|e| ArchiveError::io(&target, e))?;
    copy_chunked(content, &mut file, buf).map_err(|e| match e {
        CopyError::Read(e) => ArchiveError::archive_read(archive, e),
        CopyError::Write(e) => ArchiveError::io(&target, e),
    })?;

    log::info!("extracted {}", target.display());
    Ok(Some(target))
}
