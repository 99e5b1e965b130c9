//! Archive writer: turns one or more filesystem roots into archive entries

use crate::entry::ArchiveEntry;
use crate::error::{ArchiveError, Result};
use crate::format::{ArchiveFormat, EntrySink};
use crate::options::PackOptions;
use crate::sevenz::SevenZSink;
use crate::walk::{SourceNode, SourceWalk};
use crate::zip::ZipSink;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Pack `source` (a file or a directory) into `archive`.
///
/// The format is chosen from the archive extension (`.7z` or `.zip`).
///
/// ```no_run
/// s_pack::compress("/opt/image", "/opt/image.7z")?;
/// # Ok::<(), s_pack::ArchiveError>(())
/// ```
pub fn compress<P: AsRef<Path>, Q: AsRef<Path>>(source: P, archive: Q) -> Result<()> {
    let archive = archive.as_ref();
    let format = ArchiveFormat::from_path(archive)
        .ok_or_else(|| ArchiveError::UnknownFormat(archive.to_path_buf()))?;
    compress_with(source, archive, format, &PackOptions::default())
}

/// Pack `source` into `archive` with an explicit format and options
pub fn compress_with<P: AsRef<Path>, Q: AsRef<Path>>(
    source: P,
    archive: Q,
    format: ArchiveFormat,
    options: &PackOptions,
) -> Result<()> {
    compress_all(&[source.as_ref()], archive, format, options)
}

/// Pack several roots into one archive, each named by its basename.
///
/// Every root must exist; this is checked before the archive is created, so
/// a missing source never leaves an empty archive behind.
pub fn compress_all<P: AsRef<Path>, Q: AsRef<Path>>(
    sources: &[P],
    archive: Q,
    format: ArchiveFormat,
    options: &PackOptions,
) -> Result<()> {
    let archive = archive.as_ref();
    for source in sources {
        ensure_exists(source.as_ref())?;
    }

    match format {
        ArchiveFormat::SevenZ => {
            let sink = SevenZSink::create(archive, options)?;
            write_roots(sink, sources, archive)
        }
        ArchiveFormat::Zip => {
            let sink = ZipSink::create(archive, options)?;
            write_roots(sink, sources, archive)
        }
    }
}

fn ensure_exists(path: &Path) -> Result<()> {
    match fs::metadata(path) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ArchiveError::SourceNotFound(path.to_path_buf()))
        }
        Err(e) => Err(ArchiveError::io(path, e)),
    }
}

fn write_roots<S: EntrySink, P: AsRef<Path>>(
    mut sink: S,
    sources: &[P],
    archive: &Path,
) -> Result<()> {
    let skip = fs::canonicalize(archive).ok();
    let mut written = 0usize;
    for source in sources {
        written += write_tree(&mut sink, source.as_ref(), skip.clone())?;
    }
    sink.finish()?;
    log::info!("wrote {} entries to {}", written, archive.display());
    Ok(())
}

/// Walk one root into `sink`, returning the number of entries written.
pub fn write_tree<S: EntrySink>(sink: &mut S, root: &Path, skip: Option<PathBuf>) -> Result<usize> {
    let mut written = 0usize;
    for node in SourceWalk::new(root, skip)? {
        write_node(sink, &node?)?;
        written += 1;
    }
    Ok(written)
}

fn write_node<S: EntrySink>(sink: &mut S, node: &SourceNode) -> Result<()> {
    if node.is_directory {
        sink.put_entry(ArchiveEntry::directory(node.name.as_str()), &node.path)?;
        log::debug!("packed directory {}/", node.name);
        return Ok(());
    }

    let mut file = File::open(&node.path).map_err(|e| ArchiveError::io(&node.path, e))?;
    let size = file.metadata().ok().map(|m| m.len());
    sink.put_entry(
        ArchiveEntry::file(node.name.as_str(), &mut file).with_size_hint(size),
        &node.path,
    )?;
    log::info!("packed {}", node.name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::tempdir;

    /// Sink that records entries in memory
    #[derive(Default)]
    struct Recorder {
        entries: Vec<(String, Option<Vec<u8>>)>,
        finished: bool,
    }

    impl EntrySink for &mut Recorder {
        fn put_entry(&mut self, mut entry: ArchiveEntry<'_>, _origin: &Path) -> Result<()> {
            let name = entry.name().to_string();
            let content = entry.content().map(|r| {
                let mut data = Vec::new();
                r.read_to_end(&mut data).unwrap();
                data
            });
            self.entries.push((name, content));
            Ok(())
        }

        fn finish(self) -> Result<()> {
            self.finished = true;
            Ok(())
        }
    }

    #[test]
    fn writes_one_entry_per_file_and_marker_per_empty_dir() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("src");
        fs::create_dir_all(root.join("a/empty")).unwrap();
        fs::write(root.join("a/one.txt"), b"1").unwrap();
        fs::write(root.join("zero"), b"").unwrap();

        let mut recorder = Recorder::default();
        write_roots(&mut recorder, &[&root], &dir.path().join("out.zip")).unwrap();

        recorder.entries.sort();
        assert_eq!(
            recorder.entries,
            vec![
                ("src/a/empty/".to_string(), None),
                ("src/a/one.txt".to_string(), Some(b"1".to_vec())),
                ("src/zero".to_string(), Some(Vec::new())),
            ]
        );
        assert!(recorder.finished);
    }

    #[test]
    fn missing_source_creates_nothing() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("out.7z");
        let err = compress(dir.path().join("nope"), &archive).unwrap_err();
        assert!(matches!(err, ArchiveError::SourceNotFound(_)));
        assert!(!archive.exists());
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let dir = tempdir().unwrap();
        let err = compress(dir.path(), dir.path().join("out.rar")).unwrap_err();
        assert!(matches!(err, ArchiveError::UnknownFormat(_)));
    }
}
