//! Source tree traversal
//!
//! walkdir keeps its own stack of open directories, so traversal depth is not
//! bounded by the call stack. Children come in filesystem enumeration order;
//! nothing is sorted.

use crate::entry::{compose_name, utf8_component};
use crate::error::{ArchiveError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A node of the source tree that becomes exactly one archive entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceNode {
    pub path: PathBuf,
    /// Entry name: root basename plus `/`-joined relative components
    pub name: String,
    pub is_directory: bool,
}

/// Iterator over the entry-producing nodes below (and including) a root.
///
/// Files are always yielded. Directories are yielded only when they have no
/// children at all; non-empty directories are implied by their contents.
pub struct SourceWalk {
    root: PathBuf,
    root_name: String,
    skip: Option<PathBuf>,
    inner: walkdir::IntoIter,
}

impl SourceWalk {
    /// Walk `root`, naming entries after its basename.
    ///
    /// The basename is taken from `root` as given, so a symlinked root keeps
    /// the link's name; only paths like `.` fall back to the resolved name.
    ///
    /// `skip` is an exact path to leave out, used for the archive being
    /// written when it lives inside the tree.
    pub fn new(root: &Path, skip: Option<PathBuf>) -> Result<Self> {
        let resolved = fs::canonicalize(root).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ArchiveError::SourceNotFound(root.to_path_buf())
            } else {
                ArchiveError::io(root, e)
            }
        })?;
        let root_name = match root.file_name().or_else(|| resolved.file_name()) {
            Some(name) => utf8_component(name)?.to_string(),
            None => String::new(),
        };
        let inner = WalkDir::new(&resolved).follow_links(false).into_iter();

        Ok(Self {
            root: resolved,
            root_name,
            skip,
            inner,
        })
    }

    fn node(&self, path: &Path, is_directory: bool) -> Result<SourceNode> {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        Ok(SourceNode {
            path: path.to_path_buf(),
            name: compose_name(&self.root_name, relative)?,
            is_directory,
        })
    }
}

impl Iterator for SourceWalk {
    type Item = Result<SourceNode>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let dent = match self.inner.next()? {
                Ok(dent) => dent,
                Err(err) => return Some(Err(walk_error(err))),
            };
            let path = dent.path();

            if self.skip.as_deref() == Some(path) {
                log::warn!(
                    "skipping {}: it is the archive being written",
                    path.display()
                );
                continue;
            }

            let file_type = dent.file_type();
            if file_type.is_dir() {
                match is_empty_dir(path) {
                    Ok(true) => {}
                    Ok(false) => continue,
                    Err(e) => return Some(Err(ArchiveError::io(path, e))),
                }
                let node = match self.node(path, true) {
                    Ok(node) => node,
                    Err(e) => return Some(Err(e)),
                };
                if node.name.is_empty() {
                    continue;
                }
                return Some(Ok(node));
            }

            let node = match self.node(path, false) {
                Ok(node) => node,
                Err(e) => return Some(Err(e)),
            };
            if file_type.is_file() {
                return Some(Ok(node));
            }
            let reason = if file_type.is_symlink() {
                "symbolic links are not supported"
            } else {
                "special files are not supported"
            };
            return Some(Err(ArchiveError::unsupported(node.name, reason)));
        }
    }
}

fn is_empty_dir(path: &Path) -> std::io::Result<bool> {
    Ok(fs::read_dir(path)?.next().is_none())
}

fn walk_error(err: walkdir::Error) -> ArchiveError {
    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
    match err.into_io_error() {
        Some(io) => ArchiveError::io(path, io),
        None => ArchiveError::unsupported(path.display().to_string(), "filesystem loop"),
    }
}
