//! Archive entries and entry-name handling
//!
//! Entry names are always `/`-separated, whatever the host separator is.
//! Directory markers carry a trailing `/`.

use crate::error::{ArchiveError, Result};
use std::ffi::OsStr;
use std::io::Read;
use std::path::{Component, Path, PathBuf};

/// One named unit of an archive: a file with content, or a directory marker.
///
/// The only constructors are [`ArchiveEntry::file`] and
/// [`ArchiveEntry::directory`], so a directory never has content and a file
/// always has a (possibly empty) stream.
pub struct ArchiveEntry<'a> {
    name: String,
    content: Option<&'a mut dyn Read>,
    size_hint: Option<u64>,
}

impl<'a> ArchiveEntry<'a> {
    pub fn file(name: impl Into<String>, content: &'a mut dyn Read) -> Self {
        Self {
            name: name.into(),
            content: Some(content),
            size_hint: None,
        }
    }

    /// A directory marker. A trailing `/` is appended if missing.
    pub fn directory(name: impl Into<String>) -> Self {
        let mut name = name.into();
        if !name.ends_with('/') {
            name.push('/');
        }
        Self {
            name,
            content: None,
            size_hint: None,
        }
    }

    /// Attach the expected content size, if known
    pub fn with_size_hint(mut self, size: Option<u64>) -> Self {
        self.size_hint = size;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_directory(&self) -> bool {
        self.content.is_none()
    }

    pub fn size_hint(&self) -> Option<u64> {
        self.size_hint
    }

    /// Content stream of a file entry; `None` for directory markers
    pub fn content(&mut self) -> Option<&mut (dyn Read + 'a)> {
        self.content.as_deref_mut()
    }
}

impl std::fmt::Debug for ArchiveEntry<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveEntry")
            .field("name", &self.name)
            .field("is_directory", &self.is_directory())
            .field("size_hint", &self.size_hint)
            .finish()
    }
}

/// Entry summary returned by [`list`](crate::list)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedEntry {
    pub name: String,
    pub is_directory: bool,
    /// Uncompressed size when the format records it
    pub size: Option<u64>,
}

/// Join a parent entry name and a child component with `/`.
///
/// An empty parent yields the child unchanged.
pub fn join_name(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{}/{}", parent.trim_end_matches('/'), child)
    }
}

/// Build the entry name of `path` relative to a walk root named `root_name`.
///
/// Components that are not valid UTF-8 are refused rather than replaced, so
/// two distinct files can never collapse onto one entry name.
pub(crate) fn compose_name(root_name: &str, relative: &Path) -> Result<String> {
    let mut name = root_name.to_string();
    for component in relative.components() {
        if let Component::Normal(part) = component {
            let part = utf8_component(part)?;
            name = join_name(&name, part);
        }
    }
    Ok(name)
}

/// View a single path component as UTF-8, or fail with `UnsupportedEntry`
pub(crate) fn utf8_component(part: &OsStr) -> Result<&str> {
    part.to_str().ok_or_else(|| {
        ArchiveError::unsupported(part.to_string_lossy(), "file name is not valid UTF-8")
    })
}

/// Turn an entry name into a path relative to the extraction directory.
///
/// Accepts `/` and `\` separators and ignores `.` segments. Names that are
/// empty, absolute, drive-qualified, or climb out with `..` are rejected so an
/// archive can never write outside the destination.
pub fn sanitize_entry_name(name: &str) -> Result<PathBuf> {
    let mut relative = PathBuf::new();
    for (index, segment) in name.split(['/', '\\']).enumerate() {
        match segment {
            "" | "." => continue,
            ".." => {
                return Err(ArchiveError::unsupported(
                    name,
                    "entry escapes the destination directory",
                ))
            }
            s if index == 0 && is_drive_prefix(s) => {
                return Err(ArchiveError::unsupported(name, "drive prefix in entry name"))
            }
            s => relative.push(s),
        }
    }

    if name.starts_with('/') || name.starts_with('\\') {
        return Err(ArchiveError::unsupported(name, "absolute entry name"));
    }
    if relative.as_os_str().is_empty() {
        return Err(ArchiveError::unsupported(name, "empty entry name"));
    }
    Ok(relative)
}

fn is_drive_prefix(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    bytes.len() == 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}
