#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Dir,
    File(Vec<u8>),
}

/// Everything below `root`, keyed by `/`-joined relative path
pub fn snapshot(root: &Path) -> BTreeMap<String, Node> {
    let mut nodes = BTreeMap::new();
    for dent in WalkDir::new(root).min_depth(1) {
        let dent = dent.unwrap();
        let key = dent
            .path()
            .strip_prefix(root)
            .unwrap()
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let node = if dent.file_type().is_dir() {
            Node::Dir
        } else {
            Node::File(fs::read(dent.path()).unwrap())
        };
        nodes.insert(key, node);
    }
    nodes
}

/// Regular files below `root`, sorted
pub fn files_under(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .map(|dent| dent.unwrap())
        .filter(|dent| dent.file_type().is_file())
        .map(|dent| dent.into_path())
        .collect();
    files.sort();
    files
}

pub fn sorted(mut paths: Vec<PathBuf>) -> Vec<PathBuf> {
    paths.sort();
    paths
}

/// Deterministic, mildly compressible bytes
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| ((i * 31) ^ (i >> 7)) as u8).collect()
}

/// A tree with nested files, an empty file, an empty directory and a
/// non-ASCII name, rooted at `parent/tree`
pub fn build_sample_tree(parent: &Path) -> PathBuf {
    let root = parent.join("tree");
    fs::create_dir_all(root.join("docs/drafts")).unwrap();
    fs::create_dir_all(root.join("cache/empty")).unwrap();
    fs::write(root.join("readme.txt"), b"top level file\n").unwrap();
    fs::write(root.join("docs/report.bin"), pattern(70_000)).unwrap();
    fs::write(root.join("docs/drafts/zero.dat"), b"").unwrap();
    fs::write(root.join("docs/中文.txt"), "中文内容".as_bytes()).unwrap();
    root
}

/// A one-entry STORED archive with a raw name and caller-chosen general
/// purpose flags, built byte by byte
pub fn raw_stored_zip(name: &[u8], flags: u16, data: &[u8]) -> Vec<u8> {
    let crc = crc32fast::hash(data);
    let size = data.len() as u32;

    let mut out = Vec::new();
    out.extend_from_slice(&[0x50, 0x4b, 0x03, 0x04]);
    out.extend_from_slice(&20u16.to_le_bytes());
    out.extend_from_slice(&flags.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // stored
    out.extend_from_slice(&[0; 4]); // time, date
    out.extend_from_slice(&crc.to_le_bytes());
    out.extend_from_slice(&size.to_le_bytes());
    out.extend_from_slice(&size.to_le_bytes());
    out.extend_from_slice(&(name.len() as u16).to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(name);
    out.extend_from_slice(data);

    let cd_offset = out.len() as u32;
    out.extend_from_slice(&[0x50, 0x4b, 0x01, 0x02]);
    out.extend_from_slice(&20u16.to_le_bytes());
    out.extend_from_slice(&20u16.to_le_bytes());
    out.extend_from_slice(&flags.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&[0; 4]);
    out.extend_from_slice(&crc.to_le_bytes());
    out.extend_from_slice(&size.to_le_bytes());
    out.extend_from_slice(&size.to_le_bytes());
    out.extend_from_slice(&(name.len() as u16).to_le_bytes());
    out.extend_from_slice(&[0; 8]); // extra, comment, disk, internal attrs
    out.extend_from_slice(&0u32.to_le_bytes()); // external attrs
    out.extend_from_slice(&0u32.to_le_bytes()); // local header offset
    out.extend_from_slice(name);
    let cd_size = out.len() as u32 - cd_offset;

    out.extend_from_slice(&[0x50, 0x4b, 0x05, 0x06]);
    out.extend_from_slice(&[0; 4]);
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&cd_size.to_le_bytes());
    out.extend_from_slice(&cd_offset.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out
}
