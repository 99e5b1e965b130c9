mod common;

use common::{files_under, snapshot, sorted};
use proptest::prelude::*;
use s_pack::{ArchiveFormat, PackOptions};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

const PROPTEST_CASES: u32 = 16;

/// One generated node: a path of 1-3 short segments, and content for files
#[derive(Debug, Clone)]
struct NodePlan {
    segments: Vec<String>,
    content: Option<Vec<u8>>,
}

fn segment() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z]{1,6}",
        "[a-z]{1,3}\\.[a-z]{1,3}",
        Just("中文".to_string()),
        Just("数据".to_string()),
    ]
}

fn node() -> impl Strategy<Value = NodePlan> {
    (
        proptest::collection::vec(segment(), 1..4),
        proptest::option::weighted(0.8, proptest::collection::vec(any::<u8>(), 0..3000)),
    )
        .prop_map(|(segments, content)| NodePlan { segments, content })
}

/// Materialize the generated nodes under `root`. Nodes that clash with an
/// existing file or directory are dropped.
fn build(root: &Path, nodes: &[NodePlan]) {
    fs::create_dir_all(root).unwrap();
    for plan in nodes {
        let path: PathBuf = plan.segments.iter().fold(root.to_path_buf(), |p, s| p.join(s));
        let parent_ok = path
            .ancestors()
            .skip(1)
            .take_while(|a| *a != root)
            .all(|a| !a.is_file());
        if !parent_ok || path.exists() {
            continue;
        }
        match &plan.content {
            Some(data) => {
                fs::create_dir_all(path.parent().unwrap()).unwrap();
                fs::write(&path, data).unwrap();
            }
            None => fs::create_dir_all(&path).unwrap(),
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(PROPTEST_CASES))]

    #[test]
    fn random_trees_round_trip(
        nodes in proptest::collection::vec(node(), 0..12),
        chunk_size in 1usize..4096,
        use_zip in any::<bool>(),
    ) {
        let format = if use_zip { ArchiveFormat::Zip } else { ArchiveFormat::SevenZ };
        let dir = tempdir().unwrap();
        let root = dir.path().join("root");
        build(&root, &nodes);

        let options = PackOptions::default().with_chunk_size(chunk_size);
        let archive = dir.path().join(format!("out.{}", format.extension()));
        s_pack::compress_with(&root, &archive, format, &options).unwrap();

        let dest = dir.path().join("dest");
        let files = s_pack::decompress_with(&archive, &dest, format, &options).unwrap();

        prop_assert_eq!(snapshot(&root), snapshot(&dest.join("root")));
        prop_assert_eq!(sorted(files), files_under(&dest));
    }
}
