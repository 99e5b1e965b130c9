#[cfg(feature = "zstd-support")]
#[test]
fn test_zstd_roundtrip() {
    use s_pack::{CompressionMethod, StreamingZipReader, StreamingZipWriter};
    use tempfile::tempdir;

    let dir = tempdir().unwrap();
    let zip_path = dir.path().join("zstd_test.zip");

    // Write a ZIP with Zstd compression
    {
        let mut writer = StreamingZipWriter::with_method(&zip_path, CompressionMethod::Zstd, 3)
            .expect("Failed to create writer");

        writer.start_entry("test1.txt").unwrap();
        writer.write_data(b"Hello from Zstd compression!").unwrap();

        writer.start_entry("test2.bin").unwrap();
        let data = vec![42u8; 10000];
        writer.write_data(&data).unwrap();

        writer.finish().unwrap();
    }

    let mut reader = StreamingZipReader::open(&zip_path).expect("Failed to open zip");
    let entries: Vec<_> = reader.entries().to_vec();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].name, "test1.txt");
    assert_eq!(entries[0].compression_method, 93); // Zstd method
    assert_eq!(entries[1].compression_method, 93);

    let data1 = reader.read_entry_by_name("test1.txt").unwrap();
    assert_eq!(data1, b"Hello from Zstd compression!");

    let data2 = reader.read_entry_by_name("test2.bin").unwrap();
    assert_eq!(data2.len(), 10000);
    assert!(data2.iter().all(|&b| b == 42));

    // Compressible data must actually shrink
    assert!(entries[1].compressed_size < entries[1].uncompressed_size / 2);
}

#[cfg(feature = "zstd-support")]
#[test]
fn test_zstd_tree_roundtrip_with_options() {
    use s_pack::{ArchiveFormat, CompressionMethod, PackOptions, StreamingZipReader};
    use std::fs;
    use tempfile::tempdir;

    let dir = tempdir().unwrap();
    let root = dir.path().join("data");
    fs::create_dir_all(root.join("empty")).unwrap();
    fs::write(root.join("large.bin"), vec![0x55u8; 50000]).unwrap();

    let zip_path = dir.path().join("zstd_tree.zip");
    let options = PackOptions::default().with_zip_method(CompressionMethod::Zstd, 5);
    s_pack::compress_with(&root, &zip_path, ArchiveFormat::Zip, &options).unwrap();

    // Directory markers stay stored whatever the file method is
    let reader = StreamingZipReader::open(&zip_path).unwrap();
    for entry in reader.entries() {
        let expected = if entry.is_directory() { 0 } else { 93 };
        assert_eq!(entry.compression_method, expected, "{}", entry.name);
    }

    let dest = dir.path().join("out");
    let files = s_pack::decompress(&zip_path, &dest).unwrap();
    assert_eq!(files, vec![dest.join("data").join("large.bin")]);
    assert_eq!(fs::read(&files[0]).unwrap(), vec![0x55u8; 50000]);
    assert!(dest.join("data").join("empty").is_dir());
}
