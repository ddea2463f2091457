use std::fs::File;
use std::io::Read;
use std::path::Path;

use jarforge_archive::manifest::{MAIN_CLASS, MULTI_RELEASE};
use jarforge_archive::{
    ArchiveOptions, ArchiveWriter, CompressionPool, EntrySource, Manifest, MountedArchiveWriter,
    ParallelArchiveWriter,
};
use tempfile::tempdir;

fn entry_names(path: &Path) -> Vec<String> {
    let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

fn read_entry(path: &Path, name: &str) -> Vec<u8> {
    let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut entry = archive.by_name(name).unwrap();
    let mut buf = Vec::new();
    entry.read_to_end(&mut buf).unwrap();
    buf
}

fn manifest(main_class: &str) -> Manifest {
    let mut manifest = Manifest::new();
    manifest.main_attributes_mut().insert(MAIN_CLASS, main_class);
    manifest
}

fn fill<W: ArchiveWriter>(writer: &mut W) {
    for i in 0..40 {
        let body = format!("class body {i}").repeat(i + 1);
        writer
            .add_file(body.into_bytes().into(), &format!("org/acme/p{}/C{i}.class", i % 3), "test")
            .unwrap();
    }
    writer.add_directory("org/acme/empty", "test").unwrap();
    writer.add_manifest(manifest("org.acme.Main"));
}

#[test]
fn test_manifest_is_first_file_entry() {
    let dir = tempdir().unwrap();
    let pool = CompressionPool::new(4).unwrap();
    let mut writer =
        ParallelArchiveWriter::create(dir.path().join("a.jar"), ArchiveOptions::default(), pool).unwrap();
    writer.add_file(b"x".to_vec().into(), "z/last.txt", "test").unwrap();
    writer.add_manifest(manifest("org.acme.Main"));
    let path = writer.close().unwrap();

    let names = entry_names(&path);
    assert_eq!(names[0], "META-INF/");
    assert_eq!(names[1], "META-INF/MANIFEST.MF");
    assert_eq!(names.iter().filter(|n| n.starts_with("META-INF/")).count(), 2);
}

#[test]
fn test_directories_precede_files() {
    let dir = tempdir().unwrap();
    let pool = CompressionPool::new(2).unwrap();
    let mut writer =
        ParallelArchiveWriter::create(dir.path().join("a.jar"), ArchiveOptions::default(), pool).unwrap();
    fill(&mut writer);
    let path = writer.close().unwrap();

    let names = entry_names(&path);
    let first_file = names
        .iter()
        .skip(2)
        .position(|n| !n.ends_with('/'))
        .unwrap();
    assert!(names.iter().skip(2 + first_file).all(|n| !n.ends_with('/')));
    assert!(names.contains(&"org/acme/empty/".to_string()));
    assert!(names.contains(&"org/acme/".to_string()));
}

#[test]
fn test_first_writer_wins_regardless_of_worker_timing() {
    let dir = tempdir().unwrap();
    let pool = CompressionPool::new(8).unwrap();
    let mut writer =
        ParallelArchiveWriter::create(dir.path().join("a.jar"), ArchiveOptions::default(), pool).unwrap();

    // A large first submission finishes after the small second one.
    let big = vec![b'a'; 4 * 1024 * 1024];
    assert!(writer.add_file_if_not_exists(big.clone().into(), "res.txt", "first").unwrap());
    assert!(!writer.add_file_if_not_exists(b"b".to_vec().into(), "res.txt", "second").unwrap());
    assert_eq!(writer.provenance("res.txt"), Some("first"));
    let path = writer.close().unwrap();

    assert_eq!(read_entry(&path, "res.txt"), big);
}

#[test]
fn test_add_file_overwrites_in_place() {
    let dir = tempdir().unwrap();
    let pool = CompressionPool::new(2).unwrap();
    let mut writer =
        ParallelArchiveWriter::create(dir.path().join("a.jar"), ArchiveOptions::default(), pool).unwrap();
    writer.add_file(b"one".to_vec().into(), "a.txt", "x").unwrap();
    writer.add_file(b"two".to_vec().into(), "b.txt", "x").unwrap();
    writer.add_file(b"three".to_vec().into(), "a.txt", "y").unwrap();
    let path = writer.close().unwrap();

    assert_eq!(entry_names(&path), vec!["a.txt", "b.txt"]);
    assert_eq!(read_entry(&path, "a.txt"), b"three");
}

#[test]
fn test_generic_manifest_is_captured() {
    let dir = tempdir().unwrap();
    let pool = CompressionPool::new(2).unwrap();
    let mut writer =
        ParallelArchiveWriter::create(dir.path().join("a.jar"), ArchiveOptions::default(), pool).unwrap();
    writer.add_file(b"a".to_vec().into(), "a.txt", "x").unwrap();
    writer
        .add_file(
            b"Manifest-Version: 1.0\r\nMain-Class: org.acme.Other\r\n\r\n".to_vec().into(),
            "META-INF/MANIFEST.MF",
            "x",
        )
        .unwrap();
    let path = writer.close().unwrap();

    let names = entry_names(&path);
    assert_eq!(names[1], "META-INF/MANIFEST.MF");
    let manifest = Manifest::parse(&read_entry(&path, "META-INF/MANIFEST.MF")).unwrap();
    assert_eq!(manifest.main_attributes().get(MAIN_CLASS), Some("org.acme.Other"));
}

#[test]
fn test_identical_inputs_give_identical_bytes() {
    let dir = tempdir().unwrap();
    let pool = CompressionPool::new(4).unwrap();

    let mut first =
        ParallelArchiveWriter::create(dir.path().join("1.jar"), ArchiveOptions::default(), pool.clone())
            .unwrap();
    fill(&mut first);
    let first = first.close().unwrap();

    // Same pool, reused after the first archive closed.
    let mut second =
        ParallelArchiveWriter::create(dir.path().join("2.jar"), ArchiveOptions::default(), pool).unwrap();
    fill(&mut second);
    let second = second.close().unwrap();

    assert_eq!(std::fs::read(first).unwrap(), std::fs::read(second).unwrap());
}

#[test]
fn test_mounted_and_parallel_agree() {
    let dir = tempdir().unwrap();
    let options = ArchiveOptions {
        compress: false,
        timestamp: None,
    };
    let pool = CompressionPool::new(2).unwrap();
    let mut parallel = ParallelArchiveWriter::create(dir.path().join("p.jar"), options, pool).unwrap();
    fill(&mut parallel);
    let parallel = parallel.close().unwrap();

    let mut mounted = MountedArchiveWriter::create(dir.path().join("m.jar"), options).unwrap();
    fill(&mut mounted);
    let mounted = mounted.close().unwrap();

    assert_eq!(entry_names(&parallel), entry_names(&mounted));
    assert_eq!(
        read_entry(&parallel, "org/acme/p1/C7.class"),
        read_entry(&mounted, "org/acme/p1/C7.class")
    );
}

#[test]
fn test_mounted_reads_back_and_marks_multi_release() {
    let dir = tempdir().unwrap();
    let mut writer =
        MountedArchiveWriter::create(dir.path().join("u.jar"), ArchiveOptions::default()).unwrap();
    writer.add_manifest(manifest("org.acme.Main"));
    writer.add_file(b"v".to_vec().into(), "a/A.class", "x").unwrap();
    assert!(!writer.make_multi_version());

    let source = dir.path().join("B.class");
    std::fs::write(&source, b"nine").unwrap();
    writer
        .add_file(EntrySource::File(source), "META-INF/versions/9/a/B.class", "x")
        .unwrap();
    assert_eq!(writer.read("META-INF/versions/9/a/B.class").unwrap(), b"nine");
    assert!(writer.is_directory("META-INF/versions"));
    assert!(writer.make_multi_version());
    let path = writer.close().unwrap();

    let manifest = Manifest::parse(&read_entry(&path, "META-INF/MANIFEST.MF")).unwrap();
    assert_eq!(manifest.main_attributes().get(MULTI_RELEASE), Some("true"));
    assert_eq!(entry_names(&path)[1], "META-INF/MANIFEST.MF");
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with(".jarforge-staging-"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn test_rejects_escaping_names() {
    let dir = tempdir().unwrap();
    let mut writer =
        MountedArchiveWriter::create(dir.path().join("u.jar"), ArchiveOptions::default()).unwrap();
    assert!(writer.add_file(b"x".to_vec().into(), "../evil", "x").is_err());
}

#[test]
fn test_mounted_keeps_names_that_collide_on_disk() {
    let dir = tempdir().unwrap();
    let mut writer =
        MountedArchiveWriter::create(dir.path().join("u.jar"), ArchiveOptions::default()).unwrap();
    writer.add_file(b"upper".to_vec().into(), "META-INF/NOTICE", "a").unwrap();
    writer.add_file(b"lower".to_vec().into(), "META-INF/notice", "b").unwrap();
    writer.add_file(b"file".to_vec().into(), "org/acme/x", "a").unwrap();
    writer.add_file(b"nested".to_vec().into(), "org/acme/x/y", "b").unwrap();
    assert_eq!(writer.read("META-INF/NOTICE").unwrap(), b"upper");
    assert_eq!(writer.read("org/acme/x").unwrap(), b"file");
    assert!(writer.read("org/acme/missing").is_err());
    let path = writer.close().unwrap();

    assert_eq!(read_entry(&path, "META-INF/NOTICE"), b"upper");
    assert_eq!(read_entry(&path, "META-INF/notice"), b"lower");
    assert_eq!(read_entry(&path, "org/acme/x"), b"file");
    assert_eq!(read_entry(&path, "org/acme/x/y"), b"nested");
}
