mod common;

use common::{header, ArchiveBuilder};
use hashfs_rs::hash_fs_entry::HashFsEntryFlags;
use hashfs_rs::{FileSystem, FileSystemId, HashFileSystem, OpenMode, SysFileSystem, VfsError};
use tempfile::TempDir;

const PATHS: &[&str] = &[
    "/def/world.sii",
    "/def/city/berlin.sii",
    "/vehicle/truck/volvo.pmd",
    "/material/ui/white.mat",
    "/version.txt",
];

fn mount_named(dir: &TempDir, name: &str, builder: ArchiveBuilder) -> HashFileSystem {
    builder.write_to(dir.path(), name);
    let sys = SysFileSystem::new(dir.path());
    HashFileSystem::try_new(&sys, name).unwrap()
}

fn mount(dir: &TempDir, builder: ArchiveBuilder) -> HashFileSystem {
    mount_named(dir, "base.scs", builder)
}

fn with_paths(mut builder: ArchiveBuilder) -> ArchiveBuilder {
    for path in PATHS {
        builder = builder.file(path, path.as_bytes());
    }
    builder
}

#[test]
fn test_lookup_finds_every_entry() {
    let dir = TempDir::new().unwrap();
    let fs = mount(&dir, with_paths(ArchiveBuilder::new()));

    assert!(fs.is_loaded());
    assert_eq!(fs.entry_count(), PATHS.len());
    for path in PATHS {
        let entry = fs.find_entry(path).unwrap();
        assert_eq!(entry.hash, HashFileSystem::hash_path(0, path));
        assert!(fs.exists(path), "{path} should exist");
        let content = fs.open(path, OpenMode::READ).unwrap().read_all().unwrap();
        assert_eq!(content, path.as_bytes());
    }
}

#[test]
fn test_lookup_with_salt() {
    let dir = TempDir::new().unwrap();
    let fs = mount(&dir, with_paths(ArchiveBuilder::new().salt(17)));

    assert_eq!(fs.salt(), 17);
    for path in PATHS {
        assert!(fs.exists(path), "{path} should exist");
    }
    assert_ne!(
        HashFileSystem::hash_path(17, "/version.txt"),
        HashFileSystem::hash_path(0, "/version.txt")
    );
    assert_eq!(
        HashFileSystem::hash_path(17, "/version.txt"),
        HashFileSystem::hash_path(17, "version.txt")
    );
}

#[test]
fn test_hash_path_matches_reference_values() {
    assert_eq!(HashFileSystem::hash_path(0, "/def/world.sii"), 0xb149_1731_9948_9b4d);
    assert_eq!(HashFileSystem::hash_path(0, "version.txt"), 0xafd7_3195_09d3_8751);
    assert_eq!(HashFileSystem::hash_path(17, "/version.txt"), 0x812b_ca03_1ca3_e3b2);
}

#[test]
fn test_lookup_miss_on_small_tables() {
    let dir = TempDir::new().unwrap();

    let empty = mount_named(&dir, "empty.scs", ArchiveBuilder::new());
    assert!(empty.is_loaded());
    assert!(!empty.exists("/version.txt"));
    assert!(!empty.dir_exists("/"));
    assert!(matches!(
        empty.open("/version.txt", OpenMode::READ),
        Err(VfsError::FileNotFound(_))
    ));

    let single = mount_named(
        &dir,
        "single.scs",
        ArchiveBuilder::new().file("/version.txt", b"1.0"),
    );
    assert!(single.exists("/version.txt"));
    assert!(!single.exists("/def/world.sii"));
    assert!(single.find_entry("/def/world.sii").is_none());
}

#[test]
fn test_lookup_below_and_above_every_entry() {
    let dir = TempDir::new().unwrap();
    let target = HashFileSystem::hash_path(0, "/missing.sii");

    assert!(target > 2 && target < u64::MAX - 2);
    let above = mount_named(
        &dir,
        "above.scs",
        ArchiveBuilder::new()
            .raw_hash(target + 1, HashFsEntryFlags::empty(), 0, Vec::new())
            .raw_hash(target + 2, HashFsEntryFlags::empty(), 0, Vec::new()),
    );
    assert!(!above.exists("/missing.sii"));

    let below = mount_named(
        &dir,
        "below.scs",
        ArchiveBuilder::new()
            .raw_hash(target - 2, HashFsEntryFlags::empty(), 0, Vec::new())
            .raw_hash(target - 1, HashFsEntryFlags::empty(), 0, Vec::new()),
    );
    assert!(!below.exists("/missing.sii"));
}

#[test]
fn test_lookup_in_largest_table() {
    let dir = TempDir::new().unwrap();
    let filler = 200_000 - PATHS.len() as u64;
    let step = u64::MAX / filler;

    let mut builder = with_paths(ArchiveBuilder::new());
    for i in 0..filler {
        builder = builder.raw_hash(i * step, HashFsEntryFlags::empty(), 0, Vec::new());
    }
    let fs = mount(&dir, builder);

    assert_eq!(fs.entry_count(), 200_000);
    for path in PATHS {
        assert!(fs.exists(path), "{path} should exist");
    }
    assert!(!fs.exists("/missing.sii"));
    assert!(!fs.exists("/def/world.sii.bak"));
}

#[test]
fn test_oversized_table_is_corrupt() {
    let dir = TempDir::new().unwrap();
    let archive = header(b"SCS#", 1, 0, b"CITY", 200_001, 20);
    std::fs::write(dir.path().join("base.scs"), archive).unwrap();
    let sys = SysFileSystem::new(dir.path());

    assert!(matches!(
        HashFileSystem::try_new(&sys, "base.scs"),
        Err(VfsError::FileCorrupted(_))
    ));
}

#[test]
fn test_truncated_table_is_corrupt() {
    let dir = TempDir::new().unwrap();
    let archive = header(b"SCS#", 1, 0, b"CITY", 4, 20);
    std::fs::write(dir.path().join("base.scs"), archive).unwrap();
    let sys = SysFileSystem::new(dir.path());

    let fs = HashFileSystem::new(&sys, "base.scs");
    assert!(!fs.is_loaded());
    assert!(matches!(fs.load_error(), Some(VfsError::FileCorrupted(_))));
}

#[test]
fn test_bad_hash_method_leaves_filesystem_non_functional() {
    let dir = TempDir::new().unwrap();
    with_paths(ArchiveBuilder::new().hash_method(b"FNV1")).write_to(dir.path(), "base.scs");
    let sys = SysFileSystem::new(dir.path());

    let fs = HashFileSystem::new(&sys, "base.scs");
    assert!(!fs.is_loaded());
    assert!(!fs.exists("/x"));
    assert!(!fs.exists("/version.txt"));
    assert!(!fs.dir_exists("/"));
    assert!(matches!(
        fs.open("/version.txt", OpenMode::READ),
        Err(VfsError::FileNotFound(_))
    ));
    assert!(fs.mstat("/version.txt").is_err());
    assert!(HashFileSystem::try_new(&sys, "base.scs").is_err());
}

#[test]
fn test_bad_version_and_magic_are_corrupt() {
    let dir = TempDir::new().unwrap();
    let sys = SysFileSystem::new(dir.path());

    with_paths(ArchiveBuilder::new().version(2)).write_to(dir.path(), "v2.scs");
    assert!(matches!(
        HashFileSystem::try_new(&sys, "v2.scs"),
        Err(VfsError::FileCorrupted(_))
    ));

    with_paths(ArchiveBuilder::new().magic(b"ZIP!")).write_to(dir.path(), "zip.scs");
    let fs = HashFileSystem::new(&sys, "zip.scs");
    assert!(!fs.is_loaded());
    assert!(!fs.exists("/version.txt"));
}

#[test]
fn test_missing_archive_is_not_found() {
    let dir = TempDir::new().unwrap();
    let sys = SysFileSystem::new(dir.path());

    assert!(matches!(
        HashFileSystem::try_new(&sys, "absent.scs"),
        Err(VfsError::FileNotFound(_))
    ));
}

#[test]
fn test_exists_and_dir_exists_are_pure() {
    let dir = TempDir::new().unwrap();
    let fs = mount(
        &dir,
        with_paths(ArchiveBuilder::new()).directory("/def", &["world.sii", "*city"]),
    );
    let before: Vec<_> = PATHS.iter().map(|path| fs.find_entry(path)).collect();

    for _ in 0..3 {
        assert!(fs.dir_exists("/def"));
        assert!(fs.dir_exists("/def/"));
        assert!(!fs.exists("/def"));
        assert!(fs.exists("/def/world.sii"));
        assert!(!fs.dir_exists("/def/world.sii"));
        assert!(!fs.exists(""));
        assert!(!fs.dir_exists(""));
    }

    let after: Vec<_> = PATHS.iter().map(|path| fs.find_entry(path)).collect();
    assert_eq!(before, after);
}

#[test]
fn test_read_dir_from_blob() {
    let dir = TempDir::new().unwrap();
    let fs = mount(
        &dir,
        ArchiveBuilder::new()
            .directory("/models", &["*sub", "file.txt"])
            .directory("/models/sub", &["deep.bin"])
            .file("/models/file.txt", b"text")
            .file("/models/sub/deep.bin", b"\x00\x01"),
    );
    let id = FileSystemId::of(&fs);

    let entries = fs.read_dir("/models", false, false).unwrap();
    let listed: Vec<_> = entries
        .iter()
        .map(|entry| (entry.path(), entry.is_directory()))
        .collect();
    assert_eq!(listed, vec![("/models/sub", true), ("/models/file.txt", false)]);
    assert!(entries.iter().all(|entry| entry.filesystem() == id));
    assert!(entries.iter().all(|entry| !entry.is_encrypted()));

    let entries = fs.read_dir("/models/", false, true).unwrap();
    let listed: Vec<_> = entries.iter().map(|entry| entry.path()).collect();
    assert_eq!(
        listed,
        vec!["/models/sub", "/models/sub/deep.bin", "/models/file.txt"]
    );
}

#[test]
fn test_read_dir_root_and_failures() {
    let dir = TempDir::new().unwrap();
    let fs = mount(
        &dir,
        ArchiveBuilder::new()
            .directory("/", &["*def", "version.txt"])
            .directory("/def", &[])
            .file("/version.txt", b"1.0"),
    );

    let entries = fs.read_dir("/", false, true).unwrap();
    let listed: Vec<_> = entries.iter().map(|entry| entry.path()).collect();
    assert_eq!(listed, vec!["/def", "/version.txt"]);

    assert!(fs.read_dir("/def", false, false).unwrap().is_empty());
    assert!(matches!(
        fs.read_dir("/absent", false, false),
        Err(VfsError::FileNotFound(_))
    ));
    assert!(fs.read_dir("/version.txt", false, false).is_err());
    assert!(fs.read_dir("", false, false).is_err());
}

#[test]
fn test_read_dir_marks_encrypted_children() {
    let dir = TempDir::new().unwrap();
    let fs = mount(
        &dir,
        ArchiveBuilder::new()
            .directory("/locked", &["secret.dat", "plain.dat"])
            .encrypted_file("/locked/secret.dat", b"????")
            .file("/locked/plain.dat", b"open"),
    );

    let entries = fs.read_dir("/locked", false, false).unwrap();
    assert!(entries[0].is_encrypted());
    assert!(!entries[1].is_encrypted());
    assert!(matches!(
        fs.open("/locked/secret.dat", OpenMode::READ),
        Err(VfsError::UnsupportedFileType(_))
    ));
}

#[test]
fn test_archive_is_read_only() {
    let dir = TempDir::new().unwrap();
    let fs = mount(&dir, with_paths(ArchiveBuilder::new()));

    for mode in [OpenMode::WRITE, OpenMode::APPEND, OpenMode::READ | OpenMode::UPDATE] {
        assert!(matches!(
            fs.open("/version.txt", mode),
            Err(VfsError::UnsupportedOperation(_))
        ));
    }
    assert!(matches!(
        fs.open("/absent.txt", OpenMode::WRITE),
        Err(VfsError::FileNotFound(_))
    ));
    assert!(fs.remove("/version.txt").is_err());
    assert!(fs.mkdir("/new").is_err());
    assert!(fs.rmdir("/def").is_err());
    assert_eq!(fs.name(), "hashfs");
    assert_eq!(fs.root(), "base.scs");
}

#[test]
fn test_read_dir_skips_unnamed_children() {
    let dir = TempDir::new().unwrap();
    let fs = mount(
        &dir,
        ArchiveBuilder::new()
            .directory("/a", &["*b", "", "note.txt"])
            .directory("/a/b", &["*", "leaf.txt"])
            .file("/a/note.txt", b"note")
            .file("/a/b/leaf.txt", b"leaf"),
    );

    let entries = fs.read_dir("/a", false, true).unwrap();
    let listed: Vec<_> = entries.iter().map(|entry| entry.path()).collect();
    assert_eq!(listed, vec!["/a/b", "/a/b/leaf.txt", "/a/note.txt"]);

    let entries = fs.read_dir("/a/b", false, false).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].path(), "/a/b/leaf.txt");
}

#[test]
fn test_read_dir_rejects_runaway_nesting() {
    let dir = TempDir::new().unwrap();
    let mut builder = ArchiveBuilder::new();
    let mut path = String::from("/d");
    for _ in 0..300 {
        builder = builder.directory(&path, &["*d"]);
        path.push_str("/d");
    }
    let fs = mount(&dir, builder);

    assert!(matches!(
        fs.read_dir("/d", false, true),
        Err(VfsError::FileCorrupted(_))
    ));
    let entries = fs.read_dir("/d", false, false).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].path(), "/d/d");
}
