use crate::{
    city_hash::city_hash_64,
    entry::Entry,
    error::VfsError,
    ext::io_ext::BlockReadExt,
    file_system::{File, FileSystem, FileSystemId, OpenMode},
    hash_fs_entry::HashFsEntry,
    hash_fs_file::HashFsFile,
    hash_fs_header::HashFsHeader,
    meta_stat::{MetaStat, PlainMeta},
    utility::path::{directory_key, join, remove_slash_at_begin},
};
use std::{
    collections::HashSet,
    io::Cursor,
    sync::{Arc, Mutex},
};
use tracing::{debug, error, warn};

/// Deepest directory nesting `read_dir` follows before calling the archive corrupt.
const MAX_DIRECTORY_DEPTH: usize = 256;

/// The loaded part of an archive: its backing device and in-memory entry table.
///
/// Shared between the filesystem and every stream it hands out; all device
/// access is serialized through the mutex.
pub(crate) struct HashFsArchive {
    root: String,
    device: Mutex<Box<dyn File>>,
    header: HashFsHeader,
    entries: Vec<HashFsEntry>,
}

impl HashFsArchive {
    fn load(root: &str, mut device: Box<dyn File>) -> Result<Self, VfsError> {
        let mut header_buf = [0u8; HashFsHeader::SIZE];
        device
            .block_read(0, &mut header_buf)
            .map_err(|e| VfsError::FileCorrupted(format!("Failed to read header: {e}")))?;
        let header = HashFsHeader::read(&mut Cursor::new(&header_buf[..]))?;

        if header.magic != HashFsHeader::MAGIC {
            return Err(VfsError::FileCorrupted(format!(
                "Invalid magic ({:08X})",
                header.magic
            )));
        }
        if header.version != HashFsHeader::SUPPORTED_VERSION {
            return Err(VfsError::FileCorrupted(format!(
                "Unsupported version ({})",
                header.version
            )));
        }
        if header.hash_method != HashFsHeader::HASH_METHOD_CITY {
            return Err(VfsError::FileCorrupted(format!(
                "Unsupported hash method ({:08X})",
                header.hash_method
            )));
        }
        if header.entries_count > HashFsHeader::MAX_ENTRIES {
            return Err(VfsError::FileCorrupted(format!(
                "Entry table size ({}) exceeds internal limits",
                header.entries_count
            )));
        }

        // The whole table comes in with one read.
        let table_size = header.entries_count as usize * HashFsEntry::SIZE;
        let table = device
            .block_read_vec(header.start_offset as u64, table_size)
            .map_err(|e| VfsError::FileCorrupted(format!("Failed to read entries: {e}")))?;
        let mut cursor = Cursor::new(table);
        let entries = (0..header.entries_count)
            .map(|_| HashFsEntry::read(&mut cursor))
            .collect::<Result<Vec<_>, _>>()?;

        if entries.windows(2).any(|pair| pair[0].hash > pair[1].hash) {
            warn!(target: "hashfs", archive = root, "Entry table is not sorted by hash, lookups may miss");
        }

        Ok(HashFsArchive {
            root: root.to_string(),
            device: Mutex::new(device),
            header,
            entries,
        })
    }

    /// Hashes a logical path the way the archive's table was built.
    pub(crate) fn hash_path(salt: u16, path: &str) -> u64 {
        let path = remove_slash_at_begin(path);
        if salt != 0 {
            city_hash_64(format!("{salt}{path}").as_bytes())
        } else {
            city_hash_64(path.as_bytes())
        }
    }

    pub(crate) fn find_entry(&self, path: &str) -> Option<&HashFsEntry> {
        let hash = Self::hash_path(self.header.salt, path);
        self.entries
            .binary_search_by(|entry| entry.hash.cmp(&hash))
            .ok()
            .map(|index| &self.entries[index])
    }

    /// Fills `buf` with archive bytes starting at `offset`.
    pub(crate) fn io_read(&self, offset: u64, buf: &mut [u8]) -> Result<(), VfsError> {
        let mut device = self
            .device
            .lock()
            .map_err(|_| VfsError::Other(format!("{}: device lock poisoned", self.root)))?;
        device.block_read(offset, buf)?;
        Ok(())
    }

    pub(crate) fn io_read_vec(&self, offset: u64, length: u64) -> Result<Vec<u8>, VfsError> {
        let mut device = self
            .device
            .lock()
            .map_err(|_| VfsError::Other(format!("{}: device lock poisoned", self.root)))?;
        Ok(device.block_read_vec(offset, length as usize)?)
    }

    pub(crate) fn mstat_entry(&self, entry: &HashFsEntry, filesystem: FileSystemId) -> MetaStat {
        let mut result = MetaStat::new(filesystem);
        result.set(&entry.plain_meta());
        result
    }
}

/// A read-only filesystem backed by a HashFS v1 archive.
///
/// Paths are looked up by hashing them with CityHash64 (optionally salted) and
/// binary searching the archive's hash-sorted entry table. Hash collisions
/// between distinct paths are not detected.
///
/// An archive that fails to load leaves the filesystem in a non-functional
/// state: the failure is logged once and every later query reports not found.
pub struct HashFileSystem {
    root: String,
    archive: Result<Arc<HashFsArchive>, VfsError>,
}

impl HashFileSystem {
    /// Opens the archive at `root` through `sys`.
    pub fn new(sys: &dyn FileSystem, root: &str) -> Self {
        Self::with_archive(root, Self::open_archive(sys, root))
    }

    /// Reads the archive from an already opened device.
    pub fn from_file(root: &str, device: Box<dyn File>) -> Self {
        Self::with_archive(root, HashFsArchive::load(root, device))
    }

    /// Like [`HashFileSystem::new`], but returns the load failure instead of a
    /// non-functional instance.
    pub fn try_new(sys: &dyn FileSystem, root: &str) -> Result<Self, VfsError> {
        let archive = Self::open_archive(sys, root)
            .inspect_err(|err| error!(target: "hashfs", archive = root, "{err}"))?;
        Ok(Self::with_archive(root, Ok(archive)))
    }

    fn open_archive(sys: &dyn FileSystem, root: &str) -> Result<HashFsArchive, VfsError> {
        let device = sys.open(root, OpenMode::READ | OpenMode::BINARY)?;
        HashFsArchive::load(root, device)
    }

    fn with_archive(root: &str, archive: Result<HashFsArchive, VfsError>) -> Self {
        let archive = match archive {
            Ok(archive) => {
                debug!(
                    target: "hashfs",
                    archive = root,
                    entries = archive.entries.len(),
                    salt = archive.header.salt,
                    "Archive loaded"
                );
                Ok(Arc::new(archive))
            }
            Err(err) => {
                error!(target: "hashfs", archive = root, "{err}");
                Err(err)
            }
        };
        HashFileSystem {
            root: root.to_string(),
            archive,
        }
    }

    /// Returns `true` if the archive loaded and the filesystem is functional.
    pub fn is_loaded(&self) -> bool {
        self.archive.is_ok()
    }

    /// The error the archive failed to load with, if any.
    pub fn load_error(&self) -> Option<&VfsError> {
        self.archive.as_ref().err()
    }

    /// Number of entries in the archive's table.
    pub fn entry_count(&self) -> usize {
        self.archive.as_ref().map_or(0, |archive| archive.entries.len())
    }

    /// The salt mixed into paths before hashing.
    pub fn salt(&self) -> u16 {
        self.archive.as_ref().map_or(0, |archive| archive.header.salt)
    }

    /// Hash a path is stored under in an archive with the given salt.
    pub fn hash_path(salt: u16, path: &str) -> u64 {
        HashFsArchive::hash_path(salt, path)
    }

    /// Raw table record for `path`.
    pub fn find_entry(&self, path: &str) -> Option<HashFsEntry> {
        self.archive.as_ref().ok()?.find_entry(path).copied()
    }

    fn lookup(&self, path: &str) -> Result<(&Arc<HashFsArchive>, HashFsEntry), VfsError> {
        let archive = self
            .archive
            .as_ref()
            .map_err(|_| VfsError::FileNotFound(format!("{}: {path}", self.root)))?;
        let entry = archive
            .find_entry(path)
            .copied()
            .ok_or_else(|| VfsError::FileNotFound(format!("{}: {path}", self.root)))?;
        Ok((archive, entry))
    }

    fn open_entry(
        &self,
        path: &str,
        archive: &Arc<HashFsArchive>,
        entry: HashFsEntry,
        plain: &PlainMeta,
    ) -> Result<HashFsFile, VfsError> {
        if entry.is_encrypted() {
            return Err(VfsError::UnsupportedFileType(format!(
                "{}: {path} is encrypted",
                self.root
            )));
        }
        HashFsFile::new(path, Arc::clone(archive), entry, plain, FileSystemId::of(self))
    }

    /// Appends the entries of `dirpath` to `result`, descending into
    /// subdirectories when `recursive` is set.
    ///
    /// `ancestors` holds the directories currently being listed.
    fn list_dir(
        &self,
        dirpath: &str,
        recursive: bool,
        ancestors: &mut HashSet<String>,
        result: &mut Vec<Entry>,
    ) -> Result<(), VfsError> {
        if ancestors.len() >= MAX_DIRECTORY_DEPTH || !ancestors.insert(dirpath.to_string()) {
            warn!(target: "hashfs", archive = %self.root, path = dirpath, "Directory nesting loops or is too deep");
            return Err(VfsError::FileCorrupted(format!(
                "{}: directory {dirpath} repeats an ancestor or nests deeper than {MAX_DIRECTORY_DEPTH} levels",
                self.root
            )));
        }
        let listed = self.list_entries(dirpath, recursive, ancestors, result);
        ancestors.remove(dirpath);
        listed
    }

    fn list_entries(
        &self,
        dirpath: &str,
        recursive: bool,
        ancestors: &mut HashSet<String>,
        result: &mut Vec<Entry>,
    ) -> Result<(), VfsError> {
        let (archive, entry) = self.lookup(dirpath).inspect_err(|_| {
            warn!(target: "hashfs", archive = %self.root, path = dirpath, "Failed to open dirlist entry");
        })?;
        if !entry.is_directory() {
            warn!(target: "hashfs", archive = %self.root, path = dirpath, "Entry is not a directory");
            return Err(VfsError::InvalidData(format!(
                "{}: {dirpath} is not a directory",
                self.root
            )));
        }

        let mut listing = self.open_entry(dirpath, archive, entry, &entry.plain_meta())?;
        let data = listing.read_all()?;
        let text = String::from_utf8_lossy(&data);

        let filesystem = FileSystemId::of(self);
        for line in text.split('\n').filter(|line| !line.is_empty()) {
            let (name, is_directory) = match line.strip_prefix('*') {
                Some(name) => (name, true),
                None => (line, false),
            };
            if name.is_empty() {
                warn!(target: "hashfs", archive = %self.root, path = dirpath, "Skipping unnamed dirlist entry");
                continue;
            }

            let child = join(dirpath, name);
            let encrypted = archive.find_entry(&child).is_some_and(|e| e.is_encrypted());
            result.push(Entry::new(child.clone(), is_directory, encrypted, filesystem));
            if is_directory && recursive {
                match self.list_dir(directory_key(&child), recursive, ancestors, result) {
                    Err(err @ VfsError::FileCorrupted(_)) => return Err(err),
                    // A subdirectory without a readable listing still shows up itself.
                    Err(_) | Ok(()) => {}
                }
            }
        }
        Ok(())
    }
}

impl FileSystem for HashFileSystem {
    fn root(&self) -> &str {
        &self.root
    }

    fn name(&self) -> &str {
        "hashfs"
    }

    fn open(&self, path: &str, mode: OpenMode) -> Result<Box<dyn File>, VfsError> {
        let (archive, entry) = self.lookup(path)?;
        if mode.is_write_intent() {
            return Err(VfsError::UnsupportedOperation(format!(
                "{}: {path} cannot be opened for writing",
                self.root
            )));
        }
        let file = self.open_entry(path, archive, entry, &entry.plain_meta())?;
        Ok(Box::new(file))
    }

    fn open_with_plain_meta(
        &self,
        path: &str,
        plain: &PlainMeta,
    ) -> Result<Box<dyn File>, VfsError> {
        let (archive, entry) = self.lookup(path)?;
        let file = self.open_entry(path, archive, entry, plain)?;
        Ok(Box::new(file))
    }

    fn remove(&self, path: &str) -> Result<(), VfsError> {
        Err(VfsError::UnsupportedOperation(format!(
            "{}: remove {path} from a read-only archive",
            self.root
        )))
    }

    fn mkdir(&self, directory: &str) -> Result<(), VfsError> {
        Err(VfsError::UnsupportedOperation(format!(
            "{}: mkdir {directory} in a read-only archive",
            self.root
        )))
    }

    fn rmdir(&self, directory: &str) -> Result<(), VfsError> {
        Err(VfsError::UnsupportedOperation(format!(
            "{}: rmdir {directory} in a read-only archive",
            self.root
        )))
    }

    fn exists(&self, path: &str) -> bool {
        if path.is_empty() {
            return false;
        }
        matches!(self.lookup(path), Ok((_, entry)) if !entry.is_directory())
    }

    fn dir_exists(&self, path: &str) -> bool {
        if path.is_empty() {
            return false;
        }
        matches!(self.lookup(directory_key(path)), Ok((_, entry)) if entry.is_directory())
    }

    /// Lists a directory from its stored listing blob.
    ///
    /// Archive paths are already rooted, so `absolute_paths` has no effect.
    /// Unnamed lines are skipped. A recursive listing that revisits a
    /// directory or nests too deep is reported as corrupt.
    fn read_dir(
        &self,
        path: &str,
        _absolute_paths: bool,
        recursive: bool,
    ) -> Result<Vec<Entry>, VfsError> {
        if path.is_empty() {
            warn!(target: "hashfs", archive = %self.root, "readDir: path is empty");
            return Err(VfsError::InvalidData("readDir: path is empty".to_string()));
        }

        let mut ancestors = HashSet::new();
        let mut result = Vec::new();
        self.list_dir(directory_key(path), recursive, &mut ancestors, &mut result)?;
        Ok(result)
    }

    fn mstat(&self, path: &str) -> Result<MetaStat, VfsError> {
        let (archive, entry) = self.lookup(path)?;
        Ok(archive.mstat_entry(&entry, FileSystemId::of(self)))
    }
}
