use crate::entry::Entry;
use crate::error::VfsError;
use crate::meta_stat::{MetaStat, PlainMeta};
use crate::utility::path::trim_slashes_at_begin;
use bitflags::bitflags;
use std::io::{Read, Seek, Write};

bitflags! {
    /// How a file is opened. Archive-backed stores only accept `READ | BINARY`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OpenMode: u32 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const APPEND = 1 << 2;
        const UPDATE = 1 << 3;
        const BINARY = 1 << 4;
    }
}

impl OpenMode {
    /// Returns `true` if the mode asks to modify the file in any way.
    pub fn is_write_intent(self) -> bool {
        self.intersects(OpenMode::WRITE | OpenMode::APPEND | OpenMode::UPDATE)
    }
}

/// Identity of a store instance.
///
/// Entries and metadata carry this instead of a reference to the store that
/// produced them; it never keeps the store alive. Stores mounted in an
/// [`UberFileSystem`](crate::uber_file_system::UberFileSystem) are heap-pinned,
/// so their identity is stable for as long as they stay mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileSystemId(usize);

impl FileSystemId {
    pub fn of(filesystem: &dyn FileSystem) -> Self {
        FileSystemId(filesystem as *const dyn FileSystem as *const () as usize)
    }
}

/// An open file handed out by a [`FileSystem`].
///
/// Reading, writing, seeking, rewinding and flushing go through the standard
/// `Read`, `Write` and `Seek` traits; unsupported operations fail with an
/// `io::Error` instead of panicking.
pub trait File: Read + Write + Seek + Send {
    /// Size of the file's (decompressed) content in bytes.
    fn size(&self) -> u64;

    /// Current logical read position.
    fn tell(&self) -> u64;

    /// Metadata of the file as reported by its store.
    fn mstat(&self) -> Result<MetaStat, VfsError>;

    /// Reads the whole content, from the current position to the declared size.
    ///
    /// The first read asks for the full remaining size in one call, which
    /// is what one-shot decoders require.
    fn read_all(&mut self) -> Result<Vec<u8>, VfsError> {
        let remaining = self.size().saturating_sub(self.tell()) as usize;
        let mut buffer = vec![0u8; remaining];
        let mut filled = 0;
        while filled < remaining {
            let read = self.read(&mut buffer[filled..])?;
            if read == 0 {
                break;
            }
            filled += read;
        }
        buffer.truncate(filled);
        Ok(buffer)
    }
}

/// The capability set every storage backend implements.
///
/// `open` reports a missing file as [`VfsError::FileNotFound`]; any other
/// error means the file exists but could not be opened.
pub trait FileSystem: Send + Sync {
    /// Mount-point prefix ending with a slash, or an empty string.
    fn root(&self) -> &str;

    fn name(&self) -> &str;

    fn open(&self, path: &str, mode: OpenMode) -> Result<Box<dyn File>, VfsError>;

    /// Opens an archived file using caller-supplied storage metadata.
    fn open_with_plain_meta(
        &self,
        path: &str,
        _plain: &PlainMeta,
    ) -> Result<Box<dyn File>, VfsError> {
        Err(VfsError::UnsupportedOperation(format!(
            "{}: opening with plain meta ({path})",
            self.name()
        )))
    }

    fn remove(&self, path: &str) -> Result<(), VfsError>;

    fn mkdir(&self, directory: &str) -> Result<(), VfsError>;

    fn rmdir(&self, directory: &str) -> Result<(), VfsError>;

    fn exists(&self, path: &str) -> bool;

    fn dir_exists(&self, path: &str) -> bool;

    fn read_dir(
        &self,
        path: &str,
        absolute_paths: bool,
        recursive: bool,
    ) -> Result<Vec<Entry>, VfsError>;

    fn mstat(&self, path: &str) -> Result<MetaStat, VfsError>;

    /// Prefixes `path` with this store's root.
    fn root_path(&self, path: &str) -> String {
        let root = self.root();
        if root.is_empty() {
            path.to_string()
        } else {
            format!("{root}{}", trim_slashes_at_begin(path))
        }
    }
}

/// Copies one file from `source` to `destination`, keeping its path.
pub fn extract_file(
    source: &dyn FileSystem,
    path: &str,
    destination: &dyn FileSystem,
) -> Result<(), VfsError> {
    let mut input = source.open(path, OpenMode::READ | OpenMode::BINARY)?;
    let data = input.read_all()?;
    if (data.len() as u64) < input.size() {
        return Err(VfsError::InvalidData(format!(
            "{path}: read {} of {} bytes",
            data.len(),
            input.size()
        )));
    }

    let mut output = destination.open(path, OpenMode::WRITE | OpenMode::BINARY)?;
    output.write_all(&data)?;
    output.flush()?;
    Ok(())
}
