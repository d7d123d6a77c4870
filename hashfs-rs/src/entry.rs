use crate::file_system::FileSystemId;

/// A single item of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    path: String,
    directory: bool,
    encrypted: bool,
    filesystem: FileSystemId,
}

impl Entry {
    pub fn new(path: String, directory: bool, encrypted: bool, filesystem: FileSystemId) -> Self {
        Self {
            path,
            directory,
            encrypted,
            filesystem,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_directory(&self) -> bool {
        self.directory
    }

    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    /// The store that listed this entry.
    pub fn filesystem(&self) -> FileSystemId {
        self.filesystem
    }
}
