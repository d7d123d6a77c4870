use crate::{
    entry::Entry,
    error::VfsError,
    file_system::{File, FileSystem, FileSystemId, OpenMode},
    hash_file_system::HashFileSystem,
    meta_stat::MetaStat,
    mount_config::MountConfig,
    sys_file_system::SysFileSystem,
};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

/// Mount priority; higher values shadow lower ones.
pub type Priority = i32;

enum MountSlot<'a> {
    Owned(Box<dyn FileSystem + 'a>),
    Borrowed(&'a dyn FileSystem),
}

impl<'a> MountSlot<'a> {
    fn get(&self) -> &dyn FileSystem {
        match self {
            MountSlot::Owned(filesystem) => filesystem.as_ref(),
            MountSlot::Borrowed(filesystem) => *filesystem,
        }
    }

    fn id(&self) -> FileSystemId {
        FileSystemId::of(self.get())
    }
}

/// A union of mounted stores, resolved by priority.
///
/// `open` and `mstat` are answered by the highest-priority store that has the
/// path, `exists`/`dir_exists` by any store, and `read_dir` merges the
/// listings of every store holding the directory, with higher priorities
/// shadowing lower ones path by path.
///
/// Stores are either owned (dropped on `unmount` or when the union is
/// dropped) or borrowed from the caller for `'a`.
pub struct UberFileSystem<'a> {
    mounts: BTreeMap<Priority, MountSlot<'a>>,
    /// Owned stores pushed out of their slot by a later mount at the same priority.
    retired: Vec<Box<dyn FileSystem + 'a>>,
}

impl Default for UberFileSystem<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> UberFileSystem<'a> {
    pub fn new() -> Self {
        UberFileSystem {
            mounts: BTreeMap::new(),
            retired: Vec::new(),
        }
    }

    /// Mounts a store the union takes ownership of.
    pub fn mount(
        &mut self,
        filesystem: Box<dyn FileSystem + 'a>,
        priority: Priority,
    ) -> FileSystemId {
        self.insert(MountSlot::Owned(filesystem), priority)
    }

    /// Mounts a store owned by the caller.
    pub fn mount_borrowed(
        &mut self,
        filesystem: &'a dyn FileSystem,
        priority: Priority,
    ) -> FileSystemId {
        self.insert(MountSlot::Borrowed(filesystem), priority)
    }

    fn insert(&mut self, slot: MountSlot<'a>, priority: Priority) -> FileSystemId {
        let id = slot.id();
        debug!(
            target: "uberfs",
            name = slot.get().name(),
            root = slot.get().root(),
            priority,
            "Mounting filesystem"
        );
        if let Some(MountSlot::Owned(displaced)) = self.mounts.insert(priority, slot) {
            debug!(
                target: "uberfs",
                root = displaced.root(),
                priority,
                "Replaced mount at occupied priority"
            );
            self.retired.push(displaced);
        }
        id
    }

    /// Mounts `root` as seen through `sys`: a directory through a
    /// [`SysFileSystem`], a file as a HashFS archive.
    pub fn mount_path(
        &mut self,
        sys: &dyn FileSystem,
        root: &str,
        priority: Priority,
    ) -> Result<FileSystemId, VfsError> {
        if sys.dir_exists(root) {
            let filesystem = SysFileSystem::new(sys.root_path(root));
            return Ok(self.mount(Box::new(filesystem), priority));
        }
        if sys.exists(root) {
            let filesystem = HashFileSystem::try_new(sys, root)?;
            return Ok(self.mount(Box::new(filesystem), priority));
        }
        warn!(target: "uberfs", root, "Mount root does not exist");
        Err(VfsError::FileNotFound(root.to_string()))
    }

    /// Mounts every `mount` line of a manifest, stopping at the first failure.
    pub fn mount_config(
        &mut self,
        sys: &dyn FileSystem,
        config: &MountConfig,
    ) -> Result<Vec<FileSystemId>, VfsError> {
        config
            .mounts()?
            .iter()
            .map(|point| self.mount_path(sys, &point.root, point.priority))
            .collect()
    }

    /// Unmounts the store with the given identity, dropping it if owned.
    ///
    /// Returns `false` if no mounted store has that identity.
    pub fn unmount(&mut self, id: FileSystemId) -> bool {
        let priority = self
            .mounts
            .iter()
            .find(|(_, slot)| slot.id() == id)
            .map(|(priority, _)| *priority);
        if let Some(priority) = priority {
            debug!(target: "uberfs", priority, "Unmounting filesystem");
            self.mounts.remove(&priority);
            return true;
        }

        let before = self.retired.len();
        self.retired
            .retain(|filesystem| FileSystemId::of(filesystem.as_ref()) != id);
        before != self.retired.len()
    }

    /// Resolves an identity carried by an [`Entry`] or [`MetaStat`] back to
    /// its mounted store.
    pub fn get(&self, id: FileSystemId) -> Option<&dyn FileSystem> {
        self.mounts
            .values()
            .map(MountSlot::get)
            .find(|filesystem| FileSystemId::of(*filesystem) == id)
    }

    /// Priority the store is mounted at.
    pub fn priority_of(&self, id: FileSystemId) -> Option<Priority> {
        self.mounts
            .iter()
            .find(|(_, slot)| slot.id() == id)
            .map(|(priority, _)| *priority)
    }

    pub fn len(&self) -> usize {
        self.mounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }
}

impl FileSystem for UberFileSystem<'_> {
    fn root(&self) -> &str {
        "<ufs>/"
    }

    fn name(&self) -> &str {
        "uberfs"
    }

    fn open(&self, path: &str, mode: OpenMode) -> Result<Box<dyn File>, VfsError> {
        // Highest priority first.
        for filesystem in self.mounts.values().rev().map(MountSlot::get) {
            match filesystem.open(path, mode) {
                Err(err) if err.is_not_found() => continue,
                result => return result,
            }
        }
        Err(VfsError::FileNotFound(path.to_string()))
    }

    fn remove(&self, path: &str) -> Result<(), VfsError> {
        Err(VfsError::UnsupportedOperation(format!("uberfs: remove {path}")))
    }

    fn mkdir(&self, directory: &str) -> Result<(), VfsError> {
        Err(VfsError::UnsupportedOperation(format!("uberfs: mkdir {directory}")))
    }

    fn rmdir(&self, directory: &str) -> Result<(), VfsError> {
        Err(VfsError::UnsupportedOperation(format!("uberfs: rmdir {directory}")))
    }

    fn exists(&self, path: &str) -> bool {
        self.mounts
            .values()
            .map(MountSlot::get)
            .any(|filesystem| filesystem.exists(path))
    }

    fn dir_exists(&self, path: &str) -> bool {
        self.mounts
            .values()
            .map(MountSlot::get)
            .any(|filesystem| filesystem.dir_exists(path))
    }

    fn read_dir(
        &self,
        path: &str,
        absolute_paths: bool,
        recursive: bool,
    ) -> Result<Vec<Entry>, VfsError> {
        let mut result: Option<Vec<Entry>> = None;
        let mut seen = HashSet::new();

        for filesystem in self.mounts.values().rev().map(MountSlot::get) {
            if !filesystem.dir_exists(path) {
                continue;
            }
            let Ok(current) = filesystem.read_dir(path, absolute_paths, recursive) else {
                continue;
            };
            let merged = result.get_or_insert_with(Vec::new);
            for entry in current {
                if seen.insert(entry.path().to_string()) {
                    merged.push(entry);
                }
            }
        }

        result.ok_or_else(|| VfsError::FileNotFound(path.to_string()))
    }

    fn mstat(&self, path: &str) -> Result<MetaStat, VfsError> {
        self.mounts
            .values()
            .rev()
            .map(MountSlot::get)
            .find_map(|filesystem| filesystem.mstat(path).ok())
            .ok_or_else(|| VfsError::FileNotFound(path.to_string()))
    }
}
