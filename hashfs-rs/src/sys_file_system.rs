use crate::{
    entry::Entry,
    error::VfsError,
    file_system::{File, FileSystem, FileSystemId, OpenMode},
    meta_stat::MetaStat,
    utility::path::{directory_key, join, make_slash_at_end, trim_slashes_at_begin},
};
use std::{
    fs::{self, OpenOptions},
    io::{self, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};
use tracing::debug;

fn map_io_error(err: io::Error, path: &Path) -> VfsError {
    if err.kind() == io::ErrorKind::NotFound {
        VfsError::FileNotFound(path.display().to_string())
    } else {
        VfsError::Io(err)
    }
}

/// A file opened on the real filesystem.
pub struct SysFile {
    file: fs::File,
    filesystem: FileSystemId,
}

impl Read for SysFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for SysFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Seek for SysFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

impl File for SysFile {
    fn size(&self) -> u64 {
        self.file.metadata().map_or(0, |metadata| metadata.len())
    }

    fn tell(&self) -> u64 {
        (&self.file).stream_position().unwrap_or(0)
    }

    fn mstat(&self) -> Result<MetaStat, VfsError> {
        Ok(MetaStat::new(self.filesystem))
    }
}

/// A store over a directory of the real filesystem.
///
/// Logical paths are resolved relative to the root; an empty root resolves
/// them as given (relative to the working directory or absolute).
#[derive(Debug, Clone)]
pub struct SysFileSystem {
    root: String,
}

impl SysFileSystem {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref().display().to_string();
        SysFileSystem {
            root: make_slash_at_end(&root),
        }
    }

    fn full_path(&self, path: &str) -> PathBuf {
        if self.root.is_empty() {
            PathBuf::from(path)
        } else {
            PathBuf::from(format!("{}{}", self.root, trim_slashes_at_begin(path)))
        }
    }

    fn list(
        &self,
        path: &str,
        absolute_paths: bool,
        recursive: bool,
        result: &mut Vec<Entry>,
    ) -> Result<(), VfsError> {
        let full = self.full_path(path);
        let mut children = fs::read_dir(&full)
            .map_err(|e| map_io_error(e, &full))?
            .collect::<Result<Vec<_>, _>>()?;
        children.sort_by_key(|child| child.file_name());

        let filesystem = FileSystemId::of(self);
        for child in children {
            let name = child.file_name().to_string_lossy().into_owned();
            let logical = join(directory_key(path), &name);
            let directory = child.file_type()?.is_dir();
            let listed = if absolute_paths {
                self.root_path(&logical)
            } else {
                logical.clone()
            };
            result.push(Entry::new(listed, directory, false, filesystem));
            if directory && recursive {
                self.list(&logical, absolute_paths, recursive, result)?;
            }
        }
        Ok(())
    }
}

impl FileSystem for SysFileSystem {
    fn root(&self) -> &str {
        &self.root
    }

    fn name(&self) -> &str {
        "sysfs"
    }

    fn open(&self, path: &str, mode: OpenMode) -> Result<Box<dyn File>, VfsError> {
        let full = self.full_path(path);
        let write = mode.contains(OpenMode::WRITE);
        let append = mode.contains(OpenMode::APPEND);
        let update = mode.contains(OpenMode::UPDATE);

        // Directories are not files here, though the OS would open one for reading.
        if !mode.is_write_intent() && full.is_dir() {
            return Err(VfsError::FileNotFound(format!(
                "{}: {path} is a directory",
                self.root
            )));
        }

        if write || append {
            if let Some(parent) = full.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .read(update || !(write || append))
            .write(write || update)
            .append(append)
            .create(write || append)
            .truncate(write && !append)
            .open(&full)
            .map_err(|e| map_io_error(e, &full))?;

        Ok(Box::new(SysFile {
            file,
            filesystem: FileSystemId::of(self),
        }))
    }

    fn remove(&self, path: &str) -> Result<(), VfsError> {
        let full = self.full_path(path);
        debug!(target: "sysfs", path = %full.display(), "Removing file");
        fs::remove_file(&full).map_err(|e| map_io_error(e, &full))
    }

    fn mkdir(&self, directory: &str) -> Result<(), VfsError> {
        let full = self.full_path(directory);
        fs::create_dir_all(&full).map_err(|e| map_io_error(e, &full))
    }

    fn rmdir(&self, directory: &str) -> Result<(), VfsError> {
        let full = self.full_path(directory);
        debug!(target: "sysfs", path = %full.display(), "Removing directory");
        fs::remove_dir(&full).map_err(|e| map_io_error(e, &full))
    }

    fn exists(&self, path: &str) -> bool {
        self.full_path(path).is_file()
    }

    fn dir_exists(&self, path: &str) -> bool {
        self.full_path(path).is_dir()
    }

    fn read_dir(
        &self,
        path: &str,
        absolute_paths: bool,
        recursive: bool,
    ) -> Result<Vec<Entry>, VfsError> {
        let mut result = Vec::new();
        self.list(path, absolute_paths, recursive, &mut result)?;
        Ok(result)
    }

    fn mstat(&self, path: &str) -> Result<MetaStat, VfsError> {
        let full = self.full_path(path);
        if full.exists() {
            Ok(MetaStat::new(FileSystemId::of(self)))
        } else {
            Err(VfsError::FileNotFound(full.display().to_string()))
        }
    }
}
