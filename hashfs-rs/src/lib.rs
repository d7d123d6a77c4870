//! # hashfs-rs
//!
//! `hashfs-rs` is a pure Rust virtual filesystem layer for SCS HashFS (`SCS#`) game archives.
//! It reads files straight out of the archives, without unpacking them, and layers
//! archives and plain directories into one prioritized view.
//!
//! ## Features
//! - Parse HashFS v1 archives (CityHash64-indexed, optionally salted)
//! - Stream stored, zlib and one-shot block-compressed entries
//! - List directories from the archive's directory blobs
//! - Mount archives and directories into an [`UberFileSystem`] with shadowing by priority
//! - Typed per-path metadata through [`MetaStat`]
//!
//! ## Usage
//! Add to your `Cargo.toml`:
//! ```toml
//! [dependencies]
//! hashfs-rs = "0.1"
//! ```
//!
//! ### Example: Mounting and Extracting Files
//! ```rust,no_run
//! use hashfs_rs::{FileSystem, OpenMode, SysFileSystem, UberFileSystem};
//! use std::io::Read;
//!
//! let sys = SysFileSystem::new("");
//! let mut ufs = UberFileSystem::new();
//!
//! // Later mounts with a higher priority shadow earlier ones.
//! ufs.mount_path(&sys, "path/to/base.scs", 0).unwrap();
//! ufs.mount_path(&sys, "path/to/mod_directory", 10).unwrap();
//!
//! // List a directory across every mounted store
//! for entry in ufs.read_dir("/def", false, false).unwrap() {
//!     println!("{} (dir: {})", entry.path(), entry.is_directory());
//! }
//!
//! // Read a file from whichever store wins
//! let mut file = ufs.open("/def/world.sii", OpenMode::READ | OpenMode::BINARY).unwrap();
//! let mut content = Vec::new();
//! file.read_to_end(&mut content).unwrap();
//!
//! // Extract it to disk
//! let output = SysFileSystem::new("output");
//! hashfs_rs::extract_file(&ufs, "/def/world.sii", &output).unwrap();
//! ```

pub mod city_hash;
pub mod compression;
pub mod entry;
pub mod error;
mod ext;
pub mod file_system;
pub mod hash_file_system;
pub mod hash_fs_entry;
pub mod hash_fs_file;
pub mod hash_fs_header;
pub mod meta_stat;
pub mod mount_config;
pub mod sys_file_system;
pub mod token;
pub mod uber_file_system;
mod utility;

pub use compression::Compression;
pub use entry::Entry;
pub use error::VfsError;
pub use file_system::{extract_file, File, FileSystem, FileSystemId, OpenMode};
pub use hash_file_system::HashFileSystem;
pub use hash_fs_file::HashFsFile;
pub use meta_stat::{Meta, MetaStat, MetaValue, PlainMeta};
pub use mount_config::{MountConfig, MountPoint};
pub use sys_file_system::SysFileSystem;
pub use token::Token;
pub use uber_file_system::UberFileSystem;
