#![allow(dead_code)]

use flate2::write::{DeflateEncoder, ZlibEncoder};
use hashfs_rs::hash_fs_entry::HashFsEntryFlags;
use hashfs_rs::HashFileSystem;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const HEADER_SIZE: usize = 20;

struct Item {
    hash: u64,
    flags: HashFsEntryFlags,
    size: u32,
    payload: Vec<u8>,
}

/// Writes HashFS v1 archives: header, payloads, then the hash-sorted table.
pub struct ArchiveBuilder {
    magic: [u8; 4],
    version: u16,
    salt: u16,
    hash_method: [u8; 4],
    items: Vec<Item>,
}

impl Default for ArchiveBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        ArchiveBuilder {
            magic: *b"SCS#",
            version: 1,
            salt: 0,
            hash_method: *b"CITY",
            items: Vec::new(),
        }
    }

    pub fn salt(mut self, salt: u16) -> Self {
        self.salt = salt;
        self
    }

    pub fn magic(mut self, magic: &[u8; 4]) -> Self {
        self.magic = *magic;
        self
    }

    pub fn version(mut self, version: u16) -> Self {
        self.version = version;
        self
    }

    pub fn hash_method(mut self, hash_method: &[u8; 4]) -> Self {
        self.hash_method = *hash_method;
        self
    }

    /// A stored file.
    pub fn file(self, path: &str, content: &[u8]) -> Self {
        let size = content.len() as u32;
        self.raw(path, HashFsEntryFlags::empty(), size, content.to_vec())
    }

    /// A zlib-compressed file.
    pub fn zlib_file(self, path: &str, content: &[u8]) -> Self {
        let size = content.len() as u32;
        self.raw(path, HashFsEntryFlags::COMPRESSED, size, zlib(content))
    }

    /// A file whose payload is one raw deflate block, opened through plain meta.
    pub fn block_file(self, path: &str, content: &[u8]) -> Self {
        let size = content.len() as u32;
        self.raw(path, HashFsEntryFlags::empty(), size, deflate(content))
    }

    pub fn encrypted_file(self, path: &str, content: &[u8]) -> Self {
        let size = content.len() as u32;
        self.raw(path, HashFsEntryFlags::ENCRYPTED, size, content.to_vec())
    }

    /// A directory whose blob lists `children` (`*name` for subdirectories).
    pub fn directory(self, path: &str, children: &[&str]) -> Self {
        let mut blob = String::new();
        for child in children {
            blob.push_str(child);
            blob.push('\n');
        }
        let size = blob.len() as u32;
        self.raw(path, HashFsEntryFlags::DIR, size, blob.into_bytes())
    }

    pub fn raw(self, path: &str, flags: HashFsEntryFlags, size: u32, payload: Vec<u8>) -> Self {
        let hash = HashFileSystem::hash_path(self.salt, path);
        self.raw_hash(hash, flags, size, payload)
    }

    /// An entry under an arbitrary hash, with no path behind it.
    pub fn raw_hash(
        mut self,
        hash: u64,
        flags: HashFsEntryFlags,
        size: u32,
        payload: Vec<u8>,
    ) -> Self {
        self.items.push(Item {
            hash,
            flags,
            size,
            payload,
        });
        self
    }

    pub fn build(mut self) -> Vec<u8> {
        self.items.sort_by_key(|item| item.hash);

        let mut payloads = Vec::new();
        let mut table = Vec::with_capacity(self.items.len() * 32);
        for item in &self.items {
            let offset = (HEADER_SIZE + payloads.len()) as u64;
            table.extend_from_slice(&item.hash.to_le_bytes());
            table.extend_from_slice(&offset.to_le_bytes());
            table.extend_from_slice(&item.flags.bits().to_le_bytes());
            table.extend_from_slice(&0u32.to_le_bytes());
            table.extend_from_slice(&item.size.to_le_bytes());
            table.extend_from_slice(&(item.payload.len() as u32).to_le_bytes());
            payloads.extend_from_slice(&item.payload);
        }

        let start_offset = (HEADER_SIZE + payloads.len()) as u32;
        let mut archive = header(
            &self.magic,
            self.version,
            self.salt,
            &self.hash_method,
            self.items.len() as u32,
            start_offset,
        );
        archive.extend_from_slice(&payloads);
        archive.extend_from_slice(&table);
        archive
    }

    /// Builds the archive into `dir/name`.
    pub fn write_to(self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, self.build()).unwrap();
        path
    }
}

pub fn header(
    magic: &[u8; 4],
    version: u16,
    salt: u16,
    hash_method: &[u8; 4],
    entries_count: u32,
    start_offset: u32,
) -> Vec<u8> {
    let mut header = Vec::with_capacity(HEADER_SIZE);
    header.extend_from_slice(magic);
    header.extend_from_slice(&version.to_le_bytes());
    header.extend_from_slice(&salt.to_le_bytes());
    header.extend_from_slice(hash_method);
    header.extend_from_slice(&entries_count.to_le_bytes());
    header.extend_from_slice(&start_offset.to_le_bytes());
    header
}

pub fn zlib(content: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(content).unwrap();
    encoder.finish().unwrap()
}

pub fn deflate(content: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(content).unwrap();
    encoder.finish().unwrap()
}

/// Deterministic text-like content that compresses, but not to nothing.
pub fn sample_content(len: usize, seed: u32) -> Vec<u8> {
    const ALPHABET: &[u8] = b"abcdefghijklmnop \n";
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            ALPHABET[((state >> 16) as usize) % ALPHABET.len()]
        })
        .collect()
}
