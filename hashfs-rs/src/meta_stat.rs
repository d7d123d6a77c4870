//! Typed metadata attached to store paths.
//!
//! A [`MetaStat`] holds a small list of [`Meta`] records, each a name and up to
//! [`META_VALUE_CAPACITY`] 32-bit words. Typed views implement [`MetaValue`];
//! reading a record as a type whose word count differs fails with
//! [`VfsError::MetaMismatch`].

use crate::compression::Compression;
use crate::error::VfsError;
use crate::file_system::FileSystemId;
use crate::token::Token;
use std::marker::PhantomData;

/// Maximum number of words a single record can hold.
pub const META_VALUE_CAPACITY: usize = 13;

/// A fixed-layout metadata kind.
pub trait MetaValue: Sized {
    /// Record name this kind is stored under.
    const NAME: Token;
    /// Exact number of words the kind occupies.
    const WORD_COUNT: u32;

    /// Builds the value from exactly `WORD_COUNT` words.
    fn from_words(words: &[u32]) -> Self;

    /// Writes the value into exactly `WORD_COUNT` words.
    fn write_words(&self, words: &mut [u32]);
}

struct CapacityCheck<T>(PhantomData<T>);

impl<T: MetaValue> CapacityCheck<T> {
    const FITS: () = assert!(
        T::WORD_COUNT as usize <= META_VALUE_CAPACITY,
        "meta kind exceeds record capacity"
    );
}

/// One named metadata record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Meta {
    name: Token,
    count: u32,
    value: [u32; META_VALUE_CAPACITY],
}

impl Meta {
    pub fn new<T: MetaValue>(value: &T) -> Self {
        let mut meta = Meta {
            name: T::NAME,
            count: 0,
            value: [0; META_VALUE_CAPACITY],
        };
        meta.set_value(value);
        meta
    }

    /// Builds a record from raw words, as read from a store's metadata table.
    pub fn from_words(name: Token, words: &[u32]) -> Result<Self, VfsError> {
        if words.len() > META_VALUE_CAPACITY {
            return Err(VfsError::InvalidData(format!(
                "Meta '{name}' has {} words, capacity is {META_VALUE_CAPACITY}",
                words.len()
            )));
        }
        let mut value = [0; META_VALUE_CAPACITY];
        value[..words.len()].copy_from_slice(words);
        Ok(Meta {
            name,
            count: words.len() as u32,
            value,
        })
    }

    pub fn name(&self) -> Token {
        self.name
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn words(&self) -> &[u32] {
        &self.value[..self.count as usize]
    }

    /// Reads the record as `T`, provided the word counts agree.
    pub fn value<T: MetaValue>(&self) -> Result<T, VfsError> {
        if T::WORD_COUNT != self.count {
            return Err(VfsError::MetaMismatch {
                name: self.name.to_string(),
                expected: T::WORD_COUNT,
                actual: self.count,
            });
        }
        Ok(T::from_words(self.words()))
    }

    pub fn set_value<T: MetaValue>(&mut self, value: &T) {
        #[allow(clippy::let_unit_value)]
        let () = CapacityCheck::<T>::FITS;
        self.count = T::WORD_COUNT;
        self.value = [0; META_VALUE_CAPACITY];
        value.write_words(&mut self.value[..T::WORD_COUNT as usize]);
    }
}

/// Metadata of one path, as reported by the store that owns it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaStat {
    filesystem: Option<FileSystemId>,
    meta: Vec<Meta>,
}

impl MetaStat {
    pub fn new(filesystem: FileSystemId) -> Self {
        Self {
            filesystem: Some(filesystem),
            meta: Vec::new(),
        }
    }

    /// The store that produced this record.
    pub fn filesystem(&self) -> Option<FileSystemId> {
        self.filesystem
    }

    pub fn meta(&self) -> &[Meta] {
        &self.meta
    }

    pub fn is_empty(&self) -> bool {
        self.meta.is_empty()
    }

    pub fn find(&self, name: Token) -> Option<&Meta> {
        self.meta.iter().find(|meta| meta.name == name)
    }

    pub fn find_mut(&mut self, name: Token) -> Option<&mut Meta> {
        self.meta.iter_mut().find(|meta| meta.name == name)
    }

    pub fn push(&mut self, meta: Meta) {
        self.meta.push(meta);
    }

    /// Stores `value` under its kind's name, replacing a previous record.
    pub fn set<T: MetaValue>(&mut self, value: &T) {
        match self.find_mut(T::NAME) {
            Some(meta) => meta.set_value(value),
            None => self.meta.push(Meta::new(value)),
        }
    }

    /// Looks up and decodes the record of kind `T`.
    pub fn get<T: MetaValue>(&self) -> Result<T, VfsError> {
        self.find(T::NAME)
            .ok_or_else(|| VfsError::InvalidData(format!("Meta '{}' not present", T::NAME)))?
            .value()
    }
}

/// Where and how an archived file's payload is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlainMeta {
    pub compression: Compression,
    /// Uncompressed size.
    pub size: u64,
    pub compressed_size: u64,
    /// Absolute byte offset of the payload within the archive.
    pub offset: u64,
}

impl PlainMeta {
    /// Number of payload bytes stored in the archive.
    pub fn stored_size(&self) -> u64 {
        match self.compression {
            Compression::Store => self.size,
            _ => self.compressed_size,
        }
    }
}

fn join_words(low: u32, high: u32) -> u64 {
    (low as u64) | ((high as u64) << 32)
}

impl MetaValue for PlainMeta {
    const NAME: Token = Token::from_static("plain");
    const WORD_COUNT: u32 = 7;

    fn from_words(words: &[u32]) -> Self {
        PlainMeta {
            compression: Compression::from(words[0]),
            size: join_words(words[1], words[2]),
            compressed_size: join_words(words[3], words[4]),
            offset: join_words(words[5], words[6]),
        }
    }

    fn write_words(&self, words: &mut [u32]) {
        words[0] = self.compression.to_raw();
        words[1] = self.size as u32;
        words[2] = (self.size >> 32) as u32;
        words[3] = self.compressed_size as u32;
        words[4] = (self.compressed_size >> 32) as u32;
        words[5] = self.offset as u32;
        words[6] = (self.offset >> 32) as u32;
    }
}
