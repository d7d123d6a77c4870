use crate::compression::Compression;
use crate::meta_stat::PlainMeta;
use bitflags::bitflags;
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Read};

bitflags! {
    /// Flags of an entry in the HashFS entry table.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct HashFsEntryFlags: u32 {
        /// The entry is a directory listing.
        const DIR = 0x1;
        /// The payload is a zlib stream.
        const COMPRESSED = 0x2;
        const VERIFY = 0x4;
        const ENCRYPTED = 0x8;
    }
}

/// Represents one record of the hash-sorted entry table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashFsEntry {
    /// CityHash64 of the (salted) path.
    pub hash: u64,
    /// Absolute offset of the payload within the archive.
    pub offset: u64,
    pub flags: HashFsEntryFlags,
    pub crc: u32,
    /// Uncompressed size.
    pub size: u32,
    pub compressed_size: u32,
}

impl HashFsEntry {
    pub const SIZE: usize = 32;

    pub fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            hash: reader.read_u64::<LittleEndian>()?,
            offset: reader.read_u64::<LittleEndian>()?,
            flags: HashFsEntryFlags::from_bits_retain(reader.read_u32::<LittleEndian>()?),
            crc: reader.read_u32::<LittleEndian>()?,
            size: reader.read_u32::<LittleEndian>()?,
            compressed_size: reader.read_u32::<LittleEndian>()?,
        })
    }

    pub fn is_directory(&self) -> bool {
        self.flags.contains(HashFsEntryFlags::DIR)
    }

    pub fn is_encrypted(&self) -> bool {
        self.flags.contains(HashFsEntryFlags::ENCRYPTED)
    }

    pub fn compression(&self) -> Compression {
        if self.flags.contains(HashFsEntryFlags::COMPRESSED) {
            Compression::Zlib
        } else {
            Compression::Store
        }
    }

    /// Storage metadata the entry's stream is opened with.
    pub fn plain_meta(&self) -> PlainMeta {
        PlainMeta {
            compression: self.compression(),
            size: self.size as u64,
            compressed_size: self.compressed_size as u64,
            offset: self.offset,
        }
    }
}
