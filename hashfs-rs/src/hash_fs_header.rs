use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Read};

/// Builds a little-endian FourCC value.
pub const fn make_fourcc(code: &[u8; 4]) -> u32 {
    u32::from_le_bytes(*code)
}

/// Represents the header at the start of a HashFS v1 archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashFsHeader {
    pub magic: u32,
    pub version: u16,
    /// Prefix mixed into every path before hashing, 0 when unsalted.
    pub salt: u16,
    pub hash_method: u32,
    pub entries_count: u32,
    /// Offset of the entry table from the start of the archive.
    pub start_offset: u32,
}

impl HashFsHeader {
    pub const SIZE: usize = 20;
    pub const MAGIC: u32 = make_fourcc(b"SCS#");
    pub const SUPPORTED_VERSION: u16 = 1;
    pub const HASH_METHOD_CITY: u32 = make_fourcc(b"CITY");
    /// Entry tables larger than this are treated as corrupt.
    pub const MAX_ENTRIES: u32 = 200_000;

    pub fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            magic: reader.read_u32::<LittleEndian>()?,
            version: reader.read_u16::<LittleEndian>()?,
            salt: reader.read_u16::<LittleEndian>()?,
            hash_method: reader.read_u32::<LittleEndian>()?,
            entries_count: reader.read_u32::<LittleEndian>()?,
            start_offset: reader.read_u32::<LittleEndian>()?,
        })
    }
}
