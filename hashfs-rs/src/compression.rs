/// Represents how an archive entry's payload is stored.
///
/// The strategy is chosen once when a stream is opened and decides how reads
/// and seeks behave for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Compression {
    /// Plain stored bytes, freely seekable.
    Store = 0,
    /// A zlib stream, decoded incrementally and forward-only.
    Zlib = 1,
    /// A single raw-deflate block that must be decoded in one call.
    Block = 2,
    /// Unknown or unsupported method, stores the raw value.
    Unknown(u32),
}

impl Compression {
    pub fn to_raw(self) -> u32 {
        match self {
            Compression::Store => 0,
            Compression::Zlib => 1,
            Compression::Block => 2,
            Compression::Unknown(other) => other,
        }
    }
}

impl From<u32> for Compression {
    fn from(value: u32) -> Self {
        match value {
            0 => Compression::Store,
            1 => Compression::Zlib,
            2 => Compression::Block,
            other => Compression::Unknown(other),
        }
    }
}
