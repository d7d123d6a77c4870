use std::io;

/// Represents all possible errors that can occur in the virtual filesystem layer.
///
/// This enum is used throughout the crate to report lookup misses, corrupt archives,
/// decode failures and operations a store does not support.
#[derive(Debug)]
pub enum VfsError {
    /// The path does not resolve to anything in the store.
    FileNotFound(String),
    /// The archive is malformed (bad magic, version, hash method, entry count or truncated).
    FileCorrupted(String),
    /// The data read from a store is invalid.
    InvalidData(String),
    /// The file exists but is of a kind this store cannot hand out (e.g. encrypted).
    UnsupportedFileType(String),
    /// The store or stream does not support the requested operation.
    UnsupportedOperation(String),
    /// A compressed payload failed to decode.
    Decode(String),
    /// A metadata record was accessed as a type with a different word count.
    MetaMismatch {
        name: String,
        expected: u32,
        actual: u32,
    },
    /// Represents an error that occurs during I/O operations.
    Io(io::Error),
    /// Represents an error that occurs for any other reason not covered by the above variants.
    Other(String),
}

impl VfsError {
    /// Returns `true` for a plain lookup miss.
    pub fn is_not_found(&self) -> bool {
        matches!(self, VfsError::FileNotFound(_))
    }
}

impl std::fmt::Display for VfsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VfsError::FileNotFound(name) => write!(f, "File not found: {name}"),
            VfsError::FileCorrupted(err) => write!(f, "Archive is corrupted: {err}"),
            VfsError::InvalidData(err) => write!(f, "Invalid data: {err}"),
            VfsError::UnsupportedFileType(name) => write!(f, "Unsupported file type: {name}"),
            VfsError::UnsupportedOperation(op) => write!(f, "Unsupported operation: {op}"),
            VfsError::Decode(err) => write!(f, "Decode error: {err}"),
            VfsError::MetaMismatch {
                name,
                expected,
                actual,
            } => write!(
                f,
                "Meta '{name}' holds {actual} words, requested type expects {expected}"
            ),
            VfsError::Io(err) => write!(f, "I/O error: {err}"),
            VfsError::Other(err) => write!(f, "VFS error: {err}"),
        }
    }
}

impl std::error::Error for VfsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            VfsError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for VfsError {
    fn from(error: io::Error) -> Self {
        VfsError::Io(error)
    }
}

/// Streams implement `std::io` traits, so their failures travel as `io::Error`.
impl From<VfsError> for io::Error {
    fn from(error: VfsError) -> Self {
        let kind = match &error {
            VfsError::Io(err) => return io::Error::new(err.kind(), error.to_string()),
            VfsError::FileNotFound(_) => io::ErrorKind::NotFound,
            VfsError::UnsupportedOperation(_) | VfsError::UnsupportedFileType(_) => {
                io::ErrorKind::Unsupported
            }
            VfsError::FileCorrupted(_) | VfsError::InvalidData(_) | VfsError::Decode(_) => {
                io::ErrorKind::InvalidData
            }
            VfsError::MetaMismatch { .. } => io::ErrorKind::InvalidInput,
            VfsError::Other(_) => io::ErrorKind::Other,
        };
        io::Error::new(kind, error)
    }
}
