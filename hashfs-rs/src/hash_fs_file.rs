use crate::compression::Compression;
use crate::error::VfsError;
use crate::file_system::{File, FileSystemId};
use crate::hash_file_system::HashFsArchive;
use crate::hash_fs_entry::HashFsEntry;
use crate::meta_stat::{MetaStat, PlainMeta};
use flate2::{Decompress, FlushDecompress, Status};
use std::{
    io::{self, Read, Seek, SeekFrom, Write},
    sync::Arc,
};
use tracing::error;

/// Compressed bytes pulled from the archive per inflate step.
const ZLIB_CHUNK_SIZE: usize = 4 * 1024;

/// Archive offset of the payload byte at `position`.
fn device_position(path: &str, offset: u64, position: u64) -> Result<u64, VfsError> {
    offset
        .checked_add(position)
        .ok_or_else(|| VfsError::FileCorrupted(format!("{path}: payload offset overflows")))
}

/// Per-stream decoder, owned by exactly one open file.
enum DecodeState {
    Store,
    Zlib {
        inflate: Decompress,
        finished: bool,
    },
    Block {
        armed: bool,
    },
}

impl DecodeState {
    fn new(compression: Compression) -> Result<Self, VfsError> {
        match compression {
            Compression::Store => Ok(DecodeState::Store),
            Compression::Zlib => Ok(DecodeState::Zlib {
                inflate: Decompress::new(true),
                finished: false,
            }),
            Compression::Block => Ok(DecodeState::Block { armed: true }),
            Compression::Unknown(other) => Err(VfsError::UnsupportedFileType(format!(
                "Unknown compression method {other}"
            ))),
        }
    }
}

/// A read-only stream over one archived file.
///
/// The decode strategy is fixed at open time from the entry's plain metadata:
/// stored files seek freely, while zlib and block-compressed files are
/// forward-only and can only be rewound to the start.
pub struct HashFsFile {
    path: String,
    archive: Arc<HashFsArchive>,
    entry: HashFsEntry,
    filesystem: FileSystemId,
    /// Uncompressed size.
    size: u64,
    compressed_size: u64,
    /// Absolute offset of the payload within the archive.
    device_offset: u64,
    /// Decompressed bytes delivered so far (stored files: the cursor).
    position: u64,
    /// Compressed bytes consumed by the inflate context.
    input_position: u64,
    decoder: DecodeState,
}

impl HashFsFile {
    pub(crate) fn new(
        path: &str,
        archive: Arc<HashFsArchive>,
        entry: HashFsEntry,
        plain: &PlainMeta,
        filesystem: FileSystemId,
    ) -> Result<Self, VfsError> {
        if plain.offset.checked_add(plain.stored_size()).is_none() {
            return Err(VfsError::FileCorrupted(format!(
                "{path}: payload at {:#x} runs past the end of the archive",
                plain.offset
            )));
        }
        Ok(HashFsFile {
            path: path.to_string(),
            archive,
            entry,
            filesystem,
            size: plain.size,
            compressed_size: plain.compressed_size,
            device_offset: plain.offset,
            position: 0,
            input_position: 0,
            decoder: DecodeState::new(plain.compression)?,
        })
    }

    fn read_stored(&mut self, buf: &mut [u8]) -> Result<usize, VfsError> {
        if self.position >= self.size || buf.is_empty() {
            return Ok(0);
        }
        let count = (buf.len() as u64).min(self.size - self.position) as usize;
        let at = device_position(&self.path, self.device_offset, self.position)?;
        self.archive.io_read(at, &mut buf[..count])?;
        self.position += count as u64;
        Ok(count)
    }

    fn read_zlib(&mut self, buf: &mut [u8]) -> Result<usize, VfsError> {
        let DecodeState::Zlib { inflate, finished } = &mut self.decoder else {
            return Err(VfsError::Other("zlib read on a non-zlib stream".to_string()));
        };

        let mut chunk = [0u8; ZLIB_CHUNK_SIZE];
        let mut written = 0;
        while !*finished && written < buf.len() {
            let left = self.compressed_size.saturating_sub(self.input_position);
            let bytes = left.min(ZLIB_CHUNK_SIZE as u64) as usize;
            let input = &mut chunk[..bytes];
            if bytes > 0 {
                let at = device_position(&self.path, self.device_offset, self.input_position)?;
                self.archive.io_read(at, input)?;
            }

            // Once the input is exhausted keep draining whatever inflate still holds.
            let flush = if bytes == 0 {
                FlushDecompress::Finish
            } else {
                FlushDecompress::None
            };
            let total_in = inflate.total_in();
            let total_out = inflate.total_out();
            let status = inflate
                .decompress(input, &mut buf[written..], flush)
                .map_err(|e| VfsError::Decode(format!("zlib: {e}")))?;
            let consumed = inflate.total_in() - total_in;
            let produced = (inflate.total_out() - total_out) as usize;
            self.input_position += consumed;
            written += produced;

            match status {
                Status::StreamEnd => *finished = true,
                Status::Ok | Status::BufError if consumed == 0 && produced == 0 => {
                    return Err(VfsError::Decode(if bytes == 0 {
                        "zlib: compressed stream is truncated".to_string()
                    } else {
                        "zlib: no progress decoding compressed stream".to_string()
                    }));
                }
                Status::Ok | Status::BufError => {}
            }
        }

        self.position += written as u64;
        Ok(written)
    }

    fn read_block(&mut self, buf: &mut [u8]) -> Result<usize, VfsError> {
        let DecodeState::Block { armed } = &mut self.decoder else {
            return Err(VfsError::Other("block read on a non-block stream".to_string()));
        };
        if !*armed {
            return Ok(0);
        }
        if self.position != 0 || buf.len() as u64 != self.size {
            return Err(VfsError::UnsupportedOperation(format!(
                "{}: block-compressed file must be read in one call of {} bytes",
                self.path, self.size
            )));
        }

        let compressed = self
            .archive
            .io_read_vec(self.device_offset, self.compressed_size)?;
        let mut decompressor = Decompress::new(false);
        let status = decompressor
            .decompress(&compressed, buf, FlushDecompress::Finish)
            .map_err(|e| VfsError::Decode(format!("block codec: {e}")))?;
        if status != Status::StreamEnd || decompressor.total_out() != self.size {
            return Err(VfsError::Decode(format!(
                "block codec: produced {} of {} bytes",
                decompressor.total_out(),
                self.size
            )));
        }

        *armed = false;
        self.position = self.size;
        Ok(buf.len())
    }

    /// Resets a compressed stream to its first byte with a fresh decoder.
    fn rearm(&mut self) {
        if self.position == 0 && self.input_position == 0 {
            return;
        }
        match &mut self.decoder {
            DecodeState::Store => {}
            DecodeState::Zlib { inflate, finished } => {
                *inflate = Decompress::new(true);
                *finished = false;
            }
            DecodeState::Block { armed } => *armed = true,
        }
        self.position = 0;
        self.input_position = 0;
    }
}

impl Read for HashFsFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let result = match self.decoder {
            DecodeState::Store => self.read_stored(buf),
            DecodeState::Zlib { .. } => self.read_zlib(buf),
            DecodeState::Block { .. } => self.read_block(buf),
        };
        result.map_err(|err| {
            error!(target: "hashfs_file", path = %self.path, "{err}");
            io::Error::from(err)
        })
    }
}

impl Seek for HashFsFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self.decoder {
            DecodeState::Store => {
                let target = match pos {
                    SeekFrom::Start(offset) => Some(offset),
                    SeekFrom::Current(offset) => self.position.checked_add_signed(offset),
                    SeekFrom::End(offset) => self.size.checked_add_signed(offset),
                };
                self.position = target.ok_or_else(|| {
                    io::Error::new(io::ErrorKind::InvalidInput, "seek to a negative position")
                })?;
            }
            DecodeState::Zlib { .. } | DecodeState::Block { .. } => match pos {
                SeekFrom::Current(0) => {}
                SeekFrom::Start(0) => self.rearm(),
                _ => {
                    return Err(VfsError::UnsupportedOperation(format!(
                        "{}: random access on a compressed stream",
                        self.path
                    ))
                    .into())
                }
            },
        }
        Ok(self.position)
    }
}

impl Write for HashFsFile {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(VfsError::UnsupportedOperation(format!("{}: archive files are read-only", self.path)).into())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl File for HashFsFile {
    fn size(&self) -> u64 {
        self.size
    }

    fn tell(&self) -> u64 {
        self.position
    }

    fn mstat(&self) -> Result<MetaStat, VfsError> {
        Ok(self.archive.mstat_entry(&self.entry, self.filesystem))
    }
}
