use std::io;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;

/// Positioned reads over any seekable source, the archive device primitive.
pub trait BlockReadExt: Read + Seek {
    /// Fills `buf` entirely with the bytes stored at `offset`.
    fn block_read(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()>;

    /// Reads `length` bytes stored at `offset` into a new buffer.
    fn block_read_vec(&mut self, offset: u64, length: usize) -> io::Result<Vec<u8>>;
}

impl<T> BlockReadExt for T
where
    T: Read + Seek + ?Sized,
{
    fn block_read(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        self.seek(SeekFrom::Start(offset))?;
        self.read_exact(buf)
    }

    fn block_read_vec(&mut self, offset: u64, length: usize) -> io::Result<Vec<u8>> {
        let mut result: Vec<u8> = Vec::new();

        result
            .try_reserve_exact(length)
            .map_err(|e| io::Error::new(io::ErrorKind::OutOfMemory, e))?;
        result.resize(length, 0);

        self.block_read(offset, &mut result)?;

        Ok(result)
    }
}
