//! I/O utilities
use std::io::{self, Read, Write};

#[derive(Debug)]
/// Error indicating excess writing to a [`LimitedWriter`]
pub struct WriteLimitExceededError;
impl std::fmt::Display for WriteLimitExceededError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "Write limit exceeded")
    }
}
impl std::error::Error for WriteLimitExceededError {}

/// Checks whether an [`io::Error`] was produced by a [`LimitedWriter`]
pub fn is_write_limit_error(e: &io::Error) -> bool {
    e.get_ref()
        .is_some_and(|e| e.is::<WriteLimitExceededError>())
}

/// A `Write` wrapper which limits the amount of data written
///
/// Once the limit is reached further writes fail with an [`io::Error`] of kind
/// [`io::ErrorKind::Other`] wrapping a [`WriteLimitExceededError`]
pub struct LimitedWriter<W: Write> {
    w: W,
    available: u64,
    written: u64,
}

impl<W: Write> LimitedWriter<W> {
    /// Creates a new writer which accepts at most `limit` bytes
    pub fn new(w: W, limit: u64) -> Self {
        Self {
            w,
            available: limit,
            written: 0,
        }
    }

    /// Returns number of written bytes
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Unwraps this LimitedWriter, returning the underlying writer
    pub fn into_inner(self) -> W {
        self.w
    }
}

impl<W: Write> Write for LimitedWriter<W> {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> Result<usize, io::Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.available == 0 {
            return Err(io::Error::other(WriteLimitExceededError));
        }
        let write_len = buf
            .len()
            .min(self.available.try_into().unwrap_or(buf.len()));
        let written = self.w.write(&buf[0..write_len])?;
        // Lossless: written <= write_len <= available
        let written = written as u64;
        self.available -= written;
        self.written += written;
        Ok(written as usize)
    }

    fn flush(&mut self) -> Result<(), io::Error> {
        self.w.flush()
    }
}

/// Reads into `buf` until it is full or the stream is exhausted
///
/// Unlike [`Read::read_exact`] a short count is not an error: the number of
/// bytes actually placed in `buf` is returned. Interrupted reads are retried.
pub fn read_up_to<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<usize, io::Error> {
    let mut filled = 0usize;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Single byte `u8` reader
#[inline]
pub fn rdu8<R: Read>(r: &mut R) -> Result<u8, io::Error> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

/// Little endian `u16` reader
#[inline]
pub fn rdu16le<R: Read>(r: &mut R) -> Result<u16, io::Error> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

/// Big endian `u16` reader
#[inline]
pub fn rdu16be<R: Read>(r: &mut R) -> Result<u16, io::Error> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)?;
    Ok(u16::from_be_bytes(buf))
}

/// Little endian `u16` at `offset` in `buf`, if in bounds
#[inline]
pub fn le16_at(buf: &[u8], offset: usize) -> Option<u16> {
    let end = offset.checked_add(2)?;
    Some(u16::from_le_bytes(buf.get(offset..end)?.try_into().ok()?))
}

/// Little endian `u32` at `offset` in `buf`, if in bounds
#[inline]
pub fn le32_at(buf: &[u8], offset: usize) -> Option<u32> {
    let end = offset.checked_add(4)?;
    Some(u32::from_le_bytes(buf.get(offset..end)?.try_into().ok()?))
}
