//! Byte sources and sinks for stream codecs.
//!
//! Any [`Write`] works as a sink. Sources must implement [`DataInput`],
//! which adds a skip operation to [`Read`] so that readers can jump over
//! whole blocks without decoding them.
#![cfg(target_pointer_width = "64")]

use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};

use anyhow::Result;
use byteorder::{ReadBytesExt, WriteBytesExt};

use crate::Error;

/// Maximum number of bytes of an encoded [`u64`] in [`write_vlong`].
pub const MAX_VLONG_BYTES: usize = 10;

/// A byte source that can skip forward.
pub trait DataInput: Read {
    /// Skips the next `n` bytes.
    ///
    /// # Errors
    ///
    /// An [`io::Error`] of kind [`io::ErrorKind::UnexpectedEof`] is returned
    /// if fewer than `n` bytes remain.
    fn skip_bytes(&mut self, n: u64) -> Result<()>;
}

fn unexpected_eof(n: u64) -> anyhow::Error {
    io::Error::new(
        io::ErrorKind::UnexpectedEof,
        format!("cannot skip {n} bytes past the end of the input."),
    )
    .into()
}

impl DataInput for &[u8] {
    /// Skips by slicing.
    fn skip_bytes(&mut self, n: u64) -> Result<()> {
        if (self.len() as u64) < n {
            return Err(unexpected_eof(n));
        }
        *self = &self[n as usize..];
        Ok(())
    }
}

impl<T: AsRef<[u8]>> DataInput for Cursor<T> {
    /// Skips by seeking.
    fn skip_bytes(&mut self, n: u64) -> Result<()> {
        let len = self.get_ref().as_ref().len() as u64;
        let pos = self.position();
        if pos > len || len - pos < n {
            return Err(unexpected_eof(n));
        }
        self.seek(SeekFrom::Current(n as i64))?;
        Ok(())
    }
}

impl<D: DataInput + ?Sized> DataInput for &mut D {
    fn skip_bytes(&mut self, n: u64) -> Result<()> {
        (**self).skip_bytes(n)
    }
}

/// Adapter turning any [`Read`] into a [`DataInput`] that skips by reading and discarding.
///
/// # Examples
///
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use std::io::Read;
/// use packints::data_io::{DataInput, ReadInput};
///
/// let mut input = ReadInput::new(&[1u8, 2, 3, 4][..]);
/// input.skip_bytes(3)?;
/// let mut buf = [0u8; 1];
/// input.read_exact(&mut buf)?;
/// assert_eq!(buf, [4]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ReadInput<R> {
    inner: R,
}

impl<R: Read> ReadInput<R> {
    /// Wraps `inner`.
    pub const fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Unwraps the reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for ReadInput<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R: Read> DataInput for ReadInput<R> {
    fn skip_bytes(&mut self, n: u64) -> Result<()> {
        let skipped = io::copy(&mut (&mut self.inner).take(n), &mut io::sink())?;
        if skipped != n {
            return Err(unexpected_eof(n));
        }
        Ok(())
    }
}

/// Writes `val` in groups of 7 bits, least significant group first,
/// setting the high bit of every byte but the last.
/// Returns the number of bytes written.
///
/// # Examples
///
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use packints::data_io::{read_vlong, write_vlong};
///
/// let mut bytes = vec![];
/// assert_eq!(write_vlong(&mut bytes, 300)?, 2);
/// assert_eq!(bytes, vec![0xAC, 0x02]);
/// assert_eq!(read_vlong(&bytes[..])?, 300);
/// # Ok(())
/// # }
/// ```
pub fn write_vlong<W: Write>(mut writer: W, mut val: u64) -> Result<usize> {
    let mut written = 1;
    while val >= 0x80 {
        writer.write_u8((val & 0x7F) as u8 | 0x80)?;
        val >>= 7;
        written += 1;
    }
    writer.write_u8(val as u8)?;
    Ok(written)
}

/// Reads a value written by [`write_vlong`].
///
/// # Errors
///
/// An error [`Error::CorruptData`] is returned if the encoding does not terminate
/// within [`MAX_VLONG_BYTES`] bytes or overflows 64 bits.
pub fn read_vlong<R: Read>(mut reader: R) -> Result<u64> {
    let mut val = 0u64;
    for i in 0..MAX_VLONG_BYTES {
        let b = reader.read_u8()?;
        let shift = 7 * i;
        if shift == 63 && b > 1 {
            return Err(Error::corrupt_data("vlong overflows 64 bits."));
        }
        val |= u64::from(b & 0x7F) << shift;
        if b & 0x80 == 0 {
            return Ok(val);
        }
    }
    Err(Error::corrupt_data(format!(
        "vlong must terminate within {MAX_VLONG_BYTES} bytes."
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vlong() {
        for x in [0, 1, 127, 128, 16383, 16384, u64::MAX >> 1, u64::MAX - 1, u64::MAX] {
            let mut bytes = vec![];
            let n = write_vlong(&mut bytes, x).unwrap();
            assert_eq!(n, bytes.len());
            assert_eq!(read_vlong(&bytes[..]).unwrap(), x);
        }
    }

    #[test]
    fn test_vlong_max_len() {
        let mut bytes = vec![];
        assert_eq!(write_vlong(&mut bytes, u64::MAX).unwrap(), MAX_VLONG_BYTES);
    }

    #[test]
    fn test_vlong_too_long() {
        let bytes = [0x80u8; 11];
        let e = read_vlong(&bytes[..]);
        assert_eq!(
            e.err().map(|x| x.to_string()),
            Some("vlong must terminate within 10 bytes.".to_string())
        );
    }

    #[test]
    fn test_vlong_overflow() {
        let mut bytes = [0xFFu8; 10];
        bytes[9] = 0x02;
        let e = read_vlong(&bytes[..]).unwrap_err();
        assert_eq!(
            e.downcast_ref::<Error>(),
            Some(&Error::CorruptData("vlong overflows 64 bits.".to_string()))
        );
    }

    #[test]
    fn test_skip_slice() {
        let mut input = &[1u8, 2, 3][..];
        input.skip_bytes(2).unwrap();
        assert_eq!(input, &[3]);
        let e = input.skip_bytes(2).unwrap_err();
        assert_eq!(
            e.downcast_ref::<io::Error>().map(|x| x.kind()),
            Some(io::ErrorKind::UnexpectedEof)
        );
    }

    #[test]
    fn test_skip_cursor() {
        let mut input = Cursor::new(vec![1u8, 2, 3, 4]);
        input.skip_bytes(3).unwrap();
        assert_eq!(input.position(), 3);
        assert!(input.skip_bytes(2).is_err());
        input.skip_bytes(1).unwrap();
        assert_eq!(input.position(), 4);
    }

    #[test]
    fn test_skip_read_input() {
        let mut input = ReadInput::new(&[1u8, 2, 3][..]);
        input.skip_bytes(1).unwrap();
        assert_eq!(input.read_u8().unwrap(), 2);
        assert!(input.skip_bytes(5).is_err());
    }
}
