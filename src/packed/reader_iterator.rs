//! Sequential reader of packed values written with a header.
#![cfg(target_pointer_width = "64")]

use anyhow::Result;

use crate::data_io::DataInput;
use crate::packed::{BitPacker, Format, PackedHeader, DEFAULT_BUFFER_SIZE};
use crate::{Error, Serializable};

/// Forward reader of the values written by [`PackedWriter`](crate::packed::PackedWriter)
/// or by serializing a [`FixedWidthArray`](crate::packed::FixedWidthArray).
///
/// Values are decoded a few iterations at a time into an internal buffer,
/// so the whole array is never loaded.
/// Once all values are read, the input is positioned right after the packed bytes.
///
/// # Examples
///
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use packints::packed::{FixedWidthArray, PackedReaderIterator};
/// use packints::Serializable;
///
/// let arr = FixedWidthArray::from_slice(&[3u32, 1, 4, 1, 5, 9, 2, 6])?;
/// let mut bytes = vec![];
/// arr.serialize_into(&mut bytes)?;
///
/// let mut reader = PackedReaderIterator::new(&bytes[..])?;
/// assert_eq!(reader.next_chunk(3)?, &[3, 1, 4]);
/// let rest = reader.collect::<Result<Vec<_>, _>>()?;
/// assert_eq!(rest, vec![1, 5, 9, 2, 6]);
/// # Ok(())
/// # }
/// ```
pub struct PackedReaderIterator<R: DataInput> {
    input: R,
    header: PackedHeader,
    packer: BitPacker,
    values: Vec<u64>,
    bytes: Vec<u8>,
    len: usize,
    off: usize,
    ord: usize,
}

impl<R: DataInput> PackedReaderIterator<R> {
    /// Creates a reader over `input`, starting with the header.
    ///
    /// # Errors
    ///
    /// An error [`Error::CorruptData`] or [`std::io::Error`] is returned if the header is malformed.
    pub fn new(mut input: R) -> Result<Self> {
        let header = PackedHeader::deserialize_from(&mut input)?;
        Self::with_header(input, header)
    }

    /// Creates a reader over `input` positioned at the first packed byte,
    /// with the header read beforehand.
    ///
    /// # Errors
    ///
    /// An error [`Error::InvalidArgument`] is returned if the header's format does not
    /// support its number of bits per value.
    pub fn with_header(input: R, header: PackedHeader) -> Result<Self> {
        let packer = BitPacker::new(header.format(), header.bits_per_value())?;
        let (block_count, value_count_per_iter) =
            (packer.byte_block_count(), packer.byte_value_count());
        let max_iterations = (header.value_count() / value_count_per_iter).saturating_add(1);
        let iterations = (DEFAULT_BUFFER_SIZE / (block_count + 8 * value_count_per_iter))
            .clamp(1, max_iterations);
        log::debug!(
            "PackedReaderIterator for {} values at {} bits in {:?}, buffering {iterations} iterations",
            header.value_count(),
            header.bits_per_value(),
            header.format()
        );
        Ok(Self {
            input,
            header,
            packer,
            values: vec![0; iterations * value_count_per_iter],
            bytes: vec![0; iterations * block_count],
            len: 0,
            off: 0,
            ord: 0,
        })
    }

    /// Returns up to `count` values, decoding the next buffer if needed.
    ///
    /// The returned slice is never empty when `count > 0`.
    ///
    /// # Errors
    ///
    /// An error [`Error::IllegalState`] is returned if all values have been read.
    /// An error [`std::io::Error`] is returned if the input ends early.
    pub fn next_chunk(&mut self, count: usize) -> Result<&[u64]> {
        if self.ord == self.header.value_count() {
            return Err(Error::illegal_state(format!(
                "All self.value_count()={} values have been read.",
                self.header.value_count()
            )));
        }
        if self.off == self.len {
            self.refill()?;
        }
        let count = count.min(self.len - self.off);
        let start = self.off;
        self.off += count;
        self.ord += count;
        Ok(&self.values[start..self.off])
    }

    /// Gets the number of values read so far.
    pub const fn ord(&self) -> usize {
        self.ord
    }

    /// Gets the number of values in the stream.
    pub const fn value_count(&self) -> usize {
        self.header.value_count()
    }

    /// Gets the format.
    pub const fn format(&self) -> Format {
        self.header.format()
    }

    /// Gets the number of bits per value.
    pub const fn bits_per_value(&self) -> usize {
        self.header.bits_per_value()
    }

    /// Unwraps the underlying input.
    pub fn into_inner(self) -> R {
        self.input
    }

    fn refill(&mut self) -> Result<()> {
        let rest = self.header.value_count() - self.ord;
        let len = rest.min(self.values.len());
        let byte_count = if len == self.values.len() {
            self.bytes.len()
        } else {
            self.header
                .format()
                .byte_count(len, self.header.bits_per_value())
        };
        let bytes = &mut self.bytes[..byte_count];
        self.input.read_exact(bytes)?;
        self.packer.decode_bytes(bytes, &mut self.values[..len])?;
        log::trace!("PackedReaderIterator refills {len} values from {byte_count} bytes");
        self.len = len;
        self.off = 0;
        Ok(())
    }
}

impl<R: DataInput> Iterator for PackedReaderIterator<R> {
    type Item = Result<u64>;

    /// Returns the next value, or [`None`] once all values have been read.
    fn next(&mut self) -> Option<Self::Item> {
        if self.ord == self.header.value_count() {
            return None;
        }
        if self.off == self.len {
            if let Err(e) = self.refill() {
                return Some(Err(e));
            }
        }
        let val = self.values[self.off];
        self.off += 1;
        self.ord += 1;
        Some(Ok(val))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rest = self.header.value_count() - self.ord;
        (rest, Some(rest))
    }
}

impl<R: DataInput> std::fmt::Debug for PackedReaderIterator<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackedReaderIterator")
            .field("header", &self.header)
            .field("ord", &self.ord)
            .finish()
    }
}
