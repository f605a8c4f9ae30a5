//! Streaming writer of packed values with a leading header.
#![cfg(target_pointer_width = "64")]

use std::io::Write;

use anyhow::Result;

use crate::packed::{
    fastest_format_and_bits, BitPacker, Format, PackedHeader, DEFAULT_BUFFER_SIZE,
};
use crate::{Error, Serializable};

/// Writer of a known number of packed values, producing the same bytes as
/// serializing a [`FixedWidthArray`](crate::packed::FixedWidthArray) holding them.
///
/// The header is written on creation. Values are buffered and encoded a few
/// iterations at a time, so memory stays bounded whatever the value count.
/// [`Self::finish()`] pads missing values with zeros.
///
/// # Examples
///
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use packints::packed::{FixedWidthArray, PackedWriter, COMPACT};
/// use packints::Serializable;
///
/// let mut writer = PackedWriter::new(vec![], 100, 7, COMPACT)?;
/// for i in 0..100 {
///     writer.add(i)?;
/// }
/// writer.finish()?;
/// let bytes = writer.into_inner();
///
/// let arr = FixedWidthArray::deserialize_from(&bytes[..])?;
/// assert_eq!(arr.get(42), Some(42));
/// # Ok(())
/// # }
/// ```
pub struct PackedWriter<W: Write> {
    out: W,
    header: PackedHeader,
    packer: BitPacker,
    values: Vec<u64>,
    buffer_len: usize,
    bytes: Vec<u8>,
    ord: usize,
    finished: bool,
}

impl<W: Write> PackedWriter<W> {
    /// Creates a writer of `value_count` values of at least `bits_per_value` bits,
    /// in the fastest layout whose overhead is within `acceptable_overhead_ratio`
    /// (see [`fastest_format_and_bits`]).
    ///
    /// # Errors
    ///
    /// An error [`Error::InvalidArgument`] is returned if `bits_per_value` is not in `1..=64`.
    /// Errors of the underlying writer are propagated.
    pub fn new(
        out: W,
        value_count: usize,
        bits_per_value: usize,
        acceptable_overhead_ratio: f32,
    ) -> Result<Self> {
        let fb = fastest_format_and_bits(bits_per_value, acceptable_overhead_ratio)?;
        Self::with_format(out, fb.format, value_count, fb.bits_per_value)
    }

    /// Creates a writer of `value_count` values of `bits_per_value` bits in `format`.
    ///
    /// # Errors
    ///
    /// An error [`Error::InvalidArgument`] is returned if `format` does not support `bits_per_value`.
    /// Errors of the underlying writer are propagated.
    pub fn with_format(
        mut out: W,
        format: Format,
        value_count: usize,
        bits_per_value: usize,
    ) -> Result<Self> {
        let header = PackedHeader::new(format, bits_per_value, value_count)?;
        let packer = BitPacker::new(format, bits_per_value)?;
        header.serialize_into(&mut out)?;

        let (block_count, value_count_per_iter) =
            (packer.byte_block_count(), packer.byte_value_count());
        let max_iterations = (value_count / value_count_per_iter).saturating_add(1);
        let iterations = (DEFAULT_BUFFER_SIZE / (block_count + 8 * value_count_per_iter))
            .clamp(1, max_iterations);
        log::debug!(
            "PackedWriter for {value_count} values at {bits_per_value} bits in {format:?}, \
             buffering {iterations} iterations"
        );
        Ok(Self {
            out,
            header,
            packer,
            values: Vec::with_capacity(iterations * value_count_per_iter),
            buffer_len: iterations * value_count_per_iter,
            bytes: vec![0; iterations * block_count],
            ord: 0,
            finished: false,
        })
    }

    /// Appends `val`, encoding the buffered values first if the buffer is full.
    ///
    /// # Errors
    ///
    /// An error [`Error::IllegalState`] is returned if the writer is finished
    /// or `self.value_count()` values were already added.
    /// An error [`Error::InvalidArgument`] is returned if `val` does not fit in
    /// `self.bits_per_value()` bits.
    /// Errors of the underlying writer are propagated.
    pub fn add(&mut self, val: u64) -> Result<()> {
        if self.finished {
            return Err(Error::illegal_state("This writer is already finished."));
        }
        if self.ord == self.header.value_count() {
            return Err(Error::illegal_state(format!(
                "add must be called at most self.value_count()={} times.",
                self.header.value_count()
            )));
        }
        self.packer.check_values(&[val])?;
        if self.values.len() == self.buffer_len {
            self.flush()?;
        }
        self.values.push(val);
        self.ord += 1;
        Ok(())
    }

    /// Pads the stream with zeros up to `self.value_count()` values,
    /// writes the buffered values and flushes the underlying writer.
    ///
    /// # Errors
    ///
    /// An error [`Error::IllegalState`] is returned if the writer is already finished.
    /// Errors of the underlying writer are propagated.
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Err(Error::illegal_state("This writer is already finished."));
        }
        while self.ord < self.header.value_count() {
            if self.values.len() == self.buffer_len {
                self.flush()?;
            }
            self.values.push(0);
            self.ord += 1;
        }
        self.flush()?;
        self.out.flush()?;
        self.finished = true;
        Ok(())
    }

    /// Gets the number of values added so far.
    pub const fn ord(&self) -> usize {
        self.ord
    }

    /// Gets the number of values the stream holds.
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

    /// Gets the header written ahead of the values.
    pub const fn header(&self) -> &PackedHeader {
        &self.header
    }

    /// Gets a reference to the underlying writer.
    pub const fn get_ref(&self) -> &W {
        &self.out
    }

    /// Unwraps the underlying writer.
    ///
    /// Buffered values are lost unless [`Self::finish()`] was called.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn flush(&mut self) -> Result<()> {
        if self.values.is_empty() {
            return Ok(());
        }
        let format = self.header.format();
        let byte_count = format.byte_count(self.values.len(), self.packer.bits_per_value());
        let bytes = &mut self.bytes[..byte_count];
        self.packer.encode_bytes(&self.values, bytes)?;
        self.out.write_all(bytes)?;
        log::trace!(
            "PackedWriter flushes {} values into {byte_count} bytes",
            self.values.len()
        );
        self.values.clear();
        Ok(())
    }
}

impl<W: Write> std::fmt::Debug for PackedWriter<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackedWriter")
            .field("header", &self.header)
            .field("ord", &self.ord)
            .field("buffered", &self.values.len())
            .field("finished", &self.finished)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaChaRng;

    use crate::packed::{FixedWidthArray, COMPACT, FASTEST, SINGLE_BLOCK_WIDTHS};
    use crate::utils;

    fn gen_random_values(len: usize, bits_per_value: usize, seed: u64) -> Vec<u64> {
        let mut rng = ChaChaRng::seed_from_u64(seed);
        let mask = utils::max_value(bits_per_value);
        (0..len).map(|_| rng.gen::<u64>() & mask).collect()
    }

    fn serialized_array(vals: &[u64], format: Format, bits_per_value: usize) -> Vec<u8> {
        let mut arr = FixedWidthArray::with_format(vals.len(), format, bits_per_value).unwrap();
        let mut pos = 0;
        while pos < vals.len() {
            pos += arr.set_bulk(pos, &vals[pos..]).unwrap();
        }
        let mut bytes = vec![];
        arr.serialize_into(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_matches_array_serialization() {
        let mut layouts: Vec<_> = (1..=64).map(|w| (Format::Packed, w)).collect();
        layouts.extend(SINGLE_BLOCK_WIDTHS.iter().map(|&w| (Format::PackedSingleBlock, w)));
        for (format, w) in layouts {
            for len in [0, 1, 63, 1000] {
                let vals = gen_random_values(len, w, (w * len) as u64);
                let mut writer = PackedWriter::with_format(vec![], format, len, w).unwrap();
                for &v in &vals {
                    writer.add(v).unwrap();
                }
                writer.finish().unwrap();
                assert_eq!(writer.ord(), len);
                assert_eq!(
                    writer.into_inner(),
                    serialized_array(&vals, format, w),
                    "format={format:?}, w={w}, len={len}"
                );
            }
        }
    }

    #[test]
    fn test_finish_pads_zeros() {
        let mut writer = PackedWriter::with_format(vec![], Format::Packed, 300, 5).unwrap();
        writer.add(31).unwrap();
        writer.add(7).unwrap();
        writer.finish().unwrap();
        assert_eq!(writer.ord(), 300);
        let bytes = writer.into_inner();
        let arr = FixedWidthArray::deserialize_from(&bytes[..]).unwrap();
        assert_eq!(arr.len(), 300);
        assert_eq!(arr.get(0), Some(31));
        assert_eq!(arr.get(1), Some(7));
        assert!((2..300).all(|i| arr.get(i) == Some(0)));
    }

    #[test]
    fn test_new_picks_format() {
        let writer = PackedWriter::new(vec![], 10, 7, FASTEST).unwrap();
        assert_eq!(writer.bits_per_value(), 8);
        let writer = PackedWriter::new(vec![], 10, 7, COMPACT).unwrap();
        assert_eq!(writer.format(), Format::Packed);
        assert_eq!(writer.bits_per_value(), 7);
        assert_eq!(writer.get_ref().len(), writer.header().size_in_bytes());
    }

    #[test]
    fn test_add_too_many() {
        let mut writer = PackedWriter::with_format(vec![], Format::Packed, 2, 3).unwrap();
        writer.add(1).unwrap();
        writer.add(2).unwrap();
        let e = writer.add(3);
        assert_eq!(
            e.err().map(|x| x.to_string()),
            Some("add must be called at most self.value_count()=2 times.".to_string())
        );
    }

    #[test]
    fn test_add_unfit() {
        let mut writer = PackedWriter::with_format(vec![], Format::Packed, 2, 3).unwrap();
        let e = writer.add(8);
        assert_eq!(
            e.err().map(|x| x.to_string()),
            Some("val must fit in self.bits_per_value()=3 bits, but got 8.".to_string())
        );
        assert_eq!(writer.ord(), 0);
    }

    #[test]
    fn test_finish_twice() {
        let mut writer = PackedWriter::with_format(vec![], Format::Packed, 2, 3).unwrap();
        writer.finish().unwrap();
        let e = writer.finish();
        assert_eq!(
            e.err().map(|x| x.to_string()),
            Some("This writer is already finished.".to_string())
        );
        assert!(writer.add(1).is_err());
    }

    #[test]
    fn test_unsupported() {
        assert!(PackedWriter::with_format(vec![], Format::PackedSingleBlock, 2, 11).is_err());
        assert!(PackedWriter::new(vec![], 2, 65, COMPACT).is_err());
    }
}
