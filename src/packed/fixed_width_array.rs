//! Mutable array of fixed length in which each value is stored in a fixed number of bits.
#![cfg(target_pointer_width = "64")]

use std::io::{self, Read, Write};

use anyhow::Result;
use byteorder::{ByteOrder, LittleEndian};
use num_traits::ToPrimitive;

use crate::packed::prelude::*;
use crate::packed::{
    check_pos, check_range, fastest_format_and_bits, BitPacker, Format, PackedHeader,
};
use crate::utils;
use crate::{Error, Serializable};

const ITER_BUFFER_LEN: usize = 64;

/// Mutable array of fixed length in which each value is stored in a fixed number of bits.
///
/// # Memory usage
///
/// $`n w`$ bits in [`Format::Packed`] for $`n`$ values of $`w`$ bits,
/// plus $`64 \bmod w`$ bits per word in [`Format::PackedSingleBlock`].
///
/// # Examples
///
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use packints::packed::FixedWidthArray;
///
/// // Stores 4 values within 3 bits each.
/// let mut arr = FixedWidthArray::new(4, 3)?;
///
/// arr.set(0, 7)?;
/// arr.set(2, 5)?;
///
/// assert_eq!(arr.len(), 4);
/// assert_eq!(arr.get(0), Some(7));
/// assert_eq!(arr.get(1), Some(0));
/// assert_eq!(arr.get(2), Some(5));
/// assert_eq!(arr.get(4), None);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct FixedWidthArray {
    blocks: Vec<u64>,
    len: usize,
    packer: BitPacker,
}

impl FixedWidthArray {
    /// Creates a zero-filled array of `len` values of `bits_per_value` bits in [`Format::Packed`].
    ///
    /// # Errors
    ///
    /// An error [`Error::InvalidArgument`] is returned if `bits_per_value` is not in `1..=64`.
    pub fn new(len: usize, bits_per_value: usize) -> Result<Self> {
        Self::with_format(len, Format::Packed, bits_per_value)
    }

    /// Creates a zero-filled array of `len` values of `bits_per_value` bits in `format`.
    ///
    /// # Errors
    ///
    /// An error [`Error::InvalidArgument`] is returned if `format` does not support `bits_per_value`.
    pub fn with_format(len: usize, format: Format, bits_per_value: usize) -> Result<Self> {
        let packer = BitPacker::new(format, bits_per_value)?;
        Ok(Self {
            blocks: vec![0; format.long_count(len, bits_per_value)],
            len,
            packer,
        })
    }

    /// Creates a zero-filled array of `len` values storing at least `bits_per_value` bits each,
    /// in the fastest layout whose overhead is within `acceptable_overhead_ratio`
    /// (see [`fastest_format_and_bits`]).
    ///
    /// # Errors
    ///
    /// An error [`Error::InvalidArgument`] is returned if `bits_per_value` is not in `1..=64`.
    ///
    /// # Examples
    ///
    /// ```
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// use packints::packed::{FixedWidthArray, Format, COMPACT, FASTEST};
    ///
    /// let arr = FixedWidthArray::with_overhead(10, 5, COMPACT)?;
    /// assert_eq!(arr.bits_per_value(), 5);
    ///
    /// let arr = FixedWidthArray::with_overhead(10, 5, FASTEST)?;
    /// assert_eq!(arr.bits_per_value(), 8);
    /// assert_eq!(arr.format(), Format::Packed);
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_overhead(
        len: usize,
        bits_per_value: usize,
        acceptable_overhead_ratio: f32,
    ) -> Result<Self> {
        let fb = fastest_format_and_bits(bits_per_value, acceptable_overhead_ratio)?;
        Self::with_format(len, fb.format, fb.bits_per_value)
    }

    /// Creates a new array from a slice of integers `vals`.
    ///
    /// The width fits the maximum value in `vals`.
    ///
    /// # Errors
    ///
    /// An error [`Error::InvalidArgument`] is returned if `vals` contains a value
    /// that cannot be cast into [`u64`].
    ///
    /// # Examples
    ///
    /// ```
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// use packints::packed::FixedWidthArray;
    ///
    /// let arr = FixedWidthArray::from_slice(&[5, 256, 0])?;
    /// assert_eq!(arr.bits_per_value(), 9);
    /// assert_eq!(arr.get(1), Some(256));
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_slice<T>(vals: &[T]) -> Result<Self>
    where
        T: ToPrimitive,
    {
        let vals = vals
            .iter()
            .map(|x| {
                x.to_u64().ok_or_else(|| {
                    Error::invalid_argument("vals must consist only of values castable into u64.")
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let max = vals.iter().copied().max().unwrap_or(0);
        let mut this = Self::new(vals.len(), utils::bits_required(max))?;
        this.packer.encode(&vals, &mut this.blocks)?;
        Ok(this)
    }

    /// Returns the `pos`-th value, or [`None`] if out of bounds.
    ///
    /// # Complexity
    ///
    /// Constant
    #[inline(always)]
    pub fn get(&self, pos: usize) -> Option<u64> {
        if pos < self.len {
            Some(self.packer.read(&self.blocks, pos))
        } else {
            None
        }
    }

    /// Sets the `pos`-th value to `val`.
    ///
    /// # Errors
    ///
    /// An error [`Error::InvalidArgument`] is returned if
    ///
    /// - `pos` is out of bounds, or
    /// - `val` cannot be represented in `self.bits_per_value()` bits.
    ///
    /// # Complexity
    ///
    /// Constant
    #[inline(always)]
    pub fn set(&mut self, pos: usize, val: u64) -> Result<()> {
        check_pos(pos, self.len)?;
        self.packer.check_values(&[val])?;
        self.packer.write(&mut self.blocks, pos, val);
        Ok(())
    }

    /// Reads values starting at `pos` into `buf`, returning how many were read.
    ///
    /// Values up to the next iteration boundary of the layout are read one by one;
    /// from there, whole iterations are decoded in bulk.
    /// At least one value is read when `pos` is in bounds and `buf` is not empty.
    ///
    /// # Examples
    ///
    /// ```
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// use packints::packed::FixedWidthArray;
    ///
    /// let arr = FixedWidthArray::from_slice(&(0..100u32).collect::<Vec<_>>())?;
    /// let mut buf = vec![0; 100];
    /// let mut pos = 0;
    /// while pos < arr.len() {
    ///     pos += arr.get_bulk(pos, &mut buf[pos..]);
    /// }
    /// assert_eq!(buf, (0..100).collect::<Vec<u64>>());
    /// # Ok(())
    /// # }
    /// ```
    pub fn get_bulk(&self, mut pos: usize, buf: &mut [u64]) -> usize {
        if self.len <= pos {
            return 0;
        }
        let len = buf.len().min(self.len - pos);
        let start = pos;
        let (block_count, value_count) =
            (self.packer.long_block_count(), self.packer.long_value_count());

        let misalignment = pos % value_count;
        if misalignment != 0 {
            let edge = (value_count - misalignment).min(len);
            for b in buf[..edge].iter_mut() {
                *b = self.packer.read(&self.blocks, pos);
                pos += 1;
            }
            if edge == len {
                return edge;
            }
        }

        let iterations = (len - (pos - start)) / value_count;
        if iterations > 0 {
            let block_index = pos / value_count * block_count;
            let got = iterations * value_count;
            let out = &mut buf[pos - start..pos - start + got];
            // The blocks always cover whole iterations within the length.
            self.packer.decode_words(&self.blocks[block_index..], out);
            pos += got;
        }
        if pos > start {
            return pos - start;
        }
        // No full iteration fits into the request.
        for b in buf[..len].iter_mut() {
            *b = self.packer.read(&self.blocks, pos);
            pos += 1;
        }
        len
    }

    /// Writes `vals` starting at `pos`, returning how many were written.
    ///
    /// Chunks like [`Self::get_bulk()`]. At least one value is written when `vals` is not empty.
    ///
    /// # Errors
    ///
    /// An error [`Error::InvalidArgument`] is returned if
    ///
    /// - `pos` is out of bounds, or
    /// - a value cannot be represented in `self.bits_per_value()` bits.
    ///
    /// Nothing is written on error.
    pub fn set_bulk(&mut self, mut pos: usize, vals: &[u64]) -> Result<usize> {
        check_pos(pos, self.len)?;
        let len = vals.len().min(self.len - pos);
        let vals = &vals[..len];
        self.packer.check_values(vals)?;
        let start = pos;
        let (block_count, value_count) =
            (self.packer.long_block_count(), self.packer.long_value_count());

        let misalignment = pos % value_count;
        if misalignment != 0 {
            let edge = (value_count - misalignment).min(len);
            for &v in &vals[..edge] {
                self.packer.write(&mut self.blocks, pos, v);
                pos += 1;
            }
            if edge == len {
                return Ok(edge);
            }
        }

        let iterations = (len - (pos - start)) / value_count;
        if iterations > 0 {
            let block_index = pos / value_count * block_count;
            let got = iterations * value_count;
            let input = &vals[pos - start..pos - start + got];
            self.packer.encode(input, &mut self.blocks[block_index..])?;
            pos += got;
        }
        if pos > start {
            return Ok(pos - start);
        }
        for &v in vals {
            self.packer.write(&mut self.blocks, pos, v);
            pos += 1;
        }
        Ok(len)
    }

    /// Sets the values in `from..to` to `val`.
    ///
    /// Long ranges are filled word by word with a precomputed pattern.
    ///
    /// # Errors
    ///
    /// An error [`Error::InvalidArgument`] is returned if
    ///
    /// - `from..to` is out of bounds, or
    /// - `val` cannot be represented in `self.bits_per_value()` bits.
    pub fn fill(&mut self, mut from: usize, to: usize, val: u64) -> Result<()> {
        check_range(from, to, self.len)?;
        self.packer.check_values(&[val])?;
        let (block_count, value_count) =
            (self.packer.long_block_count(), self.packer.long_value_count());
        if to - from <= 3 * value_count {
            for pos in from..to {
                self.packer.write(&mut self.blocks, pos, val);
            }
            return Ok(());
        }

        while from % value_count != 0 {
            self.packer.write(&mut self.blocks, from, val);
            from += 1;
        }
        let mut pattern = vec![0; block_count];
        self.packer.encode(&vec![val; value_count], &mut pattern)?;
        let start_block = from / value_count * block_count;
        let end_block = to / value_count * block_count;
        for (i, block) in self.blocks[start_block..end_block].iter_mut().enumerate() {
            *block = pattern[i % block_count];
        }
        for pos in to / value_count * value_count..to {
            self.packer.write(&mut self.blocks, pos, val);
        }
        Ok(())
    }

    /// Resets all values to zero.
    pub fn clear(&mut self) {
        self.blocks.iter_mut().for_each(|b| *b = 0);
    }

    /// Creates an iterator for enumerating values.
    ///
    /// # Examples
    ///
    /// ```
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// use packints::packed::FixedWidthArray;
    ///
    /// let arr = FixedWidthArray::from_slice(&[5, 256, 0])?;
    /// let mut it = arr.iter();
    ///
    /// assert_eq!(it.next(), Some(5));
    /// assert_eq!(it.next(), Some(256));
    /// assert_eq!(it.next(), Some(0));
    /// assert_eq!(it.next(), None);
    /// # Ok(())
    /// # }
    /// ```
    pub fn iter(&self) -> Iter {
        Iter::new(self)
    }

    /// Gets the number of values.
    #[inline(always)]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Checks if the array is empty.
    #[inline(always)]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Gets the number of bits per value.
    #[inline(always)]
    pub const fn bits_per_value(&self) -> usize {
        self.packer.bits_per_value()
    }

    /// Gets the layout.
    #[inline(always)]
    pub const fn format(&self) -> Format {
        self.packer.format()
    }

    /// Gets the codec.
    pub const fn packer(&self) -> &BitPacker {
        &self.packer
    }

    /// Gets the slice of raw words.
    pub fn blocks(&self) -> &[u64] {
        &self.blocks
    }

    fn header(&self) -> Result<PackedHeader> {
        PackedHeader::new(self.format(), self.bits_per_value(), self.len)
    }
}

impl NumVals for FixedWidthArray {
    /// Returns the number of values stored (just wrapping [`Self::len()`]).
    fn num_vals(&self) -> usize {
        self.len()
    }
}

impl Access for FixedWidthArray {
    /// Returns the `pos`-th value, or [`None`] if out of bounds
    /// (just wrapping [`Self::get()`]).
    fn access(&self, pos: usize) -> Option<u64> {
        self.get(pos)
    }

    fn access_bulk(&self, pos: usize, buf: &mut [u64]) -> usize {
        self.get_bulk(pos, buf)
    }
}

impl Update for FixedWidthArray {
    fn bits_per_value(&self) -> usize {
        self.packer.bits_per_value()
    }

    fn update(&mut self, pos: usize, val: u64) -> Result<()> {
        self.set(pos, val)
    }

    fn update_bulk(&mut self, pos: usize, vals: &[u64]) -> Result<usize> {
        self.set_bulk(pos, vals)
    }

    fn fill(&mut self, from: usize, to: usize, val: u64) -> Result<()> {
        FixedWidthArray::fill(self, from, to, val)
    }

    fn clear(&mut self) {
        FixedWidthArray::clear(self)
    }
}

impl RamBytesUsed for FixedWidthArray {
    fn ram_bytes_used(&self) -> usize {
        std::mem::size_of::<Self>() + self.blocks.capacity() * std::mem::size_of::<u64>()
    }
}

/// Iterator for enumerating values, created by [`FixedWidthArray::iter()`].
///
/// Values are decoded in bulk into an internal buffer.
pub struct Iter<'a> {
    arr: &'a FixedWidthArray,
    pos: usize,
    buf: [u64; ITER_BUFFER_LEN],
    buf_pos: usize,
    buf_len: usize,
}

impl<'a> Iter<'a> {
    /// Creates a new iterator.
    pub const fn new(arr: &'a FixedWidthArray) -> Self {
        Self {
            arr,
            pos: 0,
            buf: [0; ITER_BUFFER_LEN],
            buf_pos: 0,
            buf_len: 0,
        }
    }
}

impl Iterator for Iter<'_> {
    type Item = u64;

    #[inline(always)]
    fn next(&mut self) -> Option<Self::Item> {
        if self.buf_pos == self.buf_len {
            self.buf_len = self.arr.get_bulk(self.pos, &mut self.buf);
            self.buf_pos = 0;
            self.pos += self.buf_len;
            if self.buf_len == 0 {
                return None;
            }
        }
        let x = self.buf[self.buf_pos];
        self.buf_pos += 1;
        Some(x)
    }

    #[inline(always)]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let rest = self.arr.len() - self.pos + (self.buf_len - self.buf_pos);
        (rest, Some(rest))
    }
}

impl std::fmt::Debug for FixedWidthArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedWidthArray")
            .field("vals", &self.iter().collect::<Vec<_>>())
            .field("len", &self.len)
            .field("bits_per_value", &self.bits_per_value())
            .field("format", &self.format())
            .finish()
    }
}

impl Serializable for FixedWidthArray {
    fn serialize_into<W: Write>(&self, mut writer: W) -> Result<usize> {
        let header = self.header()?;
        let mem = header.serialize_into(&mut writer)?;
        let mut bytes = vec![0; self.blocks.len() * 8];
        LittleEndian::write_u64_into(&self.blocks, &mut bytes);
        writer.write_all(&bytes[..header.byte_count()])?;
        Ok(mem + header.byte_count())
    }

    fn deserialize_from<R: Read>(mut reader: R) -> Result<Self> {
        let header = PackedHeader::deserialize_from(&mut reader)?;
        let (format, bits) = (header.format(), header.bits_per_value());
        let long_count = format.long_count(header.value_count(), bits);
        let byte_count = header.byte_count();
        // Grows with the input so a truncated stream fails before a large allocation.
        let mut bytes = Vec::new();
        (&mut reader)
            .take(byte_count as u64)
            .read_to_end(&mut bytes)?;
        if bytes.len() != byte_count {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }
        bytes.resize(long_count * 8, 0);
        let mut blocks = vec![0; long_count];
        LittleEndian::read_u64_into(&bytes, &mut blocks);
        Ok(Self {
            blocks,
            len: header.value_count(),
            packer: BitPacker::new(format, bits)?,
        })
    }

    fn size_in_bytes(&self) -> usize {
        self.header()
            .map(|h| h.size_in_bytes() + h.byte_count())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaChaRng;

    use crate::packed::SINGLE_BLOCK_WIDTHS;

    fn gen_random_values(len: usize, bits_per_value: usize, seed: u64) -> Vec<u64> {
        let mut rng = ChaChaRng::seed_from_u64(seed);
        let mask = utils::max_value(bits_per_value);
        (0..len).map(|_| rng.gen::<u64>() & mask).collect()
    }

    fn all_layouts() -> Vec<(Format, usize)> {
        let mut layouts: Vec<_> = (1..=64).map(|w| (Format::Packed, w)).collect();
        layouts.extend(SINGLE_BLOCK_WIDTHS.iter().map(|&w| (Format::PackedSingleBlock, w)));
        layouts
    }

    #[test]
    fn test_set_get_random() {
        for (format, w) in all_layouts() {
            let vals = gen_random_values(500, w, w as u64);
            let mut arr = FixedWidthArray::with_format(vals.len(), format, w).unwrap();
            for (i, &v) in vals.iter().enumerate() {
                arr.set(i, v).unwrap();
            }
            for (i, &v) in vals.iter().enumerate() {
                assert_eq!(arr.get(i), Some(v), "format={format:?}, w={w}");
            }
            assert_eq!(arr.iter().collect::<Vec<_>>(), vals);
        }
    }

    #[test]
    fn test_bulk_random() {
        let mut rng = ChaChaRng::seed_from_u64(334);
        for (format, w) in all_layouts() {
            let vals = gen_random_values(777, w, w as u64 + 100);
            let mut arr = FixedWidthArray::with_format(vals.len(), format, w).unwrap();
            let mut pos = 0;
            while pos < vals.len() {
                let end = (pos + rng.gen_range(1..200)).min(vals.len());
                let written = arr.set_bulk(pos, &vals[pos..end]).unwrap();
                assert!(1 <= written && written <= end - pos);
                pos += written;
            }
            for _ in 0..50 {
                let pos = rng.gen_range(0..vals.len());
                let mut buf = vec![0; rng.gen_range(1..300)];
                let read = arr.get_bulk(pos, &mut buf);
                assert!(1 <= read && read <= buf.len());
                assert_eq!(&buf[..read], &vals[pos..pos + read], "format={format:?}, w={w}");
            }
        }
    }

    #[test]
    fn test_get_bulk_oob() {
        let arr = FixedWidthArray::new(3, 3).unwrap();
        let mut buf = [0; 4];
        assert_eq!(arr.get_bulk(3, &mut buf), 0);
        assert_eq!(arr.get_bulk(1, &mut buf), 2);
        assert_eq!(arr.get_bulk(0, &mut []), 0);
    }

    #[test]
    fn test_fill_random() {
        let mut rng = ChaChaRng::seed_from_u64(42);
        for (format, w) in all_layouts() {
            let len = 1000;
            let mut arr = FixedWidthArray::with_format(len, format, w).unwrap();
            let mut expected = vec![0; len];
            for _ in 0..5 {
                let from = rng.gen_range(0..len);
                let to = rng.gen_range(from..=len);
                let val = rng.gen::<u64>() & utils::max_value(w);
                arr.fill(from, to, val).unwrap();
                expected[from..to].iter_mut().for_each(|x| *x = val);
                assert_eq!(arr.iter().collect::<Vec<_>>(), expected, "format={format:?}, w={w}");
            }
            arr.clear();
            assert!(arr.iter().all(|x| x == 0));
        }
    }

    #[test]
    fn test_new_oob_0() {
        let e = FixedWidthArray::new(10, 0);
        assert_eq!(
            e.err().map(|x| x.to_string()),
            Some("bits_per_value must be in 1..=64, but got 0.".to_string())
        );
    }

    #[test]
    fn test_new_oob_65() {
        let e = FixedWidthArray::new(10, 65);
        assert_eq!(
            e.err().map(|x| x.to_string()),
            Some("bits_per_value must be in 1..=64, but got 65.".to_string())
        );
    }

    #[test]
    fn test_with_format_unsupported() {
        let e = FixedWidthArray::with_format(10, Format::PackedSingleBlock, 13);
        assert_eq!(
            e.err().map(|x| x.to_string()),
            Some("bits_per_value=13 is not supported by PackedSingleBlock.".to_string())
        );
    }

    #[test]
    fn test_from_slice_negative() {
        let e = FixedWidthArray::from_slice(&[1i32, -1]);
        assert_eq!(
            e.err().map(|x| x.to_string()),
            Some("vals must consist only of values castable into u64.".to_string())
        );
    }

    #[test]
    fn test_from_slice_empty() {
        let arr = FixedWidthArray::from_slice::<u64>(&[]).unwrap();
        assert!(arr.is_empty());
        assert_eq!(arr.bits_per_value(), 1);
    }

    #[test]
    fn test_set_oob() {
        let mut arr = FixedWidthArray::new(1, 2).unwrap();
        let e = arr.set(1, 1);
        assert_eq!(
            e.err().map(|x| x.to_string()),
            Some("pos must be less than self.len()=1, but got 1.".to_string())
        );
    }

    #[test]
    fn test_set_unfit() {
        let mut arr = FixedWidthArray::new(1, 2).unwrap();
        let e = arr.set(0, 4);
        assert_eq!(
            e.err().map(|x| x.to_string()),
            Some("val must fit in self.bits_per_value()=2 bits, but got 4.".to_string())
        );
        assert_eq!(arr.get(0), Some(0));
    }

    #[test]
    fn test_set_bulk_unfit_writes_nothing() {
        let mut arr = FixedWidthArray::new(4, 2).unwrap();
        let e = arr.set_bulk(0, &[1, 2, 3, 4]);
        assert!(e.is_err());
        assert!(arr.iter().all(|x| x == 0));
    }

    #[test]
    fn test_fill_oob() {
        let mut arr = FixedWidthArray::new(4, 2).unwrap();
        let e = arr.fill(3, 5, 1);
        assert_eq!(
            e.err().map(|x| x.to_string()),
            Some("from..to must be within 0..4, but got 3..5.".to_string())
        );
    }

    #[test]
    fn test_64b() {
        let mut arr = FixedWidthArray::new(3, 64).unwrap();
        arr.set(1, u64::MAX).unwrap();
        assert_eq!(arr.get(0), Some(0));
        assert_eq!(arr.get(1), Some(u64::MAX));
    }

    #[test]
    fn test_serialize() {
        for (format, w) in [(Format::Packed, 7), (Format::PackedSingleBlock, 21), (Format::Packed, 64)] {
            let vals = gen_random_values(101, w, 5);
            let mut arr = FixedWidthArray::with_format(vals.len(), format, w).unwrap();
            let mut pos = 0;
            while pos < vals.len() {
                pos += arr.set_bulk(pos, &vals[pos..]).unwrap();
            }
            let mut bytes = vec![];
            let size = arr.serialize_into(&mut bytes).unwrap();
            let other = FixedWidthArray::deserialize_from(&bytes[..]).unwrap();
            assert_eq!(arr, other);
            assert_eq!(size, bytes.len());
            assert_eq!(size, arr.size_in_bytes());
            assert_eq!(size, 14 + format.byte_count(vals.len(), w));
        }
    }

    #[test]
    fn test_deserialize_truncated() {
        let arr = FixedWidthArray::from_slice(&[1u8, 2, 3]).unwrap();
        let mut bytes = vec![];
        arr.serialize_into(&mut bytes).unwrap();
        bytes.pop();
        let e = FixedWidthArray::deserialize_from(&bytes[..]).unwrap_err();
        assert!(e.downcast_ref::<std::io::Error>().is_some());
    }

    #[test]
    fn test_deserialize_huge_value_count() {
        let mut bytes = vec![1u8, 0, 0, 0, 0, 64];
        bytes.extend_from_slice(&u64::MAX.to_le_bytes());
        bytes.extend_from_slice(&[0xFF; 8]);
        let e = FixedWidthArray::deserialize_from(&bytes[..]).unwrap_err();
        assert!(matches!(e.downcast_ref::<Error>(), Some(Error::CorruptData(_))));
    }

    #[test]
    fn test_deserialize_missing_values() {
        let mut bytes = vec![1u8, 0, 0, 0, 0, 1];
        bytes.extend_from_slice(&(1u64 << 40).to_le_bytes());
        bytes.extend_from_slice(&[0xFF; 8]);
        let e = FixedWidthArray::deserialize_from(&bytes[..]).unwrap_err();
        assert_eq!(
            e.downcast_ref::<std::io::Error>().map(|x| x.kind()),
            Some(std::io::ErrorKind::UnexpectedEof)
        );
    }
}
