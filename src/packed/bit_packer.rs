//! Stateless encoder and decoder of fixed-width values.
#![cfg(target_pointer_width = "64")]

use anyhow::Result;
use byteorder::{ByteOrder, LittleEndian};

use crate::packed::Format;
use crate::utils;
use crate::Error;

/// Stateless codec packing values of a fixed width into 64-bit words or bytes.
///
/// The word form and the byte form of the same values are interchangeable:
/// the byte form is the little-endian serialization of the words,
/// truncated to [`Format::byte_count()`] bytes.
///
/// # Examples
///
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use packints::packed::{BitPacker, Format};
///
/// let packer = BitPacker::new(Format::Packed, 5)?;
/// let vals = [1, 31, 0, 17, 9];
///
/// let mut words = vec![0; Format::Packed.long_count(5, 5)];
/// packer.encode(&vals, &mut words)?;
/// let mut bytes = vec![0; Format::Packed.byte_count(5, 5)];
/// packer.encode_bytes(&vals, &mut bytes)?;
///
/// let mut decoded = [0; 5];
/// packer.decode(&words, &mut decoded)?;
/// assert_eq!(decoded, vals);
/// packer.decode_bytes(&bytes, &mut decoded)?;
/// assert_eq!(decoded, vals);
///
/// assert_eq!(packer.get(&words, 3), Some(17));
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BitPacker {
    format: Format,
    bits_per_value: usize,
    mask: u64,
}

impl BitPacker {
    /// Creates a codec of `bits_per_value` bits in `format`.
    ///
    /// # Errors
    ///
    /// An error [`Error::InvalidArgument`] is returned if
    ///
    /// - `bits_per_value` is not in `1..=64`, or
    /// - `format` does not support `bits_per_value`.
    pub fn new(format: Format, bits_per_value: usize) -> Result<Self> {
        if !(1..=64).contains(&bits_per_value) {
            return Err(Error::invalid_argument(format!(
                "bits_per_value must be in 1..=64, but got {bits_per_value}."
            )));
        }
        if !format.is_supported(bits_per_value) {
            return Err(Error::invalid_argument(format!(
                "bits_per_value={bits_per_value} is not supported by {format:?}."
            )));
        }
        Ok(Self {
            format,
            bits_per_value,
            mask: utils::max_value(bits_per_value),
        })
    }

    /// Gets the format.
    #[inline(always)]
    pub const fn format(&self) -> Format {
        self.format
    }

    /// Gets the number of bits per value.
    #[inline(always)]
    pub const fn bits_per_value(&self) -> usize {
        self.bits_per_value
    }

    /// Returns the number of words consumed by one iteration of [`Self::long_value_count()`] values,
    /// the smallest run of values ending on a word boundary.
    pub const fn long_block_count(&self) -> usize {
        match self.format {
            Format::Packed => reduce(self.bits_per_value, 64).0,
            Format::PackedSingleBlock => 1,
        }
    }

    /// Returns the number of values produced by one iteration of [`Self::long_block_count()`] words.
    pub const fn long_value_count(&self) -> usize {
        match self.format {
            Format::Packed => reduce(self.bits_per_value, 64).1,
            Format::PackedSingleBlock => 64 / self.bits_per_value,
        }
    }

    /// Returns the number of bytes consumed by one iteration of [`Self::byte_value_count()`] values.
    pub const fn byte_block_count(&self) -> usize {
        match self.format {
            Format::Packed => reduce(self.bits_per_value, 8).0,
            Format::PackedSingleBlock => 8,
        }
    }

    /// Returns the number of values produced by one iteration of [`Self::byte_block_count()`] bytes.
    pub const fn byte_value_count(&self) -> usize {
        match self.format {
            Format::Packed => reduce(self.bits_per_value, 8).1,
            Format::PackedSingleBlock => 64 / self.bits_per_value,
        }
    }

    /// Encodes `values` into the leading words of `blocks`.
    ///
    /// Exactly `self.format().long_count(values.len(), self.bits_per_value())` words are overwritten;
    /// unused bits of the last word are cleared.
    ///
    /// # Errors
    ///
    /// An error [`Error::InvalidArgument`] is returned if
    ///
    /// - `blocks` is too short, or
    /// - a value does not fit in `self.bits_per_value()` bits.
    pub fn encode(&self, values: &[u64], blocks: &mut [u64]) -> Result<()> {
        self.check_values(values)?;
        let need = self.format.long_count(values.len(), self.bits_per_value);
        check_len("blocks", blocks.len(), need)?;
        match self.format {
            Format::Packed => self.encode_packed(values, blocks),
            Format::PackedSingleBlock => {
                let per_block = 64 / self.bits_per_value;
                for (block, chunk) in blocks.iter_mut().zip(values.chunks(per_block)) {
                    *block = self.pack_single_block(chunk);
                }
            }
        }
        Ok(())
    }

    /// Encodes `values` into the leading bytes of `bytes`.
    ///
    /// Exactly `self.format().byte_count(values.len(), self.bits_per_value())` bytes are overwritten.
    ///
    /// # Errors
    ///
    /// An error [`Error::InvalidArgument`] is returned if
    ///
    /// - `bytes` is too short, or
    /// - a value does not fit in `self.bits_per_value()` bits.
    pub fn encode_bytes(&self, values: &[u64], bytes: &mut [u8]) -> Result<()> {
        self.check_values(values)?;
        let need = self.format.byte_count(values.len(), self.bits_per_value);
        check_len("bytes", bytes.len(), need)?;
        match self.format {
            Format::Packed => {
                let w = self.bits_per_value;
                let mut acc = 0u128;
                let mut acc_bits = 0;
                let mut out = bytes.iter_mut();
                for &v in values {
                    acc |= (v as u128) << acc_bits;
                    acc_bits += w;
                    while acc_bits >= 8 {
                        if let Some(b) = out.next() {
                            *b = acc as u8;
                        }
                        acc >>= 8;
                        acc_bits -= 8;
                    }
                }
                if acc_bits > 0 {
                    if let Some(b) = out.next() {
                        *b = acc as u8;
                    }
                }
            }
            Format::PackedSingleBlock => {
                let per_block = 64 / self.bits_per_value;
                for (out, chunk) in bytes.chunks_mut(8).zip(values.chunks(per_block)) {
                    LittleEndian::write_u64(out, self.pack_single_block(chunk));
                }
            }
        }
        Ok(())
    }

    /// Decodes `values.len()` values from the leading words of `blocks`.
    ///
    /// # Errors
    ///
    /// An error [`Error::InvalidArgument`] is returned if `blocks` is too short.
    pub fn decode(&self, blocks: &[u64], values: &mut [u64]) -> Result<()> {
        let need = self.format.long_count(values.len(), self.bits_per_value);
        check_len("blocks", blocks.len(), need)?;
        self.decode_words(blocks, values);
        Ok(())
    }

    /// Decodes `values.len()` values, assuming `blocks` holds all of them.
    pub(crate) fn decode_words(&self, blocks: &[u64], values: &mut [u64]) {
        debug_assert!(blocks.len() >= self.format.long_count(values.len(), self.bits_per_value));
        match self.format {
            Format::Packed => {
                let w = self.bits_per_value;
                let mut acc = 0u128;
                let mut acc_bits = 0;
                let mut words = blocks.iter();
                for v in values.iter_mut() {
                    if acc_bits < w {
                        acc |= (words.next().copied().unwrap_or(0) as u128) << acc_bits;
                        acc_bits += 64;
                    }
                    *v = acc as u64 & self.mask;
                    acc >>= w;
                    acc_bits -= w;
                }
            }
            Format::PackedSingleBlock => {
                let per_block = 64 / self.bits_per_value;
                for (chunk, &block) in values.chunks_mut(per_block).zip(blocks) {
                    self.unpack_single_block(block, chunk);
                }
            }
        }
    }

    /// Decodes `values.len()` values from the leading bytes of `bytes`.
    ///
    /// # Errors
    ///
    /// An error [`Error::InvalidArgument`] is returned if `bytes` is too short.
    pub fn decode_bytes(&self, bytes: &[u8], values: &mut [u64]) -> Result<()> {
        let need = self.format.byte_count(values.len(), self.bits_per_value);
        check_len("bytes", bytes.len(), need)?;
        match self.format {
            Format::Packed => {
                let w = self.bits_per_value;
                let mut acc = 0u128;
                let mut acc_bits = 0;
                let mut input = bytes.iter();
                for v in values.iter_mut() {
                    while acc_bits < w {
                        acc |= (input.next().copied().unwrap_or(0) as u128) << acc_bits;
                        acc_bits += 8;
                    }
                    *v = acc as u64 & self.mask;
                    acc >>= w;
                    acc_bits -= w;
                }
            }
            Format::PackedSingleBlock => {
                let per_block = 64 / self.bits_per_value;
                for (chunk, block) in values.chunks_mut(per_block).zip(bytes.chunks(8)) {
                    self.unpack_single_block(LittleEndian::read_u64(block), chunk);
                }
            }
        }
        Ok(())
    }

    /// Returns the `index`-th value encoded in `blocks`, or [`None`] if `blocks` is too short.
    ///
    /// # Complexity
    ///
    /// Constant
    pub fn get(&self, blocks: &[u64], index: usize) -> Option<u64> {
        if blocks.len() < self.format.long_count(index + 1, self.bits_per_value) {
            return None;
        }
        Some(self.read(blocks, index))
    }

    /// Overwrites the `index`-th value encoded in `blocks` with `val`.
    ///
    /// # Errors
    ///
    /// An error [`Error::InvalidArgument`] is returned if
    ///
    /// - `blocks` is too short, or
    /// - `val` does not fit in `self.bits_per_value()` bits.
    ///
    /// # Complexity
    ///
    /// Constant
    pub fn set(&self, blocks: &mut [u64], index: usize, val: u64) -> Result<()> {
        self.check_values(&[val])?;
        let need = self.format.long_count(index + 1, self.bits_per_value);
        check_len("blocks", blocks.len(), need)?;
        self.write(blocks, index, val);
        Ok(())
    }

    /// Reads the `index`-th value, assuming `blocks` holds it.
    #[inline(always)]
    pub(crate) fn read(&self, blocks: &[u64], index: usize) -> u64 {
        let w = self.bits_per_value;
        match self.format {
            Format::Packed => {
                let bit = index * w;
                let (block, shift) = (bit / 64, bit % 64);
                if shift + w <= 64 {
                    (blocks[block] >> shift) & self.mask
                } else {
                    ((blocks[block] >> shift) | (blocks[block + 1] << (64 - shift))) & self.mask
                }
            }
            Format::PackedSingleBlock => {
                let per_block = 64 / w;
                let shift = (index % per_block) * w;
                (blocks[index / per_block] >> shift) & self.mask
            }
        }
    }

    /// Writes the `index`-th value, assuming `blocks` holds it and `val` fits.
    #[inline(always)]
    pub(crate) fn write(&self, blocks: &mut [u64], index: usize, val: u64) {
        let w = self.bits_per_value;
        match self.format {
            Format::Packed => {
                let bit = index * w;
                let (block, shift) = (bit / 64, bit % 64);
                blocks[block] = (blocks[block] & !(self.mask << shift)) | (val << shift);
                if shift + w > 64 {
                    let rest = shift + w - 64;
                    let high_mask = utils::max_value(rest);
                    blocks[block + 1] =
                        (blocks[block + 1] & !high_mask) | (val >> (64 - shift));
                }
            }
            Format::PackedSingleBlock => {
                let per_block = 64 / w;
                let shift = (index % per_block) * w;
                let block = &mut blocks[index / per_block];
                *block = (*block & !(self.mask << shift)) | (val << shift);
            }
        }
    }

    /// Checks that every value fits in the width.
    pub(crate) fn check_values(&self, values: &[u64]) -> Result<()> {
        if let Some(&val) = values.iter().find(|&&v| v & self.mask != v) {
            return Err(Error::invalid_argument(format!(
                "val must fit in self.bits_per_value()={} bits, but got {val}.",
                self.bits_per_value
            )));
        }
        Ok(())
    }

    fn encode_packed(&self, values: &[u64], blocks: &mut [u64]) {
        let w = self.bits_per_value;
        let mut acc = 0u128;
        let mut acc_bits = 0;
        let mut out = blocks.iter_mut();
        for &v in values {
            acc |= (v as u128) << acc_bits;
            acc_bits += w;
            if acc_bits >= 64 {
                if let Some(b) = out.next() {
                    *b = acc as u64;
                }
                acc >>= 64;
                acc_bits -= 64;
            }
        }
        if acc_bits > 0 {
            if let Some(b) = out.next() {
                *b = acc as u64;
            }
        }
    }

    #[inline(always)]
    fn pack_single_block(&self, chunk: &[u64]) -> u64 {
        chunk
            .iter()
            .enumerate()
            .fold(0, |block, (i, &v)| block | (v << (i * self.bits_per_value)))
    }

    #[inline(always)]
    fn unpack_single_block(&self, block: u64, chunk: &mut [u64]) {
        for (i, v) in chunk.iter_mut().enumerate() {
            *v = (block >> (i * self.bits_per_value)) & self.mask;
        }
    }
}

/// Halves `(blocks, values)` while both are even.
const fn reduce(mut blocks: usize, mut values: usize) -> (usize, usize) {
    while blocks % 2 == 0 && values % 2 == 0 {
        blocks /= 2;
        values /= 2;
    }
    (blocks, values)
}

fn check_len(name: &str, len: usize, need: usize) -> Result<()> {
    if len < need {
        return Err(Error::invalid_argument(format!(
            "{name} must have at least {need} elements, but got {len}."
        )));
    }
    Ok(())
}

/// Packs `values` into words at `bits_per_value` bits in [`Format::Packed`].
///
/// # Errors
///
/// An error [`Error::InvalidArgument`] is returned if
///
/// - `bits_per_value` is not in `1..=64`, or
/// - a value does not fit in `bits_per_value` bits.
///
/// # Examples
///
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use packints::packed::{pack, unpack};
///
/// let blocks = pack(&[1, 2, 3], 2)?;
/// assert_eq!(blocks, vec![0b11_10_01]);
/// assert_eq!(unpack(&blocks, 2, 3)?, vec![1, 2, 3]);
/// # Ok(())
/// # }
/// ```
pub fn pack(values: &[u64], bits_per_value: usize) -> Result<Vec<u64>> {
    let packer = BitPacker::new(Format::Packed, bits_per_value)?;
    let mut blocks = vec![0; Format::Packed.long_count(values.len(), bits_per_value)];
    packer.encode(values, &mut blocks)?;
    Ok(blocks)
}

/// Unpacks `n` values of `bits_per_value` bits from words in [`Format::Packed`].
///
/// # Errors
///
/// An error [`Error::InvalidArgument`] is returned if
///
/// - `bits_per_value` is not in `1..=64`, or
/// - `blocks` is too short for `n` values.
pub fn unpack(blocks: &[u64], bits_per_value: usize, n: usize) -> Result<Vec<u64>> {
    let packer = BitPacker::new(Format::Packed, bits_per_value)?;
    let mut values = vec![0; n];
    packer.decode(blocks, &mut values)?;
    Ok(values)
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

    fn test_codec(packer: &BitPacker, values: &[u64]) {
        let format = packer.format();
        let w = packer.bits_per_value();

        let mut words = vec![0; format.long_count(values.len(), w)];
        packer.encode(values, &mut words).unwrap();
        let mut bytes = vec![0; format.byte_count(values.len(), w)];
        packer.encode_bytes(values, &mut bytes).unwrap();

        // The byte form is the little-endian serialization of the words.
        let mut serialized = vec![0; words.len() * 8];
        LittleEndian::write_u64_into(&words, &mut serialized);
        assert_eq!(&serialized[..bytes.len()], &bytes[..]);

        let mut decoded = vec![0; values.len()];
        packer.decode(&words, &mut decoded).unwrap();
        assert_eq!(decoded, values);
        packer.decode_bytes(&bytes, &mut decoded).unwrap();
        assert_eq!(decoded, values);

        for (i, &v) in values.iter().enumerate() {
            assert_eq!(packer.get(&words, i), Some(v));
        }
    }

    #[test]
    fn test_packed_all_widths() {
        for w in 1..=64 {
            let packer = BitPacker::new(Format::Packed, w).unwrap();
            for len in [0, 1, 63, 64, 65, 1000] {
                test_codec(&packer, &gen_random_values(len, w, w as u64));
            }
        }
    }

    #[test]
    fn test_single_block_all_widths() {
        for w in SINGLE_BLOCK_WIDTHS {
            let packer = BitPacker::new(Format::PackedSingleBlock, w).unwrap();
            for len in [0, 1, 63, 64, 65, 1000] {
                test_codec(&packer, &gen_random_values(len, w, w as u64));
            }
        }
    }

    #[test]
    fn test_iteration_counts() {
        let packer = BitPacker::new(Format::Packed, 4).unwrap();
        assert_eq!((packer.long_block_count(), packer.long_value_count()), (1, 16));
        assert_eq!((packer.byte_block_count(), packer.byte_value_count()), (1, 2));
        let packer = BitPacker::new(Format::Packed, 12).unwrap();
        assert_eq!((packer.long_block_count(), packer.long_value_count()), (3, 16));
        assert_eq!((packer.byte_block_count(), packer.byte_value_count()), (3, 2));
        let packer = BitPacker::new(Format::Packed, 7).unwrap();
        assert_eq!((packer.long_block_count(), packer.long_value_count()), (7, 64));
        assert_eq!((packer.byte_block_count(), packer.byte_value_count()), (7, 8));
        let packer = BitPacker::new(Format::Packed, 64).unwrap();
        assert_eq!((packer.long_block_count(), packer.long_value_count()), (1, 1));
        assert_eq!((packer.byte_block_count(), packer.byte_value_count()), (8, 1));
        let packer = BitPacker::new(Format::PackedSingleBlock, 21).unwrap();
        assert_eq!((packer.long_block_count(), packer.long_value_count()), (1, 3));
        assert_eq!((packer.byte_block_count(), packer.byte_value_count()), (8, 3));
    }

    #[test]
    fn test_set_straddling() {
        let packer = BitPacker::new(Format::Packed, 7).unwrap();
        let mut blocks = vec![u64::MAX; 2];
        // Value 9 covers bits 63..70.
        packer.set(&mut blocks, 9, 0).unwrap();
        assert_eq!(packer.get(&blocks, 9), Some(0));
        assert_eq!(packer.get(&blocks, 8), Some(127));
        assert_eq!(packer.get(&blocks, 10), Some(127));
        packer.set(&mut blocks, 9, 0b1000001).unwrap();
        assert_eq!(packer.get(&blocks, 9), Some(0b1000001));
        assert_eq!(blocks[0] >> 63, 1);
        assert_eq!(blocks[1] & 0b111111, 0b100000);
    }

    #[test]
    fn test_new_oob() {
        let e = BitPacker::new(Format::Packed, 0);
        assert_eq!(
            e.err().map(|x| x.to_string()),
            Some("bits_per_value must be in 1..=64, but got 0.".to_string())
        );
        let e = BitPacker::new(Format::PackedSingleBlock, 11);
        assert_eq!(
            e.err().map(|x| x.to_string()),
            Some("bits_per_value=11 is not supported by PackedSingleBlock.".to_string())
        );
    }

    #[test]
    fn test_encode_unfit() {
        let packer = BitPacker::new(Format::Packed, 3).unwrap();
        let mut blocks = vec![0; 1];
        let e = packer.encode(&[1, 8], &mut blocks);
        assert_eq!(
            e.err().map(|x| x.to_string()),
            Some("val must fit in self.bits_per_value()=3 bits, but got 8.".to_string())
        );
    }

    #[test]
    fn test_decode_short() {
        let packer = BitPacker::new(Format::Packed, 33).unwrap();
        let mut values = vec![0; 2];
        let e = packer.decode(&[0], &mut values);
        assert_eq!(
            e.err().map(|x| x.to_string()),
            Some("blocks must have at least 2 elements, but got 1.".to_string())
        );
        assert_eq!(packer.get(&[0], 1), None);
    }
}
