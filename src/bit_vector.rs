//! Plain bit vector with word-level successor and predecessor scans.
#![cfg(target_pointer_width = "64")]

use std::io::{Read, Write};

use anyhow::Result;

use crate::broadword;
use crate::packed::RamBytesUsed;
use crate::{Error, Serializable};

/// The number of bits in a machine word.
pub const WORD_LEN: usize = 64;

/// Fixed-length bit vector stored in 64-bit words, least significant bit first.
///
/// This is the upper-bits store of [`EliasFanoEncoder`](crate::elias_fano::EliasFanoEncoder),
/// where the scans [`Self::successor1()`] and [`Self::predecessor1()`] walk the unary codes.
///
/// # Examples
///
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use packints::bit_vector::BitVector;
///
/// let mut bv = BitVector::from_bit(false, 100);
/// bv.set_bit(3, true)?;
/// bv.set_bit(70, true)?;
///
/// assert_eq!(bv.get_bit(3), Some(true));
/// assert_eq!(bv.successor1(4), Some(70));
/// assert_eq!(bv.predecessor1(69), Some(3));
/// # Ok(())
/// # }
/// ```
#[derive(Default, Clone, PartialEq, Eq)]
pub struct BitVector {
    words: Vec<u64>,
    len: usize,
}

impl BitVector {
    /// Creates a new vector that stores `len` bits,
    /// where each bit is initialized by `bit`.
    ///
    /// # Arguments
    ///
    ///  - `bit`: Bit value used for initialization.
    ///  - `len`: Number of elements.
    pub fn from_bit(bit: bool, len: usize) -> Self {
        let word = if bit { u64::MAX } else { 0 };
        let mut words = vec![word; Self::words_for(len)];
        let shift = len % WORD_LEN;
        if shift != 0 {
            if let Some(last) = words.last_mut() {
                *last &= (1 << shift) - 1;
            }
        }
        Self { words, len }
    }

    /// Returns the `pos`-th bit, or [`None`] if out of bounds.
    #[inline(always)]
    pub fn get_bit(&self, pos: usize) -> Option<bool> {
        if pos < self.len {
            Some((self.words[pos / WORD_LEN] >> (pos % WORD_LEN)) & 1 == 1)
        } else {
            None
        }
    }

    /// Updates the `pos`-th bit to `bit`.
    ///
    /// # Errors
    ///
    /// An error [`Error::InvalidArgument`] is returned if `self.len() <= pos`.
    #[inline(always)]
    pub fn set_bit(&mut self, pos: usize, bit: bool) -> Result<()> {
        if self.len <= pos {
            return Err(Error::invalid_argument(format!(
                "pos must be less than self.len()={}, but got {pos}.",
                self.len
            )));
        }
        let (block, shift) = (pos / WORD_LEN, pos % WORD_LEN);
        self.words[block] &= !(1 << shift);
        self.words[block] |= (bit as u64) << shift;
        Ok(())
    }

    /// Returns the smallest position `succ >= pos` whose bit is set, or
    /// [`None`] if not found or `self.len() <= pos`.
    ///
    /// # Complexity
    ///
    /// Linear in the number of words scanned.
    pub fn successor1(&self, pos: usize) -> Option<usize> {
        if self.len <= pos {
            return None;
        }
        let mut block = pos / WORD_LEN;
        let mut word = self.words[block] & (u64::MAX << (pos % WORD_LEN));
        loop {
            if let Some(ret) = broadword::lsb(word) {
                return Some(block * WORD_LEN + ret).filter(|&i| i < self.len);
            }
            block += 1;
            word = *self.words.get(block)?;
        }
    }

    /// Returns the largest position `pred <= pos` whose bit is set, or
    /// [`None`] if not found or `self.len() <= pos`.
    ///
    /// # Complexity
    ///
    /// Linear in the number of words scanned.
    pub fn predecessor1(&self, pos: usize) -> Option<usize> {
        if self.len <= pos {
            return None;
        }
        let mut block = pos / WORD_LEN;
        let mut word = self.words[block] & (u64::MAX >> (WORD_LEN - 1 - pos % WORD_LEN));
        loop {
            if let Some(ret) = broadword::msb(word) {
                return Some(block * WORD_LEN + ret);
            }
            if block == 0 {
                return None;
            }
            block -= 1;
            word = self.words[block];
        }
    }

    /// Returns the number of bits stored.
    #[inline(always)]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Checks if the vector is empty.
    #[inline(always)]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Gets the slice of raw words.
    #[inline(always)]
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// Gets the number of words.
    #[inline(always)]
    pub fn num_words(&self) -> usize {
        self.words.len()
    }

    #[inline(always)]
    const fn words_for(n: usize) -> usize {
        n / WORD_LEN + (n % WORD_LEN != 0) as usize
    }
}

impl RamBytesUsed for BitVector {
    fn ram_bytes_used(&self) -> usize {
        std::mem::size_of::<Self>() + self.words.capacity() * std::mem::size_of::<u64>()
    }
}

impl std::fmt::Debug for BitVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bits: String = (0..self.len)
            .map(|i| if self.get_bit(i) == Some(true) { '1' } else { '0' })
            .collect();
        f.debug_struct("BitVector")
            .field("bits", &bits)
            .field("len", &self.len)
            .finish()
    }
}

impl Serializable for BitVector {
    fn serialize_into<W: Write>(&self, mut writer: W) -> Result<usize> {
        let mut mem = self.words.serialize_into(&mut writer)?;
        mem += self.len.serialize_into(&mut writer)?;
        Ok(mem)
    }

    fn deserialize_from<R: Read>(mut reader: R) -> Result<Self> {
        let words = Vec::<u64>::deserialize_from(&mut reader)?;
        let len = usize::deserialize_from(&mut reader)?;
        if words.len() != Self::words_for(len) {
            return Err(Error::corrupt_data(format!(
                "a bit vector of {len} bits must have {} words, but got {}.",
                Self::words_for(len),
                words.len()
            )));
        }
        Ok(Self { words, len })
    }

    fn size_in_bytes(&self) -> usize {
        self.words.size_in_bytes() + usize::size_of().unwrap()
    }
}
