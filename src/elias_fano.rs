//! Elias-Fano encoding of non-decreasing sequences with a sparse skip index.
#![cfg(target_pointer_width = "64")]

pub mod decoder;

pub use decoder::EliasFanoDecoder;

use std::io::{Read, Write};

use anyhow::Result;

use crate::bit_vector::BitVector;
use crate::broadword;
use crate::packed::prelude::*;
use crate::packed::FixedWidthArray;
use crate::utils;
use crate::{Error, Serializable};

/// Default number of high values between two entries of the skip index.
pub const DEFAULT_INDEX_INTERVAL: usize = 256;

/// Encoder of a non-decreasing sequence of integers through Elias-Fano encoding.
///
/// Each value `x` in `0..=upper_bound` is split into `num_low_bits` low bits,
/// stored verbatim in a packed array, and a high part `x >> num_low_bits`,
/// stored in unary in a bit array where the `i`-th value sets bit `high + i`.
/// With $`n`$ values, this takes about $`n (2 + \lceil \lg \frac{u}{n} \rceil)`$ bits.
///
/// A sparse index records, for every `index_interval` high values,
/// the position just after the corresponding zero bit in the upper array,
/// so that decoders can jump ahead without scanning.
///
/// # Examples
///
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use packints::elias_fano::EliasFanoEncoder;
///
/// let mut enc = EliasFanoEncoder::new(5, 20)?;
/// for x in [1, 3, 3, 7, 20] {
///     enc.encode_next(x)?;
/// }
///
/// let mut dec = enc.decoder();
/// assert_eq!(dec.advance_to_value(4), Some(7));
/// assert_eq!(dec.current_index(), Some(3));
/// assert_eq!(dec.next_value(), Some(20));
/// assert_eq!(dec.next_value(), None);
/// # Ok(())
/// # }
/// ```
///
/// # References
///
///  - P. Elias, "Efficient storage and retrieval by content and address of static files,"
///    Journal of the ACM, 1974.
///  - R. Fano, "On the number of bits required to implement an associative memory,"
///    Memorandum 61. Computer Structures Group, Project MAC, MIT, 1971.
///  - S. Vigna, "Quasi-succinct indices," In WSDM, 2013.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EliasFanoEncoder {
    num_values: usize,
    upper_bound: u64,
    num_low_bits: usize,
    upper: BitVector,
    lower: Option<FixedWidthArray>,
    index: Option<FixedWidthArray>,
    index_interval: usize,
    num_index_entries: usize,
    num_encoded: usize,
    last_encoded: u64,
}

impl EliasFanoEncoder {
    /// Creates an encoder for `num_values` values in `0..=upper_bound`
    /// with [`DEFAULT_INDEX_INTERVAL`].
    ///
    /// # Errors
    ///
    /// An error [`Error::InvalidArgument`] is returned if the upper array would not fit in memory.
    pub fn new(num_values: usize, upper_bound: u64) -> Result<Self> {
        Self::with_index_interval(num_values, upper_bound, DEFAULT_INDEX_INTERVAL)
    }

    /// Creates an encoder for `num_values` values in `0..=upper_bound`,
    /// with an index entry every `index_interval` high values.
    ///
    /// # Errors
    ///
    /// An error [`Error::InvalidArgument`] is returned if
    ///
    /// - `index_interval` is less than 2, or
    /// - the upper array would not fit in memory.
    pub fn with_index_interval(
        num_values: usize,
        upper_bound: u64,
        index_interval: usize,
    ) -> Result<Self> {
        if index_interval < 2 {
            return Err(Error::invalid_argument(format!(
                "index_interval must be at least 2, but got {index_interval}."
            )));
        }
        let num_low_bits = if num_values == 0 {
            0
        } else {
            broadword::msb(upper_bound / num_values as u64).unwrap_or(0)
        };
        let max_high = if num_values == 0 {
            0
        } else {
            (upper_bound >> num_low_bits) as usize
        };
        let upper_len = max_high.checked_add(num_values).ok_or_else(|| {
            Error::invalid_argument(format!(
                "upper_bound={upper_bound} is too large for num_values={num_values}."
            ))
        })?;
        let upper = BitVector::from_bit(false, upper_len);
        let lower = if num_low_bits > 0 {
            Some(FixedWidthArray::new(num_values, num_low_bits)?)
        } else {
            None
        };

        let max_index_entry = upper_len.saturating_sub(1) as u64;
        let num_entries = max_high / index_interval;
        let index = if num_entries > 0 && max_index_entry > 0 {
            Some(FixedWidthArray::new(
                num_entries,
                utils::bits_required(max_index_entry),
            )?)
        } else {
            None
        };

        log::debug!(
            "EliasFanoEncoder for {num_values} values up to {upper_bound}: \
             {num_low_bits} low bits, {upper_len} upper bits, {num_entries} index entries"
        );
        Ok(Self {
            num_values,
            upper_bound,
            num_low_bits,
            upper,
            lower,
            index,
            index_interval,
            num_index_entries: 0,
            num_encoded: 0,
            last_encoded: 0,
        })
    }

    /// Appends `val` to the sequence.
    ///
    /// # Errors
    ///
    /// An error [`Error::IllegalState`] is returned if `num_values` values are already encoded.
    /// An error [`Error::InvalidArgument`] is returned if
    ///
    /// - `val` is less than the last encoded value, or
    /// - `val` is greater than `upper_bound`.
    ///
    /// Nothing is encoded on error.
    pub fn encode_next(&mut self, val: u64) -> Result<()> {
        if self.num_encoded >= self.num_values {
            return Err(Error::illegal_state(format!(
                "encode_next must be called at most self.num_values()={} times.",
                self.num_values
            )));
        }
        if val < self.last_encoded {
            return Err(Error::invalid_argument(format!(
                "val must be no less than the last one {}, but got {val}.",
                self.last_encoded
            )));
        }
        if val > self.upper_bound {
            return Err(Error::invalid_argument(format!(
                "val must be no greater than self.upper_bound()={}, but got {val}.",
                self.upper_bound
            )));
        }

        let high = (val >> self.num_low_bits) as usize;
        self.upper.set_bit(high + self.num_encoded, true)?;
        if let Some(lower) = self.lower.as_mut() {
            lower.set(self.num_encoded, val & utils::max_value(self.num_low_bits))?;
        }

        let mut index_value = (self.num_index_entries + 1) * self.index_interval;
        while index_value <= high {
            if let Some(index) = self.index.as_mut() {
                index.set(self.num_index_entries, (index_value + self.num_encoded) as u64)?;
            }
            self.num_index_entries += 1;
            index_value += self.index_interval;
        }

        self.last_encoded = val;
        self.num_encoded += 1;
        Ok(())
    }

    /// Checks if an Elias-Fano encoding of `num_values` values up to `upper_bound`
    /// is sufficiently smaller than a plain bit set over `0..=upper_bound`
    /// to be worth its slower access.
    ///
    /// # Examples
    ///
    /// ```
    /// use packints::elias_fano::EliasFanoEncoder;
    ///
    /// assert!(EliasFanoEncoder::sufficiently_smaller_than_bit_set(100, 10000));
    /// assert!(!EliasFanoEncoder::sufficiently_smaller_than_bit_set(2000, 10000));
    /// assert!(!EliasFanoEncoder::sufficiently_smaller_than_bit_set(1, 200));
    /// ```
    pub const fn sufficiently_smaller_than_bit_set(num_values: usize, upper_bound: u64) -> bool {
        upper_bound > 4 * 64 && upper_bound / 7 > num_values as u64
    }

    /// Creates a decoder over the values encoded so far.
    pub fn decoder(&self) -> EliasFanoDecoder {
        EliasFanoDecoder::new(self)
    }

    /// Gets the number of values the encoder was created for.
    pub const fn num_values(&self) -> usize {
        self.num_values
    }

    /// Gets the upper bound of the values.
    pub const fn upper_bound(&self) -> u64 {
        self.upper_bound
    }

    /// Gets the number of low bits stored verbatim per value.
    pub const fn num_low_bits(&self) -> usize {
        self.num_low_bits
    }

    /// Gets the number of values encoded so far.
    pub const fn num_encoded(&self) -> usize {
        self.num_encoded
    }

    /// Gets the last encoded value, or 0 if none.
    pub const fn last_encoded(&self) -> u64 {
        self.last_encoded
    }

    /// Gets the number of high values between two index entries.
    pub const fn index_interval(&self) -> usize {
        self.index_interval
    }

    /// Gets the number of index entries written so far.
    pub const fn num_index_entries(&self) -> usize {
        self.num_index_entries
    }

    /// Gets the raw words of the unary-coded high parts.
    pub fn upper_words(&self) -> &[u64] {
        self.upper.words()
    }

    /// Gets the raw words of the packed low parts.
    pub fn lower_words(&self) -> &[u64] {
        self.lower.as_ref().map(|l| l.blocks()).unwrap_or(&[])
    }

    /// Gets the raw words of the packed index entries.
    pub fn index_words(&self) -> &[u64] {
        self.index.as_ref().map(|i| i.blocks()).unwrap_or(&[])
    }

    pub(crate) const fn upper(&self) -> &BitVector {
        &self.upper
    }

    #[inline(always)]
    pub(crate) fn low(&self, i: usize) -> u64 {
        self.lower.as_ref().and_then(|l| l.get(i)).unwrap_or(0)
    }

    pub(crate) fn index_entry(&self, i: usize) -> Option<usize> {
        if i < self.num_index_entries {
            self.index.as_ref().and_then(|x| x.get(i)).map(|x| x as usize)
        } else {
            None
        }
    }

    fn layout_error(&self) -> anyhow::Error {
        Error::corrupt_data(format!(
            "the encoded arrays do not match num_values={} and upper_bound={}.",
            self.num_values, self.upper_bound
        ))
    }
}

impl RamBytesUsed for EliasFanoEncoder {
    fn ram_bytes_used(&self) -> usize {
        let heap = |a: &Option<FixedWidthArray>| {
            a.as_ref()
                .map_or(0, |a| a.ram_bytes_used() - std::mem::size_of::<FixedWidthArray>())
        };
        std::mem::size_of::<Self>() - std::mem::size_of::<BitVector>()
            + self.upper.ram_bytes_used()
            + heap(&self.lower)
            + heap(&self.index)
    }
}

impl Serializable for EliasFanoEncoder {
    fn serialize_into<W: Write>(&self, mut writer: W) -> Result<usize> {
        let mut mem = self.num_values.serialize_into(&mut writer)?;
        mem += self.upper_bound.serialize_into(&mut writer)?;
        mem += self.index_interval.serialize_into(&mut writer)?;
        mem += self.num_encoded.serialize_into(&mut writer)?;
        mem += self.last_encoded.serialize_into(&mut writer)?;
        mem += self.num_index_entries.serialize_into(&mut writer)?;
        mem += self.upper.serialize_into(&mut writer)?;
        mem += self.lower.serialize_into(&mut writer)?;
        mem += self.index.serialize_into(&mut writer)?;
        Ok(mem)
    }

    /// # Errors
    ///
    /// An error [`Error::CorruptData`] is returned if the arrays are inconsistent
    /// with the stored parameters.
    fn deserialize_from<R: Read>(mut reader: R) -> Result<Self> {
        let num_values = usize::deserialize_from(&mut reader)?;
        let upper_bound = u64::deserialize_from(&mut reader)?;
        let index_interval = usize::deserialize_from(&mut reader)?;
        let num_encoded = usize::deserialize_from(&mut reader)?;
        let last_encoded = u64::deserialize_from(&mut reader)?;
        let num_index_entries = usize::deserialize_from(&mut reader)?;
        let upper = BitVector::deserialize_from(&mut reader)?;
        let lower = Option::<FixedWidthArray>::deserialize_from(&mut reader)?;
        let index = Option::<FixedWidthArray>::deserialize_from(&mut reader)?;

        // The upper bits hold one set bit per value.
        if num_values > upper.len() {
            return Err(Error::corrupt_data(format!(
                "the encoded arrays do not match num_values={num_values} and upper_bound={upper_bound}."
            )));
        }
        let template = Self::with_index_interval(num_values, upper_bound, index_interval)
            .map_err(|e| Error::corrupt_data(e.to_string()))?;
        let shape = |a: &Option<FixedWidthArray>| a.as_ref().map(|a| (a.len(), a.bits_per_value()));
        if upper.len() != template.upper.len()
            || shape(&lower) != shape(&template.lower)
            || shape(&index) != shape(&template.index)
            || num_encoded > num_values
            || num_index_entries > index.as_ref().map_or(0, |i| i.len())
        {
            return Err(template.layout_error());
        }
        Ok(Self {
            num_encoded,
            last_encoded,
            num_index_entries,
            upper,
            lower,
            index,
            ..template
        })
    }

    fn size_in_bytes(&self) -> usize {
        usize::size_of().unwrap() * 4
            + u64::size_of().unwrap() * 2
            + self.upper.size_in_bytes()
            + self.lower.size_in_bytes()
            + self.index.size_in_bytes()
    }
}
