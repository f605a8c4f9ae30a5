//! Storage formats and the choice of a format for a requested width.
#![cfg(target_pointer_width = "64")]

use anyhow::Result;

use crate::Error;

/// No memory overhead at all, but the returned implementation may be slow.
pub const COMPACT: f32 = 0.0;

/// At most 20% memory overhead.
pub const DEFAULT: f32 = 0.2;

/// At most 50% memory overhead, always select a reasonably fast implementation.
pub const FAST: f32 = 0.5;

/// At most 700% memory overhead, always select a direct implementation.
pub const FASTEST: f32 = 7.0;

/// Default amount of memory, in bytes, used as a buffer for bulk copies.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Widths at which the [`Format::PackedSingleBlock`] layout is implemented.
pub const SINGLE_BLOCK_WIDTHS: [usize; 14] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 12, 16, 21, 32];

const SINGLE_BLOCK_SUPPORTED: [bool; 65] = {
    let mut table = [false; 65];
    let mut i = 0;
    while i < SINGLE_BLOCK_WIDTHS.len() {
        table[SINGLE_BLOCK_WIDTHS[i]] = true;
        i += 1;
    }
    table
};

/// Layout of fixed-width values on 64-bit words.
///
/// In both layouts, value `i` sits at the low end of its bit range,
/// and the byte form is the little-endian serialization of the words.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Format {
    /// Values are stored contiguously on a bit tape and may straddle two words.
    Packed,
    /// `64 / w` values are stored in each word from bit 0, wasting the `64 % w` upper bits.
    /// A value never crosses a word boundary.
    PackedSingleBlock,
}

impl Format {
    /// Returns the persisted identifier of the format.
    pub const fn id(self) -> u8 {
        match self {
            Self::Packed => 0,
            Self::PackedSingleBlock => 1,
        }
    }

    /// Returns the format with identifier `id`.
    ///
    /// # Errors
    ///
    /// An error [`Error::CorruptData`] is returned if `id` is unknown.
    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            0 => Ok(Self::Packed),
            1 => Ok(Self::PackedSingleBlock),
            _ => Err(Error::corrupt_data(format!(
                "format id must be 0 or 1, but got {id}."
            ))),
        }
    }

    /// Checks if values of `bits_per_value` bits can be stored in this format.
    ///
    /// # Examples
    ///
    /// ```
    /// use packints::packed::Format;
    ///
    /// assert!(Format::Packed.is_supported(11));
    /// assert!(Format::PackedSingleBlock.is_supported(21));
    /// assert!(!Format::PackedSingleBlock.is_supported(11));
    /// ```
    pub const fn is_supported(self, bits_per_value: usize) -> bool {
        match self {
            Self::Packed => 1 <= bits_per_value && bits_per_value <= 64,
            Self::PackedSingleBlock => {
                bits_per_value <= 64 && SINGLE_BLOCK_SUPPORTED[bits_per_value]
            }
        }
    }

    /// Returns the number of 64-bit words needed to store `value_count` values.
    ///
    /// # Examples
    ///
    /// ```
    /// use packints::packed::Format;
    ///
    /// assert_eq!(Format::Packed.long_count(10, 7), 2);
    /// assert_eq!(Format::PackedSingleBlock.long_count(10, 7), 2);
    /// assert_eq!(Format::PackedSingleBlock.long_count(10, 21), 4);
    /// ```
    pub const fn long_count(self, value_count: usize, bits_per_value: usize) -> usize {
        match self {
            Self::Packed => {
                let bits = value_count as u128 * bits_per_value as u128;
                ((bits + 63) / 64) as usize
            }
            Self::PackedSingleBlock => {
                let values_per_block = 64 / bits_per_value;
                value_count / values_per_block + (value_count % values_per_block != 0) as usize
            }
        }
    }

    /// Returns the number of bytes needed to store `value_count` values.
    ///
    /// [`Format::Packed`] is truncated to the last used byte while
    /// [`Format::PackedSingleBlock`] always fills whole words.
    ///
    /// # Examples
    ///
    /// ```
    /// use packints::packed::Format;
    ///
    /// assert_eq!(Format::Packed.byte_count(10, 7), 9);
    /// assert_eq!(Format::PackedSingleBlock.byte_count(10, 7), 16);
    /// ```
    pub const fn byte_count(self, value_count: usize, bits_per_value: usize) -> usize {
        match self {
            Self::Packed => {
                let bits = value_count as u128 * bits_per_value as u128;
                ((bits + 7) / 8) as usize
            }
            Self::PackedSingleBlock => 8 * self.long_count(value_count, bits_per_value),
        }
    }

    /// Returns the number of wasted bits per value.
    pub fn overhead_per_value(self, bits_per_value: usize) -> f32 {
        match self {
            Self::Packed => 0.0,
            Self::PackedSingleBlock => {
                let values_per_block = 64 / bits_per_value;
                (64 % bits_per_value) as f32 / values_per_block as f32
            }
        }
    }

    /// Returns the ratio of wasted bits to useful bits.
    pub fn overhead_ratio(self, bits_per_value: usize) -> f32 {
        self.overhead_per_value(bits_per_value) / bits_per_value as f32
    }
}

/// A format and the width it stores values at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FormatAndBits {
    /// The format.
    pub format: Format,
    /// The number of bits per value, no less than the requested one.
    pub bits_per_value: usize,
}

/// Picks the fastest format and width to store values of `bits_per_value` bits
/// while spending at most `acceptable_overhead_ratio` extra bits per useful bit.
///
/// Widths snap to 8, 16, 32 or 64 whenever the overhead allows,
/// since those are read without shifting across bytes.
/// Otherwise the smallest acceptable [`Format::PackedSingleBlock`] width is chosen,
/// falling back to [`Format::Packed`] at the requested width.
/// The ratio is clamped to `[COMPACT, FASTEST]`.
///
/// # Errors
///
/// An error [`Error::InvalidArgument`] is returned if `bits_per_value` is not in `1..=64`.
///
/// # Examples
///
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use packints::packed::{fastest_format_and_bits, Format, COMPACT, DEFAULT, FASTEST};
///
/// let fb = fastest_format_and_bits(3, COMPACT)?;
/// assert_eq!((fb.format, fb.bits_per_value), (Format::Packed, 3));
///
/// let fb = fastest_format_and_bits(3, FASTEST)?;
/// assert_eq!((fb.format, fb.bits_per_value), (Format::Packed, 8));
///
/// let fb = fastest_format_and_bits(20, DEFAULT)?;
/// assert_eq!((fb.format, fb.bits_per_value), (Format::PackedSingleBlock, 21));
/// # Ok(())
/// # }
/// ```
pub fn fastest_format_and_bits(
    bits_per_value: usize,
    acceptable_overhead_ratio: f32,
) -> Result<FormatAndBits> {
    if !(1..=64).contains(&bits_per_value) {
        return Err(Error::invalid_argument(format!(
            "bits_per_value must be in 1..=64, but got {bits_per_value}."
        )));
    }
    let ratio = acceptable_overhead_ratio.max(COMPACT).min(FASTEST);
    let acceptable_overhead_per_value = ratio * bits_per_value as f32;
    let max_bits_per_value = bits_per_value + acceptable_overhead_per_value as usize;

    for direct in [8, 16, 32, 64] {
        if bits_per_value <= direct && max_bits_per_value >= direct {
            return Ok(FormatAndBits {
                format: Format::Packed,
                bits_per_value: direct,
            });
        }
    }
    for bpv in bits_per_value..=max_bits_per_value.min(64) {
        if Format::PackedSingleBlock.is_supported(bpv) {
            let overhead = Format::PackedSingleBlock.overhead_per_value(bpv);
            let acceptable = acceptable_overhead_per_value + bits_per_value as f32 - bpv as f32;
            if overhead <= acceptable {
                return Ok(FormatAndBits {
                    format: Format::PackedSingleBlock,
                    bits_per_value: bpv,
                });
            }
        }
    }
    Ok(FormatAndBits {
        format: Format::Packed,
        bits_per_value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_block_supported() {
        for bpv in 1..=64 {
            assert_eq!(
                Format::PackedSingleBlock.is_supported(bpv),
                SINGLE_BLOCK_WIDTHS.contains(&bpv)
            );
        }
        assert!(!Format::PackedSingleBlock.is_supported(0));
        assert!(!Format::Packed.is_supported(0));
        assert!(!Format::Packed.is_supported(65));
    }

    #[test]
    fn test_id_round_trip() {
        for format in [Format::Packed, Format::PackedSingleBlock] {
            assert_eq!(Format::from_id(format.id()).unwrap(), format);
        }
        let e = Format::from_id(2);
        assert_eq!(
            e.err().map(|x| x.to_string()),
            Some("format id must be 0 or 1, but got 2.".to_string())
        );
    }

    #[test]
    fn test_counts() {
        assert_eq!(Format::Packed.long_count(0, 13), 0);
        assert_eq!(Format::Packed.long_count(64, 1), 1);
        assert_eq!(Format::Packed.long_count(65, 1), 2);
        assert_eq!(Format::Packed.byte_count(3, 3), 2);
        assert_eq!(Format::Packed.long_count(usize::MAX, 64), usize::MAX);
        assert_eq!(Format::PackedSingleBlock.long_count(3, 21), 1);
        assert_eq!(Format::PackedSingleBlock.long_count(4, 21), 2);
        assert_eq!(Format::PackedSingleBlock.byte_count(4, 21), 16);
    }

    #[test]
    fn test_overhead() {
        assert_eq!(Format::Packed.overhead_per_value(7), 0.0);
        assert_eq!(Format::PackedSingleBlock.overhead_per_value(32), 0.0);
        assert_eq!(Format::PackedSingleBlock.overhead_per_value(21), 1.0 / 3.0);
        assert_eq!(Format::PackedSingleBlock.overhead_per_value(12), 4.0 / 5.0);
        assert_eq!(Format::PackedSingleBlock.overhead_ratio(12), 4.0 / 5.0 / 12.0);
    }

    #[test]
    fn test_fastest_format_and_bits() {
        let check = |bpv, ratio, format, expected| {
            let fb = fastest_format_and_bits(bpv, ratio).unwrap();
            assert_eq!(fb.format, format, "bpv={bpv}, ratio={ratio}");
            assert_eq!(fb.bits_per_value, expected, "bpv={bpv}, ratio={ratio}");
        };
        check(7, DEFAULT, Format::Packed, 8);
        check(10, DEFAULT, Format::PackedSingleBlock, 10);
        check(12, COMPACT, Format::Packed, 12);
        check(20, COMPACT, Format::Packed, 20);
        check(30, COMPACT, Format::Packed, 30);
        check(30, FAST, Format::Packed, 32);
        check(60, DEFAULT, Format::Packed, 64);
        check(33, FASTEST, Format::Packed, 64);
        // Out-of-range ratios are clamped.
        check(3, -1.0, Format::Packed, 3);
        check(3, 100.0, Format::Packed, 8);
    }

    #[test]
    fn test_fastest_format_and_bits_oob() {
        let e = fastest_format_and_bits(0, DEFAULT);
        assert_eq!(
            e.err().map(|x| x.to_string()),
            Some("bits_per_value must be in 1..=64, but got 0.".to_string())
        );
        assert!(fastest_format_and_bits(65, DEFAULT).is_err());
    }
}
