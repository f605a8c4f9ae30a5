//! Random access to packed values in place, without decoding the whole array.
#![cfg(target_pointer_width = "64")]

use std::io;

use anyhow::Result;
use byteorder::{ByteOrder, LittleEndian};

use crate::packed::prelude::*;
use crate::packed::{Format, PackedHeader};
use crate::utils;
use crate::Serializable;

/// Read-only view of packed values as serialized by a
/// [`FixedWidthArray`](crate::packed::FixedWidthArray) or a
/// [`PackedWriter`](crate::packed::PackedWriter).
///
/// Each access reads the few bytes holding the value straight from the borrowed slice.
///
/// # Examples
///
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use packints::packed::{prelude::*, DirectReader, Format, PackedWriter};
///
/// let mut writer = PackedWriter::with_format(vec![], Format::Packed, 1000, 13)?;
/// for i in 0..1000 {
///     writer.add(i * 7)?;
/// }
/// writer.finish()?;
/// let bytes = writer.into_inner();
///
/// let reader = DirectReader::new(&bytes)?;
/// assert_eq!(reader.num_vals(), 1000);
/// assert_eq!(reader.access(500), Some(3500));
/// assert_eq!(reader.access(1000), None);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Copy, Debug)]
pub struct DirectReader<'a> {
    bytes: &'a [u8],
    header: PackedHeader,
    mask: u64,
}

impl<'a> DirectReader<'a> {
    /// Creates a reader over `bytes`, starting with the header.
    ///
    /// # Errors
    ///
    /// An error [`Error::CorruptData`](crate::Error::CorruptData) is returned if the header is malformed.
    /// An error [`std::io::Error`] is returned if `bytes` ends before the packed values do.
    pub fn new(bytes: &'a [u8]) -> Result<Self> {
        let mut input = bytes;
        let header = PackedHeader::deserialize_from(&mut input)?;
        Self::with_header(input, header)
    }

    /// Creates a reader over `bytes` starting at the first packed byte,
    /// with the header read beforehand.
    ///
    /// # Errors
    ///
    /// An error [`std::io::Error`] is returned if `bytes` ends before the packed values do.
    pub fn with_header(bytes: &'a [u8], header: PackedHeader) -> Result<Self> {
        let byte_count = header.byte_count();
        if bytes.len() < byte_count {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "{byte_count} bytes of packed values are expected, but got {}.",
                    bytes.len()
                ),
            )
            .into());
        }
        Ok(Self {
            bytes: &bytes[..byte_count],
            header,
            mask: utils::max_value(header.bits_per_value()),
        })
    }

    /// Returns the `pos`-th value, or [`None`] if out of bounds.
    pub fn get(&self, pos: usize) -> Option<u64> {
        if pos >= self.header.value_count() {
            return None;
        }
        let w = self.header.bits_per_value();
        match self.header.format() {
            Format::Packed => {
                let bit = pos * w;
                let (start, shift) = (bit / 8, bit % 8);
                let end = (bit + w + 7) / 8;
                let mut acc = 0u128;
                for (i, &b) in self.bytes[start..end].iter().enumerate() {
                    acc |= (b as u128) << (8 * i);
                }
                Some((acc >> shift) as u64 & self.mask)
            }
            Format::PackedSingleBlock => {
                let per_block = 64 / w;
                let block = pos / per_block;
                let word = LittleEndian::read_u64(&self.bytes[block * 8..block * 8 + 8]);
                Some((word >> ((pos % per_block) * w)) & self.mask)
            }
        }
    }

    /// Gets the number of values.
    pub const fn len(&self) -> usize {
        self.header.value_count()
    }

    /// Checks if the reader holds no values.
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Gets the header of the values.
    pub const fn header(&self) -> &PackedHeader {
        &self.header
    }
}

impl NumVals for DirectReader<'_> {
    fn num_vals(&self) -> usize {
        self.len()
    }
}

impl Access for DirectReader<'_> {
    fn access(&self, pos: usize) -> Option<u64> {
        self.get(pos)
    }
}
