//! Persisted metadata of a packed array.
#![cfg(target_pointer_width = "64")]

use std::io::{Read, Write};

use anyhow::Result;

use crate::packed::Format;
use crate::{Error, Serializable};

/// First version of the persisted layout.
pub const VERSION_START: u32 = 1;

/// Version written by this crate.
pub const VERSION_CURRENT: u32 = VERSION_START;

/// Largest number of 64-bit blocks a decoded header may describe.
const MAX_LONG_COUNT: usize = isize::MAX as usize / 8;

/// Metadata written ahead of packed values, enough to rebuild a reader
/// without scanning the values.
///
/// The layout is the codec version (`u32`), the format id (`u8`),
/// the number of bits per value (`u8`) and the number of values (`u64`),
/// all little-endian.
///
/// # Examples
///
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use packints::packed::{Format, PackedHeader};
/// use packints::Serializable;
///
/// let header = PackedHeader::new(Format::PackedSingleBlock, 21, 1000)?;
/// let mut bytes = vec![];
/// header.serialize_into(&mut bytes)?;
/// assert_eq!(bytes.len(), 14);
/// assert_eq!(PackedHeader::deserialize_from(&bytes[..])?, header);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PackedHeader {
    format: Format,
    bits_per_value: usize,
    value_count: usize,
}

impl PackedHeader {
    /// Creates a header.
    ///
    /// # Errors
    ///
    /// An error [`Error::InvalidArgument`] is returned if `format` does not support `bits_per_value`.
    pub fn new(format: Format, bits_per_value: usize, value_count: usize) -> Result<Self> {
        if !format.is_supported(bits_per_value) {
            return Err(Error::invalid_argument(format!(
                "bits_per_value={bits_per_value} is not supported by {format:?}."
            )));
        }
        Ok(Self {
            format,
            bits_per_value,
            value_count,
        })
    }

    /// Gets the format.
    pub const fn format(&self) -> Format {
        self.format
    }

    /// Gets the number of bits per value.
    pub const fn bits_per_value(&self) -> usize {
        self.bits_per_value
    }

    /// Gets the number of values.
    pub const fn value_count(&self) -> usize {
        self.value_count
    }

    /// Returns the number of bytes of the values following the header.
    pub const fn byte_count(&self) -> usize {
        self.format.byte_count(self.value_count, self.bits_per_value)
    }
}

impl Serializable for PackedHeader {
    fn serialize_into<W: Write>(&self, mut writer: W) -> Result<usize> {
        let mut mem = VERSION_CURRENT.serialize_into(&mut writer)?;
        mem += self.format.id().serialize_into(&mut writer)?;
        mem += (self.bits_per_value as u8).serialize_into(&mut writer)?;
        mem += self.value_count.serialize_into(&mut writer)?;
        Ok(mem)
    }

    /// # Errors
    ///
    /// An error [`Error::CorruptData`] is returned if the version, the format id,
    /// or the number of bits per value is not one this crate writes,
    /// or if the values would not fit in addressable memory.
    fn deserialize_from<R: Read>(mut reader: R) -> Result<Self> {
        let version = u32::deserialize_from(&mut reader)?;
        if !(VERSION_START..=VERSION_CURRENT).contains(&version) {
            return Err(Error::corrupt_data(format!(
                "version must be in {VERSION_START}..={VERSION_CURRENT}, but got {version}."
            )));
        }
        let format = Format::from_id(u8::deserialize_from(&mut reader)?)?;
        let bits_per_value = u8::deserialize_from(&mut reader)? as usize;
        if !format.is_supported(bits_per_value) {
            return Err(Error::corrupt_data(format!(
                "bits_per_value={bits_per_value} is not supported by {format:?}."
            )));
        }
        let value_count = usize::deserialize_from(&mut reader)?;
        if format.long_count(value_count, bits_per_value) > MAX_LONG_COUNT {
            return Err(Error::corrupt_data(format!(
                "value_count={value_count} is too large for bits_per_value={bits_per_value}."
            )));
        }
        Ok(Self {
            format,
            bits_per_value,
            value_count,
        })
    }

    fn size_in_bytes(&self) -> usize {
        u32::size_of().unwrap() + 2 * u8::size_of().unwrap() + usize::size_of().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_version() {
        let bytes = [9u8, 0, 0, 0, 0, 3, 0, 0, 0, 0, 0, 0, 0, 0];
        let e = PackedHeader::deserialize_from(&bytes[..]).unwrap_err();
        assert_eq!(
            e.downcast_ref::<Error>(),
            Some(&Error::CorruptData(
                "version must be in 1..=1, but got 9.".to_string()
            ))
        );
    }

    #[test]
    fn test_bad_bits() {
        let bytes = [1u8, 0, 0, 0, 0, 65, 0, 0, 0, 0, 0, 0, 0, 0];
        let e = PackedHeader::deserialize_from(&bytes[..]).unwrap_err();
        assert_eq!(
            e.downcast_ref::<Error>(),
            Some(&Error::CorruptData(
                "bits_per_value=65 is not supported by Packed.".to_string()
            ))
        );
        let bytes = [1u8, 0, 0, 0, 1, 11, 0, 0, 0, 0, 0, 0, 0, 0];
        assert!(PackedHeader::deserialize_from(&bytes[..]).is_err());
    }

    #[test]
    fn test_bad_format() {
        let bytes = [1u8, 0, 0, 0, 7, 3, 0, 0, 0, 0, 0, 0, 0, 0];
        let e = PackedHeader::deserialize_from(&bytes[..]).unwrap_err();
        assert!(matches!(e.downcast_ref::<Error>(), Some(Error::CorruptData(_))));
    }

    #[test]
    fn test_huge_value_count() {
        let mut bytes = vec![1u8, 0, 0, 0, 0, 64];
        bytes.extend_from_slice(&u64::MAX.to_le_bytes());
        let e = PackedHeader::deserialize_from(&bytes[..]).unwrap_err();
        assert_eq!(
            e.downcast_ref::<Error>(),
            Some(&Error::CorruptData(
                "value_count=18446744073709551615 is too large for bits_per_value=64.".to_string()
            ))
        );

        let mut bytes = vec![1u8, 0, 0, 0, 1, 32];
        bytes.extend_from_slice(&u64::MAX.to_le_bytes());
        let e = PackedHeader::deserialize_from(&bytes[..]).unwrap_err();
        assert!(matches!(e.downcast_ref::<Error>(), Some(Error::CorruptData(_))));

        let mut bytes = vec![1u8, 0, 0, 0, 0, 1];
        bytes.extend_from_slice(&(1u64 << 40).to_le_bytes());
        let header = PackedHeader::deserialize_from(&bytes[..]).unwrap();
        assert_eq!(header.byte_count(), 1 << 37);
    }

    #[test]
    fn test_new_unsupported() {
        assert!(PackedHeader::new(Format::PackedSingleBlock, 11, 3).is_err());
        assert!(PackedHeader::new(Format::Packed, 0, 3).is_err());
    }
}
