//! Persistence of the data structures.
#![cfg(target_pointer_width = "64")]

pub mod primitive;

use std::io::{Read, Write};

use anyhow::Result;

/// Upper bound on elements reserved up front from a decoded length.
const MAX_PREALLOC_LEN: usize = 1 << 16;

/// Trait to serialize/deserialize data structures.
///
/// Integers are written in little-endian byte order.
///
/// # Examples
///
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use packints::packed::FixedWidthArray;
/// use packints::Serializable;
///
/// let arr = FixedWidthArray::from_slice(&[3u32, 14, 15, 92])?;
///
/// let mut bytes = vec![];
/// let size = arr.serialize_into(&mut bytes)?;
/// let other = FixedWidthArray::deserialize_from(&bytes[..])?;
///
/// assert_eq!(arr, other);
/// assert_eq!(size, bytes.len());
/// assert_eq!(size, arr.size_in_bytes());
/// # Ok(())
/// # }
/// ```
pub trait Serializable: Sized {
    /// Serializes the data structure into the writer,
    /// returning the number of serialized bytes.
    ///
    /// # Arguments
    ///
    /// - `writer`: [`Write`] variable.
    fn serialize_into<W: Write>(&self, writer: W) -> Result<usize>;

    /// Deserializes the data structure from the reader.
    ///
    /// # Arguments
    ///
    /// - `reader`: [`Read`] variable.
    fn deserialize_from<R: Read>(reader: R) -> Result<Self>;

    /// Returns the number of bytes to serialize the data structure.
    fn size_in_bytes(&self) -> usize;

    /// Returns the size of a primitive type in bytes (if the type is so).
    fn size_of() -> Option<usize> {
        None
    }
}

impl<S> Serializable for Option<S>
where
    S: Serializable,
{
    fn serialize_into<W: Write>(&self, mut writer: W) -> Result<usize> {
        let mut mem = self.is_some().serialize_into(&mut writer)?;
        if let Some(x) = self {
            mem += x.serialize_into(&mut writer)?;
        }
        Ok(mem)
    }

    fn deserialize_from<R: Read>(mut reader: R) -> Result<Self> {
        if bool::deserialize_from(&mut reader)? {
            Ok(Some(S::deserialize_from(&mut reader)?))
        } else {
            Ok(None)
        }
    }

    fn size_in_bytes(&self) -> usize {
        bool::size_of().unwrap() + self.as_ref().map_or(0, |x| x.size_in_bytes())
    }
}

impl<S> Serializable for Vec<S>
where
    S: Serializable,
{
    fn serialize_into<W: Write>(&self, mut writer: W) -> Result<usize> {
        let mut mem = self.len().serialize_into(&mut writer)?;
        for x in self {
            mem += x.serialize_into(&mut writer)?;
        }
        Ok(mem)
    }

    fn deserialize_from<R: Read>(mut reader: R) -> Result<Self> {
        let len = usize::deserialize_from(&mut reader)?;
        let mut vec = Self::with_capacity(len.min(MAX_PREALLOC_LEN));
        for _ in 0..len {
            vec.push(S::deserialize_from(&mut reader)?);
        }
        Ok(vec)
    }

    fn size_in_bytes(&self) -> usize {
        let header = usize::size_of().unwrap();
        S::size_of().map_or_else(
            || header + self.iter().map(|x| x.size_in_bytes()).sum::<usize>(),
            |m| header + m * self.len(),
        )
    }
}
