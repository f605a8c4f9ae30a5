//! Top module for bit-packed integer arrays.
//!
//! # Introduction
//!
//! Sequences of small non-negative integers can be stored in compact space by
//! giving every value the same number of bits $`w \in [1, 64]`$.
//! The arrays in this module support the following queries
//! (all values are [`u64`]):
//!
//! - $`\textrm{Access}(i)`$ returns the $`i`$-th value (implemented by [`Access`]).
//! - $`\textrm{Update}(i, x)`$ overwrites the $`i`$-th value (implemented by [`Update`]).
//!
//! # Data structures
//!
//! | Implementation | Access | Update | Grows |
//! | --- | :-: | :-: | --- |
//! | [`FixedWidthArray`] | $`O(1)`$ | $`O(1)`$ | -- |
//! | [`GrowableArray`] | $`O(1)`$ | $`O(1)`$ amortized | width, on overflowing updates |
//! | [`PagedArray`] | $`O(1)`$ | $`O(1)`$ | length, by [`PagedArray::resize()`] |
//! | [`AppendBuffer`] | $`O(1)`$ | -- | length, by [`AppendBuffer::add()`] |
//!
//! [`FixedWidthArray`] stores values in one of the two layouts of [`Format`].
//! [`fastest_format_and_bits`] picks the layout and the width from a width request and an
//! acceptable memory overhead such as [`COMPACT`], [`DEFAULT`], [`FAST`] or [`FASTEST`].
//!
//! [`AppendBuffer`] seals every full page with a [`PageCodec`]:
//! [`DeltaCodec`] subtracts the page minimum, [`MonotonicCodec`] subtracts a linear model,
//! and [`PlainCodec`] packs values as they are.
//!
//! A serialized [`FixedWidthArray`] is a [`PackedHeader`] followed by the packed bytes.
//! The same bytes can be produced one value at a time by [`PackedWriter`],
//! read back sequentially by [`PackedReaderIterator`],
//! or accessed in place by [`DirectReader`].
//!
//! # Examples
//!
//! [`prelude`] imports the traits.
//!
//! ```
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use packints::packed::{prelude::*, GrowableArray, DEFAULT};
//!
//! let mut arr = GrowableArray::new(4, 1, DEFAULT)?;
//! arr.update(0, 1)?;
//! arr.update(3, 1000)?;
//!
//! assert_eq!(arr.num_vals(), 4);
//! assert!(arr.bits_per_value() >= 10);
//! assert_eq!(arr.access(0), Some(1));
//! assert_eq!(arr.access(3), Some(1000));
//! assert_eq!(arr.access(4), None);
//! # Ok(())
//! # }
//! ```
pub mod append_buffer;
pub mod bit_packer;
pub mod direct_reader;
pub mod fixed_width_array;
pub mod format;
pub mod growable_array;
pub mod header;
pub mod paged_array;
pub mod prelude;
pub mod reader_iterator;
pub mod writer;

pub use append_buffer::{
    AppendBuffer, DeltaAppendBuffer, DeltaCodec, MonotonicAppendBuffer, MonotonicCodec, PageCodec,
    PlainAppendBuffer, PlainCodec, SealedPage,
};
pub use bit_packer::{pack, unpack, BitPacker};
pub use direct_reader::DirectReader;
pub use fixed_width_array::FixedWidthArray;
pub use format::{
    fastest_format_and_bits, Format, FormatAndBits, COMPACT, DEFAULT, DEFAULT_BUFFER_SIZE, FAST,
    FASTEST, SINGLE_BLOCK_WIDTHS,
};
pub use growable_array::GrowableArray;
pub use header::PackedHeader;
pub use paged_array::{Page, PagedArray, PagedGrowableArray, PagedMutable};
pub use reader_iterator::PackedReaderIterator;
pub use writer::PackedWriter;

use anyhow::Result;

use crate::Error;

/// Interface for reporting the number of values.
pub trait NumVals {
    /// Returns the number of values stored.
    fn num_vals(&self) -> usize;
}

/// Interface for reading values.
pub trait Access: NumVals {
    /// Returns the `pos`-th value, or [`None`] if out of bounds.
    fn access(&self, pos: usize) -> Option<u64>;

    /// Reads values starting at `pos` into `buf`, returning how many were read.
    ///
    /// At least one value is read when `pos` is in bounds and `buf` is not empty,
    /// but implementations may stop early at a natural boundary of their storage.
    /// Nothing is read when `pos` is out of bounds.
    fn access_bulk(&self, pos: usize, buf: &mut [u64]) -> usize {
        let mut read = 0;
        for b in buf.iter_mut() {
            match self.access(pos + read) {
                Some(x) => *b = x,
                None => break,
            }
            read += 1;
        }
        read
    }
}

/// Interface for overwriting values.
pub trait Update: Access {
    /// Returns the number of bits each value is stored in.
    fn bits_per_value(&self) -> usize;

    /// Sets the `pos`-th value to `val`.
    ///
    /// # Errors
    ///
    /// An error [`Error::InvalidArgument`] is returned if `pos` is out of bounds
    /// or `val` cannot be stored.
    fn update(&mut self, pos: usize, val: u64) -> Result<()>;

    /// Writes `vals` starting at `pos`, returning how many were written.
    ///
    /// At least one value is written when `vals` is not empty,
    /// but implementations may stop early at a natural boundary of their storage.
    ///
    /// # Errors
    ///
    /// An error [`Error::InvalidArgument`] is returned if `pos` is out of bounds
    /// or a value cannot be stored.
    fn update_bulk(&mut self, pos: usize, vals: &[u64]) -> Result<usize> {
        check_pos(pos, self.num_vals())?;
        let len = vals.len().min(self.num_vals() - pos);
        for (i, &x) in vals[..len].iter().enumerate() {
            self.update(pos + i, x)?;
        }
        Ok(len)
    }

    /// Sets the values in `from..to` to `val`.
    ///
    /// # Errors
    ///
    /// An error [`Error::InvalidArgument`] is returned if the range is out of bounds
    /// or `val` cannot be stored.
    fn fill(&mut self, from: usize, to: usize, val: u64) -> Result<()> {
        check_range(from, to, self.num_vals())?;
        for pos in from..to {
            self.update(pos, val)?;
        }
        Ok(())
    }

    /// Resets all values to zero.
    fn clear(&mut self);
}

/// Interface for reporting the heap and inline memory of a structure.
pub trait RamBytesUsed {
    /// Returns the approximate number of bytes this structure occupies in memory.
    fn ram_bytes_used(&self) -> usize;
}

pub(crate) fn check_pos(pos: usize, len: usize) -> Result<()> {
    if len <= pos {
        return Err(Error::invalid_argument(format!(
            "pos must be less than self.len()={len}, but got {pos}."
        )));
    }
    Ok(())
}

pub(crate) fn check_range(from: usize, to: usize, len: usize) -> Result<()> {
    if from > to || to > len {
        return Err(Error::invalid_argument(format!(
            "from..to must be within 0..{len}, but got {from}..{to}."
        )));
    }
    Ok(())
}

/// Copies `len` values from `src` at `src_pos` to `dest` at `dest_pos`,
/// using at most `mem` bytes of buffer.
///
/// Values move through bulk reads and writes; when `mem` is less than 8 bytes,
/// they are copied one at a time.
///
/// # Errors
///
/// An error [`Error::InvalidArgument`] is returned if
///
/// - either range is out of bounds, or
/// - `dest` rejects a value.
///
/// # Examples
///
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use packints::packed::{copy, prelude::*, FixedWidthArray, DEFAULT_BUFFER_SIZE};
///
/// let src = FixedWidthArray::from_slice(&[1u8, 2, 3, 4])?;
/// let mut dest = FixedWidthArray::new(6, 8)?;
/// copy(&src, 1, &mut dest, 2, 3, DEFAULT_BUFFER_SIZE)?;
///
/// assert_eq!(dest.iter().collect::<Vec<_>>(), vec![0, 0, 2, 3, 4, 0]);
/// # Ok(())
/// # }
/// ```
pub fn copy<S, D>(
    src: &S,
    src_pos: usize,
    dest: &mut D,
    dest_pos: usize,
    len: usize,
    mem: usize,
) -> Result<()>
where
    S: Access + ?Sized,
    D: Update + ?Sized,
{
    check_range(src_pos, src_pos.saturating_add(len), src.num_vals())?;
    check_range(dest_pos, dest_pos.saturating_add(len), dest.num_vals())?;
    let capacity = mem / 8;
    if capacity == 0 {
        for i in 0..len {
            if let Some(x) = src.access(src_pos + i) {
                dest.update(dest_pos + i, x)?;
            }
        }
    } else if len > 0 {
        let mut buf = vec![0; capacity.min(len)];
        copy_with_buffer(src, src_pos, dest, dest_pos, len, &mut buf)?;
    }
    Ok(())
}

/// Same as [`copy`] but with a caller-supplied, non-empty buffer.
pub(crate) fn copy_with_buffer<S, D>(
    src: &S,
    mut src_pos: usize,
    dest: &mut D,
    mut dest_pos: usize,
    mut len: usize,
    buf: &mut [u64],
) -> Result<()>
where
    S: Access + ?Sized,
    D: Update + ?Sized,
{
    debug_assert!(!buf.is_empty());
    let mut remaining = 0;
    while len > 0 {
        let want = len.min(buf.len() - remaining);
        let read = src.access_bulk(src_pos, &mut buf[remaining..remaining + want]);
        if read == 0 {
            return Err(Error::invalid_argument(format!(
                "src must hold a value at {src_pos}."
            )));
        }
        src_pos += read;
        len -= read;
        remaining += read;
        let written = dest.update_bulk(dest_pos, &buf[..remaining])?;
        dest_pos += written;
        buf.copy_within(written..remaining, 0);
        remaining -= written;
    }
    while remaining > 0 {
        let written = dest.update_bulk(dest_pos, &buf[..remaining])?;
        dest_pos += written;
        buf.copy_within(written..remaining, 0);
        remaining -= written;
    }
    Ok(())
}
