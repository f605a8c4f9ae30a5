//! Writer of block-packed streams.
#![cfg(target_pointer_width = "64")]

use std::io::Write;

use anyhow::Result;
use byteorder::WriteBytesExt;

use crate::block_stream::{check_block_size, BPV_SHIFT, MIN_VALUE_EQUALS_0};
use crate::data_io::write_vlong;
use crate::packed::{BitPacker, Format};
use crate::utils;
use crate::Error;

/// Writer encoding integers into blocks of `block_size` values.
///
/// Each block stores its minimum and the packed differences from it,
/// so that blocks of close values take few bits regardless of their magnitude.
/// [`Self::finish()`] must be called to write the last, possibly partial, block.
///
/// # Examples
///
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use packints::block_stream::BlockPackedWriter;
///
/// let mut writer = BlockPackedWriter::new(vec![], 64)?;
/// for _ in 0..64 {
///     writer.add(7)?;
/// }
/// writer.finish()?;
///
/// // A constant block is its token and its minimum.
/// assert_eq!(writer.into_inner(), vec![0, 13]);
/// # Ok(())
/// # }
/// ```
pub struct BlockPackedWriter<W: Write> {
    out: W,
    values: Vec<u64>,
    bytes: Vec<u8>,
    off: usize,
    ord: u64,
    finished: bool,
}

impl<W: Write> BlockPackedWriter<W> {
    /// Creates a writer into `out` with blocks of `block_size` values.
    ///
    /// # Errors
    ///
    /// An error [`Error::InvalidArgument`] is returned if `block_size` is not a power of two
    /// in `MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE`.
    pub fn new(out: W, block_size: usize) -> Result<Self> {
        check_block_size(block_size)?;
        Ok(Self {
            out,
            values: vec![0; block_size],
            bytes: vec![],
            off: 0,
            ord: 0,
            finished: false,
        })
    }

    /// Appends `val`, writing the buffered block first if it is full.
    ///
    /// # Errors
    ///
    /// An error [`Error::IllegalState`] is returned if the writer is finished.
    /// Errors of the underlying writer are propagated.
    pub fn add(&mut self, val: u64) -> Result<()> {
        self.check_not_finished()?;
        if self.off == self.values.len() {
            self.flush()?;
        }
        self.values[self.off] = val;
        self.off += 1;
        self.ord += 1;
        Ok(())
    }

    /// Writes the buffered values and flushes the underlying writer.
    ///
    /// # Errors
    ///
    /// An error [`Error::IllegalState`] is returned if the writer is already finished.
    /// Errors of the underlying writer are propagated.
    pub fn finish(&mut self) -> Result<()> {
        self.check_not_finished()?;
        if self.off > 0 {
            self.flush()?;
        }
        self.out.flush()?;
        self.finished = true;
        Ok(())
    }

    /// Gets the number of values added so far.
    pub const fn ord(&self) -> u64 {
        self.ord
    }

    /// Gets the number of values per block.
    pub fn block_size(&self) -> usize {
        self.values.len()
    }

    /// Gets a reference to the underlying writer.
    pub const fn get_ref(&self) -> &W {
        &self.out
    }

    /// Unwraps the underlying writer.
    ///
    /// Values buffered since the last full block are lost unless [`Self::finish()`] was called.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn check_not_finished(&self) -> Result<()> {
        if self.finished {
            return Err(Error::illegal_state("This writer is already finished."));
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        let values = &mut self.values[..self.off];
        let mut min = values.iter().copied().min().unwrap_or(0);
        let max = values.iter().copied().max().unwrap_or(0);
        let delta = max - min;
        let bits = if delta == 0 {
            0
        } else {
            utils::bits_required(delta)
        };
        if bits == 64 {
            min = 0;
        } else if min > 0 {
            // Keeps the varint short while deltas still fit.
            min = max.saturating_sub(utils::max_value(bits));
        }

        let token = ((bits as u8) << BPV_SHIFT) | if min == 0 { MIN_VALUE_EQUALS_0 } else { 0 };
        self.out.write_u8(token)?;
        if min != 0 {
            write_vlong(&mut self.out, utils::zigzag_encode(min as i64) - 1)?;
        }
        if bits > 0 {
            if min != 0 {
                values.iter_mut().for_each(|v| *v -= min);
            }
            let packer = BitPacker::new(Format::Packed, bits)?;
            self.bytes.clear();
            self.bytes.resize(Format::Packed.byte_count(values.len(), bits), 0);
            packer.encode_bytes(values, &mut self.bytes)?;
            self.out.write_all(&self.bytes)?;
        }
        log::trace!(
            "BlockPackedWriter flushes {} values at {bits} bits per value with min {min}",
            values.len()
        );
        self.off = 0;
        Ok(())
    }
}

impl<W: Write> std::fmt::Debug for BlockPackedWriter<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockPackedWriter")
            .field("block_size", &self.block_size())
            .field("ord", &self.ord)
            .field("buffered", &self.off)
            .field("finished", &self.finished)
            .finish()
    }
}
