//! Streaming codec writing integers in self-describing packed blocks.
//!
//! A stream is a sequence of frames, one per block of `block_size` values
//! (the last block may be shorter):
//!
//! | Field | Size | Content |
//! | --- | --- | --- |
//! | token | 1 byte | `(bits_per_value << 1) \| min_is_zero` |
//! | min | varint, absent if `min_is_zero` | `zigzag(min) - 1` in LEB128 |
//! | deltas | `ceil(len * bits_per_value / 8)` bytes | `value - min`, packed LSB-first |
//!
//! A block of identical values has `bits_per_value = 0` and no delta bytes.
//! Since the byte length of a full block follows from its token,
//! readers can skip whole blocks without decoding them.
//!
//! # Examples
//!
//! ```
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use packints::block_stream::{BlockPackedReader, BlockPackedWriter};
//!
//! let mut writer = BlockPackedWriter::new(vec![], 64)?;
//! for i in 0..200 {
//!     writer.add(1000 + i % 10)?;
//! }
//! writer.finish()?;
//! let bytes = writer.into_inner();
//!
//! let mut reader = BlockPackedReader::new(&bytes[..], 64, 200)?;
//! reader.skip_values(150)?;
//! assert_eq!(reader.next().transpose()?, Some(1000));
//! assert_eq!(reader.ord(), 151);
//! # Ok(())
//! # }
//! ```
#![cfg(target_pointer_width = "64")]

pub mod reader;
pub mod writer;

pub use reader::BlockPackedReader;
pub use writer::BlockPackedWriter;

use anyhow::Result;

use crate::Error;

/// Minimum number of values per block.
pub const MIN_BLOCK_SIZE: usize = 64;

/// Maximum number of values per block.
pub const MAX_BLOCK_SIZE: usize = 1 << 27;

/// Token flag set when the block minimum is zero.
const MIN_VALUE_EQUALS_0: u8 = 1;

/// Shift of the width in the token.
const BPV_SHIFT: u8 = 1;

fn check_block_size(block_size: usize) -> Result<()> {
    if !block_size.is_power_of_two() || !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&block_size)
    {
        return Err(Error::invalid_argument(format!(
            "block_size must be a power of two in {MIN_BLOCK_SIZE}..={MAX_BLOCK_SIZE}, but got {block_size}."
        )));
    }
    Ok(())
}
