//! Forward reader of block-packed streams.
#![cfg(target_pointer_width = "64")]

use anyhow::Result;
use byteorder::ReadBytesExt;

use crate::block_stream::{check_block_size, BPV_SHIFT, MIN_VALUE_EQUALS_0};
use crate::data_io::{read_vlong, DataInput};
use crate::packed::{BitPacker, Format};
use crate::utils;
use crate::Error;

/// Forward reader of a stream written by [`BlockPackedWriter`](crate::block_stream::BlockPackedWriter).
///
/// The reader must be given the block size and the number of values the stream was written with.
/// Values are decoded one block at a time into an internal buffer.
///
/// # Examples
///
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use packints::block_stream::{BlockPackedReader, BlockPackedWriter};
///
/// let mut writer = BlockPackedWriter::new(vec![], 64)?;
/// for i in 0..100 {
///     writer.add(i * i)?;
/// }
/// writer.finish()?;
/// let bytes = writer.into_inner();
///
/// let mut reader = BlockPackedReader::new(&bytes[..], 64, 100)?;
/// assert_eq!(reader.next_chunk(10)?, &[0, 1, 4, 9, 16, 25, 36, 49, 64, 81]);
///
/// let rest = reader.collect::<Result<Vec<_>, _>>()?;
/// assert_eq!(rest.len(), 90);
/// assert_eq!(rest[89], 99 * 99);
/// # Ok(())
/// # }
/// ```
pub struct BlockPackedReader<R: DataInput> {
    input: R,
    value_count: u64,
    values: Vec<u64>,
    bytes: Vec<u8>,
    off: usize,
    ord: u64,
}

impl<R: DataInput> BlockPackedReader<R> {
    /// Creates a reader of `value_count` values in blocks of `block_size` values.
    ///
    /// # Errors
    ///
    /// An error [`Error::InvalidArgument`] is returned if `block_size` is not a power of two
    /// in `MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE`.
    pub fn new(input: R, block_size: usize, value_count: u64) -> Result<Self> {
        check_block_size(block_size)?;
        Ok(Self {
            input,
            value_count,
            values: vec![0; block_size],
            bytes: vec![],
            off: block_size,
            ord: 0,
        })
    }

    /// Returns up to `count` values from the current block, decoding the next block if needed.
    ///
    /// The returned slice is never empty when `count > 0`
    /// and never crosses a block boundary.
    ///
    /// # Errors
    ///
    /// An error [`Error::IllegalState`] is returned if all values have been read.
    /// An error [`Error::CorruptData`] or [`std::io::Error`] is returned if the input is malformed.
    pub fn next_chunk(&mut self, count: usize) -> Result<&[u64]> {
        if self.ord == self.value_count {
            return Err(self.exhausted());
        }
        if self.off == self.block_size() {
            self.refill()?;
        }
        let count = count
            .min(self.block_size() - self.off)
            .min((self.value_count - self.ord) as usize);
        let start = self.off;
        self.off += count;
        self.ord += count as u64;
        Ok(&self.values[start..self.off])
    }

    /// Skips the next `count` values.
    ///
    /// Whole blocks are skipped by their byte length without decoding.
    ///
    /// # Errors
    ///
    /// An error [`Error::IllegalState`] is returned if fewer than `count` values remain.
    /// An error [`Error::CorruptData`] or [`std::io::Error`] is returned if the input is malformed.
    pub fn skip_values(&mut self, mut count: u64) -> Result<()> {
        match self.ord.checked_add(count) {
            Some(target) if target <= self.value_count => {}
            _ => {
                return Err(Error::illegal_state(format!(
                    "count must be at most {} values left, but got {count}.",
                    self.value_count - self.ord
                )))
            }
        }
        let block_size = self.block_size();

        let skip_buffer = count.min((block_size - self.off) as u64);
        self.off += skip_buffer as usize;
        self.ord += skip_buffer;
        count -= skip_buffer;
        if count == 0 {
            return Ok(());
        }

        while count >= block_size as u64 {
            let (bits, min_is_zero) = self.read_token()?;
            if !min_is_zero {
                read_vlong(&mut self.input)?;
            }
            let block_bytes = Format::Packed.byte_count(block_size, bits);
            self.input.skip_bytes(block_bytes as u64)?;
            self.ord += block_size as u64;
            count -= block_size as u64;
        }
        if count == 0 {
            return Ok(());
        }

        self.refill()?;
        self.ord += count;
        self.off += count as usize;
        Ok(())
    }

    /// Gets the number of values read or skipped so far.
    pub const fn ord(&self) -> u64 {
        self.ord
    }

    /// Gets the number of values in the stream.
    pub const fn value_count(&self) -> u64 {
        self.value_count
    }

    /// Gets the number of values per block.
    pub fn block_size(&self) -> usize {
        self.values.len()
    }

    /// Unwraps the underlying input.
    pub fn into_inner(self) -> R {
        self.input
    }

    fn exhausted(&self) -> anyhow::Error {
        Error::illegal_state(format!(
            "All self.value_count()={} values have been read.",
            self.value_count
        ))
    }

    fn read_token(&mut self) -> Result<(usize, bool)> {
        let token = self.input.read_u8()?;
        let bits = (token >> BPV_SHIFT) as usize;
        if bits > 64 {
            return Err(Error::corrupt_data(format!(
                "bits_per_value must be at most 64, but got {bits}."
            )));
        }
        Ok((bits, token & MIN_VALUE_EQUALS_0 != 0))
    }

    fn refill(&mut self) -> Result<()> {
        let (bits, min_is_zero) = self.read_token()?;
        let min = if min_is_zero {
            0
        } else {
            let encoded = read_vlong(&mut self.input)?
                .checked_add(1)
                .ok_or_else(|| Error::corrupt_data("min value overflows 64 bits."))?;
            utils::zigzag_decode(encoded) as u64
        };
        let len = (self.value_count - self.ord).min(self.block_size() as u64) as usize;
        let values = &mut self.values[..len];
        if bits == 0 {
            values.iter_mut().for_each(|v| *v = min);
        } else {
            let packer = BitPacker::new(Format::Packed, bits)?;
            self.bytes.clear();
            self.bytes.resize(Format::Packed.byte_count(len, bits), 0);
            self.input.read_exact(&mut self.bytes)?;
            packer.decode_bytes(&self.bytes, values)?;
            if min != 0 {
                values.iter_mut().for_each(|v| *v = v.wrapping_add(min));
            }
        }
        log::trace!("BlockPackedReader refills {len} values at {bits} bits per value");
        self.off = 0;
        Ok(())
    }
}

impl<R: DataInput> Iterator for BlockPackedReader<R> {
    type Item = Result<u64>;

    /// Returns the next value, or [`None`] once all values have been read.
    fn next(&mut self) -> Option<Self::Item> {
        if self.ord == self.value_count {
            return None;
        }
        if self.off == self.block_size() {
            if let Err(e) = self.refill() {
                return Some(Err(e));
            }
        }
        let val = self.values[self.off];
        self.off += 1;
        self.ord += 1;
        Some(Ok(val))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rest = (self.value_count - self.ord) as usize;
        (rest, Some(rest))
    }
}

impl<R: DataInput> std::fmt::Debug for BlockPackedReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockPackedReader")
            .field("block_size", &self.block_size())
            .field("value_count", &self.value_count)
            .field("ord", &self.ord)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;

    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaChaRng;

    use crate::block_stream::BlockPackedWriter;
    use crate::data_io::ReadInput;

    fn gen_blocky_values(len: usize, block_size: usize, seed: u64) -> Vec<u64> {
        let mut rng = ChaChaRng::seed_from_u64(seed);
        let (mut min, mut bits) = (0u64, 0usize);
        (0..len)
            .map(|i| {
                if i % block_size == 0 {
                    min = match rng.gen_range(0..10) {
                        0 => rng.gen_range(0..256),
                        1 => -5i64 as u64,
                        _ => rng.gen(),
                    };
                    bits = rng.gen_range(0..=64);
                }
                match bits {
                    0 => min,
                    64 => rng.gen(),
                    _ => min.wrapping_add(rng.gen::<u64>() & utils::max_value(bits)),
                }
            })
            .collect()
    }

    fn write_all(vals: &[u64], block_size: usize) -> Vec<u8> {
        let mut writer = BlockPackedWriter::new(vec![], block_size).unwrap();
        for &v in vals {
            writer.add(v).unwrap();
        }
        writer.finish().unwrap();
        writer.into_inner()
    }

    #[test]
    fn test_constant_stream_skip() {
        let bytes = write_all(&[42; 300], 128);
        let mut reader = BlockPackedReader::new(&bytes[..], 128, 300).unwrap();
        reader.skip_values(150).unwrap();
        assert_eq!(reader.next().transpose().unwrap(), Some(42));
        assert_eq!(reader.ord(), 151);

        let reader = BlockPackedReader::new(&bytes[..], 128, 300).unwrap();
        let vals = reader.collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(vals, vec![42; 300]);
    }

    #[test]
    fn test_random_read() {
        let mut rng = ChaChaRng::seed_from_u64(17);
        for (block_size, len) in [(64, 0), (64, 1000), (128, 128), (256, 5000), (1024, 3000)] {
            let vals = gen_blocky_values(len, block_size, len as u64);
            let bytes = write_all(&vals, block_size);

            let mut input = &bytes[..];
            let mut reader = BlockPackedReader::new(&mut input, block_size, len as u64).unwrap();
            let mut i = 0;
            while i < len {
                if rng.gen_bool(0.5) {
                    assert_eq!(reader.next().transpose().unwrap(), Some(vals[i]), "i={i}");
                    i += 1;
                } else {
                    let chunk = reader.next_chunk(rng.gen_range(1..1024)).unwrap();
                    assert!(!chunk.is_empty());
                    assert_eq!(chunk, &vals[i..i + chunk.len()]);
                    i += chunk.len();
                }
                assert_eq!(reader.ord(), i as u64);
            }
            assert!(reader.next().is_none());
            assert!(reader.next_chunk(1).is_err());
            drop(reader);
            assert!(input.is_empty());
        }
    }

    #[test]
    fn test_skip_values_with_iterator_adapters() {
        let vals: Vec<u64> = (0..500).collect();
        let bytes = write_all(&vals, 64);
        let mut reader = BlockPackedReader::new(&bytes[..], 64, 500).unwrap();
        reader.skip_values(150).unwrap();
        assert_eq!(reader.next().transpose().unwrap(), Some(150));
        assert_eq!(reader.ord(), 151);
        // Iterator::skip consumes values through next().
        let skipped = reader.by_ref().skip(10).take(2).collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(skipped, vec![161, 162]);
        assert_eq!(reader.ord(), 163);
        reader.skip_values(300).unwrap();
        let rest = reader.collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(rest, (463..500).collect::<Vec<_>>());
    }

    #[test]
    fn test_random_skip() {
        let mut rng = ChaChaRng::seed_from_u64(18);
        for (block_size, len) in [(64, 1000), (128, 128), (256, 5000)] {
            let vals = gen_blocky_values(len, block_size, len as u64 + 1);
            let bytes = write_all(&vals, block_size);

            let mut input = &bytes[..];
            let mut reader = BlockPackedReader::new(&mut input, block_size, len as u64).unwrap();
            let mut k = 0;
            loop {
                let skip = rng.gen_range(0..=(len - k).min(3 * block_size));
                reader.skip_values(skip as u64).unwrap();
                k += skip;
                assert_eq!(reader.ord(), k as u64);
                if k == len {
                    break;
                }
                assert_eq!(reader.next().transpose().unwrap(), Some(vals[k]), "k={k}");
                k += 1;
            }
            assert!(reader.skip_values(1).is_err());
            drop(reader);
            assert!(input.is_empty());
        }
    }

    #[test]
    fn test_skip_sources() {
        let vals = gen_blocky_values(2000, 64, 3);
        let bytes = write_all(&vals, 64);

        let mut reader = BlockPackedReader::new(Cursor::new(&bytes), 64, 2000).unwrap();
        reader.skip_values(1000).unwrap();
        assert_eq!(reader.next().transpose().unwrap(), Some(vals[1000]));
        reader.skip_values(998).unwrap();
        assert_eq!(reader.next().transpose().unwrap(), Some(vals[1999]));
        assert_eq!(reader.into_inner().position(), bytes.len() as u64);

        let mut reader = BlockPackedReader::new(ReadInput::new(&bytes[..]), 64, 2000).unwrap();
        reader.skip_values(1999).unwrap();
        assert_eq!(reader.next().transpose().unwrap(), Some(vals[1999]));
        assert!(reader.into_inner().into_inner().is_empty());
    }

    #[test]
    fn test_skip_too_far() {
        let bytes = write_all(&[1, 2, 3], 64);
        let mut reader = BlockPackedReader::new(&bytes[..], 64, 3).unwrap();
        reader.skip_values(1).unwrap();
        let e = reader.skip_values(3);
        assert_eq!(
            e.err().map(|x| x.to_string()),
            Some("count must be at most 2 values left, but got 3.".to_string())
        );
        assert_eq!(reader.ord(), 1);
    }

    #[test]
    fn test_next_chunk_exhausted() {
        let bytes = write_all(&[1], 64);
        let mut reader = BlockPackedReader::new(&bytes[..], 64, 1).unwrap();
        assert_eq!(reader.next_chunk(5).unwrap(), &[1]);
        let e = reader.next_chunk(5);
        assert_eq!(
            e.err().map(|x| x.to_string()),
            Some("All self.value_count()=1 values have been read.".to_string())
        );
    }

    #[test]
    fn test_corrupt_token() {
        let bytes = [65u8 << 1];
        let mut reader = BlockPackedReader::new(&bytes[..], 64, 10).unwrap();
        let e = reader.next().unwrap();
        assert_eq!(
            e.err().map(|x| x.to_string()),
            Some("bits_per_value must be at most 64, but got 65.".to_string())
        );
        let mut reader = BlockPackedReader::new(&bytes[..], 64, 1000).unwrap();
        let e = reader.skip_values(500).unwrap_err();
        assert!(matches!(e.downcast_ref::<Error>(), Some(Error::CorruptData(_))));
    }

    #[test]
    fn test_truncated_input() {
        let vals: Vec<u64> = (0..100).collect();
        let bytes = write_all(&vals, 64);
        let mut reader = BlockPackedReader::new(&bytes[..bytes.len() - 1], 64, 100).unwrap();
        let e = reader.find_map(|x| x.err()).unwrap();
        assert!(e.downcast_ref::<std::io::Error>().is_some());
    }
}
