//! Packed array whose width widens on demand.
#![cfg(target_pointer_width = "64")]

use anyhow::Result;

use crate::packed::prelude::*;
use crate::packed::{
    check_pos, check_range, copy_with_buffer, FixedWidthArray, Format, DEFAULT_BUFFER_SIZE,
};
use crate::utils;

/// Packed array of fixed length that widens its values as larger ones are written.
///
/// Writing a value that does not fit the current width rebuilds the backing
/// [`FixedWidthArray`] at the width the value requires, choosing the layout with
/// the acceptable overhead ratio given at construction.
/// The width never shrinks.
///
/// # Examples
///
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use packints::packed::{GrowableArray, COMPACT};
///
/// let mut arr = GrowableArray::new(3, 2, COMPACT)?;
/// assert_eq!(arr.bits_per_value(), 2);
///
/// arr.set(1, 1000)?;
/// assert_eq!(arr.bits_per_value(), 10);
/// assert_eq!(arr.get(1), Some(1000));
/// # Ok(())
/// # }
/// ```
#[derive(Clone, PartialEq)]
pub struct GrowableArray {
    current: FixedWidthArray,
    mask: u64,
    acceptable_overhead_ratio: f32,
}

impl GrowableArray {
    /// Creates a zero-filled array of `len` values starting at `start_bits_per_value` bits.
    ///
    /// # Errors
    ///
    /// An error [`Error::InvalidArgument`](crate::Error::InvalidArgument) is returned
    /// if `start_bits_per_value` is not in `1..=64`.
    pub fn new(len: usize, start_bits_per_value: usize, acceptable_overhead_ratio: f32) -> Result<Self> {
        let current =
            FixedWidthArray::with_overhead(len, start_bits_per_value, acceptable_overhead_ratio)?;
        Ok(Self::from_fixed(current, acceptable_overhead_ratio))
    }

    fn from_fixed(current: FixedWidthArray, acceptable_overhead_ratio: f32) -> Self {
        let mask = utils::max_value(current.bits_per_value());
        Self {
            current,
            mask,
            acceptable_overhead_ratio,
        }
    }

    /// Returns the `pos`-th value, or [`None`] if out of bounds.
    #[inline(always)]
    pub fn get(&self, pos: usize) -> Option<u64> {
        self.current.get(pos)
    }

    /// Sets the `pos`-th value to `val`, widening the array if `val` does not fit.
    ///
    /// # Errors
    ///
    /// An error [`Error::InvalidArgument`](crate::Error::InvalidArgument) is returned
    /// if `pos` is out of bounds, in which case the array is left untouched.
    pub fn set(&mut self, pos: usize, val: u64) -> Result<()> {
        check_pos(pos, self.len())?;
        self.ensure_capacity(val)?;
        self.current.set(pos, val)
    }

    /// Reads values starting at `pos` into `buf`, returning how many were read.
    pub fn get_bulk(&self, pos: usize, buf: &mut [u64]) -> usize {
        self.current.get_bulk(pos, buf)
    }

    /// Writes `vals` starting at `pos`, returning how many were written.
    ///
    /// The array is widened once to fit all of `vals` before writing.
    ///
    /// # Errors
    ///
    /// An error [`Error::InvalidArgument`](crate::Error::InvalidArgument) is returned
    /// if `pos` is out of bounds.
    pub fn set_bulk(&mut self, pos: usize, vals: &[u64]) -> Result<usize> {
        check_pos(pos, self.len())?;
        let max = vals.iter().fold(0, |acc, &x| acc | x);
        self.ensure_capacity(max)?;
        self.current.set_bulk(pos, vals)
    }

    /// Sets the values in `from..to` to `val`, widening the array if `val` does not fit.
    ///
    /// # Errors
    ///
    /// An error [`Error::InvalidArgument`](crate::Error::InvalidArgument) is returned
    /// if `from..to` is out of bounds.
    pub fn fill(&mut self, from: usize, to: usize, val: u64) -> Result<()> {
        check_range(from, to, self.len())?;
        self.ensure_capacity(val)?;
        self.current.fill(from, to, val)
    }

    /// Resets all values to zero, keeping the current width.
    pub fn clear(&mut self) {
        self.current.clear();
    }

    /// Returns a copy with `new_len` values at the current width,
    /// keeping the leading `min(len, new_len)` values.
    ///
    /// # Examples
    ///
    /// ```
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// use packints::packed::{GrowableArray, DEFAULT};
    ///
    /// let mut arr = GrowableArray::new(2, 1, DEFAULT)?;
    /// arr.set(0, 5)?;
    /// arr.set(1, 6)?;
    ///
    /// let longer = arr.resize(4)?;
    /// assert_eq!(longer.len(), 4);
    /// assert_eq!(longer.get(1), Some(6));
    /// assert_eq!(longer.get(3), Some(0));
    /// # Ok(())
    /// # }
    /// ```
    pub fn resize(&self, new_len: usize) -> Result<Self> {
        let mut next = Self::new(new_len, self.bits_per_value(), self.acceptable_overhead_ratio)?;
        let len = self.len().min(new_len);
        if len > 0 {
            let mut buf = vec![0; len.min(DEFAULT_BUFFER_SIZE / 8)];
            copy_with_buffer(&self.current, 0, &mut next.current, 0, len, &mut buf)?;
        }
        Ok(next)
    }

    /// Gets the number of values.
    #[inline(always)]
    pub const fn len(&self) -> usize {
        self.current.len()
    }

    /// Checks if the array is empty.
    #[inline(always)]
    pub const fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// Gets the current number of bits per value.
    #[inline(always)]
    pub const fn bits_per_value(&self) -> usize {
        self.current.bits_per_value()
    }

    /// Gets the current layout.
    pub const fn format(&self) -> Format {
        self.current.format()
    }

    /// Gets the acceptable overhead ratio used when widening.
    pub const fn acceptable_overhead_ratio(&self) -> f32 {
        self.acceptable_overhead_ratio
    }

    /// Gets the backing array.
    pub const fn as_fixed(&self) -> &FixedWidthArray {
        &self.current
    }

    /// Creates an iterator for enumerating values.
    pub fn iter(&self) -> crate::packed::fixed_width_array::Iter {
        self.current.iter()
    }

    fn ensure_capacity(&mut self, value: u64) -> Result<()> {
        if value & self.mask == value {
            return Ok(());
        }
        let bits_required = utils::bits_required(value);
        let mut next = FixedWidthArray::with_overhead(
            self.len(),
            bits_required,
            self.acceptable_overhead_ratio,
        )?;
        let len = self.len();
        if len > 0 {
            let mut buf = vec![0; len.min(DEFAULT_BUFFER_SIZE / 8)];
            copy_with_buffer(&self.current, 0, &mut next, 0, len, &mut buf)?;
        }
        log::debug!(
            "GrowableArray of {len} values grows from {} to {} bits per value",
            self.current.bits_per_value(),
            next.bits_per_value()
        );
        self.current = next;
        self.mask = utils::max_value(self.current.bits_per_value());
        Ok(())
    }
}

impl NumVals for GrowableArray {
    fn num_vals(&self) -> usize {
        self.len()
    }
}

impl Access for GrowableArray {
    fn access(&self, pos: usize) -> Option<u64> {
        self.get(pos)
    }

    fn access_bulk(&self, pos: usize, buf: &mut [u64]) -> usize {
        self.get_bulk(pos, buf)
    }
}

impl Update for GrowableArray {
    fn bits_per_value(&self) -> usize {
        self.current.bits_per_value()
    }

    fn update(&mut self, pos: usize, val: u64) -> Result<()> {
        self.set(pos, val)
    }

    fn update_bulk(&mut self, pos: usize, vals: &[u64]) -> Result<usize> {
        self.set_bulk(pos, vals)
    }

    fn fill(&mut self, from: usize, to: usize, val: u64) -> Result<()> {
        GrowableArray::fill(self, from, to, val)
    }

    fn clear(&mut self) {
        GrowableArray::clear(self)
    }
}

impl RamBytesUsed for GrowableArray {
    fn ram_bytes_used(&self) -> usize {
        std::mem::size_of::<Self>() - std::mem::size_of::<FixedWidthArray>()
            + self.current.ram_bytes_used()
    }
}

impl std::fmt::Debug for GrowableArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrowableArray")
            .field("current", &self.current)
            .field("acceptable_overhead_ratio", &self.acceptable_overhead_ratio)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaChaRng;

    use crate::packed::{COMPACT, DEFAULT, FAST, FASTEST};

    #[test]
    fn test_matches_presized() {
        let mut rng = ChaChaRng::seed_from_u64(13);
        for ratio in [COMPACT, DEFAULT, FAST, FASTEST] {
            let vals: Vec<u64> = (0..1000)
                .map(|i| rng.gen::<u64>() >> (64 - 1 - (i % 40)))
                .collect();
            let mut arr = GrowableArray::new(vals.len(), 1, ratio).unwrap();
            for (i, &v) in vals.iter().enumerate() {
                arr.set(i, v).unwrap();
            }
            assert_eq!(arr.iter().collect::<Vec<_>>(), vals, "ratio={ratio}");
            if ratio == COMPACT {
                let max = vals.iter().copied().max().unwrap();
                let mut presized =
                    FixedWidthArray::new(vals.len(), utils::bits_required(max)).unwrap();
                let mut pos = 0;
                while pos < vals.len() {
                    pos += presized.set_bulk(pos, &vals[pos..]).unwrap();
                }
                assert_eq!(arr.as_fixed(), &presized);
            }
        }
    }

    #[test]
    fn test_width_monotone() {
        let mut arr = GrowableArray::new(4, 1, COMPACT).unwrap();
        arr.set(0, 1 << 20).unwrap();
        assert_eq!(arr.bits_per_value(), 21);
        arr.set(0, 1).unwrap();
        assert_eq!(arr.bits_per_value(), 21);
        arr.set(3, u64::MAX).unwrap();
        assert_eq!(arr.bits_per_value(), 64);
        assert_eq!(arr.iter().collect::<Vec<_>>(), vec![1, 0, 0, u64::MAX]);
    }

    #[test]
    fn test_bulk_and_fill() {
        let mut arr = GrowableArray::new(10, 2, COMPACT).unwrap();
        assert_eq!(arr.set_bulk(2, &[1, 2, 300]).unwrap(), 3);
        assert_eq!(arr.bits_per_value(), 9);
        arr.fill(6, 10, 1 << 12).unwrap();
        assert_eq!(arr.bits_per_value(), 13);
        assert_eq!(
            arr.iter().collect::<Vec<_>>(),
            vec![0, 0, 1, 2, 300, 0, 4096, 4096, 4096, 4096]
        );
        arr.clear();
        assert!(arr.iter().all(|x| x == 0));
        assert_eq!(arr.bits_per_value(), 13);
    }

    #[test]
    fn test_resize() {
        let mut arr = GrowableArray::new(5, 3, DEFAULT).unwrap();
        arr.set_bulk(0, &[1, 2, 3, 4, 5]).unwrap();
        let shorter = arr.resize(2).unwrap();
        assert_eq!(shorter.iter().collect::<Vec<_>>(), vec![1, 2]);
        let longer = arr.resize(7).unwrap();
        assert_eq!(longer.iter().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5, 0, 0]);
        assert_eq!(longer.bits_per_value(), arr.bits_per_value());
    }

    #[test]
    fn test_set_oob_keeps_width() {
        let mut arr = GrowableArray::new(2, 2, COMPACT).unwrap();
        let e = arr.set(2, 1000);
        assert_eq!(
            e.err().map(|x| x.to_string()),
            Some("pos must be less than self.len()=2, but got 2.".to_string())
        );
        assert_eq!(arr.bits_per_value(), 2);
    }

    #[test]
    fn test_fill_oob() {
        let mut arr = GrowableArray::new(2, 2, COMPACT).unwrap();
        let e = arr.fill(1, 3, 1000);
        assert_eq!(
            e.err().map(|x| x.to_string()),
            Some("from..to must be within 0..2, but got 1..3.".to_string())
        );
        assert_eq!(arr.bits_per_value(), 2);
    }

    #[test]
    fn test_empty() {
        let mut arr = GrowableArray::new(0, 4, DEFAULT).unwrap();
        assert!(arr.is_empty());
        assert_eq!(arr.get(0), None);
        arr.fill(0, 0, 0).unwrap();
        assert!(arr.set(0, 1).is_err());
    }
}
