//! Append-only buffers of integers compressed page by page.
//!
//! Values are accumulated in a pending page; once it holds `page_size` values,
//! it is sealed into a compressed page by a [`PageCodec`]:
//!
//! | Codec | Stored per page | Suited for |
//! | --- | --- | --- |
//! | [`DeltaCodec`] | minimum and packed `value - min` | values clustered in a narrow range |
//! | [`MonotonicCodec`] | base, slope and packed zig-zag residuals from the line | (nearly) monotone sequences |
//! | [`PlainCodec`] | packed values | small values |
#![cfg(target_pointer_width = "64")]

use std::marker::PhantomData;

use anyhow::Result;

use crate::packed::prelude::*;
use crate::packed::{FixedWidthArray, DEFAULT};
use crate::utils;
use crate::Error;

/// Default number of values per page.
pub const DEFAULT_PAGE_SIZE: usize = 1024;

/// Minimum number of values per page.
pub const MIN_PAGE_SIZE: usize = 64;

/// Maximum number of values per page.
pub const MAX_PAGE_SIZE: usize = 1 << 20;

const ITER_BUFFER_LEN: usize = 64;

/// Read-only compressed page.
pub trait SealedPage: RamBytesUsed {
    /// Returns the number of values in the page.
    fn len(&self) -> usize;

    /// Checks if the page is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the `i`-th value, or [`None`] if out of bounds.
    fn get(&self, i: usize) -> Option<u64>;

    /// Reads values starting at `i` into `buf`, returning how many were read.
    fn get_bulk(&self, i: usize, buf: &mut [u64]) -> usize;

    /// Returns the width of the packed payload, or 0 if the page stores no payload.
    fn bits_per_value(&self) -> usize;
}

/// Compression scheme sealing a full page of values.
pub trait PageCodec {
    /// Sealed page type.
    type Page: SealedPage;

    /// Compresses `values` into a page whose payload layout is chosen
    /// with `acceptable_overhead_ratio`.
    ///
    /// # Errors
    ///
    /// An error is returned if the payload cannot be allocated.
    fn seal(values: &[u64], acceptable_overhead_ratio: f32) -> Result<Self::Page>;
}

fn pack_page(values: &[u64], bits: usize, acceptable_overhead_ratio: f32) -> Result<FixedWidthArray> {
    let mut arr = FixedWidthArray::with_overhead(values.len(), bits, acceptable_overhead_ratio)?;
    let mut i = 0;
    while i < values.len() {
        i += arr.set_bulk(i, &values[i..])?;
    }
    Ok(arr)
}

fn payload_bytes(arr: &Option<FixedWidthArray>) -> usize {
    arr.as_ref().map_or(0, |a| {
        a.ram_bytes_used() - std::mem::size_of::<FixedWidthArray>()
    })
}

/// Codec storing the page minimum and the packed differences from it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeltaCodec;

/// Page sealed by [`DeltaCodec`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeltaPage {
    min: u64,
    deltas: Option<FixedWidthArray>,
    len: usize,
}

impl DeltaPage {
    /// Gets the minimum value in the page.
    pub const fn min(&self) -> u64 {
        self.min
    }
}

impl PageCodec for DeltaCodec {
    type Page = DeltaPage;

    fn seal(values: &[u64], acceptable_overhead_ratio: f32) -> Result<Self::Page> {
        let min = values.iter().copied().min().unwrap_or(0);
        let max = values.iter().copied().max().unwrap_or(0);
        let deltas = if max == min {
            None
        } else {
            let deltas: Vec<u64> = values.iter().map(|&v| v - min).collect();
            let bits = utils::bits_required(max - min);
            Some(pack_page(&deltas, bits, acceptable_overhead_ratio)?)
        };
        Ok(DeltaPage {
            min,
            deltas,
            len: values.len(),
        })
    }
}

impl SealedPage for DeltaPage {
    fn len(&self) -> usize {
        self.len
    }

    fn get(&self, i: usize) -> Option<u64> {
        if i >= self.len {
            return None;
        }
        match &self.deltas {
            Some(deltas) => deltas.get(i).map(|d| self.min + d),
            None => Some(self.min),
        }
    }

    fn get_bulk(&self, i: usize, buf: &mut [u64]) -> usize {
        if i >= self.len {
            return 0;
        }
        match &self.deltas {
            Some(deltas) => {
                let read = deltas.get_bulk(i, buf);
                buf[..read].iter_mut().for_each(|x| *x += self.min);
                read
            }
            None => {
                let read = buf.len().min(self.len - i);
                buf[..read].iter_mut().for_each(|x| *x = self.min);
                read
            }
        }
    }

    fn bits_per_value(&self) -> usize {
        self.deltas.as_ref().map_or(0, |d| d.bits_per_value())
    }
}

impl RamBytesUsed for DeltaPage {
    fn ram_bytes_used(&self) -> usize {
        std::mem::size_of::<Self>() + payload_bytes(&self.deltas)
    }
}

/// Codec storing each page as a line `base + slope * i` plus packed zig-zag residuals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MonotonicCodec;

/// Page sealed by [`MonotonicCodec`].
#[derive(Clone, Debug, PartialEq)]
pub struct MonotonicPage {
    base: u64,
    slope: f32,
    residuals: Option<FixedWidthArray>,
    len: usize,
}

impl MonotonicPage {
    /// Gets the first value in the page.
    pub const fn base(&self) -> u64 {
        self.base
    }

    /// Gets the average increment between consecutive values.
    pub const fn slope(&self) -> f32 {
        self.slope
    }

    #[inline(always)]
    fn predicted(base: u64, slope: f32, i: usize) -> u64 {
        // Float to integer casts saturate, so this is deterministic for any input.
        base.wrapping_add((slope * i as f32) as i64 as u64)
    }
}

impl PageCodec for MonotonicCodec {
    type Page = MonotonicPage;

    fn seal(values: &[u64], acceptable_overhead_ratio: f32) -> Result<Self::Page> {
        let base = values.first().copied().unwrap_or(0);
        let slope = if values.len() > 1 {
            let last = values[values.len() - 1];
            (last.wrapping_sub(base) as i64) as f32 / (values.len() - 1) as f32
        } else {
            0.0
        };
        let stored: Vec<u64> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let pred = MonotonicPage::predicted(base, slope, i);
                utils::zigzag_encode(v.wrapping_sub(pred) as i64)
            })
            .collect();
        let max = stored.iter().copied().max().unwrap_or(0);
        let residuals = if max == 0 {
            None
        } else {
            Some(pack_page(&stored, utils::bits_required(max), acceptable_overhead_ratio)?)
        };
        Ok(MonotonicPage {
            base,
            slope,
            residuals,
            len: values.len(),
        })
    }
}

impl SealedPage for MonotonicPage {
    fn len(&self) -> usize {
        self.len
    }

    fn get(&self, i: usize) -> Option<u64> {
        if i >= self.len {
            return None;
        }
        let residual = self.residuals.as_ref().map_or(Some(0), |r| r.get(i))?;
        let pred = Self::predicted(self.base, self.slope, i);
        Some(pred.wrapping_add(utils::zigzag_decode(residual) as u64))
    }

    fn get_bulk(&self, i: usize, buf: &mut [u64]) -> usize {
        if i >= self.len {
            return 0;
        }
        let read = match &self.residuals {
            Some(residuals) => residuals.get_bulk(i, buf),
            None => {
                let read = buf.len().min(self.len - i);
                buf[..read].iter_mut().for_each(|x| *x = 0);
                read
            }
        };
        for (j, x) in buf[..read].iter_mut().enumerate() {
            let pred = Self::predicted(self.base, self.slope, i + j);
            *x = pred.wrapping_add(utils::zigzag_decode(*x) as u64);
        }
        read
    }

    fn bits_per_value(&self) -> usize {
        self.residuals.as_ref().map_or(0, |r| r.bits_per_value())
    }
}

impl RamBytesUsed for MonotonicPage {
    fn ram_bytes_used(&self) -> usize {
        std::mem::size_of::<Self>() + payload_bytes(&self.residuals)
    }
}

/// Codec packing the values as they are.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlainCodec;

/// Page sealed by [`PlainCodec`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlainPage {
    values: FixedWidthArray,
}

impl PageCodec for PlainCodec {
    type Page = PlainPage;

    fn seal(values: &[u64], acceptable_overhead_ratio: f32) -> Result<Self::Page> {
        let max = values.iter().copied().max().unwrap_or(0);
        let values = pack_page(values, utils::bits_required(max), acceptable_overhead_ratio)?;
        Ok(PlainPage { values })
    }
}

impl SealedPage for PlainPage {
    fn len(&self) -> usize {
        self.values.len()
    }

    fn get(&self, i: usize) -> Option<u64> {
        self.values.get(i)
    }

    fn get_bulk(&self, i: usize, buf: &mut [u64]) -> usize {
        self.values.get_bulk(i, buf)
    }

    fn bits_per_value(&self) -> usize {
        self.values.bits_per_value()
    }
}

impl RamBytesUsed for PlainPage {
    fn ram_bytes_used(&self) -> usize {
        self.values.ram_bytes_used()
    }
}

/// Append-only sequence of integers, compressed page by page with codec `C`.
///
/// Reads are allowed at any time, including values in the not-yet-sealed page.
/// After [`Self::freeze()`], the buffer rejects further additions.
///
/// # Examples
///
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use packints::packed::MonotonicAppendBuffer;
///
/// let mut buf = MonotonicAppendBuffer::default();
/// for i in 0..3000 {
///     buf.add(i * 7 + i % 3)?;
/// }
/// buf.freeze()?;
///
/// assert_eq!(buf.len(), 3000);
/// assert_eq!(buf.num_pages(), 3);
/// assert_eq!(buf.get(1000), Some(7001));
/// assert!(buf.add(0).is_err());
/// # Ok(())
/// # }
/// ```
pub struct AppendBuffer<C: PageCodec> {
    pages: Vec<C::Page>,
    pending: Vec<u64>,
    len: usize,
    page_shift: usize,
    page_mask: usize,
    acceptable_overhead_ratio: f32,
    frozen: bool,
    _codec: PhantomData<C>,
}

/// Append buffer sealing pages with [`DeltaCodec`].
pub type DeltaAppendBuffer = AppendBuffer<DeltaCodec>;

/// Append buffer sealing pages with [`MonotonicCodec`].
pub type MonotonicAppendBuffer = AppendBuffer<MonotonicCodec>;

/// Append buffer sealing pages with [`PlainCodec`].
pub type PlainAppendBuffer = AppendBuffer<PlainCodec>;

impl<C: PageCodec> AppendBuffer<C> {
    /// Creates an empty buffer sealing pages of `page_size` values.
    ///
    /// # Errors
    ///
    /// An error [`Error::InvalidArgument`] is returned if `page_size` is not a power of two
    /// in `MIN_PAGE_SIZE..=MAX_PAGE_SIZE`.
    pub fn new(page_size: usize, acceptable_overhead_ratio: f32) -> Result<Self> {
        if !page_size.is_power_of_two() || !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(Error::invalid_argument(format!(
                "page_size must be a power of two in {MIN_PAGE_SIZE}..={MAX_PAGE_SIZE}, but got {page_size}."
            )));
        }
        Ok(Self::with_valid_page_size(page_size, acceptable_overhead_ratio))
    }

    fn with_valid_page_size(page_size: usize, acceptable_overhead_ratio: f32) -> Self {
        Self {
            pages: vec![],
            pending: Vec::with_capacity(page_size),
            len: 0,
            page_shift: page_size.trailing_zeros() as usize,
            page_mask: page_size - 1,
            acceptable_overhead_ratio,
            frozen: false,
            _codec: PhantomData,
        }
    }

    /// Appends `val`, sealing the pending page once it is full.
    ///
    /// # Errors
    ///
    /// An error [`Error::IllegalState`] is returned if the buffer is frozen.
    /// An error is returned if the full page cannot be sealed, leaving the buffer unchanged.
    pub fn add(&mut self, val: u64) -> Result<()> {
        if self.frozen {
            return Err(Error::illegal_state("This buffer is frozen."));
        }
        self.pending.push(val);
        if self.pending.len() == self.page_size() {
            if let Err(e) = self.seal_pending() {
                self.pending.pop();
                return Err(e);
            }
        }
        self.len += 1;
        Ok(())
    }

    /// Seals the pending values, if any, and rejects further additions.
    ///
    /// Freezing a frozen buffer does nothing.
    ///
    /// # Errors
    ///
    /// An error is returned if the pending page cannot be sealed.
    pub fn freeze(&mut self) -> Result<()> {
        if self.frozen {
            return Ok(());
        }
        if !self.pending.is_empty() {
            self.seal_pending()?;
        }
        self.pending = vec![];
        self.frozen = true;
        log::debug!(
            "AppendBuffer frozen with {} values in {} pages",
            self.len,
            self.pages.len()
        );
        Ok(())
    }

    fn seal_pending(&mut self) -> Result<()> {
        let page = C::seal(&self.pending, self.acceptable_overhead_ratio)?;
        log::trace!(
            "AppendBuffer seals page {} of {} values at {} bits per value",
            self.pages.len(),
            page.len(),
            page.bits_per_value()
        );
        self.pages.push(page);
        self.pending.clear();
        Ok(())
    }

    /// Returns the `pos`-th value, or [`None`] if out of bounds.
    pub fn get(&self, pos: usize) -> Option<u64> {
        if pos >= self.len {
            return None;
        }
        let (page, offset) = (pos >> self.page_shift, pos & self.page_mask);
        match self.pages.get(page) {
            Some(p) => p.get(offset),
            None => self.pending.get(offset).copied(),
        }
    }

    /// Reads values starting at `pos` into `buf`, returning how many were read.
    ///
    /// Never reads past the end of the page containing `pos`.
    pub fn get_bulk(&self, pos: usize, buf: &mut [u64]) -> usize {
        if pos >= self.len {
            return 0;
        }
        let (page, offset) = (pos >> self.page_shift, pos & self.page_mask);
        match self.pages.get(page) {
            Some(p) => p.get_bulk(offset, buf),
            None => {
                let read = buf.len().min(self.pending.len() - offset);
                buf[..read].copy_from_slice(&self.pending[offset..offset + read]);
                read
            }
        }
    }

    /// Creates an iterator for enumerating values.
    pub fn iter(&self) -> Iter<C> {
        Iter::new(self)
    }

    /// Gets the number of values added.
    #[inline(always)]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Checks if no value has been added.
    #[inline(always)]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Gets the number of values per page.
    pub const fn page_size(&self) -> usize {
        self.page_mask + 1
    }

    /// Gets the number of sealed pages.
    pub fn num_pages(&self) -> usize {
        self.pages.len()
    }

    /// Gets the `i`-th sealed page, or [`None`] if out of bounds.
    pub fn page(&self, i: usize) -> Option<&C::Page> {
        self.pages.get(i)
    }

    /// Checks if the buffer is frozen.
    pub const fn is_frozen(&self) -> bool {
        self.frozen
    }
}

impl<C: PageCodec> Default for AppendBuffer<C> {
    /// Creates an empty buffer with [`DEFAULT_PAGE_SIZE`] and [`DEFAULT`].
    fn default() -> Self {
        Self::with_valid_page_size(DEFAULT_PAGE_SIZE, DEFAULT)
    }
}

impl<C: PageCodec> NumVals for AppendBuffer<C> {
    fn num_vals(&self) -> usize {
        self.len()
    }
}

impl<C: PageCodec> Access for AppendBuffer<C> {
    fn access(&self, pos: usize) -> Option<u64> {
        self.get(pos)
    }

    fn access_bulk(&self, pos: usize, buf: &mut [u64]) -> usize {
        self.get_bulk(pos, buf)
    }
}

impl<C: PageCodec> RamBytesUsed for AppendBuffer<C> {
    fn ram_bytes_used(&self) -> usize {
        let spare = self.pages.capacity() - self.pages.len();
        std::mem::size_of::<Self>()
            + spare * std::mem::size_of::<C::Page>()
            + self.pages.iter().map(|p| p.ram_bytes_used()).sum::<usize>()
            + self.pending.capacity() * std::mem::size_of::<u64>()
    }
}

impl<C: PageCodec> std::fmt::Debug for AppendBuffer<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppendBuffer")
            .field("len", &self.len)
            .field("page_size", &self.page_size())
            .field("num_pages", &self.pages.len())
            .field("num_pending", &self.pending.len())
            .field("frozen", &self.frozen)
            .finish()
    }
}

/// Iterator for enumerating values, created by [`AppendBuffer::iter()`].
pub struct Iter<'a, C: PageCodec> {
    buffer: &'a AppendBuffer<C>,
    pos: usize,
    buf: [u64; ITER_BUFFER_LEN],
    buf_pos: usize,
    buf_len: usize,
}

impl<'a, C: PageCodec> Iter<'a, C> {
    /// Creates a new iterator.
    pub const fn new(buffer: &'a AppendBuffer<C>) -> Self {
        Self {
            buffer,
            pos: 0,
            buf: [0; ITER_BUFFER_LEN],
            buf_pos: 0,
            buf_len: 0,
        }
    }
}

impl<C: PageCodec> Iterator for Iter<'_, C> {
    type Item = u64;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buf_pos == self.buf_len {
            self.buf_len = self.buffer.get_bulk(self.pos, &mut self.buf);
            self.buf_pos = 0;
            self.pos += self.buf_len;
            if self.buf_len == 0 {
                return None;
            }
        }
        let x = self.buf[self.buf_pos];
        self.buf_pos += 1;
        Some(x)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rest = self.buffer.len() - self.pos + (self.buf_len - self.buf_pos);
        (rest, Some(rest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaChaRng;

    use crate::packed::{COMPACT, FASTEST};

    fn check_buffer<C: PageCodec>(buffer: &AppendBuffer<C>, expected: &[u64]) {
        assert_eq!(buffer.len(), expected.len());
        for (i, &x) in expected.iter().enumerate() {
            assert_eq!(buffer.get(i), Some(x), "i={i}");
        }
        assert_eq!(buffer.get(expected.len()), None);
        assert_eq!(buffer.iter().collect::<Vec<_>>(), expected);
        let mut buf = vec![0; 100];
        let mut pos = 0;
        while pos < expected.len() {
            let read = buffer.get_bulk(pos, &mut buf);
            assert!(read >= 1);
            assert_eq!(&buf[..read], &expected[pos..pos + read]);
            pos += read;
        }
    }

    fn test_random<C: PageCodec>(gen: impl Fn(&mut ChaChaRng, usize) -> u64) {
        let mut rng = ChaChaRng::seed_from_u64(1234);
        for (page_size, ratio) in [(64, COMPACT), (128, DEFAULT), (1024, FASTEST)] {
            let mut buffer = AppendBuffer::<C>::new(page_size, ratio).unwrap();
            let mut expected = vec![];
            for i in 0..2500 {
                let x = gen(&mut rng, i);
                buffer.add(x).unwrap();
                expected.push(x);
            }
            assert_eq!(buffer.num_pages(), 2500 / page_size);
            check_buffer(&buffer, &expected);
            buffer.freeze().unwrap();
            assert_eq!(buffer.num_pages(), (2500 + page_size - 1) / page_size);
            check_buffer(&buffer, &expected);
        }
    }

    #[test]
    fn test_delta_random() {
        test_random::<DeltaCodec>(|rng, i| match i % 500 {
            0 => u64::MAX,
            1 => 0,
            _ => 1_000_000 + rng.gen_range(0..1000),
        });
    }

    #[test]
    fn test_monotonic_random() {
        test_random::<MonotonicCodec>(|rng, i| match i % 700 {
            0 => u64::MAX,
            1 => 0,
            _ => (i as u64) * 1000 + rng.gen_range(0..50),
        });
    }

    #[test]
    fn test_plain_random() {
        test_random::<PlainCodec>(|rng, _| rng.gen::<u64>() >> rng.gen_range(0..64));
    }

    #[test]
    fn test_delta_constant_page() {
        let mut buffer = DeltaAppendBuffer::new(64, COMPACT).unwrap();
        for _ in 0..4 {
            buffer.add(5).unwrap();
        }
        buffer.freeze().unwrap();
        let page = buffer.page(0).unwrap();
        assert_eq!(page.bits_per_value(), 0);
        assert_eq!(page.min(), 5);
        check_buffer(&buffer, &[5, 5, 5, 5]);
    }

    #[test]
    fn test_delta_width() {
        let mut buffer = DeltaAppendBuffer::new(64, COMPACT).unwrap();
        for x in [10, 1, 1000, 7] {
            buffer.add(x).unwrap();
        }
        buffer.freeze().unwrap();
        let page = buffer.page(0).unwrap();
        assert_eq!(page.min(), 1);
        assert_eq!(page.bits_per_value(), utils::bits_required(999));
        assert_eq!(page.bits_per_value(), 10);
        check_buffer(&buffer, &[10, 1, 1000, 7]);
    }

    #[test]
    fn test_monotonic_linear() {
        let mut buffer = MonotonicAppendBuffer::new(128, COMPACT).unwrap();
        let expected: Vec<u64> = (0..100).map(|i| i * 10).collect();
        for &x in &expected {
            buffer.add(x).unwrap();
        }
        buffer.freeze().unwrap();
        let page = buffer.page(0).unwrap();
        assert!(page.bits_per_value() <= 1);
        assert_eq!(page.slope(), 10.0);
        check_buffer(&buffer, &expected);
    }

    #[test]
    fn test_monotonic_single_value_page() {
        let mut buffer = MonotonicAppendBuffer::new(64, COMPACT).unwrap();
        for i in 0..65 {
            buffer.add(i * 3).unwrap();
        }
        buffer.freeze().unwrap();
        let page = buffer.page(1).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page.slope(), 0.0);
        assert_eq!(page.base(), 192);
        assert_eq!(buffer.get(64), Some(192));
    }

    #[test]
    fn test_eager_sealing() {
        let mut buffer = PlainAppendBuffer::new(64, COMPACT).unwrap();
        for i in 0..64 {
            assert_eq!(buffer.num_pages(), 0);
            buffer.add(i).unwrap();
        }
        assert_eq!(buffer.num_pages(), 1);
        assert_eq!(buffer.page(0).unwrap().bits_per_value(), 6);
    }

    #[test]
    fn test_add_after_freeze() {
        let mut buffer = DeltaAppendBuffer::default();
        buffer.add(1).unwrap();
        buffer.freeze().unwrap();
        buffer.freeze().unwrap();
        assert!(buffer.is_frozen());
        let e = buffer.add(2);
        assert_eq!(
            e.err().map(|x| x.to_string()),
            Some("This buffer is frozen.".to_string())
        );
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_freeze_empty() {
        let mut buffer = MonotonicAppendBuffer::default();
        buffer.freeze().unwrap();
        assert!(buffer.is_empty());
        assert_eq!(buffer.num_pages(), 0);
        assert_eq!(buffer.iter().next(), None);
    }

    #[test]
    fn test_page_size_invalid() {
        let e = PlainAppendBuffer::new(1 << 21, COMPACT);
        assert_eq!(
            e.err().map(|x| x.to_string()),
            Some("page_size must be a power of two in 64..=1048576, but got 2097152.".to_string())
        );
    }

    #[test]
    fn test_ram_bytes_used_shrinks_on_freeze() {
        let mut buffer = DeltaAppendBuffer::new(1024, COMPACT).unwrap();
        for i in 0..100 {
            buffer.add(i).unwrap();
        }
        let before = buffer.ram_bytes_used();
        buffer.freeze().unwrap();
        assert!(buffer.ram_bytes_used() < before);
    }

    struct NoMaxCodec;

    impl PageCodec for NoMaxCodec {
        type Page = PlainPage;

        fn seal(values: &[u64], acceptable_overhead_ratio: f32) -> Result<Self::Page> {
            if values.contains(&u64::MAX) {
                return Err(Error::invalid_argument("u64::MAX is not accepted."));
            }
            PlainCodec::seal(values, acceptable_overhead_ratio)
        }
    }

    #[test]
    fn test_failed_seal_leaves_buffer_unchanged() {
        let mut buffer = AppendBuffer::<NoMaxCodec>::new(64, COMPACT).unwrap();
        for i in 0..63 {
            buffer.add(i).unwrap();
        }
        let e = buffer.add(u64::MAX);
        assert_eq!(
            e.err().map(|x| x.to_string()),
            Some("u64::MAX is not accepted.".to_string())
        );
        assert_eq!(buffer.len(), 63);
        assert_eq!(buffer.get(63), None);

        buffer.add(63).unwrap();
        buffer.add(64).unwrap();
        check_buffer(&buffer, &(0..65).collect::<Vec<_>>());
    }
}
