//! Random-access packed array split into fixed-capacity pages.
#![cfg(target_pointer_width = "64")]

use std::fmt::Debug;

use anyhow::Result;

use crate::packed::prelude::*;
use crate::packed::{
    check_pos, check_range, copy_with_buffer, fastest_format_and_bits, FixedWidthArray, Format,
    GrowableArray, DEFAULT_BUFFER_SIZE,
};
use crate::Error;

/// Minimum number of values per page.
pub const MIN_PAGE_SIZE: usize = 64;

/// Maximum number of values per page.
pub const MAX_PAGE_SIZE: usize = 1 << 30;

/// Packed array that can serve as a page of [`PagedArray`].
pub trait Page: Update + RamBytesUsed + Sized {
    /// Layout parameters shared by all pages of an array.
    type Params: Copy + PartialEq + Debug;

    /// Resolves the shared parameters and the actual base width of pages
    /// storing `bits_per_value` bits under `acceptable_overhead_ratio`.
    ///
    /// # Errors
    ///
    /// An error [`Error::InvalidArgument`] is returned if `bits_per_value` is not in `1..=64`.
    fn page_params(
        bits_per_value: usize,
        acceptable_overhead_ratio: f32,
    ) -> Result<(Self::Params, usize)>;

    /// Creates a zero-filled page of `len` values.
    ///
    /// # Errors
    ///
    /// An error [`Error::InvalidArgument`] is returned if the parameters are unsupported.
    fn new_page(params: Self::Params, len: usize, bits_per_value: usize) -> Result<Self>;
}

impl Page for FixedWidthArray {
    type Params = Format;

    fn page_params(
        bits_per_value: usize,
        acceptable_overhead_ratio: f32,
    ) -> Result<(Self::Params, usize)> {
        let fb = fastest_format_and_bits(bits_per_value, acceptable_overhead_ratio)?;
        Ok((fb.format, fb.bits_per_value))
    }

    fn new_page(params: Self::Params, len: usize, bits_per_value: usize) -> Result<Self> {
        Self::with_format(len, params, bits_per_value)
    }
}

impl Page for GrowableArray {
    type Params = f32;

    fn page_params(
        bits_per_value: usize,
        acceptable_overhead_ratio: f32,
    ) -> Result<(Self::Params, usize)> {
        // Validates the width only; each page picks its own layout as it widens.
        fastest_format_and_bits(bits_per_value, acceptable_overhead_ratio)?;
        Ok((acceptable_overhead_ratio, bits_per_value))
    }

    fn new_page(params: Self::Params, len: usize, bits_per_value: usize) -> Result<Self> {
        Self::new(len, bits_per_value, params)
    }
}

/// Random-access packed array of arbitrary length, made of pages of `page_size` values.
///
/// Every page but the last holds exactly `page_size` values.
/// Since the page size is a power of two, a position maps to its page by shifting and masking.
///
/// # Examples
///
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use packints::packed::{PagedMutable, COMPACT};
///
/// let mut arr = PagedMutable::new(1000, 256, 10, COMPACT)?;
/// assert_eq!(arr.num_pages(), 4);
///
/// arr.set(700, 1023)?;
/// assert_eq!(arr.get(700), Some(1023));
/// assert_eq!(arr.get(1000), None);
///
/// arr.grow(1500)?;
/// assert!(arr.len() >= 1500);
/// assert_eq!(arr.get(700), Some(1023));
/// # Ok(())
/// # }
/// ```
#[derive(Clone, PartialEq)]
pub struct PagedArray<P: Page> {
    pages: Vec<P>,
    len: usize,
    page_shift: usize,
    page_mask: usize,
    bits_per_value: usize,
    params: P::Params,
}

/// Paged array of fixed width.
pub type PagedMutable = PagedArray<FixedWidthArray>;

/// Paged array whose pages widen independently as larger values are written.
pub type PagedGrowableArray = PagedArray<GrowableArray>;

impl<P: Page> PagedArray<P> {
    /// Creates a zero-filled array of `len` values split into pages of `page_size` values.
    ///
    /// # Errors
    ///
    /// An error [`Error::InvalidArgument`] is returned if
    ///
    /// - `page_size` is not a power of two in `MIN_PAGE_SIZE..=MAX_PAGE_SIZE`, or
    /// - `bits_per_value` is not in `1..=64`.
    pub fn new(
        len: usize,
        page_size: usize,
        bits_per_value: usize,
        acceptable_overhead_ratio: f32,
    ) -> Result<Self> {
        check_page_size(page_size)?;
        let (params, bits_per_value) = P::page_params(bits_per_value, acceptable_overhead_ratio)?;
        Self::with_params(len, page_size, bits_per_value, params)
    }

    fn with_params(
        len: usize,
        page_size: usize,
        bits_per_value: usize,
        params: P::Params,
    ) -> Result<Self> {
        let num_pages = (len + page_size - 1) / page_size;
        let mut pages = Vec::with_capacity(num_pages);
        for i in 0..num_pages {
            let page_len = if i + 1 == num_pages {
                len - i * page_size
            } else {
                page_size
            };
            pages.push(P::new_page(params, page_len, bits_per_value)?);
        }
        Ok(Self {
            pages,
            len,
            page_shift: page_size.trailing_zeros() as usize,
            page_mask: page_size - 1,
            bits_per_value,
            params,
        })
    }

    /// Creates a zero-filled array of `new_len` values with the same page size
    /// and page parameters as `self`.
    ///
    /// # Errors
    ///
    /// An error [`Error::InvalidArgument`] is returned if the page parameters are rejected.
    pub fn new_unfilled_copy(&self, new_len: usize) -> Result<Self> {
        Self::with_params(new_len, self.page_size(), self.bits_per_value, self.params)
    }

    /// Returns the `pos`-th value, or [`None`] if out of bounds.
    ///
    /// # Complexity
    ///
    /// Constant
    #[inline(always)]
    pub fn get(&self, pos: usize) -> Option<u64> {
        self.pages
            .get(pos >> self.page_shift)
            .and_then(|page| page.access(pos & self.page_mask))
    }

    /// Sets the `pos`-th value to `val`.
    ///
    /// # Errors
    ///
    /// An error [`Error::InvalidArgument`] is returned if `pos` is out of bounds
    /// or the page cannot store `val`.
    #[inline(always)]
    pub fn set(&mut self, pos: usize, val: u64) -> Result<()> {
        check_pos(pos, self.len)?;
        self.pages[pos >> self.page_shift].update(pos & self.page_mask, val)
    }

    /// Reads values starting at `pos` into `buf`, returning how many were read.
    ///
    /// Never reads past the end of the page containing `pos`.
    pub fn get_bulk(&self, pos: usize, buf: &mut [u64]) -> usize {
        self.pages
            .get(pos >> self.page_shift)
            .map_or(0, |page| page.access_bulk(pos & self.page_mask, buf))
    }

    /// Writes `vals` starting at `pos`, returning how many were written.
    ///
    /// Never writes past the end of the page containing `pos`.
    ///
    /// # Errors
    ///
    /// An error [`Error::InvalidArgument`] is returned if `pos` is out of bounds
    /// or the page cannot store a value.
    pub fn set_bulk(&mut self, pos: usize, vals: &[u64]) -> Result<usize> {
        check_pos(pos, self.len)?;
        self.pages[pos >> self.page_shift].update_bulk(pos & self.page_mask, vals)
    }

    /// Sets the values in `from..to` to `val`.
    ///
    /// # Errors
    ///
    /// An error [`Error::InvalidArgument`] is returned if `from..to` is out of bounds
    /// or the pages cannot store `val`.
    pub fn fill(&mut self, mut from: usize, to: usize, val: u64) -> Result<()> {
        check_range(from, to, self.len)?;
        while from < to {
            let page = &mut self.pages[from >> self.page_shift];
            let offset = from & self.page_mask;
            let end = page.num_vals().min(offset + to - from);
            page.fill(offset, end, val)?;
            from += end - offset;
        }
        Ok(())
    }

    /// Resets all values to zero.
    pub fn clear(&mut self) {
        self.pages.iter_mut().for_each(|p| p.clear());
    }

    /// Returns a copy with `new_len` values, keeping the leading `min(len, new_len)` values.
    ///
    /// Each new page starts at the base width and receives the overlapping
    /// values of the page at the same index.
    ///
    /// # Errors
    ///
    /// An error [`Error::InvalidArgument`] is returned if a new page cannot store
    /// a copied value.
    pub fn resized(&self, new_len: usize) -> Result<Self> {
        let mut copy = self.new_unfilled_copy(new_len)?;
        let mut buf = vec![0; DEFAULT_BUFFER_SIZE / 8];
        for (old, new) in self.pages.iter().zip(copy.pages.iter_mut()) {
            let len = old.num_vals().min(new.num_vals());
            if len > 0 {
                copy_with_buffer(old, 0, new, 0, len, &mut buf)?;
            }
        }
        Ok(copy)
    }

    /// Changes the number of values to `new_len`, keeping the leading `min(len, new_len)` values.
    ///
    /// The array is left untouched on error.
    ///
    /// # Errors
    ///
    /// See [`Self::resized()`].
    pub fn resize(&mut self, new_len: usize) -> Result<()> {
        let copy = self.resized(new_len)?;
        log::debug!(
            "PagedArray resizes from {} to {new_len} values ({} pages of {})",
            self.len,
            copy.num_pages(),
            self.page_size()
        );
        *self = copy;
        Ok(())
    }

    /// Makes room for at least `min_len` values.
    ///
    /// Does nothing if the array is long enough; otherwise resizes to
    /// `min_len + max(3, min_len / 8)` values so that repeated growth is amortized.
    ///
    /// # Errors
    ///
    /// See [`Self::resized()`].
    pub fn grow(&mut self, min_len: usize) -> Result<()> {
        if min_len <= self.len {
            return Ok(());
        }
        let extra = (min_len >> 3).max(3);
        self.resize(min_len + extra)
    }

    /// Makes room for one more value (same as `grow(len + 1)`).
    ///
    /// # Errors
    ///
    /// See [`Self::resized()`].
    pub fn grow_one(&mut self) -> Result<()> {
        self.grow(self.len + 1)
    }

    /// Creates an iterator for enumerating values.
    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        (0..self.len).filter_map(move |i| self.get(i))
    }

    /// Gets the number of values.
    #[inline(always)]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Checks if the array is empty.
    #[inline(always)]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Gets the number of values per page.
    #[inline(always)]
    pub const fn page_size(&self) -> usize {
        self.page_mask + 1
    }

    /// Gets the number of pages.
    pub fn num_pages(&self) -> usize {
        self.pages.len()
    }

    /// Gets the `i`-th page, or [`None`] if out of bounds.
    pub fn page(&self, i: usize) -> Option<&P> {
        self.pages.get(i)
    }

    /// Gets the base number of bits per value new pages start with.
    pub const fn bits_per_value(&self) -> usize {
        self.bits_per_value
    }
}

fn check_page_size(page_size: usize) -> Result<()> {
    if !page_size.is_power_of_two() || !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&page_size) {
        return Err(Error::invalid_argument(format!(
            "page_size must be a power of two in {MIN_PAGE_SIZE}..={MAX_PAGE_SIZE}, but got {page_size}."
        )));
    }
    Ok(())
}

impl<P: Page> NumVals for PagedArray<P> {
    fn num_vals(&self) -> usize {
        self.len()
    }
}

impl<P: Page> Access for PagedArray<P> {
    fn access(&self, pos: usize) -> Option<u64> {
        self.get(pos)
    }

    fn access_bulk(&self, pos: usize, buf: &mut [u64]) -> usize {
        self.get_bulk(pos, buf)
    }
}

impl<P: Page> Update for PagedArray<P> {
    /// Returns the base width of the pages.
    fn bits_per_value(&self) -> usize {
        self.bits_per_value
    }

    fn update(&mut self, pos: usize, val: u64) -> Result<()> {
        self.set(pos, val)
    }

    fn update_bulk(&mut self, pos: usize, vals: &[u64]) -> Result<usize> {
        self.set_bulk(pos, vals)
    }

    fn fill(&mut self, from: usize, to: usize, val: u64) -> Result<()> {
        PagedArray::fill(self, from, to, val)
    }

    fn clear(&mut self) {
        PagedArray::clear(self)
    }
}

impl<P: Page> RamBytesUsed for PagedArray<P> {
    fn ram_bytes_used(&self) -> usize {
        let spare = self.pages.capacity() - self.pages.len();
        std::mem::size_of::<Self>()
            + spare * std::mem::size_of::<P>()
            + self.pages.iter().map(|p| p.ram_bytes_used()).sum::<usize>()
    }
}

impl<P: Page> std::fmt::Debug for PagedArray<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PagedArray")
            .field("len", &self.len)
            .field("page_size", &self.page_size())
            .field("num_pages", &self.num_pages())
            .field("bits_per_value", &self.bits_per_value)
            .field("params", &self.params)
            .finish()
    }
}
