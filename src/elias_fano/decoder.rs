//! Bidirectional cursor over an Elias-Fano encoded sequence.
#![cfg(target_pointer_width = "64")]

use crate::broadword;
use crate::elias_fano::EliasFanoEncoder;

/// Cursor over the values of an [`EliasFanoEncoder`], created by [`EliasFanoEncoder::decoder()`].
///
/// The cursor starts before the first value and can move in both directions.
/// Every move returns the value the cursor lands on, or [`None`] when it leaves
/// the sequence, in which case it is placed before the first or after the last value.
///
/// Forward seeks by value use the index of the encoder to jump over long runs
/// of the upper array, then skip whole words of it.
///
/// # Examples
///
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use packints::elias_fano::EliasFanoEncoder;
///
/// let mut enc = EliasFanoEncoder::new(5, 20)?;
/// for x in [1, 3, 3, 7, 20] {
///     enc.encode_next(x)?;
/// }
///
/// let mut dec = enc.decoder();
/// dec.to_after_sequence();
/// assert_eq!(dec.back_to_value(5), Some(3));
/// assert_eq!(dec.current_index(), Some(2));
/// assert_eq!(dec.previous_value(), Some(3));
/// assert_eq!(dec.advance_to_index(4), Some(20));
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct EliasFanoDecoder<'a> {
    enc: &'a EliasFanoEncoder,
    num_encoded: usize,
    num_low_bits: usize,
    // Index of the current value; -1 before the sequence and num_encoded after it.
    ef_index: isize,
    // Position of the upper bit of the current value.
    // Between moves, the number of set bits before it equals ef_index.
    set_bit: isize,
}

impl<'a> EliasFanoDecoder<'a> {
    /// Creates a decoder positioned before the first value of `enc`.
    pub fn new(enc: &'a EliasFanoEncoder) -> Self {
        Self {
            enc,
            num_encoded: enc.num_encoded(),
            num_low_bits: enc.num_low_bits(),
            ef_index: -1,
            set_bit: -1,
        }
    }

    /// Gets the number of values visible to this decoder.
    pub const fn num_encoded(&self) -> usize {
        self.num_encoded
    }

    /// Moves the cursor before the first value.
    pub fn to_before_sequence(&mut self) {
        self.ef_index = -1;
        self.set_bit = -1;
    }

    /// Moves the cursor after the last value.
    pub fn to_after_sequence(&mut self) {
        self.ef_index = self.num_encoded as isize;
        self.set_bit = if self.num_encoded == 0 {
            0
        } else {
            let last_high = (self.enc.last_encoded() >> self.num_low_bits) as isize;
            last_high + self.num_encoded as isize
        };
    }

    /// Gets the index of the current value, or [`None`] if the cursor is outside the sequence.
    pub fn current_index(&self) -> Option<usize> {
        if self.on_value() {
            Some(self.ef_index as usize)
        } else {
            None
        }
    }

    /// Gets the current value, or [`None`] if the cursor is outside the sequence.
    pub fn current_value(&self) -> Option<u64> {
        if self.on_value() {
            Some(self.value_at_cursor())
        } else {
            None
        }
    }

    /// Moves to the next value and returns it.
    ///
    /// # Complexity
    ///
    /// Linear in the number of upper words between the two values.
    pub fn next_value(&mut self) -> Option<u64> {
        if self.ef_index + 1 >= self.num_encoded as isize {
            self.to_after_sequence();
            return None;
        }
        self.ef_index += 1;
        match self.enc.upper().successor1((self.set_bit + 1) as usize) {
            Some(pos) => self.set_bit = pos as isize,
            None => {
                self.to_after_sequence();
                return None;
            }
        }
        Some(self.value_at_cursor())
    }

    /// Moves to the previous value and returns it.
    pub fn previous_value(&mut self) -> Option<u64> {
        if self.ef_index <= 0 {
            self.to_before_sequence();
            return None;
        }
        self.ef_index -= 1;
        match self.enc.upper().predecessor1((self.set_bit - 1) as usize) {
            Some(pos) => self.set_bit = pos as isize,
            None => {
                self.to_before_sequence();
                return None;
            }
        }
        Some(self.value_at_cursor())
    }

    /// Moves forward to the first value after the cursor that is no less than `target`
    /// and returns it.
    ///
    /// # Examples
    ///
    /// ```
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// use packints::elias_fano::EliasFanoEncoder;
    ///
    /// let mut enc = EliasFanoEncoder::with_index_interval(1000, 100000, 2)?;
    /// for i in 0..1000 {
    ///     enc.encode_next(i * 100)?;
    /// }
    ///
    /// let mut dec = enc.decoder();
    /// assert_eq!(dec.advance_to_value(55555), Some(55600));
    /// assert_eq!(dec.current_index(), Some(556));
    /// assert_eq!(dec.advance_to_value(55555), Some(55700));
    /// assert_eq!(dec.advance_to_value(100000), None);
    /// # Ok(())
    /// # }
    /// ```
    pub fn advance_to_value(&mut self, target: u64) -> Option<u64> {
        if self.ef_index + 1 >= self.num_encoded as isize || target > self.enc.last_encoded() {
            self.to_after_sequence();
            return None;
        }
        self.ef_index += 1;
        self.set_bit += 1;
        let high_target = (target >> self.num_low_bits) as usize;
        if self.to_high_boundary(high_target).is_none() {
            self.to_after_sequence();
            return None;
        }
        match self.enc.upper().successor1(self.set_bit as usize) {
            Some(pos) => self.set_bit = pos as isize,
            None => {
                self.to_after_sequence();
                return None;
            }
        }
        let mut val = self.value_at_cursor();
        while val < target {
            val = self.next_value()?;
        }
        Some(val)
    }

    /// Moves backward to the last value before the cursor that is no greater than `target`
    /// and returns it.
    pub fn back_to_value(&mut self, target: u64) -> Option<u64> {
        if self.ef_index <= 0 {
            self.to_before_sequence();
            return None;
        }
        let high_target = (target >> self.num_low_bits) as usize;
        if let Some(next_high) = high_target.checked_add(1) {
            let cur_high = (self.set_bit - self.ef_index) as usize;
            if cur_high > next_high {
                // Values of high part at least next_high all exceed the target.
                self.ef_index = 0;
                self.set_bit = 0;
                if self.to_high_boundary(next_high).is_none() {
                    self.to_before_sequence();
                    return None;
                }
            }
        }
        let mut val = self.previous_value()?;
        while val > target {
            val = self.previous_value()?;
        }
        Some(val)
    }

    /// Moves forward to the `index`-th value and returns it.
    ///
    /// If `index` is not after the current index, the cursor stays and the current value is returned.
    pub fn advance_to_index(&mut self, index: usize) -> Option<u64> {
        if index >= self.num_encoded {
            self.to_after_sequence();
            return None;
        }
        if index as isize <= self.ef_index {
            return self.current_value();
        }
        let rank = (index as isize - self.ef_index - 1) as usize;
        let start = (self.set_bit + 1) as usize;
        match select_from(self.enc.upper_words(), start, rank, true) {
            Some(pos) => {
                self.ef_index = index as isize;
                self.set_bit = pos as isize;
                Some(self.value_at_cursor())
            }
            None => {
                self.to_after_sequence();
                None
            }
        }
    }

    #[inline(always)]
    fn on_value(&self) -> bool {
        0 <= self.ef_index && self.ef_index < self.num_encoded as isize
    }

    #[inline(always)]
    fn value_at_cursor(&self) -> u64 {
        let high = (self.set_bit - self.ef_index) as u64;
        (high << self.num_low_bits) | self.enc.low(self.ef_index as usize)
    }

    /// Moves `set_bit` forward to just after the `high_target`-th zero of the upper array,
    /// where values of high part `high_target` start, unless it is already past it.
    fn to_high_boundary(&mut self, high_target: usize) -> Option<()> {
        let mut zeros = (self.set_bit - self.ef_index) as usize;
        if zeros >= high_target {
            return Some(());
        }
        let interval = self.enc.index_interval();
        let num_entries = self.enc.num_index_entries();
        if high_target >= interval && num_entries > 0 {
            let entry = (high_target / interval - 1).min(num_entries - 1);
            let index_high = (entry + 1) * interval;
            if index_high > zeros {
                let pos = self.enc.index_entry(entry)?;
                self.set_bit = pos as isize;
                self.ef_index = (pos - index_high) as isize;
                zeros = index_high;
            }
        }
        if zeros < high_target {
            let words = self.enc.upper_words();
            let pos = select_from(words, self.set_bit as usize, high_target - zeros - 1, false)?;
            self.set_bit = pos as isize + 1;
            self.ef_index = self.set_bit - high_target as isize;
        }
        Some(())
    }
}

impl Iterator for EliasFanoDecoder<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_value()
    }
}

/// Returns the position of the `rank`-th (0-based) set bit, or unset bit if `!ones`,
/// at or after `start`.
fn select_from(words: &[u64], start: usize, mut rank: usize, ones: bool) -> Option<usize> {
    let flip = |w: u64| if ones { w } else { !w };
    let mut block = start / 64;
    let mut word = flip(*words.get(block)?) & (u64::MAX << (start % 64));
    loop {
        let count = broadword::popcount(word);
        if rank < count {
            return Some(block * 64 + broadword::select_in_word(word, rank)?);
        }
        rank -= count;
        block += 1;
        word = flip(*words.get(block)?);
    }
}
