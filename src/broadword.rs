//! Broadword tricks over 64-bit words.
#![cfg(target_pointer_width = "64")]

const L8: u64 = 0x0101_0101_0101_0101;
const H8: u64 = 0x8080_8080_8080_8080;

/// Ranks up to which [`select_in_word`] scans bit by bit.
const LINEAR_SELECT_MAX_RANK: usize = 8;

/// `SELECT_IN_BYTE[(k << 8) | b]` is the position of the `k`-th set bit in byte `b`,
/// or 8 if there is none.
const SELECT_IN_BYTE: [u8; 2048] = build_select_in_byte();

const fn build_select_in_byte() -> [u8; 2048] {
    let mut table = [8u8; 2048];
    let mut b = 0;
    while b < 256 {
        let mut k = 0;
        let mut i = 0;
        while i < 8 {
            if (b >> i) & 1 == 1 {
                table[(k << 8) | b] = i as u8;
                k += 1;
            }
            i += 1;
        }
        b += 1;
    }
    table
}

/// Returns the number of set bits in `x`.
///
/// # Examples
///
/// ```
/// use packints::broadword::popcount;
///
/// assert_eq!(popcount(0), 0);
/// assert_eq!(popcount(0b1011), 3);
/// ```
#[inline(always)]
pub const fn popcount(x: u64) -> usize {
    x.count_ones() as usize
}

/// Returns the position of the least significant set bit, or [`None`] if `x == 0`.
///
/// # Examples
///
/// ```
/// use packints::broadword::lsb;
///
/// assert_eq!(lsb(0b1100), Some(2));
/// assert_eq!(lsb(0), None);
/// ```
#[inline(always)]
pub const fn lsb(x: u64) -> Option<usize> {
    if x == 0 {
        None
    } else {
        Some(x.trailing_zeros() as usize)
    }
}

/// Returns the position of the most significant set bit, or [`None`] if `x == 0`.
///
/// # Examples
///
/// ```
/// use packints::broadword::msb;
///
/// assert_eq!(msb(0b1100), Some(3));
/// assert_eq!(msb(u64::MAX), Some(63));
/// assert_eq!(msb(0), None);
/// ```
#[inline(always)]
pub const fn msb(x: u64) -> Option<usize> {
    if x == 0 {
        None
    } else {
        Some(63 - x.leading_zeros() as usize)
    }
}

/// Returns the position of the `k`-th set bit (0-origin) in `x`,
/// or [`None`] if `x` has no more than `k` set bits.
///
/// Small ranks are found by clearing the lowest bits one by one;
/// larger ranks use the byte-wise broadword algorithm of
/// [`select_in_word_broadword`].
///
/// # Examples
///
/// ```
/// use packints::broadword::select_in_word;
///
/// let x = 0b1010_0110;
/// assert_eq!(select_in_word(x, 0), Some(1));
/// assert_eq!(select_in_word(x, 3), Some(7));
/// assert_eq!(select_in_word(x, 4), None);
/// assert_eq!(select_in_word(u64::MAX, 40), Some(40));
/// ```
#[inline(always)]
pub fn select_in_word(x: u64, k: usize) -> Option<usize> {
    if k <= LINEAR_SELECT_MAX_RANK {
        select_in_word_naive(x, k)
    } else {
        select_in_word_broadword(x, k)
    }
}

/// Linear variant of [`select_in_word`].
#[inline(always)]
pub fn select_in_word_naive(mut x: u64, k: usize) -> Option<usize> {
    for _ in 0..k {
        if x == 0 {
            return None;
        }
        x &= x - 1;
    }
    lsb(x)
}

/// Broadword variant of [`select_in_word`].
///
/// # Credits
///
/// Based on the select algorithm in
/// [succinct::broadword](https://github.com/ot/succinct/blob/master/broadword.hpp)
/// by Vigna and Ottaviano.
#[inline(always)]
pub fn select_in_word_broadword(x: u64, k: usize) -> Option<usize> {
    if popcount(x) <= k {
        return None;
    }
    let mut byte_sums = x - ((x >> 1) & 0x5555_5555_5555_5555);
    byte_sums = (byte_sums & 0x3333_3333_3333_3333) + ((byte_sums >> 2) & 0x3333_3333_3333_3333);
    byte_sums = (byte_sums + (byte_sums >> 4)) & 0x0F0F_0F0F_0F0F_0F0F;
    byte_sums = byte_sums.wrapping_mul(L8);

    let k_step8 = k as u64 * L8;
    let geq_k_step8 = ((k_step8 | H8) - byte_sums) & H8;
    let place = popcount(geq_k_step8) * 8;
    let byte_rank = k as u64 - (((byte_sums << 8) >> place) & 0xFF);
    let byte = (x >> place) & 0xFF;
    Some(place + SELECT_IN_BYTE[((byte_rank << 8) | byte) as usize] as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaChaRng;

    fn select_by_scan(x: u64, k: usize) -> Option<usize> {
        (0..64).filter(|&i| (x >> i) & 1 == 1).nth(k)
    }

    #[test]
    fn test_select_in_byte_table() {
        assert_eq!(SELECT_IN_BYTE[0b1000_0001], 0);
        assert_eq!(SELECT_IN_BYTE[(1 << 8) | 0b1000_0001], 7);
        assert_eq!(SELECT_IN_BYTE[(2 << 8) | 0b1000_0001], 8);
        assert_eq!(SELECT_IN_BYTE[(7 << 8) | 0xFF], 7);
    }

    #[test]
    fn test_select_all_ones() {
        for k in 0..64 {
            assert_eq!(select_in_word(u64::MAX, k), Some(k));
            assert_eq!(select_in_word_broadword(u64::MAX, k), Some(k));
        }
        assert_eq!(select_in_word(u64::MAX, 64), None);
    }

    #[test]
    fn test_select_zero() {
        assert_eq!(select_in_word(0, 0), None);
        assert_eq!(select_in_word_broadword(0, 0), None);
        assert_eq!(select_in_word(0, 20), None);
    }

    #[test]
    fn test_select_random() {
        let mut rng = ChaChaRng::seed_from_u64(13);
        for _ in 0..10000 {
            // Mask some bits off so that words have varying densities.
            let x = rng.gen::<u64>() & rng.gen::<u64>() | rng.gen::<u64>() & rng.gen::<u64>();
            for k in 0..=popcount(x) {
                let expected = select_by_scan(x, k);
                assert_eq!(select_in_word_naive(x, k), expected);
                assert_eq!(select_in_word_broadword(x, k), expected);
                assert_eq!(select_in_word(x, k), expected);
            }
        }
    }

    #[test]
    fn test_lsb_msb() {
        assert_eq!(lsb(1 << 63), Some(63));
        assert_eq!(msb(1), Some(0));
        assert_eq!(msb(0x00F0), Some(7));
    }
}
