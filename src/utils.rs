//! Bit-width and sign helpers shared by the codecs.
#![cfg(target_pointer_width = "64")]

/// Returns the number of bits required to represent `x`, that is, $`\max(1, \lceil \lg (x+1) \rceil)`$.
///
/// A value whose top bit is set, such as a negative number reinterpreted as unsigned, requires 64 bits.
///
/// # Examples
///
/// ```
/// use packints::utils::bits_required;
///
/// assert_eq!(bits_required(0), 1);
/// assert_eq!(bits_required(1), 1);
/// assert_eq!(bits_required(2), 2);
/// assert_eq!(bits_required(255), 8);
/// assert_eq!(bits_required(256), 9);
/// assert_eq!(bits_required(-1i64 as u64), 64);
/// ```
#[inline(always)]
pub const fn bits_required(x: u64) -> usize {
    let bits = 64 - x.leading_zeros() as usize;
    if bits == 0 {
        1
    } else {
        bits
    }
}

/// Returns the maximum value representable in `bits` bits, i.e., $`2^{bits} - 1`$.
///
/// # Examples
///
/// ```
/// use packints::utils::max_value;
///
/// assert_eq!(max_value(0), 0);
/// assert_eq!(max_value(3), 7);
/// assert_eq!(max_value(64), u64::MAX);
/// ```
#[inline(always)]
pub const fn max_value(bits: usize) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1 << bits) - 1
    }
}

/// Maps a signed integer to an unsigned one so that values of small magnitude
/// (positive or negative) become small: `0, -1, 1, -2, ...` map to `0, 1, 2, 3, ...`.
///
/// # Examples
///
/// ```
/// use packints::utils::zigzag_encode;
///
/// assert_eq!(zigzag_encode(0), 0);
/// assert_eq!(zigzag_encode(-1), 1);
/// assert_eq!(zigzag_encode(1), 2);
/// assert_eq!(zigzag_encode(i64::MIN), u64::MAX);
/// ```
#[inline(always)]
pub const fn zigzag_encode(x: i64) -> u64 {
    ((x << 1) ^ (x >> 63)) as u64
}

/// Inverse of [`zigzag_encode`].
///
/// # Examples
///
/// ```
/// use packints::utils::zigzag_decode;
///
/// assert_eq!(zigzag_decode(3), -2);
/// assert_eq!(zigzag_decode(u64::MAX), i64::MIN);
/// ```
#[inline(always)]
pub const fn zigzag_decode(x: u64) -> i64 {
    ((x >> 1) as i64) ^ -((x & 1) as i64)
}
