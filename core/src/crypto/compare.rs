//! crypto/compare.rs
//! Digest comparison helpers.

use subtle::ConstantTimeEq;

/// Equality whose running time depends only on the lengths.
///
/// Lengths are public, so a length mismatch returns early; equal-length
/// inputs are folded byte by byte and the result is tested once.
#[inline(never)]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    bool::from(a.ct_eq(b))
}

/// Number of differing bits. Diagnostics only; never an accept/reject input.
pub fn hamming_distance(a: &[u8], b: &[u8]) -> Option<u32> {
    if a.len() != b.len() {
        return None;
    }
    Some(a.iter().zip(b.iter()).map(|(x, y)| (x ^ y).count_ones()).sum())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_and_unequal() {
        assert!(constant_time_eq(b"", b""));
        assert!(constant_time_eq(&[1, 2, 3], &[1, 2, 3]));
        assert!(!constant_time_eq(&[1, 2, 3], &[1, 2, 4]));
        assert!(!constant_time_eq(&[1, 2, 3], &[1, 2]));
    }

    #[test]
    fn difference_at_either_end_is_unequal() {
        let a = [0x5au8; 64];
        let mut first = a;
        first[0] ^= 0x01;
        let mut last = a;
        last[63] ^= 0x80;

        assert!(constant_time_eq(&a, &a));
        assert!(!constant_time_eq(&a, &first));
        assert!(!constant_time_eq(&a, &last));
        assert!(!constant_time_eq(&first, &last));
        assert_eq!(hamming_distance(&a, &first), Some(1));
        assert_eq!(hamming_distance(&a, &last), Some(1));
    }

    #[test]
    fn hamming_counts_bits() {
        assert_eq!(hamming_distance(&[0x00, 0xFF], &[0x01, 0x0F]), Some(5));
        assert_eq!(hamming_distance(&[0xAA], &[0xAA]), Some(0));
        assert_eq!(hamming_distance(&[0xAA], &[]), None);
    }
}
