//! Overflow-checked arithmetic over `u64` token quantities.
//!
//! Every balance mutation and the initialization sum goes through here; a raw
//! `+`/`-` on a stored amount is a bug.

use crate::error::{ChainError, Result};

/// Returns `(a + b, overflowed)`. On overflow the sum is the wrapped value and
/// must be ignored by the caller.
pub fn checked_add(a: u64, b: u64) -> (u64, bool) {
    a.overflowing_add(b)
}

/// Returns `(a - b, underflowed)`.
pub fn checked_sub(a: u64, b: u64) -> (u64, bool) {
    a.overflowing_sub(b)
}

/// `a + b`, or `ChainError::Overflow`.
pub fn add(a: u64, b: u64) -> Result<u64> {
    match checked_add(a, b) {
        (sum, false) => Ok(sum),
        (_, true) => Err(ChainError::Overflow(format!("{} + {}", a, b))),
    }
}

/// `a * b`, or `ChainError::Overflow`.
pub fn mul(a: u64, b: u64) -> Result<u64> {
    a.checked_mul(b)
        .ok_or_else(|| ChainError::Overflow(format!("{} * {}", a, b)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_add_ok() {
        assert_eq!(checked_add(3, 4), (7, false));
        assert_eq!(checked_add(u64::MAX - 1, 1), (u64::MAX, false));
    }

    #[test]
    fn test_checked_add_overflow() {
        assert!(checked_add(u64::MAX, 1).1);
        assert!(checked_add(u64::MAX / 2 + 1, u64::MAX / 2 + 1).1);
    }

    #[test]
    fn test_checked_add_matches_plain_addition() {
        for (a, b) in [(0u64, 0u64), (1, 2), (700_000_000, 300_000_000), (u64::MAX - 5, 5)] {
            let (sum, overflowed) = checked_add(a, b);
            assert!(!overflowed);
            assert_eq!(sum, a + b);
        }
    }

    #[test]
    fn test_checked_sub() {
        assert_eq!(checked_sub(10, 4), (6, false));
        assert_eq!(checked_sub(4, 4), (0, false));
        assert!(checked_sub(4, 5).1);
    }

    #[test]
    fn test_result_helpers() {
        assert_eq!(add(1, 1).unwrap(), 2);
        assert!(matches!(add(u64::MAX, 1), Err(ChainError::Overflow(_))));
        assert_eq!(mul(3, 4).unwrap(), 12);
        assert!(matches!(mul(u64::MAX, 2), Err(ChainError::Overflow(_))));
    }
}
