// Cryptographic primitives: JWT signing, random token generation, and
// PIN hashing.

pub mod jwt;
pub mod pin;
pub mod random;

use subtle::ConstantTimeEq;

/// Constant-time byte comparison.
pub fn constant_time_equal(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_equal() {
        assert!(constant_time_equal(b"abc", b"abc"));
        assert!(!constant_time_equal(b"abc", b"abd"));
        assert!(!constant_time_equal(b"abc", b"abcd"));
    }
}
