// Random credential generation.

use rand::{Rng, RngCore};

/// Generate a magic-link token: 32 random bytes, hex-encoded (64 chars).
pub fn generate_login_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Generate a 6-digit sign-in PIN, zero-padded.
pub fn generate_pin() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{:06}", n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_token_shape() {
        let token = generate_login_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_login_token_uniqueness() {
        assert_ne!(generate_login_token(), generate_login_token());
    }

    #[test]
    fn test_pin_shape() {
        for _ in 0..100 {
            let pin = generate_pin();
            assert_eq!(pin.len(), 6);
            assert!(pin.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
