// PIN hashing — scrypt (N=16384, r=16, p=1, dkLen=64) with a random
// 16-byte salt. Output format: "hex(salt):hex(key)".
//
// PINs are never stored in plain text; verification re-derives the key
// and compares in constant time.

use rand::RngCore;
use scrypt::{scrypt, Params};

use vcorp_core::error::VcorpError;

/// Hash a PIN. Returns a string in the format `salt:key`, hex-encoded.
pub fn hash_pin(pin: &str) -> Result<String, VcorpError> {
    let mut salt_bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt_hex = hex::encode(salt_bytes);

    let key = generate_key(pin, &salt_hex)?;
    Ok(format!("{}:{}", salt_hex, hex::encode(key)))
}

/// Verify a PIN against a hash produced by `hash_pin`.
pub fn verify_pin_hash(hash: &str, pin: &str) -> Result<bool, VcorpError> {
    let (salt, key_hex) = hash
        .split_once(':')
        .ok_or_else(|| VcorpError::Crypto("Invalid PIN hash format".into()))?;

    let expected_key = hex::decode(key_hex)
        .map_err(|e| VcorpError::Crypto(format!("Invalid hex in PIN hash: {e}")))?;

    let derived_key = generate_key(pin, salt)?;

    Ok(super::constant_time_equal(&derived_key, &expected_key))
}

/// Whether a candidate string has the required PIN shape: exactly 6 digits.
pub fn is_valid_pin_format(pin: &str) -> bool {
    pin.len() == 6 && pin.chars().all(|c| c.is_ascii_digit())
}

fn generate_key(pin: &str, salt: &str) -> Result<Vec<u8>, VcorpError> {
    // N=16384 → log2(N)=14, r=16, p=1, dkLen=64
    let params = Params::new(14, 16, 1, 64)
        .map_err(|e| VcorpError::Crypto(format!("Invalid scrypt params: {e}")))?;

    let mut output = vec![0u8; 64];
    scrypt(pin.as_bytes(), salt.as_bytes(), &params, &mut output)
        .map_err(|e| VcorpError::Crypto(format!("scrypt failed: {e}")))?;

    Ok(output)
}
