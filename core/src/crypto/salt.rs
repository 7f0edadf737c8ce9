//! crypto/salt.rs
//! Salt generation from the operating system CSPRNG.
//!
//! Salts are never drawn from a seeded generator. An all-zero salt is treated
//! as a broken source and refused on both the generation and the verify side.

use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::constants::{MAX_SALT_LEN, MIN_SALT_LEN};
use crate::crypto::types::CryptoError;

/// Length bounds and the all-zero rule.
pub fn validate_salt(salt: &[u8]) -> Result<(), CryptoError> {
    if salt.len() < MIN_SALT_LEN || salt.len() > MAX_SALT_LEN {
        return Err(CryptoError::InvalidSaltLen {
            len: salt.len(),
            min: MIN_SALT_LEN,
            max: MAX_SALT_LEN,
        });
    }
    if salt.iter().all(|&b| b == 0) {
        return Err(CryptoError::InvalidSalt);
    }
    Ok(())
}

/// Fresh salt of `len` bytes.
pub fn generate_salt(len: usize) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    if !(MIN_SALT_LEN..=MAX_SALT_LEN).contains(&len) {
        return Err(CryptoError::InvalidSaltLen { len, min: MIN_SALT_LEN, max: MAX_SALT_LEN });
    }
    let mut salt = Zeroizing::new(vec![0u8; len]);
    OsRng
        .try_fill_bytes(&mut salt)
        .map_err(|e| CryptoError::SaltGeneration(e.to_string()))?;
    validate_salt(&salt).map_err(|_| CryptoError::SaltGeneration("random source returned zeros".into()))?;
    Ok(salt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_salts_are_fresh() {
        let a = generate_salt(32).unwrap();
        let b = generate_salt(32).unwrap();
        assert_eq!(a.len(), 32);
        assert_ne!(*a, *b);
    }

    #[test]
    fn rejects_zero_and_bad_lengths() {
        assert!(matches!(validate_salt(&[0u8; 32]), Err(CryptoError::InvalidSalt)));
        assert!(matches!(validate_salt(&[1u8; 8]), Err(CryptoError::InvalidSaltLen { .. })));
        assert!(matches!(generate_salt(65), Err(CryptoError::InvalidSaltLen { .. })));
        assert!(validate_salt(&[7u8; 16]).is_ok());
    }
}
