//! crypto/digest.rs
//! Salted integrity seal over feature vectors.
//!
//! Canonical digest input:
//!
//! ```text
//! for each feature, in order:
//!   value   (f32 LE, 4 bytes)
//! salt      (salt_len bytes)
//! ```
//!
//! The seal is tamper evidence for the stored template. Noisy biometric
//! readings never hash equal, so the seal takes no part in accept/reject.

use sha2::{Digest as _, Sha256, Sha512};
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::constants::{MAX_SALT_LEN, MIN_SALT_LEN, SALT_LEN};
use crate::crypto::compare::{constant_time_eq, hamming_distance};
use crate::crypto::salt::{generate_salt, validate_salt};
use crate::crypto::types::{CryptoError, HashAlg, HashRecord};
use crate::signal::FeatureVector;
use crate::utils::hex_preview;

/// Internal hashing state.
enum DigestState {
    Sha256(Sha256),
    Sha512(Sha512),
    Blake3(Box<blake3::Hasher>),
}

impl DigestState {
    fn new(alg: HashAlg) -> Self {
        match alg {
            HashAlg::Sha256 => DigestState::Sha256(Sha256::new()),
            HashAlg::Sha512 => DigestState::Sha512(Sha512::new()),
            HashAlg::Blake3 => DigestState::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    #[inline]
    fn update(&mut self, data: &[u8]) {
        match self {
            DigestState::Sha256(h) => h.update(data),
            DigestState::Sha512(h) => h.update(data),
            DigestState::Blake3(h) => {
                h.update(data);
            }
        }
    }

    #[inline]
    fn finalize(self) -> Vec<u8> {
        match self {
            DigestState::Sha256(h) => h.finalize().to_vec(),
            DigestState::Sha512(h) => h.finalize().to_vec(),
            DigestState::Blake3(h) => h.finalize().as_bytes().to_vec(),
        }
    }
}

/// Computes and checks template seals.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FeatureHasher {
    alg: HashAlg,
    salt_len: usize,
}

impl Default for FeatureHasher {
    fn default() -> Self {
        Self { alg: HashAlg::default(), salt_len: SALT_LEN }
    }
}

impl FeatureHasher {
    pub fn new(alg: HashAlg, salt_len: usize) -> Result<Self, CryptoError> {
        if !(MIN_SALT_LEN..=MAX_SALT_LEN).contains(&salt_len) {
            return Err(CryptoError::InvalidSaltLen { len: salt_len, min: MIN_SALT_LEN, max: MAX_SALT_LEN });
        }
        Ok(Self { alg, salt_len })
    }

    #[inline]
    pub fn alg(&self) -> HashAlg {
        self.alg
    }

    #[inline]
    pub fn salt_len(&self) -> usize {
        self.salt_len
    }

    /// `H(serialize(values) || salt)` with this hasher's primitive.
    pub fn digest_with_salt(&self, values: &[f32], salt: &[u8]) -> Result<Vec<u8>, CryptoError> {
        digest_features(self.alg, values, salt)
    }

    /// Draw a fresh salt and seal `features`.
    pub fn seal(&self, features: &FeatureVector) -> Result<HashRecord, CryptoError> {
        let salt = generate_salt(self.salt_len)?;
        let digest = digest_features(self.alg, features.as_slice(), &salt)?;
        debug!(alg = %self.alg, digest = %hex_preview(&digest, 4), "template sealed");
        Ok(HashRecord::new(self.alg, digest, salt.to_vec()))
    }

    /// Recompute the seal with the stored salt and compare in constant time.
    pub fn verify(&self, features: &FeatureVector, record: &HashRecord) -> Result<(), CryptoError> {
        let expected = record.alg.digest_len();
        if record.digest.len() != expected {
            return Err(CryptoError::DigestLenMismatch { expected, actual: record.digest.len() });
        }
        let actual = Zeroizing::new(digest_features(record.alg, features.as_slice(), &record.salt)?);
        if constant_time_eq(&actual, &record.digest) {
            Ok(())
        } else {
            warn!(
                alg = %record.alg,
                bit_distance = hamming_distance(&actual, &record.digest).unwrap_or(0),
                "template seal mismatch"
            );
            Err(CryptoError::IntegrityMismatch)
        }
    }
}

fn digest_features(alg: HashAlg, values: &[f32], salt: &[u8]) -> Result<Vec<u8>, CryptoError> {
    validate_salt(salt)?;
    let mut state = DigestState::new(alg);
    for v in values {
        state.update(&v.to_le_bytes());
    }
    state.update(salt);
    Ok(state.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_lengths_match_alg() {
        let salt = [9u8; 32];
        for alg in [HashAlg::Sha256, HashAlg::Sha512, HashAlg::Blake3] {
            let d = digest_features(alg, &[1.0, 2.0], &salt).unwrap();
            assert_eq!(d.len(), alg.digest_len());
        }
    }

    #[test]
    fn digest_covers_values_then_salt() {
        let salt = [3u8; 16];
        let mut manual = Sha256::new();
        manual.update(1.5f32.to_le_bytes());
        manual.update((-2.0f32).to_le_bytes());
        manual.update(salt);
        let want = manual.finalize().to_vec();
        assert_eq!(digest_features(HashAlg::Sha256, &[1.5, -2.0], &salt).unwrap(), want);
    }

    #[test]
    fn hasher_rejects_bad_salt_len() {
        assert!(FeatureHasher::new(HashAlg::Sha256, 4).is_err());
        assert!(FeatureHasher::new(HashAlg::Sha256, 16).is_ok());
    }
}
