//! crypto/types.rs
//! Hash primitive identifiers, the integrity seal record and crypto errors.

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::constants::hash_ids;
use crate::crypto::compare::constant_time_eq;
use crate::utils::hex_preview;

/// Supported seal primitives. Blake3 is used unkeyed.
#[repr(u16)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlg {
    #[default]
    Sha256 = hash_ids::SHA256,
    Sha512 = hash_ids::SHA512,
    Blake3 = hash_ids::BLAKE3,
}

impl HashAlg {
    /// Digest length in bytes.
    #[inline]
    pub fn digest_len(self) -> usize {
        match self {
            HashAlg::Sha256 => 32,
            HashAlg::Sha512 => 64,
            HashAlg::Blake3 => 32,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            HashAlg::Sha256 => "sha256",
            HashAlg::Sha512 => "sha512",
            HashAlg::Blake3 => "blake3",
        }
    }
}

impl fmt::Display for HashAlg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug)]
pub enum CryptoError {
    /// The OS random source failed to produce a salt.
    SaltGeneration(String),

    /// Salt is all zeros.
    InvalidSalt,

    /// Salt length outside the accepted range.
    InvalidSaltLen { len: usize, min: usize, max: usize },

    /// Stored digest length does not match the configured primitive.
    DigestLenMismatch { expected: usize, actual: usize },

    /// Recomputed digest differs from the stored seal.
    IntegrityMismatch,
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use CryptoError::*;
        match self {
            SaltGeneration(msg) =>
                write!(f, "salt generation failed: {}", msg),
            InvalidSalt =>
                write!(f, "invalid salt: all zeros"),
            InvalidSaltLen { len, min, max } =>
                write!(f, "invalid salt length: {} (expected {}..={})", len, min, max),
            DigestLenMismatch { expected, actual } =>
                write!(f, "digest length mismatch: expected={}, actual={}", expected, actual),
            IntegrityMismatch =>
                write!(f, "template integrity check failed"),
        }
    }
}

impl std::error::Error for CryptoError {}

/// Integrity seal over a feature vector: `H(features || salt)`.
#[derive(Clone)]
pub struct HashRecord {
    pub alg: HashAlg,
    pub digest: Vec<u8>,
    pub salt: Vec<u8>,
}

impl HashRecord {
    pub fn new(alg: HashAlg, digest: Vec<u8>, salt: Vec<u8>) -> Self {
        Self { alg, digest, salt }
    }

    pub fn digest_hex(&self) -> String {
        hex::encode(&self.digest)
    }

    /// Constant-time over digest and salt bytes.
    pub fn ct_eq(&self, other: &HashRecord) -> bool {
        let digest_eq = constant_time_eq(&self.digest, &other.digest);
        let salt_eq = constant_time_eq(&self.salt, &other.salt);
        (self.alg == other.alg) & digest_eq & salt_eq
    }
}

impl PartialEq for HashRecord {
    fn eq(&self, other: &Self) -> bool {
        self.ct_eq(other)
    }
}

impl Eq for HashRecord {}

impl Drop for HashRecord {
    fn drop(&mut self) {
        self.digest.zeroize();
        self.salt.zeroize();
    }
}

impl fmt::Debug for HashRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashRecord")
            .field("alg", &self.alg)
            .field("digest", &hex_preview(&self.digest, 4))
            .field("salt_len", &self.salt.len())
            .finish()
    }
}
