//! matcher.rs
//! Cosine-similarity matching of a fresh feature vector against a stored one.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{DEFAULT_SIMILARITY_THRESHOLD, MIN_MAGNITUDE};
use crate::types::{ExitStatus, NeuroError, Outcome};
use crate::utils::{dot, magnitude, now_secs};

#[derive(Debug, Clone, PartialEq)]
pub enum MatchError {
    /// Vectors of different length cannot be compared.
    LengthMismatch { left: usize, right: usize },

    /// One side has (near) zero magnitude.
    DegenerateVector { magnitude: f64 },
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchError::LengthMismatch { left, right } =>
                write!(f, "feature length mismatch: {} vs {}", left, right),
            MatchError::DegenerateVector { magnitude } =>
                write!(f, "degenerate feature vector (magnitude {:.3e})", magnitude),
        }
    }
}

impl std::error::Error for MatchError {}

/// Decision of one authentication.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AuthResult {
    pub accepted: bool,
    pub score: f32,
    /// Epoch seconds.
    pub timestamp: i64,
    pub attempts: u32,
}

impl AuthResult {
    pub fn status(&self) -> ExitStatus {
        if self.accepted {
            ExitStatus::Success
        } else {
            ExitStatus::Rejected
        }
    }
}

impl Outcome for AuthResult {
    fn exit_status(&self) -> ExitStatus {
        self.status()
    }
}

/// Cosine similarity in `[0, 1]`.
///
/// Computed in f64. Negative cosines (impossible for band energies, possible
/// for arbitrary input) clamp to 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, MatchError> {
    if a.len() != b.len() {
        return Err(MatchError::LengthMismatch { left: a.len(), right: b.len() });
    }
    let ma = magnitude(a);
    let mb = magnitude(b);
    for m in [ma, mb] {
        if !m.is_finite() || m < MIN_MAGNITUDE {
            return Err(MatchError::DegenerateVector { magnitude: m });
        }
    }
    let cos = dot(a, b) / (ma * mb);
    Ok(cos.clamp(0.0, 1.0) as f32)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityMatcher {
    threshold: f32,
}

impl Default for SimilarityMatcher {
    fn default() -> Self {
        Self { threshold: DEFAULT_SIMILARITY_THRESHOLD }
    }
}

impl SimilarityMatcher {
    pub fn new(threshold: f32) -> Result<Self, NeuroError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(NeuroError::validation(format!(
                "similarity threshold {} outside [0, 1]",
                threshold
            )));
        }
        Ok(Self { threshold })
    }

    #[inline]
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Score `fresh` against `stored`; accept iff score >= threshold.
    pub fn compare(&self, fresh: &[f32], stored: &[f32]) -> Result<AuthResult, MatchError> {
        let score = cosine_similarity(fresh, stored)?;
        let accepted = score >= self.threshold;
        debug!(score, threshold = self.threshold, accepted, "similarity computed");
        Ok(AuthResult { accepted, score, timestamp: now_secs(), attempts: 1 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orthogonal_is_zero_and_opposite_clamps() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap(), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 1.0], &[-1.0, -1.0]).unwrap(), 0.0);
    }

    #[test]
    fn threshold_edge_accepts() {
        let m = SimilarityMatcher::new(1.0).unwrap();
        let r = m.compare(&[2.0, 0.0], &[5.0, 0.0]).unwrap();
        assert!(r.accepted);
        assert_eq!(r.attempts, 1);
        assert_eq!(r.status(), ExitStatus::Success);
    }

    #[test]
    fn invalid_threshold_rejected() {
        assert!(SimilarityMatcher::new(1.5).is_err());
        assert!(SimilarityMatcher::new(f32::NAN).is_err());
    }

    #[test]
    fn nan_magnitude_is_degenerate() {
        let err = cosine_similarity(&[f32::NAN, 1.0], &[1.0, 1.0]).unwrap_err();
        assert!(matches!(err, MatchError::DegenerateVector { .. }));
    }
}
