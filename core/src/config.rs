//! config.rs
//! Engine configuration: defaults, JSON loading and validation.
//!
//! Every field has a default, so a config file only needs the keys it
//! overrides. `validate()` runs before any component is built from it.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::crypto::HashAlg;
use crate::signal::{Band, FeatureMethod, PreprocessStage};
use crate::types::NeuroError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Expected channel count of every recording.
    pub channels: usize,
    /// Nominal sampling rate (Hz) used for captures and zero-filled fallbacks.
    pub sampling_rate: f32,
    /// DFT window length in samples.
    pub window: usize,
    pub stages: Vec<PreprocessStage>,
    pub feature_method: FeatureMethod,
    pub hash_alg: HashAlg,
    pub salt_len: usize,
    pub similarity_threshold: f32,
    pub enrollment_trials: usize,
    /// Seconds recorded per capture trial.
    pub capture_secs: f32,
    pub max_auth_attempts: u32,
    pub auth_timeout_secs: u64,
    pub template_dir: PathBuf,
    /// Blend rate for post-acceptance template updates; `None` disables.
    pub adaptive_rate: Option<f32>,
    pub parallel_extraction: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            channels: DEFAULT_CHANNELS,
            sampling_rate: DEFAULT_SAMPLING_RATE,
            window: DEFAULT_WINDOW,
            stages: vec![PreprocessStage::Normalize],
            feature_method: FeatureMethod::BandPower,
            hash_alg: HashAlg::Sha256,
            salt_len: SALT_LEN,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            enrollment_trials: DEFAULT_ENROLMENT_TRIALS,
            capture_secs: DEFAULT_CAPTURE_SECS,
            max_auth_attempts: DEFAULT_MAX_AUTH_ATTEMPTS,
            auth_timeout_secs: DEFAULT_AUTH_TIMEOUT_SECS,
            template_dir: PathBuf::from(DEFAULT_TEMPLATE_DIR),
            adaptive_rate: None,
            parallel_extraction: true,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self, NeuroError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, NeuroError> {
        let cfg: EngineConfig = serde_json::from_str(text)
            .map_err(|e| NeuroError::validation(format!("config: {}", e)))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn with_template_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.template_dir = dir.into();
        self
    }

    pub fn validate(&self) -> Result<(), NeuroError> {
        let bad = |msg: String| Err(NeuroError::Validation(msg));

        if self.channels == 0 {
            return bad("channels must be > 0".into());
        }
        if !self.sampling_rate.is_finite() || self.sampling_rate <= 0.0 {
            return bad(format!("sampling_rate must be > 0, got {}", self.sampling_rate));
        }
        if !(MIN_WINDOW..=MAX_WINDOW).contains(&self.window) {
            return bad(format!("window must be in {}..={}, got {}", MIN_WINDOW, MAX_WINDOW, self.window));
        }
        if !(MIN_SALT_LEN..=MAX_SALT_LEN).contains(&self.salt_len) {
            return bad(format!("salt_len must be in {}..={}, got {}", MIN_SALT_LEN, MAX_SALT_LEN, self.salt_len));
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return bad(format!("similarity_threshold must be in [0, 1], got {}", self.similarity_threshold));
        }
        if self.enrollment_trials == 0 {
            return bad("enrollment_trials must be > 0".into());
        }
        if !self.capture_secs.is_finite() || self.capture_secs <= 0.0 {
            return bad(format!("capture_secs must be > 0, got {}", self.capture_secs));
        }
        if self.max_auth_attempts == 0 {
            return bad("max_auth_attempts must be > 0".into());
        }
        if let Some(r) = self.adaptive_rate {
            if !(r > 0.0 && r <= 1.0) {
                return bad(format!("adaptive_rate must be in (0, 1], got {}", r));
            }
        }
        if (self.channels * Band::COUNT) as u64 > MAX_FEATURE_COUNT {
            return bad(format!("{} channels exceed the template feature bound", self.channels));
        }
        Ok(())
    }

    /// Samples per channel for one capture at the nominal rate.
    pub fn samples_per_capture(&self) -> usize {
        (self.capture_secs * self.sampling_rate).round() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let cfg = EngineConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.samples_per_capture(), 1280);
        assert_eq!(cfg.stages, vec![PreprocessStage::Normalize]);
    }

    #[test]
    fn partial_json_overrides_defaults() {
        let cfg = EngineConfig::from_json(
            r#"{ "hash_alg": "blake3", "adaptive_rate": 0.1,
                 "stages": [{"kind": "notch", "freq_hz": 50.0}, {"kind": "normalize"}] }"#,
        )
        .unwrap();
        assert_eq!(cfg.hash_alg, HashAlg::Blake3);
        assert_eq!(cfg.adaptive_rate, Some(0.1));
        assert_eq!(cfg.stages.len(), 2);
        assert_eq!(cfg.channels, DEFAULT_CHANNELS);
    }

    #[test]
    fn invalid_values_rejected() {
        assert!(EngineConfig::from_json(r#"{ "similarity_threshold": 1.5 }"#).is_err());
        assert!(EngineConfig::from_json(r#"{ "salt_len": 8 }"#).is_err());
        assert!(EngineConfig::from_json(r#"{ "adaptive_rate": 0.0 }"#).is_err());
        assert!(EngineConfig::from_json(r#"{ "no_such_key": 1 }"#).is_err());
        assert!(EngineConfig::from_json("not json").is_err());
    }
}
