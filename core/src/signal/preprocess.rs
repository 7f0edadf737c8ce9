//! signal/preprocess.rs
//! Preprocessing stages applied to a private copy of the recording.
//!
//! Stages run in the configured order. `Normalize` is built; the filter stages
//! are extension points and fail loudly instead of passing data through.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::MIN_CHANNEL_VARIANCE;
use crate::types::NeuroError;
use crate::utils::{mean, variance};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PreprocessStage {
    /// Band-limit every channel to `[low_hz, high_hz]`.
    Bandpass { low_hz: f32, high_hz: f32 },
    /// Remove mains interference at `freq_hz` (50 or 60 Hz).
    Notch { freq_hz: f32 },
    /// Drop or repair blink and muscle artifacts.
    ArtifactRejection,
    /// Zero mean, unit variance per channel.
    Normalize,
}

impl PreprocessStage {
    pub fn name(&self) -> &'static str {
        match self {
            PreprocessStage::Bandpass { .. } => "bandpass filter",
            PreprocessStage::Notch { .. } => "notch filter",
            PreprocessStage::ArtifactRejection => "artifact rejection",
            PreprocessStage::Normalize => "normalization",
        }
    }

    pub fn is_implemented(&self) -> bool {
        matches!(self, PreprocessStage::Normalize)
    }

    /// Apply this stage to every channel in place.
    pub fn apply(&self, channels: &mut [Vec<f32>]) -> Result<(), NeuroError> {
        match self {
            PreprocessStage::Bandpass { .. }
            | PreprocessStage::Notch { .. }
            | PreprocessStage::ArtifactRejection => Err(NeuroError::NotImplemented(self.name())),
            PreprocessStage::Normalize => {
                let skipped = channels.iter_mut().map(|ch| normalize_channel(ch)).filter(|ok| !ok).count();
                debug!(channels = channels.len(), skipped, "channels normalized");
                Ok(())
            }
        }
    }
}

impl fmt::Display for PreprocessStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreprocessStage::Bandpass { low_hz, high_hz } =>
                write!(f, "bandpass({}-{} Hz)", low_hz, high_hz),
            PreprocessStage::Notch { freq_hz } => write!(f, "notch({} Hz)", freq_hz),
            other => f.write_str(other.name()),
        }
    }
}

/// Run `stages` in order; the first failure aborts.
pub fn run_stages(stages: &[PreprocessStage], channels: &mut [Vec<f32>]) -> Result<(), NeuroError> {
    for stage in stages {
        stage.apply(channels)?;
    }
    Ok(())
}

/// Normalize one channel in place. Returns `false` when the channel is left
/// untouched because its variance is below `MIN_CHANNEL_VARIANCE`.
pub fn normalize_channel(ch: &mut [f32]) -> bool {
    let m = mean(ch);
    let var = variance(ch, m);
    if var < MIN_CHANNEL_VARIANCE {
        return false;
    }
    let sd = var.sqrt();
    for x in ch.iter_mut() {
        *x = ((f64::from(*x) - m) / sd) as f32;
    }
    true
}
