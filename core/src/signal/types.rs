//! signal/types.rs
//! Raw recordings, mental task labels, canonical bands and feature vectors.
//!
//! Every buffer that carries brain-signal samples or features is wiped on drop,
//! so early returns anywhere in the pipeline never leave biometric data behind.

use std::fmt;

use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::constants::bands;
use crate::utils::now_millis;

/// Mental task performed while recording. Persisted as `i32`.
#[repr(i32)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, TryFromPrimitive, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MentalTask {
    #[default]
    EyesClosedRest  = 0,
    EyesOpenRest    = 1,
    MentalArithmetic = 2,
    MotorImagery    = 3,
    VisualImagery   = 4,
}

impl MentalTask {
    pub const ALL: [MentalTask; 5] = [
        MentalTask::EyesClosedRest,
        MentalTask::EyesOpenRest,
        MentalTask::MentalArithmetic,
        MentalTask::MotorImagery,
        MentalTask::VisualImagery,
    ];

    #[inline]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn title(self) -> &'static str {
        match self {
            MentalTask::EyesClosedRest   => "Eyes Closed Resting State",
            MentalTask::EyesOpenRest     => "Eyes Open Resting State",
            MentalTask::MentalArithmetic => "Mental Arithmetic",
            MentalTask::MotorImagery     => "Motor Imagery",
            MentalTask::VisualImagery    => "Visual Imagery",
        }
    }

    /// Step-by-step instructions shown to the user by the command layer.
    pub fn instructions(self) -> &'static [&'static str] {
        match self {
            MentalTask::EyesClosedRest => &[
                "Sit in a comfortable position",
                "Close your eyes",
                "Relax and clear your mind",
                "Breathe normally",
                "Try to stay still until the capture ends",
            ],
            MentalTask::EyesOpenRest => &[
                "Sit in a comfortable position",
                "Keep your eyes open",
                "Focus on a point in front of you",
                "Relax and breathe normally",
                "Try to stay still until the capture ends",
            ],
            MentalTask::MentalArithmetic => &[
                "Sit in a comfortable position",
                "Solve the problem in your head without speaking",
                "Example: count backwards from 100 by 7",
                "Continue until the capture ends",
            ],
            MentalTask::MotorImagery => &[
                "Sit in a comfortable position",
                "Imagine moving your right hand",
                "Do not actually move it",
                "Visualize the movement clearly until the capture ends",
            ],
            MentalTask::VisualImagery => &[
                "Sit in a comfortable position",
                "Close your eyes",
                "Imagine a peaceful scene (beach, forest)",
                "Visualize it vividly until the capture ends",
            ],
        }
    }
}

impl fmt::Display for MentalTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Canonical EEG frequency bands, in feature order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Band {
    Delta,
    Theta,
    Alpha,
    Beta,
    Gamma,
}

impl Band {
    pub const COUNT: usize = 5;
    pub const ALL: [Band; Band::COUNT] = [Band::Delta, Band::Theta, Band::Alpha, Band::Beta, Band::Gamma];

    /// `[low, high)` edges in Hz.
    #[inline]
    pub fn range_hz(self) -> (f32, f32) {
        match self {
            Band::Delta => bands::DELTA,
            Band::Theta => bands::THETA,
            Band::Alpha => bands::ALPHA,
            Band::Beta  => bands::BETA,
            Band::Gamma => bands::GAMMA,
        }
    }

    #[inline]
    pub fn contains(self, hz: f64) -> bool {
        let (lo, hi) = self.range_hz();
        hz >= f64::from(lo) && hz < f64::from(hi)
    }

    /// Band a frequency falls into, if any.
    pub fn of(hz: f64) -> Option<Band> {
        Band::ALL.into_iter().find(|b| b.contains(hz))
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Raw multichannel recording: `channels[c][s]`.
///
/// Channels may differ in length; the extractor degrades short channels
/// to zero features instead of failing.
#[derive(Clone)]
pub struct RawSignal {
    pub channels: Vec<Vec<f32>>,
    pub sampling_rate: f32,
    pub timestamp_ms: i64,
    pub task: MentalTask,
}

impl RawSignal {
    /// New recording stamped with the current time.
    pub fn new(channels: Vec<Vec<f32>>, sampling_rate: f32, task: MentalTask) -> Self {
        Self { channels, sampling_rate, timestamp_ms: now_millis(), task }
    }

    pub fn with_timestamp(mut self, timestamp_ms: i64) -> Self {
        self.timestamp_ms = timestamp_ms;
        self
    }

    /// Zero-filled matrix of the given shape.
    pub fn zeros(n_channels: usize, n_samples: usize, sampling_rate: f32, task: MentalTask) -> Self {
        Self::new(vec![vec![0.0; n_samples]; n_channels], sampling_rate, task)
    }

    #[inline]
    pub fn n_channels(&self) -> usize {
        self.channels.len()
    }

    /// Longest channel length.
    pub fn max_samples(&self) -> usize {
        self.channels.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// No channels, or no channel carries a single sample.
    pub fn is_empty(&self) -> bool {
        self.max_samples() == 0
    }

    pub fn channel(&self, idx: usize) -> Option<&[f32]> {
        self.channels.get(idx).map(Vec::as_slice)
    }
}

impl Drop for RawSignal {
    fn drop(&mut self) {
        for ch in self.channels.iter_mut() {
            ch.zeroize();
        }
    }
}

impl fmt::Debug for RawSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawSignal")
            .field("channels", &self.n_channels())
            .field("samples", &self.max_samples())
            .field("sampling_rate", &self.sampling_rate)
            .field("timestamp_ms", &self.timestamp_ms)
            .field("task", &self.task)
            .finish()
    }
}

/// Band-power features, channel-major and band-minor.
#[derive(Clone, PartialEq)]
pub struct FeatureVector {
    pub values: Vec<f32>,
    pub task: MentalTask,
    pub timestamp_ms: i64,
}

impl FeatureVector {
    pub fn new(values: Vec<f32>, task: MentalTask, timestamp_ms: i64) -> Self {
        Self { values, task, timestamp_ms }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    /// Feature slot for `(channel, band)`.
    #[inline]
    pub fn slot(&self, channel: usize, band: Band) -> Option<f32> {
        self.values.get(channel * Band::COUNT + band.index()).copied()
    }

    /// The five band energies of one channel.
    pub fn channel_bands(&self, channel: usize) -> Option<&[f32]> {
        let start = channel * Band::COUNT;
        self.values.get(start..start + Band::COUNT)
    }
}

impl Drop for FeatureVector {
    fn drop(&mut self) {
        self.values.zeroize();
    }
}

impl fmt::Debug for FeatureVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureVector")
            .field("len", &self.values.len())
            .field("task", &self.task)
            .field("timestamp_ms", &self.timestamp_ms)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_edges_are_half_open() {
        assert_eq!(Band::of(0.25), None);
        assert_eq!(Band::of(0.5), Some(Band::Delta));
        assert_eq!(Band::of(4.0), Some(Band::Theta));
        assert_eq!(Band::of(10.0), Some(Band::Alpha));
        assert_eq!(Band::of(13.0), Some(Band::Beta));
        assert_eq!(Band::of(99.9), Some(Band::Gamma));
        assert_eq!(Band::of(100.0), None);
    }

    #[test]
    fn mental_task_roundtrips_through_i32() {
        for task in MentalTask::ALL {
            assert_eq!(MentalTask::try_from(task.as_i32()).unwrap(), task);
        }
        assert!(MentalTask::try_from(5).is_err());
        assert!(MentalTask::try_from(-1).is_err());
    }

    #[test]
    fn empty_signal_detection() {
        let none = RawSignal::new(Vec::new(), 256.0, MentalTask::EyesClosedRest);
        assert!(none.is_empty());
        let hollow = RawSignal::new(vec![Vec::new(); 4], 256.0, MentalTask::EyesClosedRest);
        assert!(hollow.is_empty());
        let zeros = RawSignal::zeros(2, 3, 256.0, MentalTask::EyesClosedRest);
        assert!(!zeros.is_empty());
        assert_eq!(zeros.max_samples(), 3);
    }

    #[test]
    fn feature_debug_does_not_leak_values() {
        let fv = FeatureVector::new(vec![123.456; 5], MentalTask::MotorImagery, 7);
        let dbg = format!("{:?}", fv);
        assert!(!dbg.contains("123.456"));
        assert_eq!(fv.slot(0, Band::Alpha), Some(123.456));
        assert_eq!(fv.channel_bands(1), None);
    }
}
