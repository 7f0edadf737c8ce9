//! capture/simulated.rs
//! Software device producing uniform noise plus an optional per-device tone.
//!
//! The tone's frequency and channel derive from the device name, so the same
//! name yields recordings with the same spectral signature across runs. The
//! noise generator is a plain PRNG; it never feeds salts.

use std::f32::consts::PI;
use std::io;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::capture::{device_error, DeviceStatus, SignalSource};
use crate::signal::{MentalTask, RawSignal};
use crate::types::NeuroError;

/// Peak amplitude of the uniform noise floor.
pub const NOISE_AMPLITUDE: f32 = 50.0;

/// Peak amplitude of a device's signature tone. Well above the noise floor so
/// that devices whose tones sit on different channels do not match.
pub const SIGNATURE_AMPLITUDE: f32 = 4.0 * NOISE_AMPLITUDE;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Signature {
    pub channel: usize,
    pub freq_hz: f32,
    pub amplitude: f32,
}

impl Signature {
    /// Alpha-band tone picked from the name's hash.
    pub fn from_name(name: &str, channels: usize) -> Self {
        let h = blake3::hash(name.as_bytes());
        let b = h.as_bytes();
        Signature {
            channel: b[0] as usize % channels.max(1),
            freq_hz: 8.0 + f32::from(b[1] % 5),
            amplitude: SIGNATURE_AMPLITUDE,
        }
    }
}

/// What the next `record` call should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimulatedBehavior {
    #[default]
    Normal,
    /// Succeed with no samples.
    Empty,
    /// Fail with a device error.
    Fault,
}

#[derive(Debug)]
pub struct SimulatedDevice {
    name: String,
    channels: usize,
    sampling_rate: f32,
    status: DeviceStatus,
    signature: Option<Signature>,
    behavior: SimulatedBehavior,
    rng: StdRng,
}

impl SimulatedDevice {
    pub fn new(name: impl Into<String>, channels: usize, sampling_rate: f32) -> Self {
        let name = name.into();
        let signature = Some(Signature::from_name(&name, channels));
        Self {
            name,
            channels,
            sampling_rate,
            status: DeviceStatus::Disconnected,
            signature,
            behavior: SimulatedBehavior::Normal,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic noise.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn with_signature(mut self, signature: Option<Signature>) -> Self {
        self.signature = signature;
        self
    }

    pub fn with_behavior(mut self, behavior: SimulatedBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn signature(&self) -> Option<Signature> {
        self.signature
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn sampling_rate(&self) -> f32 {
        self.sampling_rate
    }

    fn synthesize(&mut self, n_samples: usize) -> Vec<Vec<f32>> {
        let mut channels = Vec::with_capacity(self.channels);
        for c in 0..self.channels {
            let mut ch: Vec<f32> = (0..n_samples)
                .map(|_| self.rng.gen_range(-NOISE_AMPLITUDE..NOISE_AMPLITUDE))
                .collect();
            if let Some(sig) = self.signature.filter(|s| s.channel == c) {
                for (n, x) in ch.iter_mut().enumerate() {
                    let t = n as f32 / self.sampling_rate;
                    *x += sig.amplitude * (2.0 * PI * sig.freq_hz * t).sin();
                }
            }
            channels.push(ch);
        }
        channels
    }
}

impl SignalSource for SimulatedDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn status(&self) -> DeviceStatus {
        self.status
    }

    fn connect(&mut self) -> Result<(), NeuroError> {
        self.status = DeviceStatus::Connected;
        debug!(device = %self.name, "connected");
        Ok(())
    }

    fn start_streaming(&mut self) -> Result<(), NeuroError> {
        if self.status != DeviceStatus::Connected {
            return Err(device_error(io::ErrorKind::NotConnected, format!("{}: not connected", self.name)));
        }
        self.status = DeviceStatus::Streaming;
        Ok(())
    }

    fn record(&mut self, duration_secs: f32, task: MentalTask) -> Result<RawSignal, NeuroError> {
        if self.status != DeviceStatus::Streaming {
            return Err(device_error(io::ErrorKind::NotConnected, format!("{}: not streaming", self.name)));
        }
        if !duration_secs.is_finite() || duration_secs <= 0.0 {
            return Err(NeuroError::validation(format!("capture duration {} must be > 0", duration_secs)));
        }
        match self.behavior {
            SimulatedBehavior::Fault => {
                self.status = DeviceStatus::Error;
                Err(device_error(io::ErrorKind::Other, format!("{}: simulated device fault", self.name)))
            }
            SimulatedBehavior::Empty => Ok(RawSignal::new(Vec::new(), self.sampling_rate, task)),
            SimulatedBehavior::Normal => {
                let n = (duration_secs * self.sampling_rate).round() as usize;
                let channels = self.synthesize(n);
                debug!(device = %self.name, samples = n, task = %task, "recorded");
                Ok(RawSignal::new(channels, self.sampling_rate, task))
            }
        }
    }

    fn stop_streaming(&mut self) -> Result<(), NeuroError> {
        if self.status == DeviceStatus::Streaming {
            self.status = DeviceStatus::Connected;
        }
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), NeuroError> {
        self.status = DeviceStatus::Disconnected;
        debug!(device = %self.name, "disconnected");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureGuard;
    use crate::config::EngineConfig;
    use crate::matcher::cosine_similarity;
    use crate::signal::{FeatureExtractor, FeatureVector};

    #[test]
    fn guard_restores_disconnected_state() {
        let mut dev = SimulatedDevice::new("sim", 4, 128.0).with_seed(1);
        {
            let mut guard = CaptureGuard::start(&mut dev).unwrap();
            assert_eq!(guard.status(), DeviceStatus::Streaming);
            let sig = guard.record(1.0, MentalTask::EyesOpenRest).unwrap();
            assert_eq!(sig.n_channels(), 4);
            assert_eq!(sig.max_samples(), 128);
        }
        assert_eq!(dev.status(), DeviceStatus::Disconnected);
    }

    #[test]
    fn fault_still_disconnects() {
        let mut dev = SimulatedDevice::new("sim", 2, 64.0).with_behavior(SimulatedBehavior::Fault);
        {
            let mut guard = CaptureGuard::start(&mut dev).unwrap();
            assert!(guard.record(1.0, MentalTask::EyesClosedRest).is_err());
        }
        assert_eq!(dev.status(), DeviceStatus::Disconnected);
    }

    #[test]
    fn record_requires_streaming() {
        let mut dev = SimulatedDevice::new("sim", 2, 64.0);
        assert!(dev.record(1.0, MentalTask::EyesClosedRest).is_err());
    }

    #[test]
    fn signature_is_stable_per_name() {
        let a = Signature::from_name("headset-1", 8);
        let b = Signature::from_name("headset-1", 8);
        assert_eq!(a, b);
        assert!((8.0..13.0).contains(&a.freq_hz));
        assert!(a.channel < 8);
        assert_eq!(a.amplitude, SIGNATURE_AMPLITUDE);
    }

    fn capture_features(signature: Signature, seed: u64) -> FeatureVector {
        let cfg = EngineConfig::default();
        let mut dev = SimulatedDevice::new("sim", cfg.channels, cfg.sampling_rate)
            .with_seed(seed)
            .with_signature(Some(signature));
        let raw = {
            let mut guard = CaptureGuard::start(&mut dev).unwrap();
            guard.record(cfg.capture_secs, MentalTask::EyesClosedRest).unwrap()
        };
        FeatureExtractor::from_config(&cfg).unwrap().extract(&raw).unwrap()
    }

    #[test]
    fn signatures_on_other_channels_do_not_match() {
        let threshold = EngineConfig::default().similarity_threshold;
        let own = Signature { channel: 0, freq_hz: 10.0, amplitude: SIGNATURE_AMPLITUDE };
        let other = Signature { channel: 3, freq_hz: 10.0, amplitude: SIGNATURE_AMPLITUDE };

        let enrolled = capture_features(own, 1);
        let genuine = capture_features(own, 2);
        let impostor = capture_features(other, 3);

        let genuine_score = cosine_similarity(genuine.as_slice(), enrolled.as_slice()).unwrap();
        let impostor_score = cosine_similarity(impostor.as_slice(), enrolled.as_slice()).unwrap();
        assert!(genuine_score >= threshold, "genuine scored {}", genuine_score);
        assert!(impostor_score < threshold, "impostor scored {}", impostor_score);
    }
}
