//! Shared synthetic-signal helpers for integration tests.
#![allow(dead_code)]

use std::f32::consts::PI;
use std::path::Path;

use neurolock_core::config::EngineConfig;
use neurolock_core::signal::{MentalTask, RawSignal};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const FS: f32 = 256.0;
pub const CHANNELS: usize = 8;
pub const SAMPLES: usize = 1280;

/// Zero-mean, unit-variance uniform noise.
pub fn unit_noise(rng: &mut StdRng, n: usize) -> Vec<f32> {
    let a = 3f32.sqrt();
    (0..n).map(|_| rng.gen_range(-a..a)).collect()
}

pub fn tone(freq_hz: f32, amplitude: f32, n: usize, fs: f32) -> Vec<f32> {
    (0..n).map(|i| amplitude * (2.0 * PI * freq_hz * i as f32 / fs).sin()).collect()
}

/// 8 x 1280 unit noise, plus a 10 Hz amplitude-50 tone on channel 0.
pub fn alice_trial(seed: u64) -> RawSignal {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut channels: Vec<Vec<f32>> = (0..CHANNELS).map(|_| unit_noise(&mut rng, SAMPLES)).collect();
    for (x, t) in channels[0].iter_mut().zip(tone(10.0, 50.0, SAMPLES, FS)) {
        *x += t;
    }
    RawSignal::new(channels, FS, MentalTask::EyesClosedRest).with_timestamp(1_000 + seed as i64)
}

/// 8 x 1280 unit noise only.
pub fn noise_trial(seed: u64) -> RawSignal {
    let mut rng = StdRng::seed_from_u64(seed);
    let channels = (0..CHANNELS).map(|_| unit_noise(&mut rng, SAMPLES)).collect();
    RawSignal::new(channels, FS, MentalTask::EyesClosedRest).with_timestamp(2_000 + seed as i64)
}

pub fn config_in(dir: &Path) -> EngineConfig {
    EngineConfig::default().with_template_dir(dir)
}
