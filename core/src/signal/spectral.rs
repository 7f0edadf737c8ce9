//! signal/spectral.rs
//! Band-power spectrum of a single channel window.
//!
//! - Rectangular window over the first `W` samples.
//! - Bins `k in [0, W/2)`, bin frequency `k * fs / W`.
//! - Band energy is the sum of `|X[k]|^2` over bins with `low <= f < high`.

use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use zeroize::Zeroize;

use crate::signal::types::Band;

/// Forward FFT plan for a fixed window, shareable across threads.
#[derive(Clone)]
pub struct BandPowerAnalyzer {
    window: usize,
    fft: Arc<dyn Fft<f64>>,
}

impl std::fmt::Debug for BandPowerAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BandPowerAnalyzer").field("window", &self.window).finish()
    }
}

/// Per-call FFT buffers, wiped on drop.
pub struct SpectrumScratch {
    buffer: Vec<Complex<f64>>,
    scratch: Vec<Complex<f64>>,
}

impl Drop for SpectrumScratch {
    fn drop(&mut self) {
        for c in self.buffer.iter_mut().chain(self.scratch.iter_mut()) {
            c.re.zeroize();
            c.im.zeroize();
        }
    }
}

impl BandPowerAnalyzer {
    pub fn new(window: usize) -> Self {
        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(window);
        Self { window, fft }
    }

    #[inline]
    pub fn window(&self) -> usize {
        self.window
    }

    pub fn scratch(&self) -> SpectrumScratch {
        SpectrumScratch {
            buffer: vec![Complex::new(0.0, 0.0); self.window],
            scratch: vec![Complex::new(0.0, 0.0); self.fft.get_inplace_scratch_len()],
        }
    }

    /// Band energies of one channel, written to `out[..Band::COUNT]`.
    ///
    /// Channels shorter than the window produce all-zero energies.
    pub fn band_energies(
        &self,
        samples: &[f32],
        sampling_rate: f32,
        scratch: &mut SpectrumScratch,
        out: &mut [f32],
    ) {
        let out = &mut out[..Band::COUNT];
        out.fill(0.0);
        if samples.len() < self.window {
            return;
        }

        for (dst, &s) in scratch.buffer.iter_mut().zip(&samples[..self.window]) {
            *dst = Complex::new(f64::from(s), 0.0);
        }
        self.fft.process_with_scratch(&mut scratch.buffer, &mut scratch.scratch);

        let mut acc = [0f64; Band::COUNT];
        let bin_hz = f64::from(sampling_rate) / self.window as f64;
        for (k, c) in scratch.buffer[..self.window / 2].iter().enumerate() {
            if let Some(band) = Band::of(k as f64 * bin_hz) {
                acc[band.index()] += c.norm_sqr();
            }
        }
        for (o, a) in out.iter_mut().zip(acc.iter()) {
            *o = *a as f32;
        }
        acc.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn short_channel_is_zero() {
        let a = BandPowerAnalyzer::new(256);
        let mut s = a.scratch();
        let mut out = [9.0f32; 5];
        a.band_energies(&[1.0; 100], 256.0, &mut s, &mut out);
        assert_eq!(out, [0.0; 5]);
    }

    #[test]
    fn bin_aligned_tone_lands_in_its_band() {
        let a = BandPowerAnalyzer::new(256);
        let mut s = a.scratch();
        let tone: Vec<f32> = (0..256).map(|n| (2.0 * PI * 20.0 * n as f32 / 256.0).sin()).collect();
        let mut out = [0f32; 5];
        a.band_energies(&tone, 256.0, &mut s, &mut out);
        let total: f32 = out.iter().sum();
        assert!(out[Band::Beta.index()] / total > 0.99);
        // |X[20]| = W/2 for a unit sine
        assert!((out[Band::Beta.index()] - 128.0 * 128.0).abs() < 1.0);
    }

    #[test]
    fn dc_is_outside_every_band() {
        let a = BandPowerAnalyzer::new(64);
        let mut s = a.scratch();
        let mut out = [0f32; 5];
        a.band_energies(&[3.0; 64], 64.0, &mut s, &mut out);
        assert!(out.iter().all(|&e| e < 1e-6));
    }
}
