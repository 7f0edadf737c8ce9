//! signal/extractor.rs
//! Raw recording -> fixed-length band-power feature vector.
//!
//! Per call:
//! 1. validate shape, sampling rate and sample values,
//! 2. copy the channels into a wiped-on-drop buffer,
//! 3. run the configured preprocessing stages,
//! 4. compute five band energies per channel (channel-major, band-minor).
//!
//! The extractor is immutable after construction and `Sync`; batch
//! extraction fans trials out to scoped worker threads.

use std::thread;

use crossbeam::channel::bounded;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use zeroize::Zeroizing;

use crate::config::EngineConfig;
use crate::constants::{MAX_WINDOW, MIN_WINDOW};
use crate::signal::preprocess::{run_stages, PreprocessStage};
use crate::signal::spectral::BandPowerAnalyzer;
use crate::signal::types::{Band, FeatureVector, RawSignal};
use crate::types::NeuroError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureMethod {
    #[default]
    BandPower,
    Wavelet,
}

#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    channels: usize,
    stages: Vec<PreprocessStage>,
    method: FeatureMethod,
    parallel: bool,
    analyzer: BandPowerAnalyzer,
}

impl FeatureExtractor {
    pub fn new(
        channels: usize,
        window: usize,
        stages: Vec<PreprocessStage>,
        method: FeatureMethod,
    ) -> Result<Self, NeuroError> {
        if channels == 0 {
            return Err(NeuroError::validation("extractor needs at least one channel"));
        }
        if !(MIN_WINDOW..=MAX_WINDOW).contains(&window) {
            return Err(NeuroError::validation(format!(
                "window {} outside {}..={}",
                window, MIN_WINDOW, MAX_WINDOW
            )));
        }
        Ok(Self {
            channels,
            stages,
            method,
            parallel: true,
            analyzer: BandPowerAnalyzer::new(window),
        })
    }

    pub fn from_config(cfg: &EngineConfig) -> Result<Self, NeuroError> {
        Ok(Self::new(cfg.channels, cfg.window, cfg.stages.clone(), cfg.feature_method)?
            .with_parallel(cfg.parallel_extraction))
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    #[inline]
    pub fn window(&self) -> usize {
        self.analyzer.window()
    }

    /// Output vector length: channels x bands.
    #[inline]
    pub fn feature_len(&self) -> usize {
        self.channels * Band::COUNT
    }

    fn validate(&self, signal: &RawSignal) -> Result<(), NeuroError> {
        if signal.is_empty() {
            return Err(NeuroError::validation("empty signal"));
        }
        if !signal.sampling_rate.is_finite() || signal.sampling_rate <= 0.0 {
            return Err(NeuroError::validation(format!(
                "invalid sampling rate {}",
                signal.sampling_rate
            )));
        }
        if signal.n_channels() != self.channels {
            return Err(NeuroError::validation(format!(
                "signal has {} channels, expected {}",
                signal.n_channels(),
                self.channels
            )));
        }
        if let Some(c) = signal.channels.iter().position(|ch| ch.iter().any(|x| !x.is_finite())) {
            return Err(NeuroError::validation(format!("channel {} contains non-finite samples", c)));
        }
        Ok(())
    }

    /// Extract one feature vector. The timestamp is the signal's.
    pub fn extract(&self, signal: &RawSignal) -> Result<FeatureVector, NeuroError> {
        self.validate(signal)?;

        let mut work = Zeroizing::new(signal.channels.clone());
        run_stages(&self.stages, &mut work)?;

        match self.method {
            FeatureMethod::BandPower => {}
            FeatureMethod::Wavelet => return Err(NeuroError::NotImplemented("wavelet feature extraction")),
        }

        let mut values = vec![0f32; self.feature_len()];
        let mut scratch = self.analyzer.scratch();
        let mut degraded = 0usize;
        for (ch, out) in work.iter().zip(values.chunks_exact_mut(Band::COUNT)) {
            if ch.len() < self.window() {
                degraded += 1;
            }
            self.analyzer.band_energies(ch, signal.sampling_rate, &mut scratch, out);
        }
        trace!(channels = self.channels, degraded, "band energies computed");

        Ok(FeatureVector::new(values, signal.task, signal.timestamp_ms))
    }

    /// Extract every trial. The first failure aborts the batch; vectors
    /// already produced are dropped (and wiped).
    pub fn extract_batch(&self, signals: &[RawSignal]) -> Result<Vec<FeatureVector>, NeuroError> {
        if !self.parallel || signals.len() < 2 {
            return signals.iter().map(|s| self.extract(s)).collect();
        }

        debug!(trials = signals.len(), "parallel extraction");
        let (tx, rx) = bounded::<(usize, Result<FeatureVector, NeuroError>)>(signals.len());

        let mut slots: Vec<Option<FeatureVector>> = Vec::new();
        slots.resize_with(signals.len(), || None);

        thread::scope(|scope| {
            for (i, signal) in signals.iter().enumerate() {
                let tx = tx.clone();
                scope.spawn(move || {
                    // receiver outlives the scope
                    let _ = tx.send((i, self.extract(signal)));
                });
            }
            drop(tx);

            for (i, res) in rx.iter() {
                slots[i] = Some(res?);
            }
            Ok::<(), NeuroError>(())
        })?;

        slots
            .into_iter()
            .map(|v| v.ok_or_else(|| NeuroError::Resource("extraction worker exited without a result".into())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::MentalTask;

    fn extractor(channels: usize) -> FeatureExtractor {
        FeatureExtractor::new(channels, 64, vec![PreprocessStage::Normalize], FeatureMethod::BandPower).unwrap()
    }

    #[test]
    fn rejects_bad_shapes() {
        let ex = extractor(2);
        let empty = RawSignal::new(vec![], 64.0, MentalTask::EyesClosedRest);
        assert!(matches!(ex.extract(&empty), Err(NeuroError::Validation(_))));

        let wrong = RawSignal::zeros(3, 64, 64.0, MentalTask::EyesClosedRest);
        assert!(matches!(ex.extract(&wrong), Err(NeuroError::Validation(_))));

        let bad_rate = RawSignal::zeros(2, 64, 0.0, MentalTask::EyesClosedRest);
        assert!(matches!(ex.extract(&bad_rate), Err(NeuroError::Validation(_))));

        let mut nan = RawSignal::zeros(2, 64, 64.0, MentalTask::EyesClosedRest);
        nan.channels[1][3] = f32::NAN;
        assert!(matches!(ex.extract(&nan), Err(NeuroError::Validation(_))));
    }

    #[test]
    fn constructor_bounds() {
        assert!(FeatureExtractor::new(0, 64, vec![], FeatureMethod::BandPower).is_err());
        assert!(FeatureExtractor::new(1, 4, vec![], FeatureMethod::BandPower).is_err());
    }

    #[test]
    fn wavelet_is_not_implemented() {
        let ex = FeatureExtractor::new(1, 64, vec![], FeatureMethod::Wavelet).unwrap();
        let sig = RawSignal::zeros(1, 64, 64.0, MentalTask::EyesClosedRest);
        assert!(matches!(ex.extract(&sig), Err(NeuroError::NotImplemented(_))));
    }

    #[test]
    fn vector_length_is_channels_times_bands() {
        let ex = extractor(3);
        let sig = RawSignal::zeros(3, 10, 64.0, MentalTask::EyesClosedRest);
        let fv = ex.extract(&sig).unwrap();
        assert_eq!(fv.len(), 15);
        assert!(fv.values.iter().all(|&v| v == 0.0));
    }
}
