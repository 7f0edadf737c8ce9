//! telemetry/timers.rs
//! Stage timers for the enrollment and authentication pipelines.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Capture,
    Extract,
    Aggregate,
    Seal,
    Verify,
    Match,
    Update,
    Read,
    Write,
}

impl Stage {
    pub const ALL: [Stage; 9] = [
        Stage::Capture,
        Stage::Extract,
        Stage::Aggregate,
        Stage::Seal,
        Stage::Verify,
        Stage::Match,
        Stage::Update,
        Stage::Read,
        Stage::Write,
    ];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Capture   => "capture",
            Stage::Extract   => "extract",
            Stage::Aggregate => "aggregate",
            Stage::Seal      => "seal",
            Stage::Verify    => "verify",
            Stage::Match     => "match",
            Stage::Update    => "update",
            Stage::Read      => "read",
            Stage::Write     => "write",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageTimes {
    times: HashMap<Stage, Duration>,
}

impl StageTimes {
    /// Add duration to a stage (accumulates if already present).
    pub fn add(&mut self, stage: Stage, dur: Duration) {
        *self.times.entry(stage).or_insert(Duration::ZERO) += dur;
    }

    pub fn get(&self, stage: Stage) -> Duration {
        self.times.get(&stage).copied().unwrap_or(Duration::ZERO)
    }

    /// Sum of all recorded stages.
    pub fn total(&self) -> Duration {
        self.times.values().copied().sum()
    }

    /// True when every stage in `expected` was recorded.
    pub fn has_all(&self, expected: &[Stage]) -> bool {
        expected.iter().all(|s| self.times.contains_key(s))
    }

    /// Recorded stages in pipeline order.
    pub fn ordered(&self) -> Vec<(Stage, Duration)> {
        Stage::ALL
            .iter()
            .filter_map(|s| self.times.get(s).map(|d| (*s, *d)))
            .collect()
    }
}

#[derive(Clone, Debug)]
pub struct TelemetryTimer {
    pub start_time: Instant,
    pub end_time: Option<Instant>,
    pub stage_times: StageTimes,
}

impl Default for TelemetryTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryTimer {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            end_time: None,
            stage_times: StageTimes::default(),
        }
    }

    pub fn finish(&mut self) {
        self.end_time = Some(Instant::now());
    }

    pub fn add_stage_time(&mut self, stage: Stage, dur: Duration) {
        self.stage_times.add(stage, dur);
    }

    /// Run `f`, charge its wall time to `stage`, and log it.
    /// The time is recorded whether `f` succeeds or not.
    pub fn time<T, F>(&mut self, stage: Stage, f: F) -> T
    where
        F: FnOnce() -> T,
    {
        let t = Instant::now();
        let out = f();
        let dur = t.elapsed();
        self.add_stage_time(stage, dur);
        debug!(stage = %stage, elapsed_us = dur.as_micros() as u64, "stage finished");
        out
    }

    pub fn elapsed(&self) -> Duration {
        match self.end_time {
            Some(end) => end.duration_since(self.start_time),
            None => Instant::now().duration_since(self.start_time),
        }
    }
}
