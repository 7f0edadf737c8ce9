//! telemetry/mod.rs
//! Per-stage timing for enrollment and authentication runs.
//!
//! Timings are collected into a `TelemetryTimer` owned by the operation and
//! echoed through `tracing` at debug level as each stage completes.

pub mod timers;

pub use timers::*;
