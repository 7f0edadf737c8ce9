//! capture/mod.rs
//! Acquisition collaborator: the device seam, its state machine and an RAII
//! session guard.
//!
//! Device state lives in the source value itself; nothing here is global.

pub mod simulated;

pub use simulated::*;

use std::fmt;
use std::io;

use tracing::{debug, warn};

use crate::signal::{MentalTask, RawSignal};
use crate::types::NeuroError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceStatus {
    #[default]
    Disconnected,
    Connected,
    Streaming,
    Error,
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceStatus::Disconnected => "disconnected",
            DeviceStatus::Connected    => "connected",
            DeviceStatus::Streaming    => "streaming",
            DeviceStatus::Error        => "error",
        };
        f.write_str(name)
    }
}

/// Something that produces raw recordings.
///
/// Lifecycle: `Disconnected -> connect -> Connected -> start_streaming ->
/// Streaming -> (record)* -> stop_streaming -> Connected -> disconnect`.
pub trait SignalSource {
    fn name(&self) -> &str;

    fn status(&self) -> DeviceStatus;

    fn connect(&mut self) -> Result<(), NeuroError>;

    fn start_streaming(&mut self) -> Result<(), NeuroError>;

    /// Record `duration_secs` of data while the user performs `task`.
    fn record(&mut self, duration_secs: f32, task: MentalTask) -> Result<RawSignal, NeuroError>;

    fn stop_streaming(&mut self) -> Result<(), NeuroError>;

    fn disconnect(&mut self) -> Result<(), NeuroError>;
}

pub(crate) fn device_error(kind: io::ErrorKind, msg: impl Into<String>) -> NeuroError {
    NeuroError::Io(io::Error::new(kind, msg.into()))
}

/// Connects and starts streaming on creation; stops and disconnects on drop,
/// on every exit path.
pub struct CaptureGuard<'a, S: SignalSource + ?Sized> {
    source: &'a mut S,
}

impl<'a, S: SignalSource + ?Sized> CaptureGuard<'a, S> {
    pub fn start(source: &'a mut S) -> Result<Self, NeuroError> {
        if source.status() == DeviceStatus::Disconnected || source.status() == DeviceStatus::Error {
            source.connect()?;
        }
        // guard exists from here on, so a failed start still disconnects
        let guard = CaptureGuard { source };
        if guard.source.status() != DeviceStatus::Streaming {
            guard.source.start_streaming()?;
        }
        debug!(device = guard.source.name(), "capture started");
        Ok(guard)
    }

    pub fn record(&mut self, duration_secs: f32, task: MentalTask) -> Result<RawSignal, NeuroError> {
        self.source.record(duration_secs, task)
    }

    pub fn status(&self) -> DeviceStatus {
        self.source.status()
    }
}

impl<S: SignalSource + ?Sized> Drop for CaptureGuard<'_, S> {
    fn drop(&mut self) {
        if self.source.status() == DeviceStatus::Streaming {
            if let Err(e) = self.source.stop_streaming() {
                warn!(device = self.source.name(), error = %e, "stop streaming failed");
            }
        }
        if self.source.status() != DeviceStatus::Disconnected {
            if let Err(e) = self.source.disconnect() {
                warn!(device = self.source.name(), error = %e, "disconnect failed");
            }
        }
        debug!(device = self.source.name(), "capture closed");
    }
}
