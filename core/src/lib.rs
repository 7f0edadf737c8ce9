//! neurolock-core
//!
//! EEG biometric authentication engine: spectral feature extraction,
//! template aggregation, salted integrity seals, similarity matching and
//! template persistence.
//!
//! The library never prints; diagnostics go through `tracing`.

#![forbid(unsafe_code)]

// Shared and top level
pub mod constants;
pub mod types;
pub mod utils;
pub mod config;

// Pipeline
pub mod signal;
pub mod aggregate;
pub mod crypto;
pub mod matcher;
pub mod record;
pub mod store;

// Collaborators and orchestration
pub mod capture;
pub mod session;
pub mod telemetry;

// -----------------------------------------------------------------------------
// Prelude (Rust users)
// -----------------------------------------------------------------------------
pub mod prelude {
    pub use crate::capture::{CaptureGuard, DeviceStatus, SignalSource, SimulatedDevice};
    pub use crate::config::EngineConfig;
    pub use crate::crypto::{FeatureHasher, HashAlg, HashRecord};
    pub use crate::matcher::{AuthResult, SimilarityMatcher};
    pub use crate::record::{Template, Username};
    pub use crate::session::{AuthSession, CancelToken, EnrollReport};
    pub use crate::signal::{FeatureExtractor, FeatureMethod, FeatureVector, MentalTask, PreprocessStage, RawSignal};
    pub use crate::store::TemplateStore;
    pub use crate::types::{ExitStatus, NeuroError};
}
