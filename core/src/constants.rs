//! constants.rs
//! Defaults and hard bounds shared by the pipeline, the record format and the store.

/// Template record format version written by this crate.
pub const TEMPLATE_FORMAT_V1: u32 = 1;

/// File extension for persisted templates ("NeuroLock Template").
pub const TEMPLATE_EXTENSION: &str = "nlt";
pub const DEFAULT_TEMPLATE_DIR: &str = "./templates";

/// Acquisition defaults (used by the simulated device and for empty captures).
pub const DEFAULT_SAMPLING_RATE: f32 = 256.0;
pub const DEFAULT_CHANNELS: usize = 8;
pub const DEFAULT_CAPTURE_SECS: f32 = 5.0;

/// Spectral window (samples per channel fed to the DFT).
pub const DEFAULT_WINDOW: usize = 256;
pub const MIN_WINDOW: usize = 8;
pub const MAX_WINDOW: usize = 1 << 16;

/// Channels whose variance falls below this are left un-normalized.
pub const MIN_CHANNEL_VARIANCE: f64 = 1e-6;

/// Vectors with a smaller L2 norm cannot be compared.
pub const MIN_MAGNITUDE: f64 = 1e-6;

pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.85;
pub const DEFAULT_ENROLMENT_TRIALS: usize = 3;
pub const DEFAULT_MAX_AUTH_ATTEMPTS: u32 = 3;
pub const DEFAULT_AUTH_TIMEOUT_SECS: u64 = 30;

/// Salt defaults and bounds (bytes).
pub const SALT_LEN: usize = 32;
pub const MIN_SALT_LEN: usize = 16;
pub const MAX_SALT_LEN: usize = 64;

/// Largest digest any supported primitive emits (SHA-512).
pub const MAX_DIGEST_LEN: usize = 64;

/// Username bound in bytes. Longer names are rejected, never truncated.
pub const MAX_USERNAME_LEN: usize = 64;

/// A writer lock older than this is presumed orphaned and may be broken.
pub const LOCK_STALE_SECS: i64 = 60;

/// Sanity bounds applied while decoding a record.
pub const MAX_FEATURE_COUNT: u64 = 4096;
pub const MAX_RECORD_LEN: u64 = 1024 * 1024;

/// Canonical band edges in Hz, `[low, high)`.
pub mod bands {
    pub const DELTA: (f32, f32) = (0.5, 4.0);
    pub const THETA: (f32, f32) = (4.0, 8.0);
    pub const ALPHA: (f32, f32) = (8.0, 13.0);
    pub const BETA: (f32, f32) = (13.0, 30.0);
    pub const GAMMA: (f32, f32) = (30.0, 100.0);
}

/// Hash primitive identifiers (mirrored in config files).
pub mod hash_ids {
    pub const SHA256: u16 = 0x0001;
    pub const SHA512: u16 = 0x0002;
    pub const BLAKE3: u16 = 0x0003;
}
