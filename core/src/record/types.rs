//! record/types.rs
//! Template record, validated usernames and record errors.
//!
//! On-disk layout (all integers little-endian, no padding):
//!
//! ```text
//! version         u32     must be 1
//! username_len    u32     1..=64
//! username        UTF-8   [A-Za-z0-9._-], no leading '.'
//! task            i32     MentalTask discriminant
//! created_at      i64     epoch seconds
//! last_used       i64     epoch seconds
//! feature_count   u64     <= 4096
//! features        f32 x feature_count
//! hash_len        u64     1..=64
//! hash            bytes
//! salt_len        u64     16..=64
//! salt            bytes
//! ```

use std::fmt;

use crate::constants::{MAX_USERNAME_LEN, TEMPLATE_FORMAT_V1};
use crate::crypto::HashRecord;
use crate::signal::{FeatureVector, MentalTask};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// Input ended before `field` could be read.
    Truncated { field: &'static str, need: usize, have: usize },

    /// Whole record exceeds the size bound.
    TooLarge { len: u64, max: u64 },

    UnsupportedVersion(u32),

    /// A length or count field is outside its accepted range.
    OutOfBounds { field: &'static str, value: u64, min: u64, max: u64 },

    InvalidUsername(String),

    UnknownTask(i32),

    /// Bytes left over after the last field.
    TrailingBytes(usize),

    /// Buffer reservation failed.
    Alloc(String),
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::Truncated { field, need, have } =>
                write!(f, "truncated record at {}: need {} bytes, have {}", field, need, have),
            RecordError::TooLarge { len, max } =>
                write!(f, "record too large: {} bytes (max {})", len, max),
            RecordError::UnsupportedVersion(v) =>
                write!(f, "unsupported record version {}", v),
            RecordError::OutOfBounds { field, value, min, max } =>
                write!(f, "{} = {} outside {}..={}", field, value, min, max),
            RecordError::InvalidUsername(msg) =>
                write!(f, "invalid username: {}", msg),
            RecordError::UnknownTask(raw) =>
                write!(f, "unknown mental task label {}", raw),
            RecordError::TrailingBytes(n) =>
                write!(f, "{} trailing bytes after record", n),
            RecordError::Alloc(msg) =>
                write!(f, "allocation failed: {}", msg),
        }
    }
}

impl std::error::Error for RecordError {}

/// A username safe to embed in a file name.
///
/// 1..=64 bytes of `[A-Za-z0-9._-]`, not starting with `.`. Longer input is
/// rejected, never truncated.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Username(String);

impl Username {
    pub fn parse(raw: &str) -> Result<Self, RecordError> {
        if raw.is_empty() {
            return Err(RecordError::InvalidUsername("empty".into()));
        }
        if raw.len() > MAX_USERNAME_LEN {
            return Err(RecordError::InvalidUsername(format!(
                "{} bytes exceeds {}",
                raw.len(),
                MAX_USERNAME_LEN
            )));
        }
        if raw.starts_with('.') {
            return Err(RecordError::InvalidUsername("must not start with '.'".into()));
        }
        if let Some(c) = raw.chars().find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))) {
            return Err(RecordError::InvalidUsername(format!("character {:?} not allowed", c)));
        }
        Ok(Username(raw.to_owned()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for Username {
    type Error = RecordError;

    fn try_from(raw: &str) -> Result<Self, Self::Error> {
        Username::parse(raw)
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Persisted biometric reference for one user.
///
/// The plaintext feature vector sits next to its seal: the seal detects
/// tampering but does not hide the vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub version: u32,
    pub username: Username,
    pub features: FeatureVector,
    pub seal: HashRecord,
    pub task: MentalTask,
    /// Epoch seconds.
    pub created_at: i64,
    /// Epoch seconds.
    pub last_used: i64,
}

impl Template {
    /// New version-1 template; both timestamps set to `now`.
    pub fn new(username: Username, features: FeatureVector, seal: HashRecord, now: i64) -> Self {
        let task = features.task;
        Self {
            version: TEMPLATE_FORMAT_V1,
            username,
            features,
            seal,
            task,
            created_at: now,
            last_used: now,
        }
    }
}
