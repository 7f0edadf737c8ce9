use std::collections::TryReserveError;
use std::fmt;
use std::io;

use crate::crypto::CryptoError;
use crate::matcher::MatchError;
use crate::record::RecordError;

/// Unified pipeline error covering validation, resources, I/O, crypto and unbuilt stages.
/// - Ergonomic `From<T>` impls enable `?` across extraction, sealing and persistence.
/// - Messages aim to be stable and contextual for logs.
#[derive(Debug)]
pub enum NeuroError {
    /// Empty, malformed or size-mismatched input.
    Validation(String),

    /// Allocation could not be satisfied.
    Resource(String),

    /// Open/read/write/rename failure.
    Io(io::Error),

    /// Corrupt, truncated or out-of-bounds template record.
    Record(RecordError),

    /// Salt generation, digest or integrity failure.
    Crypto(CryptoError),

    /// A processing stage that exists as an extension point but is not built.
    NotImplemented(&'static str),

    /// The caller's cancellation token fired between stages.
    Cancelled,
}

impl NeuroError {
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            NeuroError::Validation(_) => ExitStatus::Validation,
            NeuroError::Resource(_) => ExitStatus::Resource,
            NeuroError::Io(_) | NeuroError::Record(_) => ExitStatus::Io,
            NeuroError::Crypto(_) => ExitStatus::Crypto,
            NeuroError::NotImplemented(_) => ExitStatus::NotImplemented,
            NeuroError::Cancelled => ExitStatus::Cancelled,
        }
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        NeuroError::Validation(msg.into())
    }
}

impl fmt::Display for NeuroError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NeuroError::Validation(msg) => write!(f, "validation error: {}", msg),
            NeuroError::Resource(msg) => write!(f, "resource error: {}", msg),
            NeuroError::Io(e) => write!(f, "I/O error: {}", e),
            NeuroError::Record(e) => write!(f, "template record error: {}", e),
            NeuroError::Crypto(e) => write!(f, "crypto error: {}", e),
            NeuroError::NotImplemented(stage) => write!(f, "not implemented: {}", stage),
            NeuroError::Cancelled => write!(f, "operation cancelled"),
        }
    }
}

impl std::error::Error for NeuroError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NeuroError::Io(e) => Some(e),
            NeuroError::Record(e) => Some(e),
            NeuroError::Crypto(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for NeuroError {
    fn from(e: io::Error) -> Self {
        NeuroError::Io(e)
    }
}

impl From<RecordError> for NeuroError {
    fn from(e: RecordError) -> Self {
        match e {
            RecordError::Alloc(msg) => NeuroError::Resource(msg),
            other => NeuroError::Record(other),
        }
    }
}

impl From<CryptoError> for NeuroError {
    fn from(e: CryptoError) -> Self {
        NeuroError::Crypto(e)
    }
}

impl From<MatchError> for NeuroError {
    fn from(e: MatchError) -> Self {
        NeuroError::Validation(e.to_string())
    }
}

impl From<TryReserveError> for NeuroError {
    fn from(e: TryReserveError) -> Self {
        NeuroError::Resource(e.to_string())
    }
}

/// Machine-readable outcome for the command layer.
/// Rejection is a normal negative outcome and keeps its own code.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExitStatus {
    Success        = 0,
    Rejected       = 1,
    Validation     = 2,
    Io             = 3,
    Crypto         = 4,
    NotImplemented = 5,
    Resource       = 6,
    Cancelled      = 7,
}

impl ExitStatus {
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    #[inline]
    pub fn is_success(self) -> bool {
        self == ExitStatus::Success
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExitStatus::Success        => "success",
            ExitStatus::Rejected       => "rejected",
            ExitStatus::Validation     => "validation",
            ExitStatus::Io             => "io",
            ExitStatus::Crypto         => "crypto",
            ExitStatus::NotImplemented => "not-implemented",
            ExitStatus::Resource       => "resource",
            ExitStatus::Cancelled      => "cancelled",
        };
        f.write_str(name)
    }
}

impl<T> From<&Result<T, NeuroError>> for ExitStatus
where
    T: Outcome,
{
    fn from(r: &Result<T, NeuroError>) -> Self {
        match r {
            Ok(v) => v.exit_status(),
            Err(e) => e.exit_status(),
        }
    }
}

/// Successful results that still carry a pass/fail meaning (authentication).
pub trait Outcome {
    fn exit_status(&self) -> ExitStatus;
}

impl Outcome for () {
    fn exit_status(&self) -> ExitStatus {
        ExitStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct_and_stable() {
        let all = [
            ExitStatus::Success,
            ExitStatus::Rejected,
            ExitStatus::Validation,
            ExitStatus::Io,
            ExitStatus::Crypto,
            ExitStatus::NotImplemented,
            ExitStatus::Resource,
            ExitStatus::Cancelled,
        ];
        for (i, s) in all.iter().enumerate() {
            assert_eq!(s.code() as usize, i);
        }
    }

    #[test]
    fn errors_map_to_their_class() {
        assert_eq!(NeuroError::Validation("x".into()).exit_status(), ExitStatus::Validation);
        assert_eq!(NeuroError::from(RecordError::TrailingBytes(1)).exit_status(), ExitStatus::Io);
        assert_eq!(NeuroError::from(RecordError::Alloc("oom".into())).exit_status(), ExitStatus::Resource);
        assert_eq!(NeuroError::from(CryptoError::IntegrityMismatch).exit_status(), ExitStatus::Crypto);
        assert_eq!(NeuroError::NotImplemented("notch").exit_status(), ExitStatus::NotImplemented);
        assert_eq!(NeuroError::Cancelled.exit_status(), ExitStatus::Cancelled);
    }

    #[test]
    fn result_maps_through_outcome() {
        let ok: Result<(), NeuroError> = Ok(());
        let err: Result<(), NeuroError> = Err(NeuroError::Cancelled);
        assert_eq!(ExitStatus::from(&ok), ExitStatus::Success);
        assert_eq!(ExitStatus::from(&err), ExitStatus::Cancelled);
    }
}
