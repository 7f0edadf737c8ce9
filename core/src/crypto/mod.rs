//! crypto/mod.rs
//! Template sealing: primitives, salts, digest comparison.

pub mod compare;
pub mod digest;
pub mod salt;
pub mod types;

pub use compare::*;
pub use digest::*;
pub use salt::*;
pub use types::*;
