//! record/mod.rs
//! Versioned little-endian template record.

pub mod decode;
pub mod encode;
pub mod types;

pub use decode::*;
pub use encode::*;
pub use types::*;
