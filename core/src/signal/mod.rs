//! signal/mod.rs
//! Recording types, preprocessing and spectral feature extraction.

pub mod extractor;
pub mod preprocess;
pub mod spectral;
pub mod types;

pub use extractor::*;
pub use preprocess::*;
pub use spectral::*;
pub use types::*;
