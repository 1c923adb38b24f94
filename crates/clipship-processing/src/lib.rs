//! Clipship Media Processing Library
//!
//! Validation and compression for captured video assets. The encoder sits
//! behind the `Compressor` trait so any codec library or external transcoding
//! service can back it.

pub mod compressor;
pub mod preset;
pub mod validator;

// Re-export commonly used types
pub use compressor::{Compressor, FfmpegCompressor};
pub use preset::CompressionPreset;
pub use validator::MediaValidator;
