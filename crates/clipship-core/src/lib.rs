//! Clipship Core Library
//!
//! This crate provides the domain models, error taxonomy, and configuration
//! shared across all Clipship components.

pub mod config;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{UploadConfig, UploadMode};
pub use error::{
    BackendError, CompressionError, PipelineError, SigningError, UploadError, ValidationError,
};
pub use models::{ContentDigest, Credentials, MediaAsset, UploadResult, UploadTarget};
