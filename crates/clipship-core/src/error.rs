//! Error types module
//!
//! Every pipeline failure carries a typed kind plus enough detail (HTTP
//! status, server message if present) for the caller to decide whether to
//! resign-and-retry or restart the full pipeline. The pipeline itself never
//! retries; retry policy lives at the boundary.

use std::io;

/// Validation failures. Deterministic and non-retryable.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Duration exceeded: {actual}s (max: {max}s)")]
    DurationExceeded { actual: f64, max: f64 },

    #[error("File too large: {actual} bytes (max: {max} bytes)")]
    SizeTooLarge { actual: u64, max: u64 },
}

/// Compression failures.
#[derive(Debug, thiserror::Error)]
pub enum CompressionError {
    #[error("Compression failed: {0}")]
    Failed(String),

    #[error("Compression cancelled")]
    Cancelled,
}

/// Signing failures. Deterministic and non-retryable.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SigningError {
    #[error("Missing credentials: access key id and secret access key must be non-empty")]
    MissingCredentials,
}

/// Failures talking to the presigned-URL backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid backend response: {0}")]
    InvalidResponse(String),

    #[error("Unauthorized by backend")]
    Unauthorized,

    #[error("Backend server error: status {0}")]
    Server(u16),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Failures during the PUT itself.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Upload rejected: status {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Rejected { status: u16, message: Option<String> },

    #[error("Transport error: {message} (retryable: {retryable})")]
    Transport { message: String, retryable: bool },
}

/// Unified pipeline error. Each variant maps to the phase that produced it.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Compression(#[from] CompressionError),

    #[error(transparent)]
    Signing(#[from] SigningError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("Upload cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl PipelineError {
    /// Name of the pipeline phase that produced this error.
    pub fn phase(&self) -> &'static str {
        match self {
            PipelineError::Validation(_) => "validating",
            PipelineError::Compression(_) => "compressing",
            PipelineError::Signing(_) => "signing",
            PipelineError::Backend(_) => "requesting_url",
            PipelineError::Upload(_) => "uploading",
            PipelineError::Cancelled => "cancelled",
            PipelineError::Io(_) => "io",
        }
    }

    /// Whether a caller-initiated retry can reasonably succeed without
    /// changing the input. Validation and signing failures are deterministic;
    /// transport-level failures and 5xx rejections are worth retrying with a
    /// fresh signature.
    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::Validation(_) => false,
            PipelineError::Signing(_) => false,
            PipelineError::Compression(CompressionError::Cancelled) => false,
            PipelineError::Compression(CompressionError::Failed(_)) => false,
            PipelineError::Backend(BackendError::Unavailable(_)) => true,
            PipelineError::Backend(BackendError::Server(_)) => true,
            PipelineError::Backend(_) => false,
            PipelineError::Upload(UploadError::Rejected { status, .. }) => *status >= 500,
            PipelineError::Upload(UploadError::Transport { retryable, .. }) => *retryable,
            PipelineError::Cancelled => false,
            PipelineError::Io(_) => false,
        }
    }
}
