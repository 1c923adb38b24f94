//! Clipship Upload Library
//!
//! Delivery half of the ingestion pipeline: content hashing, AWS Signature
//! Version 4 request signing, presigned-URL acquisition, the streaming PUT
//! executor, and the orchestrator that sequences one pipeline invocation.

pub mod executor;
pub mod hasher;
pub mod orchestrator;
pub mod presign;
pub mod sigv4;

// Re-export commonly used types
pub use executor::{ProgressFn, UploadExecutor};
pub use hasher::ContentHasher;
pub use orchestrator::{ProgressSink, ProgressUpdate, UploadOrchestrator, UploadPhase};
pub use presign::{PresignedUpload, PresignedUrlClient};
pub use sigv4::{sign_put, SignedHeaders};
