//! Pipeline orchestration.
//!
//! One orchestrator call runs one pipeline invocation end to end:
//! validate duration, compress into a scratch directory, size-check the
//! derivative, hash it, resolve an upload target (local SigV4 signing or a
//! backend presigned URL), then stream the PUT. The scratch directory is
//! removed on every exit path. The orchestrator never retries on its own;
//! a caller that wants another attempt after a retryable failure calls
//! [`UploadOrchestrator::upload_prepared`] with the payload it already has,
//! which re-resolves the target so the signature and timestamp are fresh.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use clipship_core::{
    MediaAsset, PipelineError, SigningError, UploadConfig, UploadMode, UploadResult, UploadTarget,
};
use clipship_processing::{CompressionPreset, Compressor, MediaValidator};

use crate::executor::UploadExecutor;
use crate::hasher::ContentHasher;
use crate::presign::PresignedUrlClient;

// Phase weights; uploads dominate wall-clock time.
const VALIDATE_END: f64 = 0.10;
const COMPRESS_END: f64 = 0.40;
const PREPARE_END: f64 = 0.50;

/// Where the pipeline currently is. Terminal phases are `Completed`,
/// `Failed`, and `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    Idle,
    Validating,
    Compressing,
    Hashing,
    Signing,
    RequestingUrl,
    Uploading,
    Completed,
    Failed,
    Cancelled,
}

impl UploadPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadPhase::Idle => "idle",
            UploadPhase::Validating => "validating",
            UploadPhase::Compressing => "compressing",
            UploadPhase::Hashing => "hashing",
            UploadPhase::Signing => "signing",
            UploadPhase::RequestingUrl => "requesting_url",
            UploadPhase::Uploading => "uploading",
            UploadPhase::Completed => "completed",
            UploadPhase::Failed => "failed",
            UploadPhase::Cancelled => "cancelled",
        }
    }
}

/// A progress observation: the active phase and the overall fraction in
/// `[0.0, 1.0]`. Fractions never decrease within one invocation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressUpdate {
    pub phase: UploadPhase,
    pub fraction: f64,
}

pub type ProgressSink = Arc<dyn Fn(ProgressUpdate) + Send + Sync>;

/// Monotonic progress reporter for a single invocation.
struct Progress {
    sink: Option<ProgressSink>,
    last: Mutex<f64>,
}

impl Progress {
    fn new(sink: Option<ProgressSink>) -> Self {
        Self {
            sink,
            last: Mutex::new(0.0),
        }
    }

    fn emit(&self, phase: UploadPhase, fraction: f64) {
        let fraction = {
            let mut last = self.last.lock().unwrap();
            let clamped = fraction.clamp(*last, 1.0);
            *last = clamped;
            clamped
        };
        if let Some(sink) = &self.sink {
            sink(ProgressUpdate { phase, fraction });
        }
    }
}

/// Sequences one ingestion pipeline invocation.
pub struct UploadOrchestrator {
    config: UploadConfig,
    preset: CompressionPreset,
    compressor: Arc<dyn Compressor>,
    executor: UploadExecutor,
    presign_client: Option<PresignedUrlClient>,
    bearer_token: Option<String>,
}

impl UploadOrchestrator {
    pub fn new(
        config: UploadConfig,
        compressor: Arc<dyn Compressor>,
    ) -> Result<Self, PipelineError> {
        let preset = CompressionPreset::parse(&config.compression_preset).map_err(|e| {
            clipship_core::CompressionError::Failed(e.to_string())
        })?;

        let timeout = Duration::from_secs(config.request_timeout_secs);
        let executor = UploadExecutor::new(timeout)?;

        let presign_client = match (&config.mode, &config.backend_url) {
            (UploadMode::Presigned, Some(url)) => {
                Some(PresignedUrlClient::new(url.clone(), timeout)?)
            }
            _ => None,
        };

        Ok(Self {
            config,
            preset,
            compressor,
            executor,
            presign_client,
            bearer_token: None,
        })
    }

    /// Attach a bearer token for presigned-URL requests.
    pub fn with_bearer_token(mut self, token: String) -> Self {
        self.bearer_token = Some(token);
        self
    }

    /// Run the full pipeline for `asset`, publishing under `content_id`.
    ///
    /// The compressed derivative lives in a scratch directory that is
    /// deleted when this returns, on success, failure, and cancellation
    /// alike.
    pub async fn run(
        &self,
        content_id: &str,
        asset: &MediaAsset,
        cancel: &CancellationToken,
        sink: Option<ProgressSink>,
    ) -> Result<UploadResult, PipelineError> {
        let progress = Arc::new(Progress::new(sink));
        let result = self.run_inner(content_id, asset, cancel, &progress).await;

        match &result {
            Ok(r) => {
                progress.emit(UploadPhase::Completed, 1.0);
                tracing::info!(content_id, public_url = %r.public_url, "Pipeline completed");
            }
            Err(PipelineError::Cancelled)
            | Err(PipelineError::Compression(clipship_core::CompressionError::Cancelled)) => {
                progress.emit(UploadPhase::Cancelled, 0.0);
                tracing::info!(content_id, "Pipeline cancelled");
            }
            Err(e) => {
                progress.emit(UploadPhase::Failed, 0.0);
                tracing::error!(content_id, phase = e.phase(), error = %e, "Pipeline failed");
            }
        }

        result
    }

    async fn run_inner(
        &self,
        content_id: &str,
        asset: &MediaAsset,
        cancel: &CancellationToken,
        progress: &Arc<Progress>,
    ) -> Result<UploadResult, PipelineError> {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        progress.emit(UploadPhase::Validating, 0.0);
        let validator = MediaValidator::new(
            self.config.max_duration_seconds,
            self.config.max_file_size_bytes(),
        );
        validator.validate_duration(asset.duration_secs)?;
        progress.emit(UploadPhase::Validating, VALIDATE_END);

        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        // Scratch directory for the derivative; dropped (and removed) on
        // every exit path out of this function.
        let scratch = tempfile::tempdir()?;

        progress.emit(UploadPhase::Compressing, VALIDATE_END);
        let compressed = self
            .compressor
            .compress(asset, self.preset, scratch.path(), cancel)
            .await?;
        progress.emit(UploadPhase::Compressing, COMPRESS_END);

        // The size limit binds the compressed derivative, not the original.
        validator.validate_size(compressed.size_bytes)?;

        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        progress.emit(UploadPhase::Hashing, COMPRESS_END);
        let payload = Bytes::from(tokio::fs::read(&compressed.path).await?);
        let digest = ContentHasher::hash(&payload);
        tracing::debug!(content_id, digest = %digest, size = payload.len(), "Derivative hashed");

        self.deliver(content_id, payload, cancel, progress).await
    }

    /// Re-enter the pipeline at target resolution with an already-compressed
    /// payload. Each call resolves a fresh target, so self-signed retries get
    /// a new signed timestamp and presigned retries get a new URL.
    pub async fn upload_prepared(
        &self,
        content_id: &str,
        payload: Bytes,
        cancel: &CancellationToken,
        sink: Option<ProgressSink>,
    ) -> Result<UploadResult, PipelineError> {
        let progress = Arc::new(Progress::new(sink));
        // Resuming past compression; progress picks up at the prepare band.
        progress.emit(UploadPhase::Hashing, COMPRESS_END);

        let result = self.deliver(content_id, payload, cancel, &progress).await;
        match &result {
            Ok(_) => progress.emit(UploadPhase::Completed, 1.0),
            Err(PipelineError::Cancelled) => progress.emit(UploadPhase::Cancelled, 0.0),
            Err(_) => progress.emit(UploadPhase::Failed, 0.0),
        }
        result
    }

    async fn deliver(
        &self,
        content_id: &str,
        payload: Bytes,
        cancel: &CancellationToken,
        progress: &Arc<Progress>,
    ) -> Result<UploadResult, PipelineError> {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        progress.emit(
            match self.config.mode {
                UploadMode::SelfSigned => UploadPhase::Signing,
                UploadMode::Presigned => UploadPhase::RequestingUrl,
            },
            COMPRESS_END,
        );
        let (target, public_url) = self.resolve_target(content_id).await?;
        progress.emit(
            match self.config.mode {
                UploadMode::SelfSigned => UploadPhase::Signing,
                UploadMode::Presigned => UploadPhase::RequestingUrl,
            },
            PREPARE_END,
        );

        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        progress.emit(UploadPhase::Uploading, PREPARE_END);
        let on_progress = upload_progress(progress.clone());

        // Dropping the upload future on cancellation aborts the transfer.
        let result = tokio::select! {
            _ = cancel.cancelled() => Err(PipelineError::Cancelled),
            result = self.executor.upload(payload, &target, &public_url, on_progress) => result,
        }?;

        Ok(result)
    }

    /// Resolve where the payload goes. Self-signed mode derives the target
    /// from config; presigned mode asks the backend for a grant.
    async fn resolve_target(
        &self,
        content_id: &str,
    ) -> Result<(UploadTarget, String), PipelineError> {
        match self.config.mode {
            UploadMode::SelfSigned => {
                let credentials = self.config.credentials();
                if credentials.access_key_id.is_empty()
                    || credentials.secret_access_key.is_empty()
                {
                    return Err(SigningError::MissingCredentials.into());
                }
                let target = UploadTarget::SelfSigned {
                    endpoint: self.config.storage_endpoint(),
                    bucket: self.config.bucket.clone(),
                    key: format!("{}.mp4", content_id),
                    credentials,
                };
                Ok((target, self.config.public_url(content_id)))
            }
            UploadMode::Presigned => {
                let client = self.presign_client.as_ref().ok_or_else(|| {
                    clipship_core::BackendError::Unavailable(
                        "presigned mode requires BACKEND_URL".to_string(),
                    )
                })?;
                let grant = client
                    .request_upload_url(content_id, self.bearer_token.as_deref())
                    .await?;
                let target = UploadTarget::Presigned {
                    url: grant.upload_url,
                    expires_at: grant.expires_at,
                };
                Ok((target, grant.public_url))
            }
        }
    }
}

/// Map transport byte counts into the upload band of the overall fraction.
/// Goes through the shared `Progress` so terminal emits clamp against the
/// true high-water mark.
fn upload_progress(progress: Arc<Progress>) -> crate::executor::ProgressFn {
    Arc::new(move |sent, total| {
        let part = if total == 0 {
            1.0
        } else {
            sent as f64 / total as f64
        };
        progress.emit(
            UploadPhase::Uploading,
            PREPARE_END + (1.0 - PREPARE_END) * part,
        );
    })
}
