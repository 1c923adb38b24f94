//! The streaming PUT executor.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use chrono::Utc;

use clipship_core::{PipelineError, UploadError, UploadResult, UploadTarget};

use crate::hasher::ContentHasher;
use crate::sigv4;

/// Progress callback: (bytes_sent, bytes_total).
pub type ProgressFn = Arc<dyn Fn(u64, u64) + Send + Sync>;

const CHUNK_SIZE: usize = 64 * 1024;
const MAX_ERROR_BODY: usize = 512;

/// Performs the HTTP PUT against either target variant.
///
/// Self-signed targets get the three SigV4 headers computed at send time so
/// the signed timestamp is fresh; presigned targets get no additional
/// authorization headers (the signature lives in the URL's query string).
/// The two schemes are never combined on one request.
#[derive(Debug, Clone)]
pub struct UploadExecutor {
    client: reqwest::Client,
}

impl UploadExecutor {
    pub fn new(timeout: Duration) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UploadError::Transport {
                message: format!("Failed to build HTTP client: {}", e),
                retryable: false,
            })?;

        Ok(Self { client })
    }

    /// PUT `payload` to `target`, streaming progress as bytes go out.
    /// A partial transfer is always a failure; a retry resends the full
    /// payload.
    pub async fn upload(
        &self,
        payload: Bytes,
        target: &UploadTarget,
        public_url: &str,
        on_progress: ProgressFn,
    ) -> Result<UploadResult, PipelineError> {
        let total = payload.len() as u64;
        let start = Instant::now();

        let mut request = match target {
            UploadTarget::SelfSigned {
                endpoint,
                bucket,
                key,
                credentials,
            } => {
                let digest = ContentHasher::hash(&payload);
                let host = endpoint
                    .trim_start_matches("https://")
                    .trim_start_matches("http://")
                    .trim_end_matches('/');
                let headers =
                    sigv4::sign_put(host, bucket, key, &digest, credentials, Utc::now())?;

                let url = format!(
                    "{}{}",
                    endpoint.trim_end_matches('/'),
                    sigv4::canonical_uri(bucket, key)
                );

                self.client
                    .put(&url)
                    .header("x-amz-date", &headers.x_amz_date)
                    .header("x-amz-content-sha256", &headers.x_amz_content_sha256)
                    .header("Authorization", &headers.authorization)
            }
            UploadTarget::Presigned { url, expires_at } => {
                if Utc::now() >= *expires_at {
                    return Err(UploadError::Transport {
                        message: "presigned URL expired before send".to_string(),
                        retryable: true,
                    }
                    .into());
                }
                self.client.put(url)
            }
        };

        request = request
            .header("Content-Type", "video/mp4")
            .header("Content-Length", total);

        on_progress(0, total);

        let body = reqwest::Body::wrap_stream(chunk_stream(payload, total, on_progress.clone()));
        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| UploadError::Transport {
                message: e.to_string(),
                retryable: !e.is_builder(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(body);
            tracing::warn!(status = status.as_u16(), "Upload rejected by storage");
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        on_progress(total, total);
        let elapsed = start.elapsed();
        tracing::info!(
            bytes_sent = total,
            elapsed_ms = elapsed.as_millis(),
            "Upload completed"
        );

        Ok(UploadResult {
            public_url: public_url.to_string(),
            bytes_sent: total,
            elapsed,
        })
    }
}

/// Cap a rejection body for the error detail, cutting on a char boundary so
/// multibyte responses cannot panic the truncation.
fn error_message(mut body: String) -> Option<String> {
    if body.is_empty() {
        return None;
    }
    if body.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
    }
    Some(body)
}

/// Split the payload into a chunked stream so progress tracks the bytes
/// handed to the transport.
fn chunk_stream(
    payload: Bytes,
    total: u64,
    on_progress: ProgressFn,
) -> impl futures::Stream<Item = Result<Bytes, std::io::Error>> {
    let chunks: Vec<Bytes> = (0..payload.len())
        .step_by(CHUNK_SIZE)
        .map(|offset| payload.slice(offset..payload.len().min(offset + CHUNK_SIZE)))
        .collect();

    let mut sent = 0u64;
    futures::stream::iter(chunks.into_iter().map(move |chunk| {
        sent += chunk.len() as u64;
        on_progress(sent, total);
        Ok(chunk)
    }))
}
