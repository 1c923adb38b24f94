//! Presigned-URL acquisition from the backend.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use clipship_core::BackendError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadUrlRequest<'a> {
    content_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadUrlResponse {
    upload_url: String,
    public_url: String,
    expires_in: u64,
}

/// A backend-issued upload grant. The URL must not be used past `expires_at`;
/// request a fresh one instead.
#[derive(Debug, Clone)]
pub struct PresignedUpload {
    pub upload_url: String,
    pub public_url: String,
    pub expires_at: DateTime<Utc>,
}

/// Client for the backend's presigned-URL endpoint.
#[derive(Debug, Clone)]
pub struct PresignedUrlClient {
    client: reqwest::Client,
    endpoint: String,
}

impl PresignedUrlClient {
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// Request a time-limited upload URL for `content_id`. The bearer token,
    /// when present, goes out as `Authorization: Bearer {token}`.
    pub async fn request_upload_url(
        &self,
        content_id: &str,
        bearer_token: Option<&str>,
    ) -> Result<PresignedUpload, BackendError> {
        if content_id.is_empty() {
            return Err(BackendError::InvalidArgument(
                "content_id must not be empty".to_string(),
            ));
        }

        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&UploadUrlRequest { content_id });

        if let Some(token) = bearer_token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => BackendError::Unauthorized,
                400 => BackendError::InvalidArgument(body),
                s if s >= 500 => BackendError::Server(s),
                s => BackendError::InvalidResponse(format!("unexpected status {}: {}", s, body)),
            });
        }

        let body: UploadUrlResponse = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;

        if body.upload_url.is_empty() || body.public_url.is_empty() {
            return Err(BackendError::InvalidResponse(
                "uploadUrl and publicUrl must be non-empty".to_string(),
            ));
        }

        tracing::debug!(
            content_id,
            expires_in = body.expires_in,
            "Obtained presigned upload URL"
        );

        Ok(PresignedUpload {
            upload_url: body.upload_url,
            public_url: body.public_url,
            expires_at: Utc::now() + chrono::Duration::seconds(body.expires_in as i64),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_content_id_rejected_client_side() {
        let client =
            PresignedUrlClient::new("http://localhost:9".to_string(), Duration::from_secs(1))
                .unwrap();
        let err = client.request_upload_url("", None).await.unwrap_err();
        assert!(matches!(err, BackendError::InvalidArgument(_)));
    }

    #[test]
    fn test_request_serializes_camel_case() {
        let body = serde_json::to_string(&UploadUrlRequest { content_id: "wk123" }).unwrap();
        assert_eq!(body, r#"{"contentId":"wk123"}"#);
    }

    #[test]
    fn test_response_parses_camel_case() {
        let body: UploadUrlResponse = serde_json::from_str(
            r#"{"uploadUrl":"https://s.example.com/u","publicUrl":"https://m.example.com/wk123.mp4","expiresIn":900}"#,
        )
        .unwrap();
        assert_eq!(body.upload_url, "https://s.example.com/u");
        assert_eq!(body.expires_in, 900);
    }
}
