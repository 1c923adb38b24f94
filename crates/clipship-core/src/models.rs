//! Domain models for the upload pipeline.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A local media file plus the measured properties the pipeline cares about.
///
/// The capture/picker collaborator supplies the original asset; the
/// compressor produces a derivative with a new path and size.
#[derive(Debug, Clone)]
pub struct MediaAsset {
    pub path: PathBuf,
    pub duration_secs: f64,
    pub size_bytes: u64,
    pub content_type: String,
}

impl MediaAsset {
    pub fn new(path: PathBuf, duration_secs: f64, size_bytes: u64) -> Self {
        Self {
            path,
            duration_secs,
            size_bytes,
            content_type: "video/mp4".to_string(),
        }
    }
}

/// 256-bit SHA-256 content digest, rendered as lowercase hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentDigest(pub [u8; 32]);

impl ContentDigest {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Object-store credentials. The secret never appears in logs or Debug output.
#[derive(Clone)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[redacted]")
            .finish()
    }
}

/// Where and how a payload gets delivered. Exactly one variant is active per
/// upload; the two signing schemes are never combined on one request.
#[derive(Debug, Clone)]
pub enum UploadTarget {
    /// PUT to `{endpoint}/{bucket}/{key}` with locally computed SigV4 headers.
    SelfSigned {
        endpoint: String,
        bucket: String,
        key: String,
        credentials: Credentials,
    },
    /// PUT to a backend-issued URL with the signature embedded in its query
    /// string. Must not be used past `expires_at`.
    Presigned {
        url: String,
        expires_at: DateTime<Utc>,
    },
}

/// Outcome of a completed upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResult {
    pub public_url: String,
    pub bytes_sent: u64,
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
}

mod duration_secs {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok(Duration::from_secs_f64(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_hex_is_lowercase() {
        let digest = ContentDigest([0xAB; 32]);
        let hex = digest.to_hex();
        assert_eq!(hex.len(), 64);
        assert_eq!(hex, hex.to_lowercase());
        assert!(hex.starts_with("abab"));
    }

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let creds = Credentials {
            access_key_id: "AKIATEST".to_string(),
            secret_access_key: "supersecret".to_string(),
        };
        let debug = format!("{:?}", creds);
        assert!(debug.contains("AKIATEST"));
        assert!(!debug.contains("supersecret"));
        assert!(debug.contains("[redacted]"));
    }

    #[test]
    fn test_media_asset_defaults_to_mp4() {
        let asset = MediaAsset::new(PathBuf::from("/tmp/clip.mp4"), 10.0, 1024);
        assert_eq!(asset.content_type, "video/mp4");
    }
}
