//! Configuration module
//!
//! Upload configuration is loaded from a secret-store file (`key=value`
//! lines, `#` comments) and/or environment variables. Credentials come only
//! from those sources; there is no in-source fallback.

use std::collections::HashMap;
use std::env;
use std::path::Path;

use crate::models::Credentials;

const MAX_DURATION_SECONDS: f64 = 30.0;
const MAX_FILE_SIZE_MB: u64 = 50;
const REQUEST_TIMEOUT_SECS: u64 = 120;
const STORAGE_HOST: &str = "r2.cloudflarestorage.com";

/// Parse an optional numeric setting. A present-but-malformed value is an
/// error, not a silent fallback to the default.
fn parse_numeric<T: std::str::FromStr>(
    vars: &HashMap<String, String>,
    key: &str,
    default: T,
) -> Result<T, anyhow::Error> {
    match vars.get(key) {
        Some(s) => s
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid {}: {}", key, s)),
        None => Ok(default),
    }
}

/// How the upload request gets authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadMode {
    /// Sign the PUT locally with SigV4.
    SelfSigned,
    /// Ask the backend for a presigned URL.
    Presigned,
}

impl UploadMode {
    pub fn parse(s: &str) -> Result<Self, anyhow::Error> {
        match s.to_lowercase().as_str() {
            "self-signed" | "self_signed" | "sigv4" => Ok(UploadMode::SelfSigned),
            "presigned" => Ok(UploadMode::Presigned),
            _ => Err(anyhow::anyhow!("Invalid upload mode: {}", s)),
        }
    }
}

/// Configuration for the upload pipeline.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub mode: UploadMode,
    pub account_id: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket: String,
    pub storage_host: String,
    pub public_base_url: String,
    /// Backend endpoint for presigned-URL requests (presigned mode only).
    pub backend_url: Option<String>,
    pub max_duration_seconds: f64,
    pub max_file_size_mb: u64,
    pub ffmpeg_path: String,
    pub compression_preset: String,
    pub request_timeout_secs: u64,
}

impl UploadConfig {
    /// Load configuration from environment variables (a `.env` file is
    /// honored if present).
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let vars: HashMap<String, String> = env::vars().collect();
        Self::from_map(&vars)
    }

    /// Load configuration from a secret-store file: one `KEY=value` per line,
    /// blank lines and `#` comments ignored.
    pub fn from_secrets_file(path: &Path) -> Result<Self, anyhow::Error> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read secrets file {}: {}", path.display(), e))?;

        let mut vars = HashMap::new();
        for (lineno, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| {
                anyhow::anyhow!("Malformed line {} in {}: expected KEY=value", lineno + 1, path.display())
            })?;
            vars.insert(key.trim().to_string(), value.trim().to_string());
        }

        Self::from_map(&vars)
    }

    fn from_map(vars: &HashMap<String, String>) -> Result<Self, anyhow::Error> {
        let get = |key: &str| vars.get(key).cloned().unwrap_or_default();

        let mode = match vars.get("UPLOAD_MODE") {
            Some(s) => UploadMode::parse(s)?,
            None => UploadMode::SelfSigned,
        };

        let max_duration_seconds =
            parse_numeric(vars, "MAX_DURATION_SECONDS", MAX_DURATION_SECONDS)?;
        let max_file_size_mb = parse_numeric(vars, "MAX_FILE_SIZE_MB", MAX_FILE_SIZE_MB)?;
        let request_timeout_secs =
            parse_numeric(vars, "REQUEST_TIMEOUT_SECS", REQUEST_TIMEOUT_SECS)?;

        let config = Self {
            mode,
            account_id: get("STORAGE_ACCOUNT_ID"),
            access_key_id: get("STORAGE_ACCESS_KEY_ID"),
            secret_access_key: get("STORAGE_SECRET_ACCESS_KEY"),
            bucket: get("STORAGE_BUCKET"),
            storage_host: vars
                .get("STORAGE_HOST")
                .cloned()
                .unwrap_or_else(|| STORAGE_HOST.to_string()),
            public_base_url: get("PUBLIC_BASE_URL"),
            backend_url: vars.get("BACKEND_URL").cloned().filter(|s| !s.is_empty()),
            max_duration_seconds,
            max_file_size_mb,
            ffmpeg_path: vars
                .get("FFMPEG_PATH")
                .cloned()
                .unwrap_or_else(|| "ffmpeg".to_string()),
            compression_preset: vars
                .get("COMPRESSION_PRESET")
                .cloned()
                .unwrap_or_else(|| "balanced".to_string()),
            request_timeout_secs,
        };

        config.validate()?;
        Ok(config)
    }

    /// Cross-check mode against required fields.
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        match self.mode {
            UploadMode::SelfSigned => {
                if self.access_key_id.is_empty() || self.secret_access_key.is_empty() {
                    return Err(anyhow::anyhow!(
                        "STORAGE_ACCESS_KEY_ID and STORAGE_SECRET_ACCESS_KEY must be set in self-signed mode"
                    ));
                }
                if self.account_id.is_empty() {
                    return Err(anyhow::anyhow!(
                        "STORAGE_ACCOUNT_ID must be set in self-signed mode"
                    ));
                }
                if self.bucket.is_empty() {
                    return Err(anyhow::anyhow!("STORAGE_BUCKET must be set in self-signed mode"));
                }
            }
            UploadMode::Presigned => {
                if self.backend_url.is_none() {
                    return Err(anyhow::anyhow!("BACKEND_URL must be set in presigned mode"));
                }
            }
        }

        if self.public_base_url.is_empty() {
            return Err(anyhow::anyhow!("PUBLIC_BASE_URL must be set"));
        }
        if self.max_duration_seconds <= 0.0 {
            return Err(anyhow::anyhow!("MAX_DURATION_SECONDS must be positive"));
        }
        if self.max_file_size_mb == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_MB must be positive"));
        }

        Ok(())
    }

    /// Storage endpoint: `https://{account_id}.{storage_host}`. A
    /// `STORAGE_HOST` that is already a full URL is used verbatim.
    pub fn storage_endpoint(&self) -> String {
        if self.storage_host.starts_with("http://") || self.storage_host.starts_with("https://") {
            self.storage_host.trim_end_matches('/').to_string()
        } else {
            format!("https://{}.{}", self.account_id, self.storage_host)
        }
    }

    /// Public URL for an uploaded clip: `{public_base_url}/{content_id}.mp4`.
    pub fn public_url(&self, content_id: &str) -> String {
        format!(
            "{}/{}.mp4",
            self.public_base_url.trim_end_matches('/'),
            content_id
        )
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            access_key_id: self.access_key_id.clone(),
            secret_access_key: self.secret_access_key.clone(),
        }
    }
}
