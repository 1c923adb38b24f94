//! Shared fixtures: an in-process fake object store / backend and a mock
//! compressor, so pipeline scenarios run against real HTTP without ffmpeg
//! or network access.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::extract::{OriginalUri, Path as UrlPath, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{post, put};
use axum::{Json, Router};
use serde_json::json;
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;

use clipship_core::{CompressionError, MediaAsset, UploadConfig, UploadMode};
use clipship_processing::{CompressionPreset, Compressor};

/// One PUT observed by the fake store.
#[derive(Debug, Clone)]
pub struct PutRecord {
    pub path: String,
    pub authorization: Option<String>,
    pub content_sha256: Option<String>,
    pub content_type: Option<String>,
    pub body_sha256: String,
    pub body_len: usize,
}

pub struct StoreInner {
    pub puts: Mutex<Vec<PutRecord>>,
    /// Statuses to answer successive PUTs with; empty means 200.
    pub put_plan: Mutex<VecDeque<u16>>,
    pub presign_calls: AtomicUsize,
    pub presign_status: Mutex<u16>,
    pub presign_authorization: Mutex<Option<String>>,
    /// When set, PUT handlers hang after recording the request.
    pub stall_puts: AtomicBool,
    addr: SocketAddr,
}

/// Loopback server playing both the object store and the presign backend.
#[derive(Clone)]
pub struct FakeStore {
    inner: Arc<StoreInner>,
}

impl FakeStore {
    pub async fn start() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let store = FakeStore {
            inner: Arc::new(StoreInner {
                puts: Mutex::new(Vec::new()),
                put_plan: Mutex::new(VecDeque::new()),
                presign_calls: AtomicUsize::new(0),
                presign_status: Mutex::new(200),
                presign_authorization: Mutex::new(None),
                stall_puts: AtomicBool::new(false),
                addr,
            }),
        };

        let router = Router::new()
            .route("/videos/{key}", put(handle_put))
            .route("/presigned/{key}", put(handle_put))
            .route("/presign", post(handle_presign))
            .with_state(store.clone());

        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        store
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.inner.addr)
    }

    pub fn plan_put_statuses(&self, statuses: &[u16]) {
        *self.inner.put_plan.lock().unwrap() = statuses.iter().copied().collect();
    }

    pub fn set_presign_status(&self, status: u16) {
        *self.inner.presign_status.lock().unwrap() = status;
    }

    pub fn stall_puts(&self) {
        self.inner.stall_puts.store(true, Ordering::SeqCst);
    }

    pub fn puts(&self) -> Vec<PutRecord> {
        self.inner.puts.lock().unwrap().clone()
    }

    pub fn put_count(&self) -> usize {
        self.inner.puts.lock().unwrap().len()
    }

    pub fn presign_calls(&self) -> usize {
        self.inner.presign_calls.load(Ordering::SeqCst)
    }

    pub fn presign_authorization(&self) -> Option<String> {
        self.inner.presign_authorization.lock().unwrap().clone()
    }
}

async fn handle_put(
    State(store): State<FakeStore>,
    OriginalUri(uri): OriginalUri,
    UrlPath(_key): UrlPath<String>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> (StatusCode, String) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string())
    };

    store.inner.puts.lock().unwrap().push(PutRecord {
        path: uri.path().to_string(),
        authorization: header("authorization"),
        content_sha256: header("x-amz-content-sha256"),
        content_type: header("content-type"),
        body_sha256: hex::encode(Sha256::digest(&body)),
        body_len: body.len(),
    });

    if store.inner.stall_puts.load(Ordering::SeqCst) {
        tokio::time::sleep(std::time::Duration::from_secs(60)).await;
    }

    let status = store
        .inner
        .put_plan
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or(200);
    let status = StatusCode::from_u16(status).unwrap();
    if status.is_success() {
        (status, String::new())
    } else {
        (status, "InternalError".to_string())
    }
}

async fn handle_presign(
    State(store): State<FakeStore>,
    headers: HeaderMap,
    Json(request): Json<serde_json::Value>,
) -> (StatusCode, Json<serde_json::Value>) {
    store.inner.presign_calls.fetch_add(1, Ordering::SeqCst);
    *store.inner.presign_authorization.lock().unwrap() = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());

    let status = *store.inner.presign_status.lock().unwrap();
    if status != 200 {
        return (
            StatusCode::from_u16(status).unwrap(),
            Json(json!({"error": "denied"})),
        );
    }

    let content_id = request["contentId"].as_str().unwrap_or_default();
    let base = store.base_url();
    (
        StatusCode::OK,
        Json(json!({
            "uploadUrl": format!("{}/presigned/{}.mp4", base, content_id),
            "publicUrl": format!("https://media.example.com/{}.mp4", content_id),
            "expiresIn": 900,
        })),
    )
}

/// Compressor stand-in: writes a fixed-fill derivative into the scratch
/// directory and counts invocations.
pub struct MockCompressor {
    pub calls: AtomicUsize,
    pub output_size: usize,
    last_output: Mutex<Option<std::path::PathBuf>>,
}

impl MockCompressor {
    pub fn new(output_size: usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            output_size,
            last_output: Mutex::new(None),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Path of the most recent derivative, for cleanup assertions.
    pub fn last_output(&self) -> Option<std::path::PathBuf> {
        self.last_output.lock().unwrap().clone()
    }

    /// The exact bytes every derivative holds, for re-entry scenarios.
    pub fn payload(&self) -> Vec<u8> {
        vec![7u8; self.output_size]
    }
}

#[async_trait]
impl Compressor for MockCompressor {
    async fn compress(
        &self,
        asset: &MediaAsset,
        _preset: CompressionPreset,
        output_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<MediaAsset, CompressionError> {
        if cancel.is_cancelled() {
            return Err(CompressionError::Cancelled);
        }
        self.calls.fetch_add(1, Ordering::SeqCst);

        let output = output_dir.join("compressed.mp4");
        std::fs::write(&output, self.payload())
            .map_err(|e| CompressionError::Failed(e.to_string()))?;
        *self.last_output.lock().unwrap() = Some(output.clone());

        Ok(MediaAsset::new(
            output,
            asset.duration_secs,
            self.output_size as u64,
        ))
    }
}

/// Compressor that blocks until its token fires, signalling once the encode
/// has started. Mirrors the select-on-cancel shape of the ffmpeg compressor.
pub struct HangingCompressor {
    pub started: Arc<tokio::sync::Notify>,
}

impl HangingCompressor {
    pub fn new() -> Self {
        Self {
            started: Arc::new(tokio::sync::Notify::new()),
        }
    }
}

#[async_trait]
impl Compressor for HangingCompressor {
    async fn compress(
        &self,
        _asset: &MediaAsset,
        _preset: CompressionPreset,
        _output_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<MediaAsset, CompressionError> {
        self.started.notify_one();
        cancel.cancelled().await;
        Err(CompressionError::Cancelled)
    }
}

/// Config pointed at the fake store in self-signed mode.
pub fn self_signed_config(store: &FakeStore) -> UploadConfig {
    UploadConfig {
        mode: UploadMode::SelfSigned,
        account_id: "testaccount".to_string(),
        access_key_id: "AKIATEST".to_string(),
        secret_access_key: "testsecret".to_string(),
        bucket: "videos".to_string(),
        storage_host: store.base_url(),
        public_base_url: "https://media.example.com".to_string(),
        backend_url: None,
        max_duration_seconds: 30.0,
        max_file_size_mb: 50,
        ffmpeg_path: "ffmpeg".to_string(),
        compression_preset: "balanced".to_string(),
        request_timeout_secs: 5,
    }
}

/// Config pointed at the fake backend in presigned mode.
pub fn presigned_config(store: &FakeStore) -> UploadConfig {
    UploadConfig {
        mode: UploadMode::Presigned,
        account_id: String::new(),
        access_key_id: String::new(),
        secret_access_key: String::new(),
        bucket: String::new(),
        storage_host: store.base_url(),
        public_base_url: "https://media.example.com".to_string(),
        backend_url: Some(format!("{}/presign", store.base_url())),
        max_duration_seconds: 30.0,
        max_file_size_mb: 50,
        ffmpeg_path: "ffmpeg".to_string(),
        compression_preset: "balanced".to_string(),
        request_timeout_secs: 5,
    }
}

pub fn test_asset(duration_secs: f64) -> MediaAsset {
    MediaAsset::new(
        std::path::PathBuf::from("/tmp/capture.mp4"),
        duration_secs,
        10 * 1024 * 1024,
    )
}
