//! Video compression behind the `Compressor` trait.
//!
//! `FfmpegCompressor` re-encodes a captured clip into a network-optimized
//! MP4 with the moov atom relocated to the head of the file
//! (`-movflags +faststart`) so playback can start before the full object
//! downloads.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use clipship_core::{CompressionError, MediaAsset};

use crate::preset::CompressionPreset;

/// Compression capability. Single-shot, cancellable; implementations must not
/// block the caller and must stop the underlying encoder when the token fires.
#[async_trait]
pub trait Compressor: Send + Sync {
    /// Re-encode `asset` into `output_dir`, returning the new asset.
    /// The caller owns `output_dir` and its cleanup.
    async fn compress(
        &self,
        asset: &MediaAsset,
        preset: CompressionPreset,
        output_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<MediaAsset, CompressionError>;
}

/// Validate that a path doesn't contain shell metacharacters or dangerous sequences
fn validate_path(path: &str) -> Result<()> {
    let dangerous_chars = [';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];
    if path.chars().any(|c| dangerous_chars.contains(&c)) {
        return Err(anyhow!("Path contains dangerous characters: {}", path));
    }

    if path.contains("..") {
        return Err(anyhow!("Path contains directory traversal: {}", path));
    }

    Ok(())
}

/// FFmpeg-backed compressor.
pub struct FfmpegCompressor {
    ffmpeg_path: String,
    ffprobe_path: String,
}

impl FfmpegCompressor {
    pub fn new(ffmpeg_path: String) -> Result<Self> {
        validate_path(&ffmpeg_path).context("Invalid ffmpeg_path")?;

        let ffprobe_path = if let Some(dir) = Path::new(&ffmpeg_path).parent() {
            if dir.as_os_str().is_empty() {
                "ffprobe".to_string()
            } else {
                dir.join("ffprobe").to_string_lossy().to_string()
            }
        } else {
            "ffprobe".to_string()
        };

        Ok(Self {
            ffmpeg_path,
            ffprobe_path,
        })
    }

    fn build_args(input: &Path, output: &Path, preset: CompressionPreset) -> Vec<String> {
        vec![
            "-v".to_string(),
            "error".to_string(),
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            preset.x264_preset().to_string(),
            "-crf".to_string(),
            preset.crf().to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            format!("{}k", preset.audio_bitrate_kbps()),
            "-movflags".to_string(),
            "+faststart".to_string(),
            "-y".to_string(),
            output.to_string_lossy().to_string(),
        ]
    }

    /// Probe a capture on disk into a `MediaAsset`: duration from ffprobe,
    /// byte size from the filesystem.
    pub async fn probe_asset(&self, path: &Path) -> Result<MediaAsset> {
        validate_path(&path.to_string_lossy())?;

        let size_bytes = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("Failed to stat {}", path.display()))?
            .len();

        let output = Command::new(&self.ffprobe_path)
            .args(["-v", "quiet", "-print_format", "json", "-show_format"])
            .arg(path)
            .output()
            .await
            .context("Failed to run ffprobe")?;
        if !output.status.success() {
            return Err(anyhow!("ffprobe failed for {}", path.display()));
        }

        let probe: serde_json::Value =
            serde_json::from_slice(&output.stdout).context("Invalid ffprobe output")?;
        let duration_secs = probe["format"]["duration"]
            .as_str()
            .and_then(|d| d.parse::<f64>().ok())
            .ok_or_else(|| anyhow!("ffprobe reported no duration for {}", path.display()))?;

        Ok(MediaAsset::new(path.to_path_buf(), duration_secs, size_bytes))
    }

    /// Probe the encoded output for its duration. Compression preserves
    /// duration, so the input's value is used if the probe fails.
    async fn probe_duration(&self, path: &Path, fallback: f64) -> f64 {
        let output = match Command::new(&self.ffprobe_path)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
            ])
            .arg(path)
            .output()
            .await
        {
            Ok(out) if out.status.success() => out,
            _ => {
                tracing::debug!(path = %path.display(), "ffprobe failed, using input duration");
                return fallback;
            }
        };

        serde_json::from_slice::<serde_json::Value>(&output.stdout)
            .ok()
            .and_then(|probe| {
                probe["format"]["duration"]
                    .as_str()
                    .and_then(|d| d.parse::<f64>().ok())
            })
            .unwrap_or(fallback)
    }
}

#[async_trait]
impl Compressor for FfmpegCompressor {
    async fn compress(
        &self,
        asset: &MediaAsset,
        preset: CompressionPreset,
        output_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<MediaAsset, CompressionError> {
        let input_str = asset.path.to_string_lossy();
        validate_path(&input_str).map_err(|e| CompressionError::Failed(e.to_string()))?;

        let output_path: PathBuf = output_dir.join("compressed.mp4");
        let args = Self::build_args(&asset.path, &output_path, preset);

        tracing::info!(
            input = %asset.path.display(),
            preset = ?preset,
            "Starting video compression"
        );
        let start = std::time::Instant::now();

        let mut child = Command::new(&self.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CompressionError::Failed(format!("Failed to spawn ffmpeg: {}", e)))?;

        let mut stderr = child.stderr.take();

        let status = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!(input = %asset.path.display(), "Compression cancelled, killing encoder");
                let _ = child.kill().await;
                return Err(CompressionError::Cancelled);
            }
            status = child.wait() => {
                status.map_err(|e| CompressionError::Failed(format!("ffmpeg wait failed: {}", e)))?
            }
        };

        if !status.success() {
            let mut message = String::new();
            if let Some(ref mut pipe) = stderr {
                let _ = pipe.read_to_string(&mut message).await;
            }
            return Err(CompressionError::Failed(format!(
                "ffmpeg exited with {}: {}",
                status,
                message.trim()
            )));
        }

        let size_bytes = tokio::fs::metadata(&output_path)
            .await
            .map_err(|e| CompressionError::Failed(format!("Missing ffmpeg output: {}", e)))?
            .len();

        let duration_secs = self.probe_duration(&output_path, asset.duration_secs).await;

        tracing::info!(
            output = %output_path.display(),
            size_bytes,
            elapsed_ms = start.elapsed().as_millis(),
            "Compression completed"
        );

        Ok(MediaAsset::new(output_path, duration_secs, size_bytes))
    }
}
