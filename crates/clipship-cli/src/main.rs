//! Clipship CLI — validate, compress, and upload a video clip.
//!
//! Configuration comes from the environment (a `.env` file is honored) or a
//! secrets file passed with `--secrets`. See `UploadConfig` for the keys.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use clipship_cli::init_tracing;
use clipship_core::UploadConfig;
use clipship_processing::FfmpegCompressor;
use clipship_upload::{ProgressSink, UploadOrchestrator};

#[derive(Parser)]
#[command(name = "clipship", about = "Clip ingestion pipeline CLI")]
struct Cli {
    /// Load configuration from a KEY=value secrets file instead of the
    /// environment
    #[arg(long, global = true)]
    secrets: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: validate, compress, sign, upload
    Upload {
        /// Path to the captured video
        file: PathBuf,
        /// Content id to publish under (random if omitted)
        #[arg(long)]
        id: Option<String>,
        /// Bearer token for the presigned-URL backend
        #[arg(long)]
        token: Option<String>,
    },
    /// Probe a video file and print its measured properties
    Probe {
        /// Path to the video
        file: PathBuf,
    },
}

fn load_config(secrets: Option<&PathBuf>) -> anyhow::Result<UploadConfig> {
    match secrets {
        Some(path) => UploadConfig::from_secrets_file(path),
        None => UploadConfig::from_env(),
    }
    .context("Failed to load upload configuration")
}

fn progress_sink() -> ProgressSink {
    let last_pct = AtomicU64::new(u64::MAX);
    Arc::new(move |update| {
        let pct = (update.fraction * 100.0).round() as u64;
        if last_pct.swap(pct, Ordering::Relaxed) != pct {
            eprintln!("[{:>3}%] {}", pct, update.phase.as_str());
        }
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Probe { file } => {
            let ffmpeg_path =
                std::env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string());
            let compressor = FfmpegCompressor::new(ffmpeg_path)?;
            let asset = compressor.probe_asset(&file).await?;
            println!(
                "{}",
                serde_json::json!({
                    "path": asset.path,
                    "durationSecs": asset.duration_secs,
                    "sizeBytes": asset.size_bytes,
                    "contentType": asset.content_type,
                })
            );
        }
        Commands::Upload { file, id, token } => {
            let config = load_config(cli.secrets.as_ref())?;
            let compressor = Arc::new(FfmpegCompressor::new(config.ffmpeg_path.clone())?);
            let asset = compressor.probe_asset(&file).await?;

            let mut orchestrator = UploadOrchestrator::new(config, compressor)?;
            if let Some(token) = token {
                orchestrator = orchestrator.with_bearer_token(token);
            }

            let content_id = id.unwrap_or_else(|| Uuid::new_v4().simple().to_string());
            tracing::info!(%content_id, input = %file.display(), "Starting upload");

            let cancel = CancellationToken::new();
            let ctrl_c_cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    eprintln!("Cancelling...");
                    ctrl_c_cancel.cancel();
                }
            });

            let result = orchestrator
                .run(&content_id, &asset, &cancel, Some(progress_sink()))
                .await?;

            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}
