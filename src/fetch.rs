use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    config::Config,
    error::FetchError,
    model::{DownloadRequest, MediaFormat, Quality},
    process::{last_non_empty_line, run_tool},
};

const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";
const MERGE_CONTAINER: &str = "mp4";
const AUDIO_CODEC: &str = "mp3";
const GENERIC_FAILURE: &str = "Download failed";

/// Retrieves the media behind a request and reports where it landed.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(
        &self,
        request: &DownloadRequest,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, FetchError>;
}

/// Fetcher backed by the yt-dlp command line tool.
pub struct YtDlpFetcher {
    config: Arc<Config>,
}

impl YtDlpFetcher {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    async fn fetch(
        &self,
        request: &DownloadRequest,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, FetchError> {
        let args = build_ytdlp_args(request, &self.config.download_dir);
        info!("fetching {} as {}", request.url, request.format);

        let output = run_tool(
            &self.config.yt_dlp_path,
            &args,
            self.config.tool_timeout,
            cancel,
        )
        .await?;

        if !output.success() {
            let diagnostics = output.stderr.trim();
            warn!("yt-dlp exited with {}: {diagnostics}", output.status);
            return Err(FetchError::Failed(if diagnostics.is_empty() {
                GENERIC_FAILURE.to_string()
            } else {
                diagnostics.to_string()
            }));
        }

        let printed = last_non_empty_line(&output.stdout).ok_or(FetchError::MissingPath)?;
        Ok(resolve_printed_path(&self.config.download_dir, printed))
    }
}

/// yt-dlp `-f` selector for video downloads.
///
/// Falls back from capped height in mp4, to capped height in any mp4, to
/// whatever is best.
pub fn video_selector(quality: Quality) -> String {
    match quality {
        Quality::Best => "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best".to_string(),
        Quality::MaxHeight(height) => format!(
            "bestvideo[height<={height}][ext=mp4]+bestaudio[ext=m4a]/best[height<={height}][ext=mp4]/best"
        ),
    }
}

pub fn build_ytdlp_args(request: &DownloadRequest, download_dir: &Path) -> Vec<String> {
    let mut args = Vec::new();

    match request.format {
        MediaFormat::Audio => {
            args.push("-x".to_string());
            args.push("--audio-format".to_string());
            args.push(AUDIO_CODEC.to_string());
        }
        MediaFormat::Best => {
            args.push("-f".to_string());
            args.push("bestvideo+bestaudio/best".to_string());
        }
        MediaFormat::Video(quality) => {
            args.push("-f".to_string());
            args.push(video_selector(quality));
        }
    }

    args.extend([
        "--merge-output-format".to_string(),
        MERGE_CONTAINER.to_string(),
        "-o".to_string(),
        download_dir.join(OUTPUT_TEMPLATE).to_string_lossy().into_owned(),
        "--no-playlist".to_string(),
        "--print".to_string(),
        "after_move:filepath".to_string(),
        request.url.to_string(),
    ]);

    args
}

fn resolve_printed_path(download_dir: &Path, printed: &str) -> PathBuf {
    let path = PathBuf::from(printed);
    if path.is_absolute() {
        path
    } else {
        download_dir.join(path)
    }
}
