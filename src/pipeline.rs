use std::{path::Path, sync::Arc};

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::{
    config::Config,
    error::DownloadError,
    fetch::{MediaFetcher, YtDlpFetcher},
    model::{DownloadPayload, DownloadRequest, DownloadResult},
    upload::{CurlUploader, ShareUploader},
};

/// Validate, fetch, optionally share. One run per HTTP request.
#[derive(Clone)]
pub struct DownloadPipeline {
    config: Arc<Config>,
    fetcher: Arc<dyn MediaFetcher>,
    uploader: Arc<dyn ShareUploader>,
    permits: Arc<Semaphore>,
}

impl DownloadPipeline {
    pub fn new(
        config: Arc<Config>,
        fetcher: Arc<dyn MediaFetcher>,
        uploader: Arc<dyn ShareUploader>,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent_downloads));
        Self {
            config,
            fetcher,
            uploader,
            permits,
        }
    }

    /// Pipeline wired to yt-dlp and curl.
    pub fn with_system_tools(config: Arc<Config>) -> Self {
        let fetcher = Arc::new(YtDlpFetcher::new(Arc::clone(&config)));
        let uploader = Arc::new(CurlUploader::new(Arc::clone(&config)));
        Self::new(config, fetcher, uploader)
    }

    /// Runs one job to completion on its own task. Never fails: every error,
    /// including a panic inside the job, becomes a failed result.
    pub async fn run(&self, payload: DownloadPayload, cancel: CancellationToken) -> DownloadResult {
        let job_id = Uuid::new_v4();
        let span = info_span!("download", %job_id);
        let job = self.clone();

        let handle = tokio::spawn(
            async move { job.execute(payload, &cancel).await }.instrument(span.clone()),
        );

        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(join_error) => Err(DownloadError::unexpected(describe_join_error(join_error))),
        };

        span.in_scope(|| match outcome {
            Ok(result) => {
                info!("download finished: {:?}", result.filename);
                result
            }
            Err(error) => {
                warn!("download failed: {error}");
                DownloadResult::failed(&error)
            }
        })
    }

    async fn execute(
        &self,
        payload: DownloadPayload,
        cancel: &CancellationToken,
    ) -> Result<DownloadResult, DownloadError> {
        let request = DownloadRequest::try_from(payload)?;

        let _permit = tokio::select! {
            _ = cancel.cancelled() => {
                return Err(DownloadError::unexpected("Download was cancelled"));
            }
            permit = Arc::clone(&self.permits).acquire_owned() => permit
                .map_err(|_| DownloadError::unexpected("Download capacity is unavailable"))?,
        };

        let file_path = self.fetcher.fetch(&request, cancel).await?;
        let filename = file_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                DownloadError::unexpected(format!(
                    "Could not determine a file name from {}",
                    file_path.display()
                ))
            })?;

        let share_url = if request.share_requested {
            self.share(&file_path, cancel).await
        } else {
            None
        };

        Ok(DownloadResult::saved(
            filename,
            &self.config.download_dir,
            share_url,
        ))
    }

    async fn share(&self, file_path: &Path, cancel: &CancellationToken) -> Option<String> {
        if tokio::fs::try_exists(file_path).await.unwrap_or(false) {
            self.uploader.upload(file_path, cancel).await
        } else {
            warn!(
                "skipping share upload, {} does not exist",
                file_path.display()
            );
            None
        }
    }
}

fn describe_join_error(error: tokio::task::JoinError) -> String {
    if error.is_cancelled() {
        return "Download was cancelled".to_string();
    }
    let panic = error.into_panic();
    panic
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "Unexpected internal error".to_string())
}
