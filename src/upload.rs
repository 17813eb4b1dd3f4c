use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;

use crate::{config::Config, process::run_tool};

/// Publishes a local file and returns a public link to it.
///
/// Every failure collapses to `None`; a missing link never fails the
/// download it belongs to.
#[async_trait]
pub trait ShareUploader: Send + Sync {
    async fn upload(&self, file: &Path, cancel: &CancellationToken) -> Option<String>;
}

/// Uploads with curl as a multipart form post.
pub struct CurlUploader {
    config: Arc<Config>,
}

impl CurlUploader {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ShareUploader for CurlUploader {
    async fn upload(&self, file: &Path, cancel: &CancellationToken) -> Option<String> {
        let args = build_upload_args(file, &self.config.upload_endpoint);
        let output = match run_tool(
            &self.config.upload_tool,
            &args,
            self.config.tool_timeout,
            cancel,
        )
        .await
        {
            Ok(output) => output,
            Err(error) => {
                warn!("upload of {} did not run: {error}", file.display());
                return None;
            }
        };

        if !output.success() {
            warn!(
                "upload of {} exited with {}: {}",
                file.display(),
                output.status,
                output.stderr.trim()
            );
            return None;
        }

        let share_url = parse_share_url(&output.stdout);
        match &share_url {
            Some(url) => info!("uploaded {} to {url}", file.display()),
            None => warn!(
                "upload of {} returned no link: {:?}",
                file.display(),
                output.stdout.trim()
            ),
        }
        share_url
    }
}

pub fn build_upload_args(file: &Path, endpoint: &str) -> Vec<String> {
    vec![
        "-sS".to_string(),
        "-F".to_string(),
        "reqtype=fileupload".to_string(),
        "-F".to_string(),
        format!("fileToUpload=@{}", file.display()),
        endpoint.to_string(),
    ]
}

/// Accepts the tool's stdout only when it is a bare http(s) link, and returns
/// it in normalized (percent-encoded) form.
pub fn parse_share_url(stdout: &str) -> Option<String> {
    if !(stdout.starts_with("https://") || stdout.starts_with("http://")) {
        return None;
    }
    Url::parse(stdout.trim()).ok().map(String::from)
}
