use std::{path::PathBuf, time::Duration};

use clap::Parser;
use tracing::info;

use crate::error::ConfigError;

pub const DEFAULT_PORT: u16 = 8888;
pub const DEFAULT_TOOL_TIMEOUT_SECONDS: u64 = 600;
pub const DEFAULT_MAX_CONCURRENT_DOWNLOADS: usize = 3;
pub const DEFAULT_UPLOAD_ENDPOINT: &str = "https://catbox.moe/user/api.php";

/// Command line and environment surface of the server.
#[derive(Debug, Parser)]
#[command(name = "media-share", version, about = "Download media with yt-dlp and share it")]
pub struct Cli {
    /// Port to listen on.
    #[arg(default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Interface to bind.
    #[arg(long, env = "BIND_HOST", default_value = "0.0.0.0")]
    pub bind_host: String,

    /// Directory downloads are written to [default: ~/Downloads/YouTube].
    #[arg(long, env = "DOWNLOAD_DIR")]
    pub download_dir: Option<PathBuf>,

    /// Path to the yt-dlp executable [default: ~/.local/bin/yt-dlp].
    #[arg(long, env = "YT_DLP_PATH")]
    pub yt_dlp_path: Option<PathBuf>,

    /// Program used to upload files for share links.
    #[arg(long, env = "UPLOAD_TOOL_PATH", default_value = "curl")]
    pub upload_tool: PathBuf,

    /// Multipart endpoint that receives share uploads.
    #[arg(long, env = "UPLOAD_ENDPOINT", default_value = DEFAULT_UPLOAD_ENDPOINT)]
    pub upload_endpoint: String,

    /// Wall-clock limit for every external tool run, in seconds.
    #[arg(long, env = "TOOL_TIMEOUT_SECS", default_value_t = DEFAULT_TOOL_TIMEOUT_SECONDS)]
    pub tool_timeout_secs: u64,

    /// Jobs allowed to run external tools at the same time.
    #[arg(
        long,
        env = "MAX_CONCURRENT_DOWNLOADS",
        default_value_t = DEFAULT_MAX_CONCURRENT_DOWNLOADS
    )]
    pub max_concurrent_downloads: usize,
}

/// Immutable runtime configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub download_dir: PathBuf,
    pub yt_dlp_path: PathBuf,
    pub upload_tool: PathBuf,
    pub upload_endpoint: String,
    pub tool_timeout: Duration,
    pub max_concurrent_downloads: usize,
}

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        if cli.tool_timeout_secs == 0 {
            return Err(ConfigError::NotPositive {
                name: "tool timeout",
            });
        }
        if cli.max_concurrent_downloads == 0 {
            return Err(ConfigError::NotPositive {
                name: "max concurrent downloads",
            });
        }

        let download_dir = match cli.download_dir {
            Some(dir) => dir,
            None => home_relative(&["Downloads", "YouTube"], "download-dir")?,
        };
        let yt_dlp_path = match cli.yt_dlp_path {
            Some(path) => path,
            None => home_relative(&[".local", "bin", "yt-dlp"], "yt-dlp-path")?,
        };

        Ok(Self {
            bind_addr: format!("{}:{}", cli.bind_host, cli.port),
            download_dir,
            yt_dlp_path,
            upload_tool: cli.upload_tool,
            upload_endpoint: cli.upload_endpoint,
            tool_timeout: Duration::from_secs(cli.tool_timeout_secs),
            max_concurrent_downloads: cli.max_concurrent_downloads,
        })
    }

    /// Config rooted at `download_dir` with every other setting defaulted and
    /// the tools looked up on `PATH`. Used to embed the router without a CLI.
    pub fn with_download_dir(download_dir: impl Into<PathBuf>) -> Self {
        Self {
            bind_addr: format!("127.0.0.1:{DEFAULT_PORT}"),
            download_dir: download_dir.into(),
            yt_dlp_path: PathBuf::from("yt-dlp"),
            upload_tool: PathBuf::from("curl"),
            upload_endpoint: DEFAULT_UPLOAD_ENDPOINT.to_string(),
            tool_timeout: Duration::from_secs(DEFAULT_TOOL_TIMEOUT_SECONDS),
            max_concurrent_downloads: DEFAULT_MAX_CONCURRENT_DOWNLOADS,
        }
    }

    /// Creates the download directory if it does not exist yet.
    pub async fn prepare(&self) -> Result<(), ConfigError> {
        tokio::fs::create_dir_all(&self.download_dir)
            .await
            .map_err(|source| ConfigError::CreateDir {
                path: self.download_dir.clone(),
                source,
            })?;
        info!("Downloads folder: {}", self.download_dir.display());
        Ok(())
    }
}

fn home_relative(segments: &[&str], flag: &'static str) -> Result<PathBuf, ConfigError> {
    let mut path = dirs::home_dir().ok_or(ConfigError::NoHomeDir { flag })?;
    path.extend(segments);
    Ok(path)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["media-share"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn explicit_values_are_used() {
        let cli = parse(&[
            "9000",
            "--download-dir",
            "/srv/media",
            "--yt-dlp-path",
            "/opt/yt-dlp",
            "--bind-host",
            "127.0.0.1",
            "--tool-timeout-secs",
            "30",
        ]);
        let config = Config::from_cli(cli).unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.download_dir, PathBuf::from("/srv/media"));
        assert_eq!(config.yt_dlp_path, PathBuf::from("/opt/yt-dlp"));
        assert_eq!(config.tool_timeout, Duration::from_secs(30));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let cli = parse(&[
            "--download-dir",
            "/tmp/x",
            "--yt-dlp-path",
            "yt-dlp",
            "--tool-timeout-secs",
            "0",
        ]);
        assert!(matches!(
            Config::from_cli(cli),
            Err(ConfigError::NotPositive { .. })
        ));
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let cli = parse(&[
            "--download-dir",
            "/tmp/x",
            "--yt-dlp-path",
            "yt-dlp",
            "--max-concurrent-downloads",
            "0",
        ]);
        assert!(Config::from_cli(cli).is_err());
    }

    #[test]
    fn non_numeric_port_is_a_parse_error() {
        assert!(Cli::try_parse_from(["media-share", "eighty"]).is_err());
    }

    #[tokio::test]
    async fn prepare_creates_nested_directory() {
        let root = tempfile::tempdir().unwrap();
        let config = Config::with_download_dir(root.path().join("a").join("b"));
        config.prepare().await.unwrap();
        assert!(config.download_dir.is_dir());
    }
}
