use std::{io, path::PathBuf, time::Duration};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not resolve the home directory; pass --{flag} explicitly")]
    NoHomeDir { flag: &'static str },

    #[error("{name} must be greater than zero")]
    NotPositive { name: &'static str },

    #[error("could not create download directory {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("{program} could not be started: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} did not finish within {}s", .limit.as_secs())]
    TimedOut { program: String, limit: Duration },

    #[error("{program} was cancelled")]
    Cancelled { program: String },
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Download timed out ({} limit)", describe_limit(.limit))]
    TimedOut { limit: Duration },

    /// Non-zero exit; carries the tool's diagnostics.
    #[error("{0}")]
    Failed(String),

    #[error("Download finished but the downloader did not report a file path")]
    MissingPath,

    #[error("Download was cancelled")]
    Cancelled,

    #[error("{0}")]
    Launch(ProcessError),
}

impl From<ProcessError> for FetchError {
    fn from(error: ProcessError) -> Self {
        match error {
            ProcessError::TimedOut { limit, .. } => Self::TimedOut { limit },
            ProcessError::Cancelled { .. } => Self::Cancelled,
            other => Self::Launch(other),
        }
    }
}

/// Every way a download request can fail. The `Display` text is what the
/// client sees in the `error` field.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("{0}")]
    Unexpected(String),
}

impl DownloadError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("could not listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("HTTP server error: {0}")]
    Serve(#[source] io::Error),
}

fn describe_limit(limit: &Duration) -> String {
    let secs = limit.as_secs();
    if secs >= 60 && secs % 60 == 0 {
        format!("{} min", secs / 60)
    } else {
        format!("{secs}s")
    }
}
