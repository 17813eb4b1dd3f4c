use std::{
    fmt,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::DownloadError;

pub const DEFAULT_FORMAT: &str = "video";
pub const DEFAULT_QUALITY: &str = "720";

/// Body of `POST /download` exactly as the client sent it.
///
/// A field that is missing or `null` takes its default during validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadPayload {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub quality: Option<RawQuality>,
    #[serde(default)]
    pub share_link: Option<bool>,
}

impl DownloadPayload {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }
}

/// Quality may be sent as `"720"`, `720` or `"best"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawQuality {
    Text(String),
    Number(u64),
}

impl RawQuality {
    fn to_text(&self) -> String {
        match self {
            Self::Text(text) => text.trim().to_string(),
            Self::Number(number) => number.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    Best,
    MaxHeight(u32),
}

impl Quality {
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("best") {
            return Some(Self::Best);
        }
        value
            .parse::<u32>()
            .ok()
            .filter(|height| *height > 0)
            .map(Self::MaxHeight)
    }
}

/// Stream selection strategy. Only video carries a quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFormat {
    Video(Quality),
    Audio,
    Best,
}

impl fmt::Display for MediaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video(Quality::Best) => f.write_str("video (best)"),
            Self::Video(Quality::MaxHeight(height)) => write!(f, "video (<= {height}p)"),
            Self::Audio => f.write_str("audio"),
            Self::Best => f.write_str("best"),
        }
    }
}

/// A validated download request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: Url,
    pub format: MediaFormat,
    pub share_requested: bool,
}

impl TryFrom<DownloadPayload> for DownloadRequest {
    type Error = DownloadError;

    fn try_from(payload: DownloadPayload) -> Result<Self, Self::Error> {
        let raw_url = payload.url.as_deref().unwrap_or_default().trim();
        if raw_url.is_empty() {
            return Err(DownloadError::validation("Please provide a URL"));
        }
        let url = Url::parse(raw_url)
            .ok()
            .filter(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
            .ok_or_else(|| DownloadError::validation(format!("Invalid URL: {raw_url}")))?;

        let format_name = payload
            .format
            .as_deref()
            .unwrap_or(DEFAULT_FORMAT)
            .trim()
            .to_ascii_lowercase();
        let format = match format_name.as_str() {
            "audio" => MediaFormat::Audio,
            "best" => MediaFormat::Best,
            "video" | "" => {
                let quality = payload
                    .quality
                    .as_ref()
                    .map_or_else(|| DEFAULT_QUALITY.to_string(), RawQuality::to_text);
                MediaFormat::Video(Quality::parse(&quality).ok_or_else(|| {
                    DownloadError::validation(format!(
                        "Invalid quality {quality:?}; use a height such as 720 or \"best\""
                    ))
                })?)
            }
            other => {
                return Err(DownloadError::validation(format!(
                    "Unknown format {other:?}; expected video, audio or best"
                )));
            }
        };

        Ok(Self {
            url,
            format,
            share_requested: payload.share_link.unwrap_or(false),
        })
    }
}

/// Response entity for `POST /download`.
///
/// A saved result always carries `shareUrl` (null when no link was made); a
/// failed one carries only `success` and `error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(rename = "path", skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    share_url: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DownloadResult {
    pub fn saved(filename: String, directory: &Path, share_url: Option<String>) -> Self {
        Self {
            success: true,
            filename: Some(filename),
            directory: Some(directory.to_path_buf()),
            share_url: Some(share_url),
            error: None,
        }
    }

    pub fn failed(error: &DownloadError) -> Self {
        Self {
            success: false,
            filename: None,
            directory: None,
            share_url: None,
            error: Some(error.to_string()),
        }
    }

    pub fn share_url(&self) -> Option<&str> {
        self.share_url.as_ref().and_then(Option::as_deref)
    }
}
