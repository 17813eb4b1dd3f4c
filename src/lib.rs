//! Local HTTP front-end that downloads media with yt-dlp and can publish the
//! result through an anonymous file host.

pub mod config;
pub mod error;
pub mod fetch;
pub mod http;
pub mod model;
pub mod pipeline;
pub mod process;
pub mod upload;

pub use crate::{
    config::{Cli, Config},
    error::{DownloadError, FetchError},
    fetch::{MediaFetcher, YtDlpFetcher},
    http::{AppState, build_router},
    model::{DownloadPayload, DownloadRequest, DownloadResult, MediaFormat, Quality},
    pipeline::DownloadPipeline,
    upload::{CurlUploader, ShareUploader},
};
