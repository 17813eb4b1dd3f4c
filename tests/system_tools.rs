#![cfg(unix)]
#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Drives the real yt-dlp and curl adapters against scripted stand-ins.

use std::{
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    sync::Arc,
};

use media_share::{AppState, Config, DownloadPipeline, build_router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

async fn serve(config: Config) -> String {
    let pipeline = DownloadPipeline::with_system_tools(Arc::new(config));
    let app = build_router(AppState::new(pipeline, CancellationToken::new()));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/download")
}

async fn post(url: &str, body: Value) -> Value {
    reqwest::Client::new()
        .post(url)
        .json(&body)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn downloaded_file_is_uploaded_for_a_share_link() {
    let tools = tempfile::tempdir().unwrap();
    let downloads = tempfile::tempdir().unwrap();
    let target = downloads.path().join("My Video.mp4");

    // Writes the file the way yt-dlp would, then prints its path last.
    let fetch_body = format!(
        "echo '[download] Destination: {0}'\nprintf media > '{0}'\necho '{0}'",
        target.display()
    );
    let mut config = Config::with_download_dir(downloads.path());
    config.yt_dlp_path = script(tools.path(), "yt-dlp", &fetch_body);
    config.upload_tool = script(
        tools.path(),
        "curl",
        "case \"$5\" in fileToUpload=@*) echo https://files.example/abc ;; *) exit 9 ;; esac",
    );

    let url = serve(config).await;
    let body = post(
        &url,
        json!({
            "url": "https://example.com/v",
            "format": "video",
            "quality": "720",
            "shareLink": true,
        }),
    )
    .await;

    assert_eq!(body["success"], true);
    assert_eq!(body["filename"], "My Video.mp4");
    assert_eq!(body["path"], &*downloads.path().to_string_lossy());
    assert_eq!(body["shareUrl"], "https://files.example/abc");
    assert!(target.exists());
}

#[tokio::test]
async fn tool_exit_code_surfaces_stderr() {
    let tools = tempfile::tempdir().unwrap();
    let downloads = tempfile::tempdir().unwrap();
    let mut config = Config::with_download_dir(downloads.path());
    config.yt_dlp_path = script(tools.path(), "yt-dlp", "echo 'Unsupported URL' >&2\nexit 1");

    let url = serve(config).await;
    let body = post(
        &url,
        json!({
            "url": "https://example.com/v",
            "format": "video",
            "quality": "720",
            "shareLink": false,
        }),
    )
    .await;

    assert_eq!(body, json!({ "success": false, "error": "Unsupported URL" }));
}

#[tokio::test]
async fn failed_upload_still_reports_success() {
    let tools = tempfile::tempdir().unwrap();
    let downloads = tempfile::tempdir().unwrap();
    let target = downloads.path().join("song.mp3");

    let mut config = Config::with_download_dir(downloads.path());
    config.yt_dlp_path = script(
        tools.path(),
        "yt-dlp",
        &format!("printf x > '{0}'\necho '{0}'", target.display()),
    );
    config.upload_tool = script(
        tools.path(),
        "curl",
        "echo 'curl: (6) Could not resolve host' >&2\nexit 6",
    );

    let url = serve(config).await;
    let body = post(
        &url,
        json!({ "url": "https://example.com/v", "format": "audio", "shareLink": true }),
    )
    .await;

    assert_eq!(body["success"], true);
    assert_eq!(body["filename"], "song.mp3");
    assert_eq!(body["shareUrl"], Value::Null);
}
