// Helper functions shared by extractors and the download backend

use lazy_static::lazy_static;
use regex::Regex;
use std::process::{Output, Stdio};
use tokio::io::AsyncReadExt;
use tokio::process::Command as TokioCommand;
use tokio::time::{timeout, Duration};
use tracing::debug;

use crate::config::CookieSource;
use crate::downloader::errors::DownloadError;
use crate::downloader::models::Platform;

lazy_static! {
    static ref YOUTUBE_ID_RE: Regex = Regex::new(r"(?:v=|youtu\.be/|shorts/)([\w-]{11})").unwrap();
}

/// Extract the 11 character video id from a YouTube URL
pub fn extract_video_id(url: &str) -> Option<&str> {
    YOUTUBE_ID_RE
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

pub fn is_youtube_url(url: &str) -> bool {
    Platform::detect(url) == Platform::YouTube
}

/// Piped format ids are stream URLs rather than yt-dlp selectors
pub fn is_direct_stream_url(spec: &str) -> bool {
    spec.starts_with("http://") || spec.starts_with("https://")
}

/// Reject empty input and anything that is not an http(s) URL
pub fn validate_url(url: &str) -> Result<&str, DownloadError> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(DownloadError::InvalidUrl("URL is required".to_string()));
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(DownloadError::InvalidUrl(trimmed.to_string()));
    }
    Ok(trimmed)
}

/// Run command with timeout, collecting stdout and stderr
pub async fn run_output_with_timeout(
    program: &str,
    args: &[String],
    timeout_secs: u64,
) -> Result<Output, DownloadError> {
    debug!(program, args = %args.join(" "), "spawning");

    let mut child = TokioCommand::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => DownloadError::ToolNotFound(program.to_string()),
            _ => DownloadError::ExecutionError(format!("Failed to start {program}: {e}")),
        })?;

    let mut stdout_pipe = child
        .stdout
        .take()
        .ok_or_else(|| DownloadError::ExecutionError(format!("Failed to capture stdout from {program}")))?;
    let mut stderr_pipe = child
        .stderr
        .take()
        .ok_or_else(|| DownloadError::ExecutionError(format!("Failed to capture stderr from {program}")))?;

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stdout_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });

    match timeout(Duration::from_secs(timeout_secs), child.wait()).await {
        Ok(status) => {
            let status = status?;
            let stdout = join_pipe(stdout_task).await?;
            let stderr = join_pipe(stderr_task).await?;
            Ok(Output { status, stdout, stderr })
        }
        Err(_) => {
            let _ = child.kill().await;
            stdout_task.abort();
            stderr_task.abort();
            Err(DownloadError::Timeout(timeout_secs))
        }
    }
}

async fn join_pipe(
    task: tokio::task::JoinHandle<std::io::Result<Vec<u8>>>,
) -> Result<Vec<u8>, DownloadError> {
    task.await
        .map_err(|e| DownloadError::ExecutionError(format!("pipe reader failed: {e}")))?
        .map_err(DownloadError::from)
}

/// Build cookie arguments for yt-dlp
pub fn get_cookie_args(cookies: &CookieSource) -> Vec<String> {
    match cookies {
        CookieSource::None => Vec::new(),
        CookieSource::Browser(browser) => {
            vec!["--cookies-from-browser".to_string(), browser.as_str().to_string()]
        }
        CookieSource::File(path) => {
            vec!["--cookies".to_string(), path.to_string_lossy().to_string()]
        }
    }
}

/// Build proxy arguments for yt-dlp
pub fn get_proxy_args(proxy: Option<&str>) -> Vec<String> {
    match proxy {
        Some(p) => vec!["--proxy".to_string(), p.to_string()],
        None => Vec::new(),
    }
}

/// Build timeout arguments for yt-dlp
pub fn get_timeout_args(timeout_seconds: u64) -> Vec<String> {
    vec!["--socket-timeout".to_string(), timeout_seconds.to_string()]
}
