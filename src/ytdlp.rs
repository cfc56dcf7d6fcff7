// yt-dlp download invocation
//
// Turns a DownloadRequest into yt-dlp arguments, runs the binary and streams
// its `--newline` progress output into a ProgressSink.

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::DownloaderConfig;
use crate::downloader::errors::DownloadError;
use crate::downloader::models::{
    DownloadOutcome, DownloadProgress, DownloadRequest, DownloadTarget, Platform,
};
use crate::downloader::traits::{DownloaderBackend, ProgressSink};
use crate::downloader::utils::{get_cookie_args, get_proxy_args, get_timeout_args};

lazy_static! {
    // [download]  12.5% of ~ 310.04MiB at  374.36KiB/s ETA 11:59 (frag 56/454)
    static ref PROGRESS_RE: Regex = Regex::new(
        r"\[download\]\s+(\d+\.?\d*)%\s+of\s+~?\s*(\d+\.?\d*\s*\w+)(?:\s+at\s+(\S+/s))?(?:\s+ETA\s+(\S+))?(?:\s+\(frag\s+(\d+)/(\d+)\))?"
    ).unwrap();
    static ref DEST_RE: Regex = Regex::new(r"\[download\]\s+Destination:\s+(.+)").unwrap();
    static ref MERGE_RE: Regex = Regex::new(r"\[Merger?\]\s+Merging").unwrap();
    static ref ALREADY_RE: Regex = Regex::new(r"has already been downloaded").unwrap();
}

const PLAYLIST_TEMPLATE: &str = "%(playlist)s/%(playlist_index)s - %(title)s.%(ext)s";
const SUBTITLE_LANGS: &str = "en,en-US,en-GB";

/// Parse one line of yt-dlp output into a progress update
pub fn parse_progress(line: &str) -> Option<DownloadProgress> {
    if let Some(caps) = PROGRESS_RE.captures(line) {
        let percent: f32 = caps.get(1)?.as_str().parse().ok()?;
        let size = caps.get(2).map_or("?", |m| m.as_str());
        let speed = caps.get(3).map_or("?", |m| m.as_str());

        let mut status = format!("{percent:.1}% of {size} @ {speed}");
        if let Some(eta) = caps.get(4) {
            status.push_str(&format!(" ETA {}", eta.as_str()));
        }
        if let (Some(current), Some(total)) = (caps.get(5), caps.get(6)) {
            status.push_str(&format!(" (frag {}/{})", current.as_str(), total.as_str()));
        }

        return Some(DownloadProgress { percent, status });
    }

    if let Some(caps) = DEST_RE.captures(line) {
        let filename = caps.get(1).map_or("file", |m| m.as_str().trim());
        let short_name: String = Path::new(filename)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| filename.to_string())
            .chars()
            .take(50)
            .collect();
        return Some(DownloadProgress {
            percent: 0.0,
            status: format!("Starting: {short_name}"),
        });
    }

    if MERGE_RE.is_match(line) {
        return Some(DownloadProgress {
            percent: 99.0,
            status: "Merging video and audio...".to_string(),
        });
    }

    if ALREADY_RE.is_match(line) {
        return Some(DownloadProgress {
            percent: 100.0,
            status: "File already downloaded".to_string(),
        });
    }

    None
}

/// Folder the request writes into
pub fn resolve_output_dir(request: &DownloadRequest, config: &DownloaderConfig) -> PathBuf {
    request
        .output_dir
        .clone()
        .unwrap_or_else(|| config.platform_dir(Platform::detect(&request.url)))
}

/// File name template; Instagram and Facebook titles are often empty or long
pub fn output_template(platform: Platform, target: &DownloadTarget) -> &'static str {
    if matches!(target, DownloadTarget::Playlist { .. }) {
        return PLAYLIST_TEMPLATE;
    }
    match platform {
        Platform::Instagram => "%(uploader)s_%(id)s.%(ext)s",
        Platform::Facebook => "%(title)s_%(id)s.%(ext)s",
        Platform::YouTube | Platform::Unknown => "%(title)s.%(ext)s",
    }
}

fn height_format(max_height: u32) -> String {
    format!("bestvideo[height<={max_height}]+bestaudio/best[height<={max_height}]")
}

fn audio_args() -> Vec<String> {
    [
        "-f",
        "bestaudio/best",
        "-x",
        "--audio-format",
        "mp3",
        "--audio-quality",
        "192K",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn subtitle_args() -> Vec<String> {
    [
        "--write-subs",
        "--write-auto-subs",
        "--sub-langs",
        SUBTITLE_LANGS,
        "--convert-subs",
        "srt",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Build the full yt-dlp argument list for a request
pub fn build_download_args(request: &DownloadRequest, config: &DownloaderConfig) -> Vec<String> {
    let platform = Platform::detect(&request.url);
    let output_dir = resolve_output_dir(request, config);

    let mut args = vec![
        "--newline".to_string(),
        "--no-update".to_string(),
        "--retries".to_string(),
        "5".to_string(),
        "--fragment-retries".to_string(),
        "50".to_string(),
        "-P".to_string(),
        output_dir.to_string_lossy().into_owned(),
        "-o".to_string(),
        output_template(platform, &request.target).to_string(),
    ];

    match &request.target {
        DownloadTarget::Format(spec) => {
            args.push("-f".to_string());
            args.push(spec.clone());
        }
        DownloadTarget::MaxHeight(height) => {
            args.push("-f".to_string());
            args.push(height_format(*height));
        }
        DownloadTarget::Best => {
            args.push("-f".to_string());
            args.push("bestvideo+bestaudio/best".to_string());
        }
        DownloadTarget::AudioMp3 => args.extend(audio_args()),
        DownloadTarget::ThumbnailOnly => {
            args.push("--skip-download".to_string());
            args.push("--write-thumbnail".to_string());
        }
        DownloadTarget::SubtitlesOnly => {
            args.push("--skip-download".to_string());
            args.extend(subtitle_args());
        }
        DownloadTarget::Playlist { max_height, audio_only } => {
            if *audio_only {
                args.extend(audio_args());
            } else {
                args.push("-f".to_string());
                args.push(match max_height {
                    Some(h) => height_format(*h),
                    None => "bestvideo+bestaudio/best".to_string(),
                });
            }
            args.push("--yes-playlist".to_string());
            args.push("--ignore-errors".to_string());
        }
    }

    if !matches!(request.target, DownloadTarget::Playlist { .. }) {
        args.push("--no-playlist".to_string());
    }

    if request.target.is_video() {
        args.push("--merge-output-format".to_string());
        args.push(request.container.as_str().to_string());
    }

    if request.with_subtitles && request.target != DownloadTarget::SubtitlesOnly {
        args.extend(subtitle_args());
    }
    if request.with_thumbnail && request.target != DownloadTarget::ThumbnailOnly {
        args.push("--write-thumbnail".to_string());
    }

    args.extend(get_timeout_args(config.timeout_seconds));
    args.extend(get_cookie_args(&config.cookies));
    args.extend(get_proxy_args(config.proxy.as_deref()));

    args.push(request.url.clone());
    args
}

/// Backend that shells out to the yt-dlp binary
#[derive(Debug, Default, Clone, Copy)]
pub struct YtDlpBackend;

impl YtDlpBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DownloaderBackend for YtDlpBackend {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn download(
        &self,
        request: &DownloadRequest,
        config: &DownloaderConfig,
        sink: &dyn ProgressSink,
    ) -> Result<DownloadOutcome, DownloadError> {
        let output_dir = resolve_output_dir(request, config);
        tokio::fs::create_dir_all(&output_dir).await?;

        let program = config.ytdlp_program();
        let args = build_download_args(request, config);
        info!("[yt-dlp] Downloading {} into {}", request.url, output_dir.display());
        debug!("[yt-dlp] {} {}", program, args.join(" "));

        let mut child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => DownloadError::ToolNotFound(program.clone()),
                _ => DownloadError::ExecutionError(format!("Failed to start yt-dlp: {e}")),
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DownloadError::ExecutionError("Failed to capture stdout".to_string()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| DownloadError::ExecutionError("Failed to capture stderr".to_string()))?;

        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf).await;
            buf
        });

        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines.next_line().await? {
            if let Some(progress) = parse_progress(&line) {
                sink.emit(progress);
            }
            if line.contains("[Merger]") || line.contains("Destination") {
                debug!("[yt-dlp] {}", line);
            }
        }

        let status = child.wait().await?;
        let stderr_output = stderr_task.await.unwrap_or_default();

        if !status.success() {
            warn!("[yt-dlp] exited with {}: {}", status, stderr_output.trim());
            return Err(DownloadError::from_stderr(&stderr_output));
        }

        sink.emit(DownloadProgress {
            percent: 100.0,
            status: "Download completed".to_string(),
        });
        info!("[yt-dlp] Finished {}", request.url);

        Ok(DownloadOutcome::Saved {
            directory: output_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Browser, CookieSource};
    use crate::downloader::models::Container;

    fn has_pair(args: &[String], flag: &str, value: &str) -> bool {
        args.windows(2).any(|w| w[0] == flag && w[1] == value)
    }

    #[test]
    fn test_parse_progress_line() {
        let p = parse_progress(
            "[download]  12.5% of ~ 310.04MiB at  374.36KiB/s ETA 11:59 (frag 56/454)",
        )
        .unwrap();
        assert_eq!(p.percent, 12.5);
        assert!(p.status.contains("310.04MiB"));
        assert!(p.status.contains("ETA 11:59"));
        assert!(p.status.contains("frag 56/454"));
    }

    #[test]
    fn test_parse_progress_finished_line() {
        let p = parse_progress("[download] 100% of   10.00MiB in 00:00:02 at 4.50MiB/s").unwrap();
        assert_eq!(p.percent, 100.0);
    }

    #[test]
    fn test_parse_other_lines() {
        let dest = parse_progress("[download] Destination: downloads/My Video.f137.mp4").unwrap();
        assert_eq!(dest.percent, 0.0);
        assert!(dest.status.contains("My Video.f137.mp4"));

        let merge = parse_progress("[Merger] Merging formats into \"downloads/My Video.mp4\"").unwrap();
        assert_eq!(merge.percent, 99.0);

        let done = parse_progress("[download] downloads/x.mp4 has already been downloaded").unwrap();
        assert_eq!(done.percent, 100.0);

        assert!(parse_progress("[youtube] abc: Downloading webpage").is_none());
    }

    #[test]
    fn test_format_args() {
        let config = DownloaderConfig::default();
        let request = DownloadRequest::new(
            "https://youtu.be/dQw4w9WgXcQ",
            DownloadTarget::Format("137+bestaudio[ext=m4a]/bestaudio".to_string()),
        );

        let args = build_download_args(&request, &config);

        assert!(has_pair(&args, "-f", "137+bestaudio[ext=m4a]/bestaudio"));
        assert!(has_pair(&args, "-o", "%(title)s.%(ext)s"));
        assert!(has_pair(&args, "-P", "downloads"));
        assert!(has_pair(&args, "--merge-output-format", "mp4"));
        assert!(args.contains(&"--newline".to_string()));
        assert!(args.contains(&"--no-playlist".to_string()));
        assert_eq!(args.last().unwrap(), "https://youtu.be/dQw4w9WgXcQ");
    }

    #[test]
    fn test_max_height_with_extras() {
        let config = DownloaderConfig::default()
            .with_cookies(CookieSource::Browser(Browser::Firefox))
            .with_proxy(Some("socks5://127.0.0.1:1080".to_string()));
        let request = DownloadRequest::new("https://youtu.be/x", DownloadTarget::MaxHeight(720))
            .with_container(Container::Mkv)
            .with_subtitles(true)
            .with_thumbnail(true);

        let args = build_download_args(&request, &config);

        assert!(has_pair(&args, "-f", "bestvideo[height<=720]+bestaudio/best[height<=720]"));
        assert!(has_pair(&args, "--merge-output-format", "mkv"));
        assert!(has_pair(&args, "--sub-langs", SUBTITLE_LANGS));
        assert!(args.contains(&"--write-thumbnail".to_string()));
        assert!(has_pair(&args, "--cookies-from-browser", "firefox"));
        assert!(has_pair(&args, "--proxy", "socks5://127.0.0.1:1080"));
    }

    #[test]
    fn test_audio_args() {
        let request = DownloadRequest::new("https://youtu.be/x", DownloadTarget::AudioMp3);
        let args = build_download_args(&request, &DownloaderConfig::default());

        assert!(has_pair(&args, "-f", "bestaudio/best"));
        assert!(has_pair(&args, "--audio-format", "mp3"));
        assert!(has_pair(&args, "--audio-quality", "192K"));
        assert!(!args.contains(&"--merge-output-format".to_string()));
    }

    #[test]
    fn test_skip_download_targets() {
        let config = DownloaderConfig::default();

        let thumb = build_download_args(
            &DownloadRequest::new("https://youtu.be/x", DownloadTarget::ThumbnailOnly),
            &config,
        );
        assert!(thumb.contains(&"--skip-download".to_string()));
        assert_eq!(thumb.iter().filter(|a| *a == "--write-thumbnail").count(), 1);

        let subs = build_download_args(
            &DownloadRequest::new("https://youtu.be/x", DownloadTarget::SubtitlesOnly)
                .with_subtitles(true),
            &config,
        );
        assert!(subs.contains(&"--skip-download".to_string()));
        assert_eq!(subs.iter().filter(|a| *a == "--write-subs").count(), 1);
        assert!(has_pair(&subs, "--convert-subs", "srt"));
    }

    #[test]
    fn test_playlist_args() {
        let request = DownloadRequest::new(
            "https://youtube.com/playlist?list=PL1",
            DownloadTarget::Playlist {
                max_height: Some(480),
                audio_only: false,
            },
        );
        let args = build_download_args(&request, &DownloaderConfig::default());

        assert!(has_pair(&args, "-o", PLAYLIST_TEMPLATE));
        assert!(args.contains(&"--yes-playlist".to_string()));
        assert!(args.contains(&"--ignore-errors".to_string()));
        assert!(!args.contains(&"--no-playlist".to_string()));
        assert!(has_pair(&args, "-f", "bestvideo[height<=480]+bestaudio/best[height<=480]"));
    }

    #[test]
    fn test_platform_folders_and_templates() {
        let config = DownloaderConfig::default();

        let ig = DownloadRequest::new("https://www.instagram.com/reel/abc/", DownloadTarget::Best);
        let args = build_download_args(&ig, &config);
        assert!(has_pair(&args, "-P", &Path::new("downloads").join("instagram").to_string_lossy()));
        assert!(has_pair(&args, "-o", "%(uploader)s_%(id)s.%(ext)s"));

        let fb = DownloadRequest::new("https://fb.watch/abc", DownloadTarget::Best)
            .with_output_dir(Some(PathBuf::from("/tmp/out")));
        let args = build_download_args(&fb, &config);
        assert!(has_pair(&args, "-P", "/tmp/out"));
        assert!(has_pair(&args, "-o", "%(title)s_%(id)s.%(ext)s"));
    }

    #[tokio::test]
    async fn test_missing_binary_reports_tool_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = DownloaderConfig::default().with_download_dir(dir.path().to_path_buf());
        config.ytdlp_path = Some(PathBuf::from("/nonexistent/yt-dlp-xyz"));

        let request = DownloadRequest::new("https://youtu.be/x", DownloadTarget::Best);
        let err = YtDlpBackend::new()
            .download(&request, &config, &crate::downloader::traits::NoProgress)
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::ToolNotFound(_)));
    }
}
