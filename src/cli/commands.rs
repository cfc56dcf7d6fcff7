use anyhow::Context;
use std::path::Path;

use super::ConsoleProgress;
use crate::downloader::extractors::{ExtractorConfig, InfoExtractorOrchestrator};
use crate::downloader::format_selector::{format_size, FormatFilter};
use crate::downloader::tools::ToolManager;
use crate::downloader::{
    BatchSummary, Container, DownloadError, DownloadOutcome, DownloadRequest, DownloadTarget, Downloader,
};

fn print_outcome(outcome: &DownloadOutcome) {
    match outcome {
        DownloadOutcome::Saved { directory } => {
            println!("✓ Saved to {}", directory.display());
        }
        DownloadOutcome::DirectUrl { url } => {
            println!("Direct stream URL (open it to download):");
            println!("{url}");
        }
    }
}

/// Print the failure with its hint and turn it into an anyhow error
fn with_hint(err: DownloadError) -> anyhow::Error {
    if let Some(hint) = err.hint() {
        eprintln!("Hint: {hint}");
    }
    anyhow::Error::new(err)
}

pub async fn cmd_qualities(downloader: &Downloader, url: &str, muxed: bool) -> anyhow::Result<()> {
    let filter = filter_for(muxed);

    println!("Fetching video information...");
    let report = downloader.fetch_qualities(url, filter).await.map_err(with_hint)?;

    println!();
    println!("Title: {}", report.video_info.title);
    println!("{:-<60}", "");
    for (i, q) in report.qualities.iter().enumerate() {
        let size = format_size(q.filesize).map(|s| format!(" ~{s}")).unwrap_or_default();
        println!(
            "[{}] {:>9}  {:<6} {:>8.0} kbps{}  id={}",
            i + 1,
            q.resolution_label,
            q.container,
            q.bitrate,
            size,
            q.format_id
        );
    }
    println!();
    if muxed {
        println!("Download with: unidownload download <url> --format-id <id> --muxed");
    } else {
        println!("Download with: unidownload download <url> --format-id <id>");
    }
    Ok(())
}

/// Target for the `download` command; a format id is interpreted under the
/// same filter it was listed with
pub fn download_target(
    format_id: Option<&str>,
    muxed: bool,
    height: Option<u32>,
) -> Result<DownloadTarget, DownloadError> {
    match (format_id, height) {
        (Some(id), _) => Downloader::format_target(id, filter_for(muxed)),
        (None, Some(h)) => Ok(DownloadTarget::MaxHeight(h)),
        (None, None) => Ok(DownloadTarget::Best),
    }
}

fn filter_for(muxed: bool) -> FormatFilter {
    if muxed {
        FormatFilter::MuxedMp4
    } else {
        FormatFilter::VideoOnlyMp4
    }
}

#[allow(clippy::too_many_arguments)]
pub async fn cmd_download(
    downloader: &Downloader,
    url: &str,
    format_id: Option<&str>,
    muxed: bool,
    height: Option<u32>,
    container: Container,
    subs: bool,
    thumbnail: bool,
) -> anyhow::Result<()> {
    let target = download_target(format_id, muxed, height).map_err(with_hint)?;

    let request = DownloadRequest::new(url, target)
        .with_container(container)
        .with_subtitles(subs)
        .with_thumbnail(thumbnail);

    run_request(downloader, request).await
}

pub async fn run_request(downloader: &Downloader, request: DownloadRequest) -> anyhow::Result<()> {
    let outcome = downloader
        .download(&request, &ConsoleProgress)
        .await
        .map_err(with_hint)?;
    print_outcome(&outcome);
    Ok(())
}

pub async fn cmd_single(downloader: &Downloader, url: &str, target: DownloadTarget) -> anyhow::Result<()> {
    run_request(downloader, DownloadRequest::new(url, target)).await
}

pub async fn cmd_playlist(
    downloader: &Downloader,
    url: &str,
    height: Option<u32>,
    audio: bool,
    container: Container,
) -> anyhow::Result<()> {
    let request = DownloadRequest::new(
        url,
        DownloadTarget::Playlist {
            max_height: height,
            audio_only: audio,
        },
    )
    .with_container(container);
    run_request(downloader, request).await
}

/// URLs from a file: one per line, blank lines and '#' comments skipped
pub fn read_url_file(path: &Path) -> anyhow::Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read URL list {}", path.display()))?;
    Ok(parse_url_list(&content))
}

pub fn parse_url_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

pub fn print_batch_summary(summary: &BatchSummary) {
    println!();
    println!("{:-<60}", "");
    println!(
        "Batch finished: {} succeeded, {} failed",
        summary.succeeded.len(),
        summary.failed.len()
    );
    for (url, error) in &summary.failed {
        println!("  ✗ {url}: {error}");
    }
}

pub async fn cmd_batch(
    downloader: &Downloader,
    mut urls: Vec<String>,
    file: Option<&Path>,
    height: Option<u32>,
    container: Container,
) -> anyhow::Result<()> {
    if let Some(path) = file {
        urls.extend(read_url_file(path)?);
    }
    if urls.is_empty() {
        anyhow::bail!("No URLs provided");
    }

    let target = height.map_or(DownloadTarget::Best, DownloadTarget::MaxHeight);
    let summary = downloader
        .batch(&urls, target, container, &ConsoleProgress)
        .await;
    print_batch_summary(&summary);

    if summary.succeeded.is_empty() {
        anyhow::bail!("All {} downloads failed", summary.failed.len());
    }
    Ok(())
}

pub async fn cmd_detect(downloader: &Downloader, url: &str) -> anyhow::Result<()> {
    let report = downloader.detect(url).await.map_err(with_hint)?;

    println!("{:-<60}", "");
    println!("Platform:   {}", report.platform);
    println!("Type:       {:?}", report.media_type);
    println!("Title:      {}", report.title);
    println!("Uploader:   {}", report.uploader);
    if report.duration > 0 {
        println!("Duration:   {}:{:02}", report.duration / 60, report.duration % 60);
    }
    if let Some(entries) = report.entry_count {
        println!("Entries:    {entries}");
    }
    if !report.formats.is_empty() {
        let labels: Vec<&str> = report.formats.iter().map(|f| f.label.as_str()).collect();
        println!("Qualities:  {}", labels.join(", "));
    }
    println!("Subtitles:  {}", if report.has_subtitles { "yes" } else { "no" });
    println!("Options:    {}", report.options.join(", "));
    Ok(())
}

pub async fn cmd_tools(downloader: &Downloader) -> anyhow::Result<()> {
    let tools = ToolManager::from_config(downloader.config()).get_all_tools().await;
    let status = InfoExtractorOrchestrator::new().status(&ExtractorConfig::from(downloader.config()));

    for tool in tools {
        match (&tool.path, &tool.version) {
            (Some(path), version) => println!(
                "✓ {:<8} {} ({})",
                tool.name,
                version.as_deref().unwrap_or("unknown version"),
                path.display()
            ),
            (None, _) => println!(
                "✗ {:<8} not found - {}",
                tool.name,
                tool.tool_type.install_hint()
            ),
        }
    }

    println!();
    println!(
        "Extractor mode: {} (yt-dlp {}, Piped {})",
        status.mode,
        if status.cli_available { "ready" } else { "missing" },
        if status.piped_available { "configured" } else { "not configured" },
    );
    Ok(())
}
