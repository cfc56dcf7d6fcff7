//! Interactive text menus.
//!
//! Settings chosen here (cookies, download folder) never touch the running
//! downloader: they build a new [`DownloaderConfig`] and the menu continues
//! with a downloader reconfigured from it.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use crate::cli::{print_batch_summary, ConsoleProgress};
use crate::config::{Browser, CookieSource, DownloaderConfig};
use crate::downloader::format_selector::standard_qualities;
use crate::downloader::{
    Container, DownloadError, DownloadOutcome, DownloadRequest, DownloadTarget, Downloader,
    MediaKind, Platform,
};
use crate::downloader::models::is_playlist_url;

const RULE: &str = "============================================================";

/// New config with cookies from the browser at `choice` (1-based), or `None`
/// when the choice is empty or out of range.
pub fn cookie_config(config: &DownloaderConfig, choice: &str) -> Option<DownloaderConfig> {
    let browser = Browser::from_menu_choice(choice)?;
    Some(config.clone().with_cookies(CookieSource::Browser(browser)))
}

/// New config with a different download root; empty input keeps the current one
pub fn folder_config(config: &DownloaderConfig, input: &str) -> Option<DownloaderConfig> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    Some(config.clone().with_download_dir(PathBuf::from(input)))
}

pub struct Menu<R, W> {
    input: R,
    output: W,
    downloader: Downloader,
}

impl<R: BufRead, W: Write> Menu<R, W> {
    pub fn new(input: R, output: W, downloader: Downloader) -> Self {
        Self {
            input,
            output,
            downloader,
        }
    }

    /// Read one trimmed line; `None` on end of input
    fn prompt(&mut self, label: &str) -> io::Result<Option<String>> {
        write!(self.output, "{label}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn say(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.output, "{text}")
    }

    fn header(&mut self, title: &str) -> io::Result<()> {
        writeln!(self.output, "\n{RULE}\n{title}\n{RULE}")
    }

    fn yes(&mut self, label: &str) -> io::Result<bool> {
        Ok(self
            .prompt(label)?
            .is_some_and(|a| a.eq_ignore_ascii_case("y")))
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        self.say(RULE)?;
        self.say("          UniDownload - Universal Media Downloader")?;
        self.say(RULE)?;

        loop {
            self.say("\nSelect Platform:\n1. YouTube\n2. Instagram\n3. Facebook\n0. Exit\n")?;
            let Some(choice) = self.prompt("Enter your choice: ")? else {
                return Ok(());
            };

            let platform = match choice.as_str() {
                "1" => Platform::YouTube,
                "2" => Platform::Instagram,
                "3" => Platform::Facebook,
                "0" => {
                    self.say("\nThank you for using UniDownload!")?;
                    return Ok(());
                }
                _ => {
                    self.say("\nInvalid choice. Please try again.")?;
                    continue;
                }
            };

            if !self.platform_menu(platform).await? {
                return Ok(());
            }
            self.say(&"-".repeat(60))?;
        }
    }

    /// Returns false when input ran out
    async fn platform_menu(&mut self, platform: Platform) -> anyhow::Result<bool> {
        let (title, what) = match platform {
            Platform::YouTube => ("YouTube Options", "Single Video/Playlist"),
            Platform::Instagram => ("Instagram Options", "Post/Reel/Story"),
            _ => ("Facebook Options", "Post/Video/Image"),
        };
        self.header(title)?;
        self.say(&format!("1. Download {what}\n2. Advanced Options\n3. Back to Main Menu\n"))?;

        let Some(choice) = self.prompt("Enter your choice: ")? else {
            return Ok(false);
        };

        match choice.as_str() {
            "1" => {
                let Some(url) = self.prompt(&format!("\nEnter {platform} URL: "))? else {
                    return Ok(false);
                };
                if url.is_empty() {
                    self.say("Invalid URL. Please try again.")?;
                } else if platform == Platform::YouTube {
                    self.youtube_download(&url).await?;
                } else {
                    self.social_download(platform, &url).await?;
                }
            }
            "2" => self.advanced_menu(platform).await?,
            "3" => {}
            _ => self.say("Invalid choice.")?,
        }
        Ok(true)
    }

    async fn advanced_menu(&mut self, platform: Platform) -> anyhow::Result<()> {
        self.header("Advanced Options")?;
        self.say("1. Set Custom Download Folder\n2. Enable Browser Cookies (for private content)\n3. Batch Download (Multiple URLs)\n4. Back\n")?;

        let Some(choice) = self.prompt("Enter your choice: ")? else {
            return Ok(());
        };

        match choice.as_str() {
            "1" => {
                let current = self.downloader.config().download_dir.display().to_string();
                self.say(&format!("Current folder: {current}"))?;
                let input = self
                    .prompt("Enter new download folder path (or press Enter to keep current): ")?
                    .unwrap_or_default();
                if let Some(config) = folder_config(self.downloader.config(), &input) {
                    self.downloader = self.downloader.reconfigured(config);
                    self.say(&format!("Download folder set to: {}", input.trim()))?;
                }
            }
            "2" => {
                self.say("\nSelect browser:")?;
                for (i, browser) in Browser::ALL.iter().enumerate() {
                    writeln!(self.output, "{}. {}", i + 1, browser)?;
                }
                let input = self
                    .prompt("Select browser (or press Enter to skip): ")?
                    .unwrap_or_default();
                match cookie_config(self.downloader.config(), &input) {
                    Some(config) => {
                        self.downloader = self.downloader.reconfigured(config);
                        self.say("Cookies enabled.")?;
                    }
                    None => self.say("Cookies unchanged.")?,
                }
            }
            "3" => self.batch_menu(platform).await?,
            "4" => {}
            _ => self.say("Invalid choice.")?,
        }
        Ok(())
    }

    async fn youtube_download(&mut self, url: &str) -> anyhow::Result<()> {
        if is_playlist_url(url) {
            return self.youtube_playlist(url).await;
        }

        self.say("\nFetching video information...")?;
        let media = match self.downloader.extract(url).await {
            Ok(media) => media,
            Err(e) => return self.report_error(&e),
        };
        let qualities = standard_qualities(&media.formats);

        self.say(&format!("\nTitle: {}\nUploader: {}\nDuration: {}", media.title, media.uploader, media.duration_label()))?;
        self.header("Download Options:")?;
        self.say("V. Download Video (choose quality)\nA. Download Audio Only (MP3)\nT. Download Thumbnail Only\nS. Download Subtitles Only\nB. Back to main menu\n")?;

        let Some(choice) = self.prompt("Enter your choice: ")? else {
            return Ok(());
        };

        let request = match choice.to_uppercase().as_str() {
            "V" => {
                if qualities.is_empty() {
                    return self.say("No video formats available.").map_err(Into::into);
                }
                self.say("\nSelect Quality:")?;
                for (i, q) in qualities.iter().enumerate() {
                    writeln!(self.output, "{}. {}", i + 1, q.label)?;
                }
                let pick = self.prompt("\nEnter quality number: ")?.unwrap_or_default();
                let Some(quality) = pick
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|i| qualities.get(i))
                else {
                    return self.say("Invalid choice.").map_err(Into::into);
                };
                let height = quality.height;

                self.say("\nAdditional Options:\n1. Format: MP4 (default)\n2. Format: WebM\n3. Format: MKV")?;
                let container = Container::from_menu_choice(
                    &self.prompt("Select format (press Enter for MP4): ")?.unwrap_or_default(),
                );
                let subs = self.yes("Download subtitles? (y/n, default: n): ")?;
                let thumb = self.yes("Download thumbnail? (y/n, default: n): ")?;

                DownloadRequest::new(url, DownloadTarget::MaxHeight(height))
                    .with_container(container)
                    .with_subtitles(subs)
                    .with_thumbnail(thumb)
            }
            "A" => DownloadRequest::new(url, DownloadTarget::AudioMp3),
            "T" => DownloadRequest::new(url, DownloadTarget::ThumbnailOnly),
            "S" => DownloadRequest::new(url, DownloadTarget::SubtitlesOnly),
            "B" => return Ok(()),
            _ => return self.say("Invalid choice.").map_err(Into::into),
        };

        self.run_download(request).await
    }

    async fn youtube_playlist(&mut self, url: &str) -> anyhow::Result<()> {
        self.say("\nPlaylist detected!")?;
        self.header("Playlist Download Options:")?;
        self.say("1. Download entire playlist (video)\n2. Download entire playlist (audio only)\n3. Back to main menu\n")?;

        let Some(choice) = self.prompt("Enter your choice: ")? else {
            return Ok(());
        };

        let request = match choice.as_str() {
            "1" => {
                let (max_height, container) = self.quality_and_container("Select Quality for all videos:")?;
                let subs = self.yes("Download subtitles for all videos? (y/n, default: n): ")?;
                DownloadRequest::new(
                    url,
                    DownloadTarget::Playlist {
                        max_height,
                        audio_only: false,
                    },
                )
                .with_container(container)
                .with_subtitles(subs)
            }
            "2" => {
                if !self.yes("\nContinue with download? (y/n): ")? {
                    return self.say("Download cancelled.").map_err(Into::into);
                }
                DownloadRequest::new(
                    url,
                    DownloadTarget::Playlist {
                        max_height: None,
                        audio_only: true,
                    },
                )
            }
            "3" => return Ok(()),
            _ => return self.say("Invalid choice.").map_err(Into::into),
        };

        self.run_download(request).await
    }

    /// Fixed quality ladder used for playlists and batches
    fn quality_and_container(&mut self, title: &str) -> io::Result<(Option<u32>, Container)> {
        self.say(&format!("\n{title}\n1. 1080p HD\n2. 720p\n3. 480p\n4. 360p\n5. Best available"))?;
        let choice = self.prompt("\nEnter quality number: ")?.unwrap_or_default();
        let max_height = match DownloadTarget::from_quality_choice(&choice) {
            DownloadTarget::MaxHeight(h) => Some(h),
            _ => None,
        };

        self.say("\nSelect format:\n1. MP4 (default)\n2. WebM\n3. MKV")?;
        let container = Container::from_menu_choice(
            &self.prompt("Enter format number (press Enter for MP4): ")?.unwrap_or_default(),
        );
        Ok((max_height, container))
    }

    async fn social_download(&mut self, platform: Platform, url: &str) -> anyhow::Result<()> {
        self.say("\nFetching media information...")?;
        let media = match self.downloader.extract(url).await {
            Ok(media) => media,
            Err(e) => {
                self.say("Make sure the content is public or you have access to it.")?;
                return self.report_error(&e);
            }
        };

        let kind = match platform {
            Platform::Facebook => MediaKind::from_extracted(&media),
            _ => MediaKind::from_url(platform, url),
        };
        self.say(&format!("\n{RULE}\nMedia Type: {kind:?}\nUploader: {}\nTitle: {}\n{RULE}", media.uploader, media.title))?;
        self.say("\nDownload Options:\n1. Download Media (Best Quality)\n2. Download Audio Only (MP3)\n3. Download with Thumbnail\n4. Back to main menu\n")?;

        let Some(choice) = self.prompt("Enter your choice: ")? else {
            return Ok(());
        };

        let request = match choice.as_str() {
            "1" => DownloadRequest::new(url, DownloadTarget::Best),
            "2" => DownloadRequest::new(url, DownloadTarget::AudioMp3),
            "3" => DownloadRequest::new(url, DownloadTarget::Best).with_thumbnail(true),
            "4" => return Ok(()),
            _ => return self.say("Invalid choice.").map_err(Into::into),
        };

        self.run_download(request).await
    }

    /// URLs one per line until "done" or end of input
    fn read_urls(&mut self) -> io::Result<Vec<String>> {
        self.say("Enter URLs (one per line)\nEnter 'done' when finished:\n")?;
        let mut urls = Vec::new();
        while let Some(line) = self.prompt(&format!("URL {}: ", urls.len() + 1))? {
            if line.eq_ignore_ascii_case("done") {
                break;
            }
            if !line.is_empty() {
                urls.push(line);
            }
        }
        Ok(urls)
    }

    async fn batch_menu(&mut self, platform: Platform) -> anyhow::Result<()> {
        self.header("Batch Download")?;
        let urls = self.read_urls()?;
        if urls.is_empty() {
            return self.say("No URLs provided.").map_err(Into::into);
        }
        self.say(&format!("\n{} URL(s) added.", urls.len()))?;

        let (target, container) = if platform == Platform::YouTube {
            let (max_height, container) = self.quality_and_container("Select Quality for all videos:")?;
            (max_height.map_or(DownloadTarget::Best, DownloadTarget::MaxHeight), container)
        } else {
            if !self.yes("Continue with batch download? (y/n): ")? {
                return self.say("Batch download cancelled.").map_err(Into::into);
            }
            (DownloadTarget::Best, Container::Mp4)
        };

        let summary = self
            .downloader
            .batch(&urls, target, container, &ConsoleProgress)
            .await;
        print_batch_summary(&summary);
        Ok(())
    }

    async fn run_download(&mut self, request: DownloadRequest) -> anyhow::Result<()> {
        match self.downloader.download(&request, &ConsoleProgress).await {
            Ok(DownloadOutcome::Saved { directory }) => {
                self.say(&format!("\n✓ Downloaded successfully to {}", directory.display()))?;
            }
            Ok(DownloadOutcome::DirectUrl { url }) => {
                self.say(&format!("\nDirect stream URL: {url}"))?;
            }
            Err(e) => self.report_error(&e)?,
        }
        Ok(())
    }

    fn report_error(&mut self, err: &DownloadError) -> anyhow::Result<()> {
        self.say(&format!("\n✗ Error: {err}"))?;
        if let Some(hint) = err.hint() {
            self.say(&format!("Hint: {hint}"))?;
        }
        Ok(())
    }
}

/// Run the menus on stdin/stdout
pub async fn run_menu(downloader: Downloader) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut menu = Menu::new(stdin.lock(), io::stdout(), downloader);
    menu.run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::extractors::{ExtractorConfig, InfoExtractor};
    use crate::downloader::format_selector::StreamDescriptor;
    use crate::downloader::{DownloaderBackend, MediaInfo, ProgressSink};
    use async_trait::async_trait;
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};

    struct OneVideo;

    #[async_trait]
    impl InfoExtractor for OneVideo {
        fn name(&self) -> &'static str {
            "one-video"
        }

        fn is_available(&self, _config: &ExtractorConfig) -> bool {
            true
        }

        fn supports(&self, _url: &str) -> bool {
            true
        }

        async fn extract(&self, _url: &str, _config: &ExtractorConfig) -> Result<MediaInfo, DownloadError> {
            Ok(MediaInfo {
                id: "x".to_string(),
                title: "Clip".to_string(),
                uploader: "Someone".to_string(),
                duration_seconds: 90,
                thumbnail: String::new(),
                webpage_url: String::new(),
                formats: vec![
                    StreamDescriptor::from_codecs("137", Some("avc1"), None, "mp4", Some(1080), Some(3000.0)),
                    StreamDescriptor::from_codecs("136", Some("avc1"), None, "mp4", Some(720), Some(1500.0)),
                ],
                has_subtitles: false,
                is_playlist: false,
                entry_count: None,
                extension: Some("mp4".to_string()),
            })
        }
    }

    #[derive(Default)]
    struct Recorder {
        requests: Mutex<Vec<DownloadRequest>>,
    }

    #[async_trait]
    impl DownloaderBackend for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        async fn download(
            &self,
            request: &DownloadRequest,
            config: &DownloaderConfig,
            _sink: &dyn ProgressSink,
        ) -> Result<DownloadOutcome, DownloadError> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(DownloadOutcome::Saved {
                directory: config.download_dir.clone(),
            })
        }
    }

    fn menu(script: &str) -> (Menu<Cursor<Vec<u8>>, Vec<u8>>, Arc<Recorder>) {
        let backend = Arc::new(Recorder::default());
        let downloader = Downloader::with_components(
            DownloaderConfig::default(),
            Arc::new(OneVideo),
            backend.clone(),
        );
        (
            Menu::new(Cursor::new(script.as_bytes().to_vec()), Vec::new(), downloader),
            backend,
        )
    }

    #[test]
    fn test_cookie_config_returns_new_value() {
        let base = DownloaderConfig::default();
        let updated = cookie_config(&base, "2").unwrap();

        assert_eq!(updated.cookies, CookieSource::Browser(Browser::Firefox));
        assert_eq!(base.cookies, CookieSource::None);
        assert!(cookie_config(&base, "").is_none());
        assert!(cookie_config(&base, "9").is_none());
    }

    #[test]
    fn test_folder_config() {
        let base = DownloaderConfig::default();
        assert!(folder_config(&base, "  ").is_none());
        assert_eq!(
            folder_config(&base, "/media/videos").unwrap().download_dir,
            PathBuf::from("/media/videos")
        );
    }

    #[tokio::test]
    async fn test_youtube_video_flow() {
        // platform 1, download 1, url, V, quality 2 (720p), webm, subs yes, thumb no, exit
        let (mut menu, backend) = menu("1\n1\nhttps://youtu.be/dQw4w9WgXcQ\nV\n2\n2\ny\nn\n0\n");
        menu.run().await.unwrap();

        let requests = backend.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].target, DownloadTarget::MaxHeight(720));
        assert_eq!(requests[0].container, Container::Webm);
        assert!(requests[0].with_subtitles);
        assert!(!requests[0].with_thumbnail);
    }

    #[tokio::test]
    async fn test_cookie_menu_reconfigures_downloader() {
        // platform 2, advanced, cookies, chrome, then end of input
        let (mut menu, _) = menu("2\n2\n2\n1\n");
        menu.run().await.unwrap();

        assert_eq!(
            menu.downloader.config().cookies,
            CookieSource::Browser(Browser::Chrome)
        );
    }

    #[tokio::test]
    async fn test_batch_menu_reads_until_done() {
        let script = "1\n2\n3\nhttps://youtu.be/a\n\nhttps://youtu.be/b\ndone\n3\n\n0\n";
        let (mut menu, backend) = menu(script);
        menu.run().await.unwrap();

        let requests = backend.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|r| r.target == DownloadTarget::MaxHeight(480)));
    }

    #[tokio::test]
    async fn test_invalid_choice_keeps_looping() {
        let (mut menu, backend) = menu("7\n0\n");
        menu.run().await.unwrap();

        let out = String::from_utf8(menu.output.clone()).unwrap();
        assert!(out.contains("Invalid choice"));
        assert!(out.contains("Thank you for using UniDownload!"));
        assert!(backend.requests.lock().unwrap().is_empty());
    }
}
