//! CLI module - Command-line interface for UniDownload
//!
//! Flags override the loaded config once at startup; every command then works
//! on that immutable value.

mod commands;
pub mod menu;

use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

use crate::config::{Browser, CookieSource, DownloaderConfig};
use crate::downloader::extractors::ExtractorMode;
use crate::downloader::{Container, DownloadProgress, ProgressSink};

pub use commands::*;

/// UniDownload - YouTube, Instagram and Facebook downloader
#[derive(Parser)]
#[command(name = "unidownload")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Config file (default: ./unidownload.toml, then the user config dir)
    #[arg(long, global = true, env = "UNIDOWNLOAD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Download root folder
    #[arg(short, long, global = true, env = "UNIDOWNLOAD_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Netscape cookies.txt file
    #[arg(long, global = true, env = "UNIDOWNLOAD_COOKIES", conflicts_with = "cookies_from_browser")]
    pub cookies: Option<PathBuf>,

    /// Read cookies from a browser (chrome, firefox, edge, opera, brave)
    #[arg(long, global = true, env = "UNIDOWNLOAD_COOKIES_FROM_BROWSER")]
    pub cookies_from_browser: Option<Browser>,

    /// SOCKS5/HTTP proxy URL
    #[arg(long, global = true, env = "UNIDOWNLOAD_PROXY")]
    pub proxy: Option<String>,

    /// Socket timeout in seconds
    #[arg(long, global = true, env = "UNIDOWNLOAD_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Metadata source: cli, piped or auto
    #[arg(long, global = true, env = "UNIDOWNLOAD_EXTRACTOR")]
    pub extractor: Option<ExtractorMode>,
}

impl GlobalArgs {
    /// New config with the flags that were given laid over `config`
    pub fn apply(&self, mut config: DownloaderConfig) -> DownloaderConfig {
        if let Some(dir) = &self.output_dir {
            config = config.with_download_dir(dir.clone());
        }
        if let Some(path) = &self.cookies {
            config = config.with_cookies(CookieSource::File(path.clone()));
        }
        if let Some(browser) = self.cookies_from_browser {
            config = config.with_cookies(CookieSource::Browser(browser));
        }
        if let Some(proxy) = &self.proxy {
            config = config.with_proxy(Some(proxy.clone()));
        }
        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }
        if let Some(mode) = self.extractor {
            config = config.with_extractor(mode);
        }
        config
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API
    #[command(alias = "web")]
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },

    /// List one option per resolution
    #[command(alias = "q")]
    Qualities {
        url: String,
        /// Muxed MP4 streams instead of video-only MP4
        #[arg(long)]
        muxed: bool,
    },

    /// Download a video
    #[command(alias = "d")]
    Download {
        url: String,
        /// Format id from `qualities` (audio is merged in unless --muxed)
        #[arg(long, conflicts_with = "height")]
        format_id: Option<String>,
        /// The format id came from `qualities --muxed`
        #[arg(long, requires = "format_id")]
        muxed: bool,
        /// Best video up to this height
        #[arg(long)]
        height: Option<u32>,
        #[arg(long, default_value_t = Container::Mp4)]
        container: Container,
        /// Also fetch English subtitles
        #[arg(long)]
        subs: bool,
        /// Also fetch the thumbnail
        #[arg(long)]
        thumbnail: bool,
    },

    /// Best audio as MP3
    #[command(alias = "a")]
    Audio { url: String },

    /// Thumbnail only
    Thumbnail { url: String },

    /// English subtitles only (SRT)
    Subtitles { url: String },

    /// Download a whole playlist
    Playlist {
        url: String,
        #[arg(long, conflicts_with = "audio")]
        height: Option<u32>,
        /// MP3 for every entry
        #[arg(long)]
        audio: bool,
        #[arg(long, default_value_t = Container::Mp4)]
        container: Container,
    },

    /// Download several URLs in a row
    Batch {
        urls: Vec<String>,
        /// File with one URL per line ('#' starts a comment)
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long)]
        height: Option<u32>,
        #[arg(long, default_value_t = Container::Mp4)]
        container: Container,
    },

    /// Show platform, media type and standard qualities
    Detect { url: String },

    /// Report yt-dlp and ffmpeg availability
    Tools,

    /// Interactive text menus
    Menu,
}

/// Progress sink that redraws one terminal line
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleProgress;

impl ProgressSink for ConsoleProgress {
    fn emit(&self, progress: DownloadProgress) {
        let mut out = std::io::stdout().lock();
        let _ = write!(out, "\r\x1b[2K{}", progress.status);
        if progress.percent >= 100.0 {
            let _ = writeln!(out);
        }
        let _ = out.flush();
    }
}
