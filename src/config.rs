//! Downloader configuration.
//!
//! One immutable value is built at startup (file, then env/CLI overrides) and
//! passed into every operation. Menus that change settings produce a new
//! value instead of mutating shared state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::downloader::extractors::ExtractorMode;
use crate::downloader::models::Platform;

pub const DEFAULT_PIPED_API: &str = "https://pipedapi.kavin.rocks";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Browsers yt-dlp can read cookies from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    Chrome,
    Firefox,
    Edge,
    Opera,
    Brave,
}

impl Browser {
    pub const ALL: [Browser; 5] = [
        Browser::Chrome,
        Browser::Firefox,
        Browser::Edge,
        Browser::Opera,
        Browser::Brave,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chrome => "chrome",
            Self::Firefox => "firefox",
            Self::Edge => "edge",
            Self::Opera => "opera",
            Self::Brave => "brave",
        }
    }

    /// Menu numbering starts at 1
    pub fn from_menu_choice(choice: &str) -> Option<Self> {
        let index: usize = choice.trim().parse().ok()?;
        Self::ALL.get(index.checked_sub(1)?).copied()
    }
}

impl fmt::Display for Browser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Browser {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|b| b.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unsupported browser '{s}' (chrome, firefox, edge, opera, brave)"))
    }
}

/// Where authentication cookies come from
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CookieSource {
    #[default]
    None,
    Browser(Browser),
    File(PathBuf),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloaderConfig {
    /// Root folder; Instagram and Facebook get sub-folders
    pub download_dir: PathBuf,

    pub cookies: CookieSource,

    /// SOCKS5/HTTP proxy URL
    pub proxy: Option<String>,

    /// Socket timeout handed to yt-dlp, also bounds metadata extraction
    pub timeout_seconds: u64,

    /// Explicit yt-dlp binary; searched on PATH when unset
    pub ytdlp_path: Option<PathBuf>,

    pub extractor: ExtractorMode,

    pub piped_api: String,

    pub log_level: String,

    pub server: ServerConfig,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("downloads"),
            cookies: CookieSource::None,
            proxy: None,
            timeout_seconds: 30,
            ytdlp_path: None,
            extractor: ExtractorMode::Auto,
            piped_api: DEFAULT_PIPED_API.to_string(),
            log_level: "info".to_string(),
            server: ServerConfig::default(),
        }
    }
}

impl DownloaderConfig {
    /// Load from `explicit`, or the first existing default location, or defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match Self::locate(explicit) {
            Some(path) => Self::load_from_path(&path),
            None => Ok(Self::default()),
        }
    }

    /// File `load` reads; an explicit path is returned even if it is missing
    pub fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        Self::config_paths().into_iter().find(|p| p.exists())
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        config.validate()?;
        Ok(config)
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("unidownload.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("unidownload").join("config.toml"));
        }

        paths
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_seconds == 0 {
            return Err(ConfigError::Invalid("timeout_seconds must be positive".to_string()));
        }
        if self.download_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("download_dir must not be empty".to_string()));
        }
        if let Some(proxy) = &self.proxy {
            if !proxy.contains("://") {
                return Err(ConfigError::Invalid(format!(
                    "proxy '{proxy}' must include a scheme (socks5://, http://)"
                )));
            }
        }
        Ok(())
    }

    /// Output folder for a platform
    pub fn platform_dir(&self, platform: Platform) -> PathBuf {
        match platform.download_subdir() {
            Some(sub) => self.download_dir.join(sub),
            None => self.download_dir.clone(),
        }
    }

    pub fn with_cookies(mut self, cookies: CookieSource) -> Self {
        self.cookies = cookies;
        self
    }

    pub fn with_download_dir(mut self, dir: PathBuf) -> Self {
        self.download_dir = dir;
        self
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn with_extractor(mut self, mode: ExtractorMode) -> Self {
        self.extractor = mode;
        self
    }

    pub fn ytdlp_program(&self) -> String {
        self.ytdlp_path
            .as_ref()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_else(|| "yt-dlp".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = DownloaderConfig::default();
        assert_eq!(config.download_dir, PathBuf::from("downloads"));
        assert_eq!(config.cookies, CookieSource::None);
        assert_eq!(config.server.port, 5000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_platform_dirs() {
        let config = DownloaderConfig::default();
        assert_eq!(config.platform_dir(Platform::YouTube), PathBuf::from("downloads"));
        assert_eq!(
            config.platform_dir(Platform::Instagram),
            PathBuf::from("downloads").join("instagram")
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
download_dir = "/tmp/media"
proxy = "socks5://127.0.0.1:1080"
timeout_seconds = 12
cookies = {{ browser = "firefox" }}

[server]
port = 8080
"#
        )
        .unwrap();

        let config = DownloaderConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.download_dir, PathBuf::from("/tmp/media"));
        assert_eq!(config.cookies, CookieSource::Browser(Browser::Firefox));
        assert_eq!(config.timeout_seconds, 12);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_invalid_proxy_rejected() {
        let config = DownloaderConfig::default().with_proxy(Some("127.0.0.1:1080".to_string()));
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_browser_menu_choice() {
        assert_eq!(Browser::from_menu_choice("1"), Some(Browser::Chrome));
        assert_eq!(Browser::from_menu_choice("5"), Some(Browser::Brave));
        assert_eq!(Browser::from_menu_choice("0"), None);
        assert_eq!(Browser::from_menu_choice("6"), None);
        assert_eq!("Edge".parse::<Browser>(), Ok(Browser::Edge));
    }

    #[test]
    fn test_with_cookies_returns_new_value() {
        let base = DownloaderConfig::default();
        let updated = base.clone().with_cookies(CookieSource::Browser(Browser::Chrome));
        assert_eq!(base.cookies, CookieSource::None);
        assert_eq!(updated.cookies, CookieSource::Browser(Browser::Chrome));
    }

    #[test]
    fn test_locate_explicit_path() {
        let path = Path::new("/nonexistent/unidownload.toml");
        assert_eq!(DownloaderConfig::locate(Some(path)), Some(path.to_path_buf()));
        assert!(DownloaderConfig::load(Some(path)).is_err());
    }
}
