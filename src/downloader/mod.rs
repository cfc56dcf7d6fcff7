// Downloader module - extraction, quality selection and download orchestration

pub mod errors;
pub mod extractors;
pub mod format_selector;
pub mod models;
pub mod orchestrator;
pub mod tools;
pub mod traits;
pub mod utils;

pub use errors::DownloadError;
pub use format_selector::{
    select_best_qualities, try_select_best_qualities, FormatFilter, QualityOption,
    StandardQuality, StreamDescriptor,
};
pub use models::{
    BatchSummary, Container, DetectReport, DownloadOutcome, DownloadProgress, DownloadRequest,
    DownloadTarget, MediaInfo, MediaKind, Platform, QualityReport,
};
pub use orchestrator::Downloader;
pub use traits::{DownloaderBackend, LogProgress, NoProgress, ProgressSink};
