// InfoExtractor module - video info extraction
//
// Provides two sources:
// - CLI mode: native `yt-dlp` binary (every platform yt-dlp knows)
// - Piped mode: Piped HTTP API (YouTube only, no local tools)
//
// The Orchestrator picks between them per request and falls back from
// yt-dlp to Piped for YouTube when the binary is missing or blocked.

mod cli;
mod diagnostics;
mod orchestrator;
mod piped;
mod traits;

pub use cli::CliInfoExtractor;
pub use diagnostics::{diagnose_error, BlockingReason};
pub use orchestrator::{InfoExtractorOrchestrator, OrchestratorStatus};
pub use piped::PipedInfoExtractor;
pub use traits::{ExtractorConfig, ExtractorMode, InfoExtractor};
