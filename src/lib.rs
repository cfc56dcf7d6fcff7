pub mod cli;
pub mod config;
pub mod downloader;
pub mod server;
pub mod ytdlp;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
pub use config::DownloaderConfig;
use downloader::{DownloadTarget, Downloader};
use server::AppState;

fn init_tracing(log_level: &str) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = DownloaderConfig::locate(cli.global.config.as_deref());
    let loaded = match &config_path {
        Some(path) => DownloaderConfig::load_from_path(path)?,
        None => DownloaderConfig::default(),
    };
    let config = cli.global.apply(loaded);
    config.validate()?;

    init_tracing(&config.log_level);
    match &config_path {
        Some(path) => info!("Loaded config from {}", path.display()),
        None => info!("No config file found, using defaults"),
    }
    info!("Downloads go to {}", config.download_dir.display());

    let server_config = config.server.clone();
    let downloader = Downloader::new(config);

    match cli.command {
        None | Some(Commands::Menu) => cli::menu::run_menu(downloader).await,
        Some(Commands::Serve { host, port }) => {
            let host = host.unwrap_or(server_config.host);
            let port = port.unwrap_or(server_config.port);
            server::serve(AppState::new(downloader), &host, port).await
        }
        Some(Commands::Qualities { url, muxed }) => cli::cmd_qualities(&downloader, &url, muxed).await,
        Some(Commands::Download {
            url,
            format_id,
            muxed,
            height,
            container,
            subs,
            thumbnail,
        }) => {
            cli::cmd_download(
                &downloader,
                &url,
                format_id.as_deref(),
                muxed,
                height,
                container,
                subs,
                thumbnail,
            )
            .await
        }
        Some(Commands::Audio { url }) => cli::cmd_single(&downloader, &url, DownloadTarget::AudioMp3).await,
        Some(Commands::Thumbnail { url }) => {
            cli::cmd_single(&downloader, &url, DownloadTarget::ThumbnailOnly).await
        }
        Some(Commands::Subtitles { url }) => {
            cli::cmd_single(&downloader, &url, DownloadTarget::SubtitlesOnly).await
        }
        Some(Commands::Playlist {
            url,
            height,
            audio,
            container,
        }) => cli::cmd_playlist(&downloader, &url, height, audio, container).await,
        Some(Commands::Batch {
            urls,
            file,
            height,
            container,
        }) => cli::cmd_batch(&downloader, urls, file.as_deref(), height, container).await,
        Some(Commands::Detect { url }) => cli::cmd_detect(&downloader, &url).await,
        Some(Commands::Tools) => cli::cmd_tools(&downloader).await,
    }
}

