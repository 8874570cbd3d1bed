//! Bot entry point: load config, connect, and relay until Ctrl-C.

use std::sync::Arc;

use anyhow::{Context, Result};
use audio_relay::chat::telegram::{self, TelegramSink};
use audio_relay::{
    ArtifactStore, Dispatcher, Fetcher, ProcessResolver, RelayConfig, RequestOrchestrator,
};
use clap::Parser;
use tracing::{debug, error, info};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Config is needed to pick the log level; report its failure after tracing is up.
    let loaded = RelayConfig::load(&args.conf);

    // Priority: RUST_LOG env var > quiet flag > verbose flag > config log_level
    let (config_level, level_known) = loaded
        .as_ref()
        .map_or(("info", true), RelayConfig::log_directive);
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => config_level,
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = loaded.with_context(|| format!("loading {}", args.conf.display()))?;
    if !level_known {
        error!(
            log_level = %config.log_level,
            "Unknown log level, will set to Info level"
        );
    }
    debug!(?config, "config loaded");

    let store = ArtifactStore::new(&config.music_dir);
    store
        .ensure_root()
        .await
        .with_context(|| format!("creating storage directory {}", store.root().display()))?;

    let fetcher = Fetcher::with_timeouts(
        config.fetch_connect_timeout_secs,
        config.fetch_read_timeout_secs,
    )
    .context("building HTTP client")?;
    let resolver = Arc::new(ProcessResolver::from_config(&config));

    let bot = telegram::connect(&config.token)
        .await
        .context("connecting to Telegram")?;
    let sink = Arc::new(TelegramSink::new(bot.clone()));

    let orchestrator = Arc::new(RequestOrchestrator::new(
        resolver,
        store,
        fetcher,
        sink,
        config.max_filesize,
    ));
    let dispatcher = Dispatcher::new(orchestrator);

    info!(
        storage = %config.music_dir.display(),
        max_filesize = config.max_filesize,
        "Audio relay starting"
    );
    telegram::run_polling(bot, dispatcher).await?;
    info!("Audio relay stopped");

    Ok(())
}
