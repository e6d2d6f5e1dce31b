use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, ensure};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use onair::config::Config;
use onair::probe::youtube::YoutubeSource;
use onair::publish::Publisher;
use onair::roster::{ChannelRepository, TomlRoster};
use onair::state::MessageStateStore;
use onair::telegram::TelegramApi;
use onair::watcher;

/// `onair` - one Telegram message, always showing who is live.
#[derive(Parser, Debug)]
#[command(name = "onair")]
#[command(version)]
#[command(about = "Keeps one Telegram status message in sync with the live broadcasts of tracked YouTube channels.", long_about = None)]
struct Cli {
    /// Path to config.toml (defaults to ~/.onair/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Watch the tracked channels and maintain the status message
    Run,
    /// Check configuration and Telegram connectivity
    Doctor,
    /// List the tracked channels
    Channels,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging - respects RUST_LOG env var, defaults to INFO
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let config = match cli.config {
        Some(path) => Config::load_or_init_at(path)?,
        None => Config::load_or_init()?,
    };

    match cli.command {
        Commands::Run => run(config).await,
        Commands::Doctor => doctor(config).await,
        Commands::Channels => channels(config).await,
    }
}

async fn run(config: Config) -> Result<()> {
    ensure!(
        !config.telegram.bot_token.is_empty(),
        "telegram.bot_token is not set; edit {} or export ONAIR_BOT_TOKEN",
        config.config_path.display()
    );
    ensure!(
        !config.telegram.chat_id.is_empty(),
        "telegram.chat_id is not set; edit {}",
        config.config_path.display()
    );

    let roster = TomlRoster::new(config.roster_path());
    let source = YoutubeSource::new(Duration::from_secs(config.watcher.probe_timeout_secs))?;
    let api = TelegramApi::new(config.telegram.bot_token.clone())
        .with_api_base(config.telegram.api_base.clone());
    let store = MessageStateStore::new(config.state_file_path());
    let publisher = Publisher::new(api, store, config.telegram.chat_id.clone());

    info!(
        "watching roster {} every {}s",
        config.roster_path().display(),
        config.watcher.interval_secs
    );

    tokio::select! {
        result = watcher::run(config.watcher.interval_secs, &roster, &source, &publisher) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
            Ok(())
        }
    }
}

async fn doctor(config: Config) -> Result<()> {
    println!("Config: {}", config.config_path.display());
    println!(
        "  {} telegram.bot_token",
        if config.telegram.bot_token.is_empty() { "❌" } else { "✅" }
    );
    println!(
        "  {} telegram.chat_id",
        if config.telegram.chat_id.is_empty() { "❌" } else { "✅" }
    );

    let roster = TomlRoster::new(config.roster_path());
    match roster.enabled_channels().await {
        Ok(channels) => println!("  ✅ roster: {} enabled channel(s)", channels.len()),
        Err(e) => println!("  ❌ roster: {e:#}"),
    }

    let store = MessageStateStore::new(config.state_file_path());
    match store.load() {
        Some(id) => println!("  ✅ tracked message: {id}"),
        None => println!("  ∅ no message tracked yet"),
    }

    if config.telegram.bot_token.is_empty() {
        println!("  ∅ skipping connectivity check without a token");
        return Ok(());
    }
    let api = TelegramApi::new(config.telegram.bot_token.clone())
        .with_api_base(config.telegram.api_base.clone());
    match api.get_me().await {
        Ok(username) => println!("  ✅ Telegram: connected as @{username}"),
        Err(e) => println!("  ❌ Telegram: {e}"),
    }

    Ok(())
}

async fn channels(config: Config) -> Result<()> {
    let roster = TomlRoster::new(config.roster_path());
    let channels = roster.enabled_channels().await?;

    if channels.is_empty() {
        println!(
            "No channels tracked. Add [[channels]] entries to {}",
            config.roster_path().display()
        );
        return Ok(());
    }

    for channel in &channels {
        println!("{}: {}", channel.label, channel.url);
    }
    Ok(())
}
