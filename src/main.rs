//! Channel Forward Bot - Main Entry Point
//!
//! A Telegram bot that copies all messages from a source channel into a
//! target channel on command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use channel_forward_bot::commands::CommandHandler;
use channel_forward_bot::config::{BotSettings, ChannelStore, TelegramConfig};
use channel_forward_bot::forwarder::ForwardRegistry;
use channel_forward_bot::health;
use channel_forward_bot::telegram::{ChannelGateway, TelegramBot};

/// Telegram bot that copies a channel's messages into another channel.
#[derive(Parser, Debug)]
#[command(name = "forward_bot")]
#[command(about = "Copy every message from one Telegram channel to another")]
#[command(version)]
struct Args {
    /// Path to the channel configuration JSON file (overrides `CONFIG_PATH`).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the .env file for environment variables.
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level);

    // Load environment variables
    if let Err(e) = dotenvy::from_filename(&args.env_file) {
        debug!("Could not load .env file ({}): {}", args.env_file, e);
    }

    // Load configurations
    let tg_config = TelegramConfig::from_env()
        .context("Failed to load Telegram configuration from environment")?;

    let mut settings = BotSettings::from_env_with_defaults();
    if let Some(path) = args.config {
        settings.config_path = path;
    }

    let store = ChannelStore::load(&settings.config_path)
        .context("Failed to load channel configuration")?;

    info!(
        "Loaded configuration from {} (source: {:?}, target: {:?})",
        store.path().display(),
        store.source(),
        store.target()
    );

    // Health endpoint comes up before the bot so it answers while connecting
    let health_addr = settings.health_addr;
    tokio::spawn(async move {
        if let Err(e) = health::serve(health_addr).await {
            error!("Health endpoint stopped: {}", e);
        }
    });

    info!("Bot is starting...");

    let (bot, mut incoming) = TelegramBot::start(&tg_config)
        .await
        .context("Failed to start Telegram session")?;
    let bot = Arc::new(bot);

    let registry = ForwardRegistry::new(settings.single_flight);
    let handler = CommandHandler::new(
        Arc::new(RwLock::new(store)),
        Arc::clone(&bot) as Arc<dyn ChannelGateway>,
        registry.clone(),
    );

    if settings.single_flight {
        info!("Single-flight forwarding enabled");
    }
    info!("Bot is running. Use Ctrl+C to stop.");

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    // Commands are handled in arrival order; `/forward` detaches its own task
    let result = loop {
        tokio::select! {
            message = incoming.recv() => {
                let Some(message) = message else {
                    break Err(anyhow::anyhow!("Telegram update stream closed"));
                };
                handler
                    .handle_message(&message.text, message.is_private, message.reply)
                    .await;
            }
            _ = &mut shutdown => {
                info!("Received Ctrl+C, shutting down...");
                break Ok(());
            }
        }
    };

    for task in registry.active().await {
        warn!(
            "Forward task #{} ({} -> {}) still running since {}, abandoning",
            task.id, task.source, task.target, task.started_at
        );
    }

    bot.disconnect();
    result.context("Bot session ended")
}

/// Initializes the logging subsystem.
fn init_logging(level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
