//! # Oladizz
//!
//! Runs the bot: loads configuration, opens the chat store, connects to the
//! Bot API and hands every update to the conversation engine.
//!
//! # Usage
//!
//! ```bash
//! TELEGRAM_BOT_TOKEN=123:abc oladizz
//! oladizz --config ./oladizz.toml --profile production
//! oladizz --memory-store --check
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use oladizz_adapter_telegram::{LongPolling, TelegramBot, TelegramSettings};
use oladizz_core::{BoxedOutbound, BoxedUpdateSource};
use oladizz_framework::ConversationEngine;
use oladizz_runtime::config::{TelegramConfig, ToolsConfig};
use oladizz_runtime::{OladizzRuntime, RuntimeBuilder};
use oladizz_tools::{Binaries, Endpoints, ToolSettings};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "oladizz", version, about = "The Oladizz Telegram bot")]
struct Cli {
    /// Load exactly this configuration file instead of searching.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Configuration profile, e.g. `production`. Overrides `OLADIZZ_PROFILE`.
    #[arg(short, long)]
    profile: Option<String>,

    /// Keep chat state in memory only.
    #[arg(long)]
    memory_store: bool,

    /// Validate the configuration and the bot token, then exit.
    #[arg(long)]
    check: bool,
}

impl Cli {
    fn runtime(&self) -> RuntimeBuilder {
        let mut builder = OladizzRuntime::builder();
        if let Some(path) = &self.config {
            builder = builder.config_file(path);
        }
        if let Some(profile) = &self.profile {
            builder = builder.profile(profile);
        }
        if self.memory_store {
            builder = builder.set("store.backend", "memory");
        }
        builder
    }
}

fn telegram_settings(config: &TelegramConfig) -> TelegramSettings {
    TelegramSettings::new(config.token.clone())
        .api_base(config.api_base.clone())
        .poll_timeout(config.poll_timeout())
        .request_timeout(config.request_timeout())
}

fn tool_settings(config: &ToolsConfig) -> ToolSettings {
    ToolSettings {
        binaries: Binaries {
            ffmpeg: config.ffmpeg.clone(),
            ffprobe: config.ffprobe.clone(),
            tesseract: config.tesseract.clone(),
            magick: config.magick.clone(),
            qrencode: config.qrencode.clone(),
            chromium: config.chromium.clone(),
            zip: config.zip.clone(),
        },
        endpoints: Endpoints {
            github_api: config.github_api.trim_end_matches('/').to_string(),
            gemini_api: config.gemini_api.trim_end_matches('/').to_string(),
            gemini_model: config.gemini_model.clone(),
            npm_registry: config.npm_registry.trim_end_matches('/').to_string(),
            tinyurl_api: config.tinyurl_api.trim_end_matches('/').to_string(),
        },
        http_timeout: config.http_timeout(),
        user_agent: config.user_agent.clone(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let runtime = cli.runtime().build().context("failed to load configuration")?;
    let config = runtime.config().clone();

    let settings = telegram_settings(&config.telegram);
    let bot = TelegramBot::new(&settings).context("failed to create the Bot API client")?;
    let me = bot.get_me().await.context("the bot token was rejected")?;
    info!(
        bot_id = me.id,
        username = me.username.as_deref().unwrap_or("<none>"),
        "Connected to the Bot API"
    );
    if cli.check {
        info!("Configuration and token are valid");
        return Ok(());
    }

    let store = runtime.open_store().await.context("failed to open the chat store")?;
    let temp_dir = runtime.prepare_temp_dir().await?;
    let services = oladizz_tools::services(&tool_settings(&config.tools))
        .context("failed to set up feature services")?;

    let outbound: BoxedOutbound = Arc::new(bot.clone());
    let engine = ConversationEngine::builder(store, outbound)
        .registry(oladizz_tools::registry())
        .menu(oladizz_tools::menu())
        .services(services)
        .temp_dir(temp_dir)
        .task_timeout(config.runtime.task_timeout())
        .build()
        .context("invalid action registry")?;

    let source: BoxedUpdateSource = Arc::new(LongPolling::new(bot.caller(), &settings));
    runtime.run(engine, source).await?;
    info!("Oladizz stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_cli_flags() {
        let cli = Cli::try_parse_from([
            "oladizz",
            "--config",
            "bot.toml",
            "--profile",
            "production",
            "--memory-store",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("bot.toml")));
        assert_eq!(cli.profile.as_deref(), Some("production"));
        assert!(cli.memory_store);
        assert!(!cli.check);
    }

    #[test]
    fn test_tool_settings_from_config() {
        let config = ToolsConfig {
            github_api: "http://localhost:9000/".to_string(),
            http_timeout_secs: 5,
            ..ToolsConfig::default()
        };
        let settings = tool_settings(&config);
        assert_eq!(settings.endpoints.github_api, "http://localhost:9000");
        assert_eq!(settings.http_timeout, Duration::from_secs(5));
        assert_eq!(settings.binaries, Binaries::default());
        assert_eq!(settings.endpoints.gemini_model, "gemini-2.5-flash");
    }

    #[test]
    fn test_telegram_settings_from_config() {
        let config = TelegramConfig {
            token: "123:abc".to_string(),
            api_base: "http://localhost:8081/".to_string(),
            ..TelegramConfig::default()
        };
        let settings = telegram_settings(&config);
        assert_eq!(settings.token, "123:abc");
        assert_eq!(settings.api_base, "http://localhost:8081");
        assert_eq!(settings.poll_timeout, Duration::from_secs(30));
    }
}
