//! Console chat bot example.
//!
//! Reads lines from stdin as messages in a single channel and prints
//! whatever the model decides to send.
//!
//! Run with: cargo run -p orchestrator --example console_bot
//!
//! Configuration via .env file or environment variables:
//!   CHIME_ADAPTERS         - JSON roster; without it replies are echoed
//!   CHIME_CONSOLE_CHANNEL  - Channel id for stdin lines (default: console)
//!   CHIME_BOT_ID           - The bot's member id
//!   CHIME_MIN_TRIGGER      - Countdown bounds, see BotConfig::from_env

use std::env;
use std::sync::Arc;

use async_trait::async_trait;
use mock_brain::EchoAdapter;
use orchestrator::{
    AdapterSwitcher, BotConfig, ChatMessage, DeliverySink, Orchestrator, OrchestratorError,
    TurnContext, TurnOutcome,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

/// Prints delivered actions to stdout.
struct ConsoleSink;

#[async_trait]
impl DeliverySink for ConsoleSink {
    async fn send(&self, channel_id: &str, text: &str) -> Result<(), OrchestratorError> {
        println!("[{channel_id}] bot: {text}");
        Ok(())
    }

    async fn execute(&self, channel_id: &str, command: &str) -> Result<(), OrchestratorError> {
        println!("[{channel_id}] bot runs: {command}");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = BotConfig::from_env()?;
    let switcher = if config.adapters.is_empty() {
        println!("CHIME_ADAPTERS not set, echoing replies instead.");
        AdapterSwitcher::with_adapters(vec![Arc::new(EchoAdapter::new())])
    } else {
        AdapterSwitcher::from_entries(config.adapters.clone())?
    };
    let orchestrator = Orchestrator::new(config, switcher, ConsoleSink)?;

    let channel = env::var("CHIME_CONSOLE_CHANNEL").unwrap_or_else(|_| "console".to_string());
    println!("Type messages for channel `{channel}`. Ctrl+D to stop.\n");

    let ctx = TurnContext::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut seq: u64 = 0;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        seq += 1;

        let message = ChatMessage::new(
            format!("console-{seq}"),
            &channel,
            "user",
            line,
            chrono::Utc::now().timestamp_millis(),
        )
        .with_sender_name("You");

        match orchestrator.handle(message, &ctx).await {
            Ok(TurnOutcome::Waiting { remaining }) => info!(remaining, "waiting"),
            Ok(outcome) => info!(?outcome, "turn finished"),
            Err(e) => error!("turn failed: {}", e),
        }
    }

    Ok(())
}
