// Copyright (C) 2025 Category Labs, Inc.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Whale Watch - Hyperliquid position monitor with Telegram alerts

mod api;
mod config;
mod monitor;
mod notify;
mod position;
mod state;

use anyhow::Context;
use api::HyperliquidClient;
use api::types::ClearinghouseState;
use clap::{Parser, Subcommand};
use config::Config;
use monitor::{CycleSettings, LoopSettings, PollLoop};
use notify::format::{display_name, test_message};
use notify::{Notifier, TelegramNotifier};
use state::JsonStateStore;

use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const PREVIEW_CHARS: usize = 400;
const INSPECT_TIMEOUT_SECS: u64 = 15;

#[derive(Parser)]
#[command(name = "whale-watch", version, about = "Hyperliquid position monitor with Telegram alerts")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Poll every configured address (default).
    Run {
        /// Single pass over all addresses, then exit.
        #[arg(long)]
        once: bool,
    },
    /// Send a test message to the configured chat.
    TestTelegram,
    /// Print the raw venue response and parsed positions for an address.
    Inspect { address: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env first so RUST_LOG can come from it
    dotenvy::dotenv().ok();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Run { once: false }) {
        Command::Run { once } => run(once).await,
        Command::TestTelegram => test_telegram().await,
        Command::Inspect { address } => inspect(&address).await,
    }
}

async fn run(once: bool) -> anyhow::Result<()> {
    info!("🚀 Whale Watch starting...");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load config: {}", e);
        e
    })?;

    let names: Vec<String> = config
        .addresses
        .iter()
        .map(|a| match &a.alias {
            Some(_) => format!("{}({})", display_name(&a.address, a.alias.as_deref()), a.address),
            None => a.address.clone(),
        })
        .collect();
    info!("👀 Watching: {}", names.join(", "));
    info!("📡 API: {}", config.api_url);
    info!("⏱️ Poll interval: {}s", config.poll_interval.as_secs());
    info!("📊 Report interval: {} min", config.report_interval_minutes);
    info!("💾 State dir: {}", config.state_dir.display());
    if let Some(proxy) = &config.proxy {
        info!("🌐 Using proxy: {}", proxy);
    }

    let client = HyperliquidClient::new(config.api_url.clone(), config.request_timeout)
        .context("failed to build HTTP client")?;
    let notifier = TelegramNotifier::new(config.telegram_token.clone(), &config.telegram_chat_id);
    let store = JsonStateStore::new(config.state_dir.clone());

    let settings = LoopSettings {
        poll_interval: config.poll_interval,
        address_delay: config.address_delay,
        cycle: CycleSettings {
            report_interval_minutes: config.report_interval_minutes,
            amount_tolerance: config.amount_tolerance,
        },
    };
    let mut poller = PollLoop::new(client, notifier, store, config.addresses.clone(), settings);

    if once || config.run_once {
        tokio::select! {
            summary = poller.run_pass() => {
                if summary.failed > 0 {
                    warn!("⚠️ {} of {} address(es) failed", summary.failed, summary.polled);
                }
            }
            _ = signal::ctrl_c() => {
                info!("🛑 Shutdown signal received, pass aborted");
            }
        }
        return Ok(());
    }

    info!("✅ Monitor ready");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    tokio::select! {
        _ = poller.run() => {}
        _ = signal::ctrl_c() => {
            info!("🛑 Shutdown signal received, stopping monitor");
        }
    }

    Ok(())
}

async fn test_telegram() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let notifier = TelegramNotifier::new(config.telegram_token, &config.telegram_chat_id);

    notifier
        .send(&test_message(chrono::Utc::now()))
        .await
        .context("Telegram test message failed")?;
    info!("✅ Telegram test message delivered");
    Ok(())
}

async fn inspect(address: &str) -> anyhow::Result<()> {
    let address = address.trim().to_lowercase();
    let api_url = config::api_url();
    info!("🔍 Querying {} for {}", api_url, address);

    let client = HyperliquidClient::new(api_url, Duration::from_secs(INSPECT_TIMEOUT_SECS))?;
    let body = client.fetch_raw(&address).await?;

    let preview: String = body.chars().take(PREVIEW_CHARS).collect();
    let ellipsis = if body.chars().count() > PREVIEW_CHARS { " …" } else { "" };
    info!("JSON preview: {}{}", preview, ellipsis);

    let state: ClearinghouseState =
        serde_json::from_str(&body).context("response is not a clearinghouseState")?;
    let snapshot = state.into_snapshot()?;

    info!(
        "💰 Account value: {:?} | Total position value: {:?} | {} position(s)",
        snapshot.account_value,
        snapshot.total_position_value,
        snapshot.len()
    );
    for p in &snapshot.positions {
        info!(
            "  {} {} {} @ {} | PnL {:.2} ({:.2}%) | liq {:?} | {}",
            p.side,
            p.coin,
            p.amount,
            p.entry_price,
            p.unrealized_pnl,
            p.return_on_equity_pct,
            p.liquidation_price,
            p.leverage.map_or_else(|| "-".to_string(), |l| l.to_string())
        );
    }
    Ok(())
}
