// Copyright (C) 2025 Category Labs, Inc.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Configuration module - loads settings from environment variables.

use crate::position::AMOUNT_TOLERANCE;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_ADDRESS: &str = "0xb317d2bc2d3d2df5fa441b5bae0ab9d8b07283ae";
pub const DEFAULT_API_URL: &str = "https://api-ui.hyperliquid.xyz/info";

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },

    #[error("no addresses to monitor, set ADDRESS or ADDRESSES")]
    NoAddresses,
}

/// An address to watch plus its optional display alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedAddress {
    pub address: String,
    pub alias: Option<String>,
}

/// Main configuration for the monitor.
#[derive(Debug, Clone)]
pub struct Config {
    // Targets
    pub addresses: Vec<WatchedAddress>,

    // Venue
    pub api_url: String,
    pub request_timeout: Duration,

    // Telegram
    pub telegram_token: String,
    pub telegram_chat_id: String,

    // Timing
    pub poll_interval: Duration,
    pub report_interval_minutes: u64,
    pub address_delay: Duration,
    pub run_once: bool,

    // Detection
    pub amount_tolerance: f64,

    // Persistence
    pub state_dir: PathBuf,

    // Proxy picked up by the HTTP clients
    pub proxy: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from any variable lookup.
    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let address_list = get("ADDRESSES")
            .or_else(|| get("ADDRESS"))
            .unwrap_or_else(|| DEFAULT_ADDRESS.to_string());
        let addresses = parse_address_list(&address_list);
        if addresses.is_empty() {
            return Err(ConfigError::NoAddresses);
        }

        let poll_seconds: u64 = env_var_or(&get, "POLL_SECONDS", "30").parse().unwrap_or(30);
        if poll_seconds == 0 {
            return Err(ConfigError::Invalid {
                name: "POLL_SECONDS",
                value: poll_seconds.to_string(),
            });
        }

        Ok(Self {
            // Targets
            addresses,

            // Venue
            api_url: env_var_or(&get, "API_URL", DEFAULT_API_URL),
            request_timeout: Duration::from_secs(
                env_var_or(&get, "REQUEST_TIMEOUT_SECS", "15").parse().unwrap_or(15),
            ),

            // Telegram
            telegram_token: env_var(&get, "TELEGRAM_BOT_TOKEN")?,
            telegram_chat_id: env_var(&get, "TELEGRAM_CHAT_ID")?,

            // Timing
            poll_interval: Duration::from_secs(poll_seconds),
            report_interval_minutes: env_var_or(&get, "REPORT_INTERVAL_MINUTES", "30")
                .parse()
                .unwrap_or(30),
            address_delay: Duration::from_millis(
                env_var_or(&get, "ADDRESS_DELAY_MS", "1000").parse().unwrap_or(1000),
            ),
            run_once: env_var_or(&get, "RUN_ONCE", "0") == "1",

            // Detection
            amount_tolerance: env_var_or(&get, "AMOUNT_TOLERANCE", &AMOUNT_TOLERANCE.to_string())
                .parse()
                .ok()
                .filter(|t: &f64| t.is_finite() && *t >= 0.0)
                .unwrap_or(AMOUNT_TOLERANCE),

            // Persistence
            state_dir: PathBuf::from(env_var_or(&get, "STATE_DIR", ".")),

            proxy: get("HTTPS_PROXY")
                .or_else(|| get("HTTP_PROXY"))
                .filter(|p| !p.trim().is_empty()),
        })
    }
}

/// Venue endpoint, usable without the rest of the configuration.
pub fn api_url() -> String {
    env_var_or(&|name: &str| std::env::var(name).ok(), "API_URL", DEFAULT_API_URL)
}

/// Parse `addr[:alias],addr[:alias]...`. Addresses are lower-cased and blank
/// entries dropped.
pub fn parse_address_list(raw: &str) -> Vec<WatchedAddress> {
    raw.split(',')
        .filter_map(|entry| {
            let mut parts = entry.trim().splitn(2, ':');
            let address = parts.next()?.trim().to_lowercase();
            if address.is_empty() {
                return None;
            }
            let alias = parts
                .next()
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(str::to_string);
            Some(WatchedAddress { address, alias })
        })
        .collect()
}

fn env_var<F>(get: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    get(name)
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn env_var_or<F>(get: &F, name: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    get(name).unwrap_or_else(|| default.to_string())
}
