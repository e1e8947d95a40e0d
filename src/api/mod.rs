// Copyright (C) 2025 Category Labs, Inc.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Venue position queries.

pub mod client;
pub mod types;

pub use client::HyperliquidClient;

use crate::position::Snapshot;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("unreadable size {size:?} for {coin}")]
    InvalidSize { coin: String, size: String },
}

/// Anything that can report the current positions of an address.
#[async_trait]
pub trait PositionSource: Send + Sync {
    async fn fetch_positions(&self, address: &str) -> Result<Snapshot, FetchError>;
}
