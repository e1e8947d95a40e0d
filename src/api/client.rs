// Copyright (C) 2025 Category Labs, Inc.
// SPDX-License-Identifier: GPL-3.0-or-later

//! HTTP client for the Hyperliquid info endpoint.

use super::types::{ClearinghouseState, InfoRequest};
use super::{FetchError, PositionSource};
use crate::position::Snapshot;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

pub struct HyperliquidClient {
    http_client: Client,
    api_url: String,
}

impl HyperliquidClient {
    /// Proxies from `HTTPS_PROXY`/`HTTP_PROXY` are picked up by reqwest.
    pub fn new(api_url: String, timeout: Duration) -> Result<Self, FetchError> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            api_url,
        })
    }

    /// Raw `clearinghouseState` response body for `address`.
    pub async fn fetch_raw(&self, address: &str) -> Result<String, FetchError> {
        let response = self
            .http_client
            .post(&self.api_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&InfoRequest::clearinghouse_state(address))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!("clearinghouseState {} -> {} bytes", address, body.len());
        Ok(body)
    }
}

#[async_trait]
impl PositionSource for HyperliquidClient {
    async fn fetch_positions(&self, address: &str) -> Result<Snapshot, FetchError> {
        let body = self.fetch_raw(address).await?;
        let state: ClearinghouseState = serde_json::from_str(&body)?;
        state.into_snapshot()
    }
}
