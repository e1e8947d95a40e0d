// Copyright (C) 2025 Category Labs, Inc.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Wire types for the Hyperliquid `clearinghouseState` info query.
//! Numeric fields arrive as decimal strings.

use super::FetchError;
use crate::position::{Leverage, MarginMode, Position, Side, Snapshot};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Serialize)]
pub struct InfoRequest<'a> {
    #[serde(rename = "type")]
    pub kind: &'a str,
    pub user: &'a str,
}

impl<'a> InfoRequest<'a> {
    pub fn clearinghouse_state(user: &'a str) -> Self {
        Self {
            kind: "clearinghouseState",
            user,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearinghouseState {
    #[serde(default)]
    pub asset_positions: Vec<AssetPosition>,
    pub margin_summary: Option<MarginSummary>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarginSummary {
    pub account_value: Option<String>,
    pub total_ntl_pos: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetPosition {
    pub position: RawPosition,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPosition {
    pub coin: String,
    pub szi: String,
    pub entry_px: Option<String>,
    pub position_value: Option<String>,
    pub unrealized_pnl: Option<String>,
    pub return_on_equity: Option<String>,
    pub liquidation_px: Option<String>,
    pub leverage: Option<RawLeverage>,
    pub cum_funding: Option<CumFunding>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawLeverage {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CumFunding {
    pub since_open: Option<String>,
}

fn parse_num(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

impl RawLeverage {
    fn to_leverage(&self) -> Option<Leverage> {
        let mode = match self.kind.as_str() {
            "cross" => MarginMode::Cross,
            "isolated" => MarginMode::Isolated,
            _ => return None,
        };
        Some(Leverage {
            mode,
            multiplier: self.value,
        })
    }
}

impl RawPosition {
    /// Fails when the signed size is unparseable. Dropping the leg instead
    /// would make it look closed.
    pub fn to_position(&self) -> Result<Position, FetchError> {
        let szi = parse_num(Some(self.szi.as_str())).ok_or_else(|| FetchError::InvalidSize {
            coin: self.coin.clone(),
            size: self.szi.clone(),
        })?;
        Ok(Position {
            coin: self.coin.clone(),
            side: Side::from_signed_size(szi),
            amount: szi.abs(),
            entry_price: parse_num(self.entry_px.as_deref()).unwrap_or(0.0),
            position_value: parse_num(self.position_value.as_deref()).unwrap_or(0.0),
            unrealized_pnl: parse_num(self.unrealized_pnl.as_deref()).unwrap_or(0.0),
            return_on_equity_pct: parse_num(self.return_on_equity.as_deref()).unwrap_or(0.0)
                * 100.0,
            liquidation_price: parse_num(self.liquidation_px.as_deref()),
            leverage: self.leverage.as_ref().and_then(RawLeverage::to_leverage),
            funding_since_open: self
                .cum_funding
                .as_ref()
                .and_then(|f| parse_num(f.since_open.as_deref())),
        })
    }
}

impl ClearinghouseState {
    pub fn into_snapshot(self) -> Result<Snapshot, FetchError> {
        let positions = self
            .asset_positions
            .iter()
            .map(|ap| ap.position.to_position())
            .collect::<Result<Vec<_>, _>>()
            .inspect_err(|e| warn!("⚠️ Discarding snapshot: {}", e))?;
        let (account_value, total_position_value) = match &self.margin_summary {
            Some(m) => (
                parse_num(m.account_value.as_deref()),
                parse_num(m.total_ntl_pos.as_deref()),
            ),
            None => (None, None),
        };
        Ok(Snapshot {
            positions,
            account_value,
            total_position_value,
        })
    }
}
