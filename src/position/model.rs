// Copyright (C) 2025 Category Labs, Inc.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Typed view of an account's open positions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a perpetual position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// Side implied by a signed size: negative is short, anything else long.
    pub fn from_signed_size(size: f64) -> Self {
        if size < 0.0 {
            Side::Short
        } else {
            Side::Long
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => write!(f, "Long"),
            Side::Short => write!(f, "Short"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarginMode {
    Cross,
    Isolated,
}

/// Margin mode plus leverage multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Leverage {
    pub mode: MarginMode,
    pub multiplier: f64,
}

impl fmt::Display for Leverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self.mode {
            MarginMode::Cross => "Cross",
            MarginMode::Isolated => "Isolated",
        };
        write!(f, "{}x {}", self.multiplier, mode)
    }
}

/// Identity of a position within one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PositionKey {
    pub coin: String,
    pub side: Side,
}

impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.coin, self.side)
    }
}

/// A single open position for one coin/side pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub coin: String,
    pub side: Side,
    /// Absolute size in coin units.
    pub amount: f64,
    pub entry_price: f64,
    pub position_value: f64,
    pub unrealized_pnl: f64,
    pub return_on_equity_pct: f64,
    pub liquidation_price: Option<f64>,
    pub leverage: Option<Leverage>,
    pub funding_since_open: Option<f64>,
}

impl Position {
    pub fn key(&self) -> PositionKey {
        PositionKey {
            coin: self.coin.clone(),
            side: self.side,
        }
    }
}

/// Positions plus account totals for one address at one poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub positions: Vec<Position>,
    pub account_value: Option<f64>,
    pub total_position_value: Option<f64>,
}

impl Snapshot {
    pub fn is_flat(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }
}
