// Copyright (C) 2025 Category Labs, Inc.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Position model and change detection.

pub mod diff;
pub mod model;

pub use diff::{diff_positions_with_tolerance, PositionDiff, AMOUNT_TOLERANCE};
pub use model::{Leverage, MarginMode, Position, Side, Snapshot};

/// Position with plausible market fields, for tests.
#[cfg(test)]
pub(crate) fn test_position(coin: &str, side: Side, amount: f64) -> Position {
    Position {
        coin: coin.to_string(),
        side,
        amount,
        entry_price: 100.0,
        position_value: amount * 100.0,
        unrealized_pnl: 25.0,
        return_on_equity_pct: 12.5,
        liquidation_price: Some(80.0),
        leverage: Some(Leverage {
            mode: MarginMode::Cross,
            multiplier: 10.0,
        }),
        funding_since_open: None,
    }
}
