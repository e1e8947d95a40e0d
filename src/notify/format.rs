// Copyright (C) 2025 Category Labs, Inc.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Telegram HTML rendering for monitor notifications.

use crate::config::WatchedAddress;
use crate::monitor::Notification;
use crate::position::diff::PositionChange;
use crate::position::{Position, PositionDiff, Side, Snapshot};
use chrono::{DateTime, Utc};
use teloxide::utils::html::escape;

const DIVIDER: &str = "━━━━━━━━━━━━━━━━";
const POSITIONS_PAGE: &str = "https://www.coinglass.com/hyperliquid/";

/// `0x1234...abcd`; short inputs are returned unchanged.
pub fn short_address(address: &str) -> String {
    if address.len() <= 10 || !address.is_ascii() {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}

/// Alias when set, otherwise the shortened address.
pub fn display_name(address: &str, alias: Option<&str>) -> String {
    match alias.map(str::trim).filter(|a| !a.is_empty()) {
        Some(alias) => alias.to_string(),
        None => short_address(address),
    }
}

/// Compact number: `1.50M`, `12.30K`, otherwise fixed decimals.
pub fn format_number(value: f64, decimals: usize) -> String {
    let abs = value.abs();
    if abs >= 1e6 {
        format!("{:.*}M", decimals, value / 1e6)
    } else if abs >= 1e3 {
        format!("{:.*}K", decimals, value / 1e3)
    } else {
        format!("{:.*}", decimals, value)
    }
}

fn format_opt(value: Option<f64>, decimals: usize) -> String {
    value.map_or_else(|| "-".to_string(), |v| format_number(v, decimals))
}

fn signed_usd(value: f64) -> String {
    if value >= 0.0 {
        format!("+${}", format_number(value, 2))
    } else {
        format!("-${}", format_number(-value, 2))
    }
}

fn signed_pct(value: f64) -> String {
    if value >= 0.0 {
        format!("+{:.2}%", value)
    } else {
        format!("{:.2}%", value)
    }
}

fn side_badge(side: Side) -> &'static str {
    match side {
        Side::Long => "🟢 <b>[LONG]</b>",
        Side::Short => "🔴 <b>[SHORT]</b>",
    }
}

fn positions_link(address: &str) -> String {
    format!("<a href=\"{}{}\">📈 View full positions</a>", POSITIONS_PAGE, address)
}

fn identity_lines(lines: &mut Vec<String>, target: &WatchedAddress) {
    let name = display_name(&target.address, target.alias.as_deref());
    lines.push(format!("🐋 <b>{}</b>", escape(&name)));
    lines.push(format!("👤 Address: <code>{}</code>", short_address(&target.address)));
}

fn totals_lines(lines: &mut Vec<String>, snapshot: &Snapshot) {
    if snapshot.account_value.is_some() {
        lines.push(format!("💰 Account value: ${}", format_opt(snapshot.account_value, 2)));
        lines.push(format!(
            "📊 Total position value: ${}",
            format_opt(snapshot.total_position_value, 2)
        ));
    }
}

/// Multi-line block describing one open position.
pub fn format_position(p: &Position) -> String {
    let leverage = p.leverage.map_or_else(|| "-".to_string(), |l| l.to_string());
    let pnl_emoji = if p.unrealized_pnl >= 0.0 { "📈" } else { "📉" };

    let mut block = format!(
        "{} <b>{}</b> | {}\n{}\n📊 Size: {} {}\n💵 Value: ${}\n📍 Entry: ${}\n⚠️ Liquidation: ${}\n{} Unrealized PnL: {} ({})",
        side_badge(p.side),
        escape(&p.coin),
        leverage,
        DIVIDER,
        format_number(p.amount, 4),
        escape(&p.coin),
        format_number(p.position_value, 2),
        format_number(p.entry_price, 2),
        format_opt(p.liquidation_price, 2),
        pnl_emoji,
        signed_usd(p.unrealized_pnl),
        signed_pct(p.return_on_equity_pct),
    );
    if let Some(funding) = p.funding_since_open {
        block.push_str(&format!("\n💸 Funding since open: ${}", format_number(funding, 2)));
    }
    block
}

fn format_closed(p: &Position) -> String {
    let result = if p.unrealized_pnl >= 0.0 { "✅" } else { "❌" };
    format!(
        "{} <b>{}</b> closed\n{} Closing PnL: {} ({})",
        side_badge(p.side),
        escape(&p.coin),
        result,
        signed_usd(p.unrealized_pnl),
        signed_pct(p.return_on_equity_pct),
    )
}

fn format_resize(change: &PositionChange) -> String {
    let mut text = format_position(&change.after);
    if let Some(amount) = change.amount_change() {
        let direction = if amount.new > amount.old { "increased" } else { "decreased" };
        text.push_str(&format!(
            "\n  └ Size: {} → {} ({})",
            format_number(amount.old, 4),
            format_number(amount.new, 4),
            direction
        ));
    }
    text
}

/// Render a notification as Telegram HTML.
pub fn render(notification: &Notification, target: &WatchedAddress, now: DateTime<Utc>) -> String {
    match notification {
        Notification::FirstRun { snapshot } => render_first_run(target, snapshot),
        Notification::ChangeAlert {
            diff,
            snapshot,
            fully_closed,
        } => render_change_alert(target, snapshot, diff, *fully_closed),
        Notification::PeriodicReport { snapshot } => render_periodic_report(target, snapshot, now),
    }
}

fn render_first_run(target: &WatchedAddress, snapshot: &Snapshot) -> String {
    let mut lines = vec!["✅ <b>Monitoring started</b>".to_string(), String::new()];
    identity_lines(&mut lines, target);
    lines.push(format!("💵 Account value: ${}", format_opt(snapshot.account_value, 2)));
    lines.push(format!(
        "📊 Total position value: ${}",
        format_opt(snapshot.total_position_value, 2)
    ));
    lines.push(format!("📍 Open positions: {}", snapshot.len()));
    lines.push(String::new());
    lines.push(positions_link(&target.address));
    lines.join("\n")
}

fn render_change_alert(
    target: &WatchedAddress,
    snapshot: &Snapshot,
    diff: &PositionDiff,
    fully_closed: bool,
) -> String {
    let mut lines = vec!["🚨 <b>Position change detected</b> 🚨".to_string(), String::new()];
    identity_lines(&mut lines, target);
    totals_lines(&mut lines, snapshot);
    lines.push(DIVIDER.to_string());

    if fully_closed {
        lines.push(String::new());
        lines.push("🎯 <b>Fully closed: every position has been exited</b>".to_string());
    }
    lines.push(String::new());

    if !diff.added.is_empty() {
        lines.push(format!("➕ <b>Opened ({})</b>", diff.added.len()));
        lines.extend(diff.added.iter().map(format_position));
        lines.push(String::new());
    }

    if !diff.removed.is_empty() {
        lines.push(format!("✂️ <b>Closed ({})</b>", diff.removed.len()));
        lines.extend(diff.removed.iter().map(format_closed));
        lines.push(String::new());
    }

    if !diff.changed.is_empty() {
        lines.push(format!("♻️ <b>Resized ({})</b>", diff.changed.len()));
        lines.extend(diff.changed.iter().map(format_resize));
        lines.push(String::new());
    }

    lines.push(DIVIDER.to_string());
    lines.push("💡 <b>Follow-trade hints:</b>".to_string());
    lines.extend(follow_hints(diff, fully_closed).into_iter().map(|h| format!("  {}", h)));

    lines.push(String::new());
    lines.push(positions_link(&target.address));
    lines.join("\n")
}

fn follow_hints(diff: &PositionDiff, fully_closed: bool) -> Vec<&'static str> {
    if fully_closed {
        return vec!["🎯 Whale is fully out, wait and see"];
    }

    let mut hints = Vec::new();
    if diff.added.iter().any(|p| p.side == Side::Long) {
        hints.push("🟢 New long opened, watch for an entry");
    }
    if diff.added.iter().any(|p| p.side == Side::Short) {
        hints.push("🔴 New short opened, watch for an entry");
    }
    if !diff.removed.is_empty() {
        hints.push("✂️ Positions closed, review take-profit and stop-loss");
    }
    if !diff.changed.is_empty() {
        hints.push("♻️ Position size adjusted");
    }
    hints
}

fn render_periodic_report(target: &WatchedAddress, snapshot: &Snapshot, now: DateTime<Utc>) -> String {
    let mut lines = vec!["📊 <b>Scheduled report</b> 📊".to_string(), String::new()];
    identity_lines(&mut lines, target);
    totals_lines(&mut lines, snapshot);
    lines.push(format!("📍 Open positions: {}", snapshot.len()));
    lines.push(DIVIDER.to_string());
    lines.push(String::new());

    if snapshot.is_flat() {
        lines.push("🎯 <b>Currently flat</b>".to_string());
    } else {
        lines.push("<b>Positions:</b>".to_string());
        lines.push(String::new());
        for p in &snapshot.positions {
            lines.push(format_position(p));
            lines.push(String::new());
        }
    }

    lines.push(format!("⏰ Report time: {}", now.format("%Y-%m-%d %H:%M:%S UTC")));
    lines.push(String::new());
    lines.push(positions_link(&target.address));
    lines.join("\n")
}

/// Message sent by the `test-telegram` command.
pub fn test_message(now: DateTime<Utc>) -> String {
    format!("🔔 <b>Telegram test message</b>\nTime: {}", now.to_rfc3339())
}
