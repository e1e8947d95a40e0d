// Copyright (C) 2025 Category Labs, Inc.
// SPDX-License-Identifier: GPL-3.0-or-later

//! One polling pass for one address: fetch, diff, decide.

use super::schedule::{is_report_due, mark_reported, minutes_until_report};
use crate::api::{FetchError, PositionSource};
use crate::config::WatchedAddress;
use crate::notify::format::display_name;
use crate::position::{diff_positions_with_tolerance, PositionDiff, Snapshot, AMOUNT_TOLERANCE};
use crate::state::AddressState;
use chrono::{DateTime, Utc};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    FirstRun,
    ChangeAlert,
    PeriodicReport,
}

/// What a cycle decided to tell the user.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// First poll ever for the address: a summary of current holdings.
    FirstRun { snapshot: Snapshot },
    /// Positions were opened, closed or resized since the last poll.
    ChangeAlert {
        diff: PositionDiff,
        snapshot: Snapshot,
        /// Something was closed and nothing is left open.
        fully_closed: bool,
    },
    /// The report interval elapsed.
    PeriodicReport { snapshot: Snapshot },
}

impl Notification {
    pub fn kind(&self) -> NotificationKind {
        match self {
            Notification::FirstRun { .. } => NotificationKind::FirstRun,
            Notification::ChangeAlert { .. } => NotificationKind::ChangeAlert,
            Notification::PeriodicReport { .. } => NotificationKind::PeriodicReport,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CycleSettings {
    pub report_interval_minutes: u64,
    pub amount_tolerance: f64,
}

impl Default for CycleSettings {
    fn default() -> Self {
        Self {
            report_interval_minutes: 30,
            amount_tolerance: AMOUNT_TOLERANCE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CycleOutcome {
    /// State to persist; always carries the freshly fetched snapshot.
    pub state: AddressState,
    pub notifications: Vec<Notification>,
}

impl CycleOutcome {
    /// Nothing changed and no report was due.
    pub fn is_quiet(&self) -> bool {
        self.notifications.is_empty()
    }

    pub fn kinds(&self) -> Vec<NotificationKind> {
        self.notifications.iter().map(Notification::kind).collect()
    }
}

/// Run one cycle for `target`.
///
/// `prior` is `None` when the address has never been polled. A fetch failure
/// is returned untouched and no state is produced.
pub async fn run_cycle<S: PositionSource + ?Sized>(
    source: &S,
    target: &WatchedAddress,
    prior: Option<AddressState>,
    now: DateTime<Utc>,
    settings: &CycleSettings,
) -> Result<CycleOutcome, FetchError> {
    let name = display_name(&target.address, target.alias.as_deref());
    let snapshot = source.fetch_positions(&target.address).await?;

    let Some(prior) = prior else {
        info!("[{}] ✅ Initialized, {} positions", name, snapshot.len());
        let state = AddressState::new(&target.address, target.alias.clone(), snapshot.clone(), now);
        return Ok(CycleOutcome {
            state,
            notifications: vec![Notification::FirstRun { snapshot }],
        });
    };

    let diff = diff_positions_with_tolerance(
        &prior.last_snapshot.positions,
        &snapshot.positions,
        settings.amount_tolerance,
    );
    let mut state = AddressState {
        address: target.address.clone(),
        alias: target.alias.clone(),
        last_snapshot: snapshot.clone(),
        last_report_at: prior.last_report_at,
    };
    let mut notifications = Vec::new();

    let has_changes = !diff.is_empty();
    if has_changes {
        info!(
            "[{}] 🚨 Position change: +{} -{} ~{}",
            name,
            diff.added.len(),
            diff.removed.len(),
            diff.changed.len()
        );
        let fully_closed = !diff.removed.is_empty() && snapshot.is_flat();
        notifications.push(Notification::ChangeAlert {
            diff,
            snapshot: snapshot.clone(),
            fully_closed,
        });
    }

    if is_report_due(&state, now, settings.report_interval_minutes) {
        info!("[{}] 📊 Periodic report due ({} positions)", name, snapshot.len());
        notifications.push(Notification::PeriodicReport { snapshot });
        state = mark_reported(state, now);
    } else if !has_changes {
        info!(
            "[{}] No change, {} positions (next report in {} min)",
            name,
            snapshot.len(),
            minutes_until_report(&state, now, settings.report_interval_minutes)
        );
    }

    Ok(CycleOutcome {
        state,
        notifications,
    })
}
