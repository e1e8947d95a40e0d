// Copyright (C) 2025 Category Labs, Inc.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Periodic report timing.

use crate::state::AddressState;
use chrono::{DateTime, Utc};

/// True once at least `interval_minutes` have passed since the last report.
pub fn is_report_due(state: &AddressState, now: DateTime<Utc>, interval_minutes: u64) -> bool {
    let elapsed_secs = now.signed_duration_since(state.last_report_at).num_seconds();
    elapsed_secs >= 0 && elapsed_secs as u64 >= interval_minutes.saturating_mul(60)
}

/// Minutes left until the next report, rounded up. Zero when already due.
pub fn minutes_until_report(state: &AddressState, now: DateTime<Utc>, interval_minutes: u64) -> u64 {
    let elapsed_secs = now.signed_duration_since(state.last_report_at).num_seconds().max(0) as u64;
    let interval_secs = interval_minutes.saturating_mul(60);
    interval_secs.saturating_sub(elapsed_secs).div_ceil(60)
}

pub fn mark_reported(mut state: AddressState, now: DateTime<Utc>) -> AddressState {
    state.last_report_at = now;
    state
}
