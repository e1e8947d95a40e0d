// Copyright (C) 2025 Category Labs, Inc.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Position diffing between two polls.
//!
//! Only position size is compared. Prices, PnL and ROE move with the market on
//! every poll and would otherwise turn every cycle into an alert.

use super::model::{Position, PositionKey};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

/// Smallest size difference treated as a real resize.
pub const AMOUNT_TOLERANCE: f64 = 1e-4;

/// Fields compared when matching a position across two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PositionField {
    Amount,
}

impl PositionField {
    fn value(self, position: &Position) -> f64 {
        match self {
            PositionField::Amount => position.amount,
        }
    }
}

impl fmt::Display for PositionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionField::Amount => write!(f, "amount"),
        }
    }
}

const COMPARED_FIELDS: &[PositionField] = &[PositionField::Amount];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldChange {
    pub old: f64,
    pub new: f64,
}

/// A position present in both snapshots whose compared fields moved.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionChange {
    pub before: Position,
    pub after: Position,
    pub changed_fields: BTreeMap<PositionField, FieldChange>,
}

impl PositionChange {
    pub fn amount_change(&self) -> Option<FieldChange> {
        self.changed_fields.get(&PositionField::Amount).copied()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionDiff {
    pub added: Vec<Position>,
    pub removed: Vec<Position>,
    pub changed: Vec<PositionChange>,
}

impl PositionDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// Diff two position sets with the default [`AMOUNT_TOLERANCE`].
#[cfg(test)]
pub fn diff_positions(prev: &[Position], curr: &[Position]) -> PositionDiff {
    diff_positions_with_tolerance(prev, curr, AMOUNT_TOLERANCE)
}

/// Diff two position sets keyed by (coin, side).
///
/// `added` and `changed` follow the order of `curr`, `removed` follows `prev`.
/// If a key repeats within one input the last occurrence wins.
pub fn diff_positions_with_tolerance(
    prev: &[Position],
    curr: &[Position],
    tolerance: f64,
) -> PositionDiff {
    let prev_map = index_by_key(prev);
    let curr_map = index_by_key(curr);
    let mut diff = PositionDiff::default();

    let mut seen = HashSet::new();
    for key in curr.iter().map(Position::key) {
        if !seen.insert(key.clone()) {
            continue;
        }
        let after = curr_map[&key];
        match prev_map.get(&key) {
            None => diff.added.push(after.clone()),
            Some(before) => {
                let changed_fields = compare_fields(before, after, tolerance);
                if !changed_fields.is_empty() {
                    diff.changed.push(PositionChange {
                        before: (*before).clone(),
                        after: after.clone(),
                        changed_fields,
                    });
                }
            }
        }
    }

    let mut seen = HashSet::new();
    for key in prev.iter().map(Position::key) {
        if !seen.insert(key.clone()) {
            continue;
        }
        if !curr_map.contains_key(&key) {
            diff.removed.push(prev_map[&key].clone());
        }
    }

    diff
}

fn index_by_key(positions: &[Position]) -> HashMap<PositionKey, &Position> {
    positions.iter().map(|p| (p.key(), p)).collect()
}

fn compare_fields(
    before: &Position,
    after: &Position,
    tolerance: f64,
) -> BTreeMap<PositionField, FieldChange> {
    COMPARED_FIELDS
        .iter()
        .filter_map(|&field| {
            let old = field.value(before);
            let new = field.value(after);
            ((old - new).abs() > tolerance).then_some((field, FieldChange { old, new }))
        })
        .collect()
}
