// Copyright (C) 2025 Category Labs, Inc.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Per-address monitor state and its on-disk persistence.

use crate::position::Snapshot;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

const STATE_FILE_PREFIX: &str = ".hyperliquid_state_";

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Everything remembered about one watched address between polls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressState {
    pub address: String,
    pub alias: Option<String>,
    pub last_snapshot: Snapshot,
    /// Baseline for the periodic report. Files written before this field
    /// existed load with the current time.
    #[serde(default = "Utc::now")]
    pub last_report_at: DateTime<Utc>,
}

impl AddressState {
    pub fn new(address: &str, alias: Option<String>, snapshot: Snapshot, now: DateTime<Utc>) -> Self {
        Self {
            address: address.to_string(),
            alias,
            last_snapshot: snapshot,
            last_report_at: now,
        }
    }
}

/// Key-value persistence for [`AddressState`].
#[async_trait]
pub trait StateStore: Send + Sync {
    /// `Ok(None)` means the address has never been polled.
    async fn load(&self, address: &str) -> Result<Option<AddressState>, PersistenceError>;

    async fn save(&self, state: &AddressState) -> Result<(), PersistenceError>;
}

/// One pretty-printed JSON file per address.
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    dir: PathBuf,
}

impl JsonStateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, address: &str) -> PathBuf {
        self.dir.join(format!("{}{}.json", STATE_FILE_PREFIX, address))
    }

    fn read(path: &Path) -> Result<Option<AddressState>, PersistenceError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }
}

#[async_trait]
impl StateStore for JsonStateStore {
    async fn load(&self, address: &str) -> Result<Option<AddressState>, PersistenceError> {
        let path = self.path_for(address);
        let state = Self::read(&path)?;
        debug!(
            "Loaded state for {} from {} (found: {})",
            address,
            path.display(),
            state.is_some()
        );
        Ok(state)
    }

    async fn save(&self, state: &AddressState) -> Result<(), PersistenceError> {
        if !self.dir.as_os_str().is_empty() && !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
        }

        let content = serde_json::to_string_pretty(state)?;
        let path = self.path_for(&state.address);
        fs::write(&path, content)?;

        debug!(
            "Saved state for {} ({} positions) to {}",
            state.address,
            state.last_snapshot.len(),
            path.display()
        );
        Ok(())
    }
}
