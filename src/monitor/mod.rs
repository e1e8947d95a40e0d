// Copyright (C) 2025 Category Labs, Inc.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Change detection and notification decisions per watched address.

pub mod cycle;
pub mod poll_loop;
pub mod schedule;

pub use cycle::{CycleSettings, Notification};
pub use poll_loop::{LoopSettings, PollLoop};
