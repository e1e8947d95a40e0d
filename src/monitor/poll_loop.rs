// Copyright (C) 2025 Category Labs, Inc.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Sequential polling of every watched address.

use super::cycle::{run_cycle, CycleSettings};
use crate::api::{FetchError, PositionSource};
use crate::config::WatchedAddress;
use crate::notify::format::{display_name, render};
use crate::notify::Notifier;
use crate::state::{AddressState, StateStore};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct LoopSettings {
    pub poll_interval: Duration,
    /// Pause between two addresses within one pass.
    pub address_delay: Duration,
    pub cycle: CycleSettings,
}

/// Counters for one pass over all addresses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub polled: usize,
    pub failed: usize,
    pub quiet: usize,
    pub notifications: usize,
}

pub struct PollLoop<S, N, P> {
    source: S,
    notifier: N,
    store: P,
    targets: Vec<WatchedAddress>,
    settings: LoopSettings,
    /// Latest state per address, kept even when a save fails.
    states: HashMap<String, AddressState>,
}

impl<S, N, P> PollLoop<S, N, P>
where
    S: PositionSource,
    N: Notifier,
    P: StateStore,
{
    pub fn new(
        source: S,
        notifier: N,
        store: P,
        targets: Vec<WatchedAddress>,
        settings: LoopSettings,
    ) -> Self {
        Self {
            source,
            notifier,
            store,
            targets,
            settings,
            states: HashMap::new(),
        }
    }

    /// Poll forever. The next pass starts no earlier than one interval after
    /// the previous one started, and never while it is still running.
    pub async fn run(&mut self) {
        let mut ticker = tokio::time::interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.run_pass().await;
        }
    }

    /// One pass over every address, in configuration order.
    pub async fn run_pass(&mut self) -> PassSummary {
        info!(
            "🔄 Polling {} address(es) at {}",
            self.targets.len(),
            Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
        );

        let targets = self.targets.clone();
        let mut summary = PassSummary::default();

        for (i, target) in targets.iter().enumerate() {
            summary.polled += 1;
            match self.process_address(target, Utc::now()).await {
                Ok(0) => summary.quiet += 1,
                Ok(sent) => summary.notifications += sent,
                Err(e) => {
                    summary.failed += 1;
                    error!(
                        "[{}] ❌ Monitor error: {}",
                        display_name(&target.address, target.alias.as_deref()),
                        e
                    );
                }
            }

            if i + 1 < targets.len() && !self.settings.address_delay.is_zero() {
                tokio::time::sleep(self.settings.address_delay).await;
            }
        }

        info!(
            "✅ Pass complete: {} polled, {} failed, {} quiet, {} notification(s)",
            summary.polled, summary.failed, summary.quiet, summary.notifications
        );
        summary
    }

    /// Run a cycle for one address, persist, then deliver its notifications.
    /// Returns the number of notifications produced.
    pub async fn process_address(
        &mut self,
        target: &WatchedAddress,
        now: DateTime<Utc>,
    ) -> Result<usize, FetchError> {
        let prior = self.prior_state(target).await;
        let outcome = run_cycle(&self.source, target, prior, now, &self.settings.cycle).await?;
        if !outcome.is_quiet() {
            debug!("[{}] Notifications: {:?}", target.address, outcome.kinds());
        }

        if let Err(e) = self.store.save(&outcome.state).await {
            warn!(
                "[{}] ⚠️ Failed to save state: {}",
                display_name(&target.address, target.alias.as_deref()),
                e
            );
        }

        for notification in &outcome.notifications {
            let text = render(notification, target, now);
            if let Err(e) = self.notifier.send(&text).await {
                warn!(
                    "[{}] ⚠️ {:?} not delivered: {}",
                    display_name(&target.address, target.alias.as_deref()),
                    notification.kind(),
                    e
                );
            }
        }

        let sent = outcome.notifications.len();
        self.states.insert(target.address.clone(), outcome.state);
        Ok(sent)
    }

    /// Cached state, falling back to the store. An unreadable state file is
    /// treated as a first run.
    async fn prior_state(&self, target: &WatchedAddress) -> Option<AddressState> {
        if let Some(state) = self.states.get(&target.address) {
            return Some(state.clone());
        }
        match self.store.load(&target.address).await {
            Ok(state) => state,
            Err(e) => {
                warn!(
                    "[{}] ⚠️ Could not read saved state, starting fresh: {}",
                    display_name(&target.address, target.alias.as_deref()),
                    e
                );
                None
            }
        }
    }

    #[cfg(test)]
    pub fn state(&self, address: &str) -> Option<&AddressState> {
        self.states.get(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotificationError;
    use crate::position::{test_position as pos, Position, Side, Snapshot};
    use crate::state::PersistenceError;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct FakeVenue {
        books: Arc<Mutex<HashMap<String, Vec<Position>>>>,
    }

    impl FakeVenue {
        fn set(&self, address: &str, positions: Vec<Position>) {
            self.books.lock().unwrap().insert(address.to_string(), positions);
        }
    }

    #[async_trait]
    impl PositionSource for FakeVenue {
        async fn fetch_positions(&self, address: &str) -> Result<Snapshot, FetchError> {
            match self.books.lock().unwrap().get(address) {
                Some(positions) => Ok(Snapshot {
                    positions: positions.clone(),
                    account_value: Some(10_000.0),
                    total_position_value: Some(5_000.0),
                }),
                None => Err(FetchError::Status {
                    status: 500,
                    body: "unknown user".to_string(),
                }),
            }
        }
    }

    #[derive(Clone, Default)]
    struct RecordingNotifier {
        sent: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, message: &str) -> Result<(), NotificationError> {
            self.sent.lock().unwrap().push(message.to_string());
            Ok(())
        }
    }

    /// Fails the first `failures` sends, records the rest.
    #[derive(Clone, Default)]
    struct FlakyNotifier {
        failures: Arc<Mutex<usize>>,
        attempts: Arc<Mutex<usize>>,
        sent: Arc<Mutex<Vec<String>>>,
    }

    impl FlakyNotifier {
        fn failing(failures: usize) -> Self {
            Self {
                failures: Arc::new(Mutex::new(failures)),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl Notifier for FlakyNotifier {
        async fn send(&self, message: &str) -> Result<(), NotificationError> {
            *self.attempts.lock().unwrap() += 1;
            let mut failures = self.failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                let io = std::io::Error::other("telegram unreachable");
                return Err(NotificationError::Telegram(teloxide::RequestError::Io(Arc::new(io))));
            }
            self.sent.lock().unwrap().push(message.to_string());
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct MemoryStore {
        states: Arc<Mutex<HashMap<String, AddressState>>>,
        fail_saves: bool,
    }

    #[async_trait]
    impl StateStore for MemoryStore {
        async fn load(&self, address: &str) -> Result<Option<AddressState>, PersistenceError> {
            Ok(self.states.lock().unwrap().get(address).cloned())
        }

        async fn save(&self, state: &AddressState) -> Result<(), PersistenceError> {
            if self.fail_saves {
                return Err(PersistenceError::Io(std::io::Error::other("disk full")));
            }
            self.states
                .lock()
                .unwrap()
                .insert(state.address.clone(), state.clone());
            Ok(())
        }
    }

    fn watched(address: &str) -> WatchedAddress {
        WatchedAddress {
            address: address.to_string(),
            alias: None,
        }
    }

    fn settings() -> LoopSettings {
        LoopSettings {
            poll_interval: Duration::from_secs(30),
            address_delay: Duration::ZERO,
            cycle: CycleSettings::default(),
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_first_pass_initializes_and_persists() {
        let venue = FakeVenue::default();
        venue.set("0xaaa", vec![pos("BTC", Side::Long, 1.0)]);
        let notifier = RecordingNotifier::default();
        let store = MemoryStore::default();

        let mut poller = PollLoop::new(
            venue,
            notifier.clone(),
            store.clone(),
            vec![watched("0xaaa")],
            settings(),
        );
        let summary = poller.run_pass().await;

        assert_eq!(summary.polled, 1);
        assert_eq!(summary.notifications, 1);
        assert!(notifier.sent.lock().unwrap()[0].contains("Monitoring started"));
        assert!(store.states.lock().unwrap().contains_key("0xaaa"));
    }

    #[tokio::test]
    async fn test_failing_address_does_not_block_others() {
        let venue = FakeVenue::default();
        venue.set("0xbbb", vec![]);
        let notifier = RecordingNotifier::default();
        let store = MemoryStore::default();

        let mut poller = PollLoop::new(
            venue,
            notifier.clone(),
            store.clone(),
            vec![watched("0xaaa"), watched("0xbbb")],
            settings(),
        );
        let summary = poller.run_pass().await;

        assert_eq!(summary.polled, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.notifications, 1);
        assert!(poller.state("0xaaa").is_none());
        assert!(poller.state("0xbbb").is_some());
        assert!(!store.states.lock().unwrap().contains_key("0xaaa"));
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_previous_state() {
        let venue = FakeVenue::default();
        venue.set("0xaaa", vec![pos("BTC", Side::Long, 1.0)]);
        let store = MemoryStore::default();
        let mut poller = PollLoop::new(
            venue.clone(),
            RecordingNotifier::default(),
            store.clone(),
            vec![watched("0xaaa")],
            settings(),
        );
        poller.process_address(&watched("0xaaa"), t0()).await.unwrap();
        let before = store.states.lock().unwrap().get("0xaaa").cloned();

        venue.books.lock().unwrap().clear();
        assert!(poller.process_address(&watched("0xaaa"), t0()).await.is_err());

        assert_eq!(store.states.lock().unwrap().get("0xaaa").cloned(), before);
        assert_eq!(poller.state("0xaaa").cloned(), before);
    }

    #[tokio::test]
    async fn test_resumes_from_persisted_state() {
        let venue = FakeVenue::default();
        venue.set("0xaaa", vec![pos("BTC", Side::Long, 1.0)]);
        let store = MemoryStore::default();
        store.states.lock().unwrap().insert(
            "0xaaa".to_string(),
            AddressState::new(
                "0xaaa",
                None,
                Snapshot {
                    positions: vec![pos("BTC", Side::Long, 1.0)],
                    ..Snapshot::default()
                },
                t0(),
            ),
        );
        let notifier = RecordingNotifier::default();
        let mut poller = PollLoop::new(venue, notifier.clone(), store, vec![watched("0xaaa")], settings());

        let sent = poller
            .process_address(&watched("0xaaa"), t0() + chrono::Duration::minutes(1))
            .await
            .unwrap();
        assert_eq!(sent, 0);
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_failure_still_tracks_changes() {
        let venue = FakeVenue::default();
        venue.set("0xaaa", vec![pos("BTC", Side::Long, 1.0)]);
        let store = MemoryStore {
            fail_saves: true,
            ..MemoryStore::default()
        };
        let notifier = RecordingNotifier::default();
        let mut poller = PollLoop::new(
            venue.clone(),
            notifier.clone(),
            store,
            vec![watched("0xaaa")],
            settings(),
        );

        poller.process_address(&watched("0xaaa"), t0()).await.unwrap();
        venue.set("0xaaa", vec![]);
        let sent = poller
            .process_address(&watched("0xaaa"), t0() + chrono::Duration::minutes(1))
            .await
            .unwrap();

        assert_eq!(sent, 1);
        let messages = notifier.sent.lock().unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages[1].contains("Fully closed"));
    }

    #[tokio::test]
    async fn test_repeat_poll_is_quiet() {
        let venue = FakeVenue::default();
        venue.set("0xaaa", vec![pos("ETH", Side::Short, 4.0)]);
        let notifier = RecordingNotifier::default();
        let mut poller = PollLoop::new(
            venue,
            notifier.clone(),
            MemoryStore::default(),
            vec![watched("0xaaa")],
            settings(),
        );

        poller.run_pass().await;
        let summary = poller.run_pass().await;

        assert_eq!(summary.quiet, 1);
        assert_eq!(summary.notifications, 0);
        assert_eq!(notifier.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_send_still_persists() {
        let venue = FakeVenue::default();
        venue.set("0xaaa", vec![pos("BTC", Side::Long, 1.0)]);
        let notifier = FlakyNotifier::failing(1);
        let store = MemoryStore::default();
        let mut poller = PollLoop::new(
            venue,
            notifier.clone(),
            store.clone(),
            vec![watched("0xaaa")],
            settings(),
        );

        let sent = poller.process_address(&watched("0xaaa"), t0()).await.unwrap();

        assert_eq!(sent, 1);
        assert!(notifier.sent.lock().unwrap().is_empty());
        let saved = store.states.lock().unwrap().get("0xaaa").cloned().unwrap();
        assert_eq!(saved.last_snapshot.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_alert_does_not_block_report() {
        let venue = FakeVenue::default();
        venue.set("0xaaa", vec![pos("BTC", Side::Long, 2.0)]);
        let store = MemoryStore::default();
        store.states.lock().unwrap().insert(
            "0xaaa".to_string(),
            AddressState::new(
                "0xaaa",
                None,
                Snapshot {
                    positions: vec![pos("BTC", Side::Long, 1.0)],
                    ..Snapshot::default()
                },
                t0(),
            ),
        );
        let notifier = FlakyNotifier::failing(1);
        let mut poller = PollLoop::new(
            venue,
            notifier.clone(),
            store.clone(),
            vec![watched("0xaaa")],
            settings(),
        );

        let later = t0() + chrono::Duration::minutes(31);
        let sent = poller.process_address(&watched("0xaaa"), later).await.unwrap();

        assert_eq!(sent, 2);
        assert_eq!(*notifier.attempts.lock().unwrap(), 2);
        let delivered = notifier.sent.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        assert!(delivered[0].contains("Scheduled report"));

        let saved = store.states.lock().unwrap().get("0xaaa").cloned().unwrap();
        assert_eq!(saved.last_snapshot.positions[0].amount, 2.0);
        assert_eq!(saved.last_report_at, later);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_only_between_addresses() {
        let venue = FakeVenue::default();
        for address in ["0xaaa", "0xbbb", "0xccc"] {
            venue.set(address, vec![]);
        }
        let mut poller = PollLoop::new(
            venue,
            RecordingNotifier::default(),
            MemoryStore::default(),
            vec![watched("0xaaa"), watched("0xbbb"), watched("0xccc")],
            LoopSettings {
                address_delay: Duration::from_millis(500),
                ..settings()
            },
        );

        let started = tokio::time::Instant::now();
        poller.run_pass().await;
        let elapsed = started.elapsed();

        assert!(elapsed >= Duration::from_millis(1000), "{:?}", elapsed);
        assert!(elapsed < Duration::from_millis(1500), "{:?}", elapsed);

        let started = tokio::time::Instant::now();
        let mut single = PollLoop::new(
            FakeVenue::default(),
            RecordingNotifier::default(),
            MemoryStore::default(),
            vec![watched("0xaaa")],
            LoopSettings {
                address_delay: Duration::from_millis(500),
                ..settings()
            },
        );
        single.run_pass().await;
        assert!(started.elapsed() < Duration::from_millis(500));
    }
}
