// SPDX-FileCopyrightText: 2026 Ringline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A relay stack wired over a temp store and a mock transport.

use std::sync::Arc;
use std::time::Duration;

use ringline_config::model::{CallsConfig, StorageConfig};
use ringline_core::{CallStore, ServerEvent};
use ringline_presence::PresenceRegistry;
use ringline_session::CallSessionManager;
use ringline_storage::SqliteCallStore;
use ringline_test_utils::MockTransport;

use crate::lifecycle::ConnectionLifecycle;
use crate::notifier::Notifier;
use crate::relay::SignalingRelay;
use crate::ring_timer::RingTimers;

pub(crate) struct Stack {
    pub manager: Arc<CallSessionManager>,
    pub presence: Arc<PresenceRegistry>,
    pub transport: Arc<MockTransport>,
    pub relay: Arc<SignalingRelay>,
    pub lifecycle: ConnectionLifecycle,
    _dir: tempfile::TempDir,
}

impl Stack {
    pub(crate) async fn new(ring_timeout: Option<Duration>, grace: Duration) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteCallStore::new(StorageConfig {
            database_path: dir.path().join("calls.db").to_str().unwrap().to_string(),
            wal_mode: true,
        });
        store.initialize().await.unwrap();

        let manager = Arc::new(CallSessionManager::new(
            Arc::new(store),
            &CallsConfig::default(),
        ));
        let presence = Arc::new(PresenceRegistry::new());
        let transport = Arc::new(MockTransport::new());
        let notifier = Notifier::new(Arc::clone(&presence), transport.clone());
        let relay = Arc::new(SignalingRelay::new(
            Arc::clone(&manager),
            notifier,
            RingTimers::new(ring_timeout),
        ));
        let lifecycle = ConnectionLifecycle::new(Arc::clone(&relay), grace);
        Self {
            manager,
            presence,
            transport,
            relay,
            lifecycle,
            _dir: dir,
        }
    }

    pub(crate) async fn basic() -> Self {
        Self::new(None, Duration::ZERO).await
    }

    /// Registers `user` on connection `conn-<user>`.
    pub(crate) fn online(&self, user: &str) -> u64 {
        self.presence.register(user, &format!("conn-{user}")).generation
    }

    pub(crate) async fn kinds(&self, user: &str) -> Vec<&'static str> {
        self.events(user).await.iter().map(ServerEvent::kind).collect()
    }

    pub(crate) async fn events(&self, user: &str) -> Vec<ServerEvent> {
        self.transport.events_for(&format!("conn-{user}")).await
    }

    pub(crate) async fn team(&self, members: &[&str]) {
        for member in members {
            self.manager.store().add_group_member("team", member).await.unwrap();
        }
    }
}
