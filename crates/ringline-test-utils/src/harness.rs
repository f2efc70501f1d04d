// SPDX-FileCopyrightText: 2026 Ringline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end call scenarios.
//!
//! `TestHarness` assembles the full signaling stack over a temp SQLite
//! database and a [`MockTransport`]. Users connect through the real
//! connection lifecycle, and commands go through the same dispatch the
//! WebSocket gateway uses.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use ringline_config::model::{CallsConfig, StorageConfig};
use ringline_core::{CallStore, RinglineError, ServerEvent};
use ringline_presence::PresenceRegistry;
use ringline_session::CallSessionManager;
use ringline_signaling::{
    ClientCommand, ConnectionLifecycle, DisconnectOutcome, Notifier, RingTimers, SignalingRelay,
    dispatch,
};
use ringline_storage::SqliteCallStore;

use crate::failing_store::FailingStore;
use crate::mock_transport::MockTransport;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    ring_timeout: Option<Duration>,
    reconnect_grace: Duration,
    groups: Vec<(String, Vec<String>)>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            ring_timeout: None,
            reconnect_grace: Duration::ZERO,
            groups: Vec::new(),
        }
    }

    /// Arm ring timers with this timeout. Off by default.
    pub fn with_ring_timeout(mut self, timeout: Duration) -> Self {
        self.ring_timeout = Some(timeout);
        self
    }

    /// Delay before a disconnect is acted on.
    pub fn with_reconnect_grace(mut self, grace: Duration) -> Self {
        self.reconnect_grace = grace;
        self
    }

    /// Seed a group in the directory.
    pub fn with_group(mut self, group_id: &str, members: &[&str]) -> Self {
        self.groups.push((
            group_id.to_string(),
            members.iter().map(|m| m.to_string()).collect(),
        ));
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, RinglineError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| RinglineError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");

        let store = SqliteCallStore::new(StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        });
        store.initialize().await?;
        for (group_id, members) in &self.groups {
            for member in members {
                store.add_group_member(group_id, member).await?;
            }
        }

        let store = Arc::new(FailingStore::new(Arc::new(store)));
        let manager = Arc::new(CallSessionManager::new(
            store.clone(),
            &CallsConfig::default(),
        ));
        let presence = Arc::new(PresenceRegistry::new());
        let transport = Arc::new(MockTransport::new());
        let notifier = Notifier::new(presence.clone(), transport.clone());
        let relay = Arc::new(SignalingRelay::new(
            manager.clone(),
            notifier,
            RingTimers::new(self.ring_timeout),
        ));
        let lifecycle = ConnectionLifecycle::new(relay.clone(), self.reconnect_grace);

        Ok(TestHarness {
            store,
            manager,
            presence,
            transport,
            relay,
            lifecycle,
            next_connection: AtomicU64::new(1),
            _temp_dir: temp_dir,
        })
    }
}

/// An open test connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub user_id: String,
    pub connection_id: String,
    pub generation: u64,
}

/// A complete signaling stack with a mock transport and temp storage.
pub struct TestHarness {
    /// The store behind `manager`; writes can be made to fail.
    pub store: Arc<FailingStore>,
    pub manager: Arc<CallSessionManager>,
    pub presence: Arc<PresenceRegistry>,
    pub transport: Arc<MockTransport>,
    pub relay: Arc<SignalingRelay>,
    pub lifecycle: ConnectionLifecycle,
    next_connection: AtomicU64,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Open a connection for `user_id` through the lifecycle handler.
    ///
    /// Connection ids have the form `<user>#<n>`.
    pub async fn connect(&self, user_id: &str) -> Connection {
        let n = self.next_connection.fetch_add(1, Ordering::Relaxed);
        let connection_id = format!("{user_id}#{n}");
        let lease = self.lifecycle.on_connect(user_id, &connection_id).await;
        Connection {
            user_id: user_id.to_string(),
            connection_id,
            generation: lease.generation,
        }
    }

    pub async fn disconnect(&self, connection: &Connection) -> DisconnectOutcome {
        self.lifecycle
            .on_disconnect(&connection.user_id, connection.generation)
            .await
    }

    /// Run a client command as `user_id`.
    pub async fn command(
        &self,
        user_id: &str,
        command: ClientCommand,
    ) -> Result<Option<ServerEvent>, RinglineError> {
        dispatch(&self.relay, user_id, command).await
    }

    /// Events delivered to any of the user's connections, in order.
    pub async fn events_for(&self, user_id: &str) -> Vec<ServerEvent> {
        let prefix = format!("{user_id}#");
        self.transport
            .deliveries()
            .await
            .into_iter()
            .filter(|(conn, _)| conn.starts_with(&prefix))
            .map(|(_, event)| event)
            .collect()
    }

    /// The `type` tags of [`events_for`](Self::events_for).
    pub async fn kinds_for(&self, user_id: &str) -> Vec<&'static str> {
        self.events_for(user_id)
            .await
            .iter()
            .map(ServerEvent::kind)
            .collect()
    }

    /// Forget everything delivered so far.
    pub async fn clear_events(&self) {
        self.transport.clear().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn harness_builds_and_connects() {
        let harness = TestHarness::builder()
            .with_group("team", &["a", "b"])
            .build()
            .await
            .unwrap();
        let conn = harness.connect("a").await;
        assert_eq!(conn.connection_id, "a#1");
        assert!(harness.presence.is_online("a"));
        assert_eq!(harness.kinds_for("a").await, vec!["connected"]);
        assert_eq!(
            harness.manager.group_members("team").await.unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );

        let outcome = harness.disconnect(&conn).await;
        assert_eq!(outcome, DisconnectOutcome::Offline { left_call: None });
        assert!(!harness.presence.is_online("a"));
    }
}
