// SPDX-FileCopyrightText: 2026 Ringline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock transport for deterministic testing.

use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::Mutex;

use ringline_core::{AdapterType, HealthStatus, PluginAdapter, RinglineError, ServerEvent, Transport};

/// Captures deliveries in order as `(connection_id, event)` pairs.
///
/// Connections marked with [`fail_connection`](Self::fail_connection)
/// refuse every event, like a saturated or closed socket.
#[derive(Default)]
pub struct MockTransport {
    delivered: Mutex<Vec<(String, ServerEvent)>>,
    failing: Mutex<HashSet<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fail_connection(&self, connection_id: &str) {
        self.failing.lock().await.insert(connection_id.to_string());
    }

    pub async fn restore_connection(&self, connection_id: &str) {
        self.failing.lock().await.remove(connection_id);
    }

    /// Every delivery so far, in order.
    pub async fn deliveries(&self) -> Vec<(String, ServerEvent)> {
        self.delivered.lock().await.clone()
    }

    pub async fn events_for(&self, connection_id: &str) -> Vec<ServerEvent> {
        self.delivered
            .lock()
            .await
            .iter()
            .filter(|(conn, _)| conn == connection_id)
            .map(|(_, event)| event.clone())
            .collect()
    }

    pub async fn delivered_count(&self) -> usize {
        self.delivered.lock().await.len()
    }

    pub async fn clear(&self) {
        self.delivered.lock().await.clear();
    }
}

#[async_trait]
impl PluginAdapter for MockTransport {
    fn name(&self) -> &str {
        "mock-transport"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, RinglineError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RinglineError> {
        Ok(())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn deliver(&self, connection_id: &str, event: &ServerEvent) -> Result<(), RinglineError> {
        if self.failing.lock().await.contains(connection_id) {
            return Err(RinglineError::Transport {
                message: format!("mock connection {connection_id} refused delivery"),
                source: None,
            });
        }
        self.delivered
            .lock()
            .await
            .push((connection_id.to_string(), event.clone()));
        Ok(())
    }
}
