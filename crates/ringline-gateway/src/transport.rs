// SPDX-FileCopyrightText: 2026 Ringline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-connection outbound queues for WebSocket clients.

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use ringline_core::{AdapterType, HealthStatus, PluginAdapter, RinglineError, ServerEvent, Transport};

/// Routes events to WebSocket connections by connection id.
///
/// Each connection owns a bounded queue drained by its socket task. A full
/// or closed queue fails the delivery instead of waiting on the client.
pub struct WsTransport {
    senders: DashMap<String, mpsc::Sender<ServerEvent>>,
    buffer: usize,
}

impl WsTransport {
    pub fn new(buffer: usize) -> Self {
        Self {
            senders: DashMap::new(),
            buffer: buffer.max(1),
        }
    }

    /// Open a queue for a new connection; the socket task drains the receiver.
    pub fn register(&self, connection_id: &str) -> mpsc::Receiver<ServerEvent> {
        let (tx, rx) = mpsc::channel(self.buffer);
        self.senders.insert(connection_id.to_string(), tx);
        rx
    }

    pub fn unregister(&self, connection_id: &str) {
        self.senders.remove(connection_id);
    }

    pub fn connection_count(&self) -> usize {
        self.senders.len()
    }
}

#[async_trait]
impl PluginAdapter for WsTransport {
    fn name(&self) -> &str {
        "websocket"
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
        self.senders.clear();
        Ok(())
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn deliver(&self, connection_id: &str, event: &ServerEvent) -> Result<(), RinglineError> {
        let sender = self
            .senders
            .get(connection_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| RinglineError::Transport {
                message: format!("connection {connection_id} is not open"),
                source: None,
            })?;

        sender.try_send(event.clone()).map_err(|e| {
            let message = match e {
                TrySendError::Full(_) => format!("outbound queue for {connection_id} is full"),
                TrySendError::Closed(_) => format!("connection {connection_id} closed"),
            };
            RinglineError::Transport {
                message,
                source: None,
            }
        })
    }
}
