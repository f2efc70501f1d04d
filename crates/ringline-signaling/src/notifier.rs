// SPDX-FileCopyrightText: 2026 Ringline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Best-effort delivery by user id.

use std::sync::Arc;

use tracing::debug;

use ringline_core::types::{Delivery, FanoutReport};
use ringline_core::{ServerEvent, Transport};
use ringline_presence::PresenceRegistry;

/// Resolves users through presence and hands events to the transport.
///
/// Nothing here returns an error: an offline user or a refused delivery is
/// recorded as a [`Delivery`] outcome and logged.
#[derive(Clone)]
pub struct Notifier {
    presence: Arc<PresenceRegistry>,
    transport: Arc<dyn Transport>,
}

impl Notifier {
    pub fn new(presence: Arc<PresenceRegistry>, transport: Arc<dyn Transport>) -> Self {
        Self {
            presence,
            transport,
        }
    }

    pub fn presence(&self) -> &Arc<PresenceRegistry> {
        &self.presence
    }

    /// Deliver to a specific connection, bypassing presence.
    pub async fn send_to_connection(&self, connection_id: &str, event: &ServerEvent) -> Delivery {
        let delivery = match self.transport.deliver(connection_id, event).await {
            Ok(()) => Delivery::Delivered,
            Err(e) => {
                debug!(connection_id, event = event.kind(), error = %e, "delivery failed");
                Delivery::Failed
            }
        };
        ringline_prometheus::record_relay_event(event.kind(), delivery);
        delivery
    }

    /// Deliver to the user's current connection, if any.
    pub async fn send(&self, user_id: &str, event: &ServerEvent) -> Delivery {
        match self.presence.lookup(user_id) {
            Some(connection_id) => self.send_to_connection(&connection_id, event).await,
            None => {
                debug!(user_id, event = event.kind(), "target offline, event dropped");
                ringline_prometheus::record_relay_event(event.kind(), Delivery::Offline);
                Delivery::Offline
            }
        }
    }

    /// Deliver to each user in turn. Takes a collected slice: the future
    /// runs inside spawned timer and socket tasks and must stay `Send`.
    pub async fn fanout(&self, users: &[&str], event: &ServerEvent) -> FanoutReport {
        let mut report = FanoutReport::default();
        for &user_id in users {
            let delivery = self.send(user_id, event).await;
            report.record(user_id, delivery);
        }
        report
    }

    /// Deliver to every online user except `except`.
    pub async fn broadcast_except(&self, except: &str, event: &ServerEvent) -> FanoutReport {
        let online = self.presence.snapshot();
        let targets: Vec<&str> = online
            .iter()
            .map(String::as_str)
            .filter(|u| *u != except)
            .collect();
        self.fanout(&targets, event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringline_test_utils::MockTransport;

    fn event() -> ServerEvent {
        ServerEvent::UserOnline {
            user_id: "zed".into(),
        }
    }

    #[tokio::test]
    async fn send_reports_each_outcome() {
        let presence = Arc::new(PresenceRegistry::new());
        let transport = Arc::new(MockTransport::new());
        let notifier = Notifier::new(Arc::clone(&presence), transport.clone());

        presence.register("alice", "conn-a");
        presence.register("bob", "conn-b");
        transport.fail_connection("conn-b").await;

        assert_eq!(notifier.send("alice", &event()).await, Delivery::Delivered);
        assert_eq!(notifier.send("bob", &event()).await, Delivery::Failed);
        assert_eq!(notifier.send("carol", &event()).await, Delivery::Offline);
        assert_eq!(transport.events_for("conn-a").await.len(), 1);
        assert!(transport.events_for("conn-b").await.is_empty());
    }

    #[tokio::test]
    async fn broadcast_skips_sender() {
        let presence = Arc::new(PresenceRegistry::new());
        let transport = Arc::new(MockTransport::new());
        let notifier = Notifier::new(Arc::clone(&presence), transport.clone());
        for user in ["alice", "bob", "carol"] {
            presence.register(user, &format!("conn-{user}"));
        }

        let report = notifier.broadcast_except("alice", &event()).await;
        assert_eq!(report.delivered.len(), 2);
        assert!(transport.events_for("conn-alice").await.is_empty());
    }
}
