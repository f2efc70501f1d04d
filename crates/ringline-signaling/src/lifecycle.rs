// SPDX-FileCopyrightText: 2026 Ringline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connect and disconnect handling for signaling connections.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use ringline_config::model::CallsConfig;
use ringline_core::ServerEvent;
use ringline_presence::PresenceLease;

use crate::relay::SignalingRelay;

/// What a disconnect ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectOutcome {
    /// A newer connection for the same user took over; nothing was torn down.
    Superseded,
    /// The user went offline. `left_call` names the call they were removed from.
    Offline { left_call: Option<String> },
}

#[derive(Clone)]
pub struct ConnectionLifecycle {
    relay: Arc<SignalingRelay>,
    grace: Duration,
}

impl ConnectionLifecycle {
    pub fn new(relay: Arc<SignalingRelay>, grace: Duration) -> Self {
        Self { relay, grace }
    }

    pub fn from_config(relay: Arc<SignalingRelay>, config: &CallsConfig) -> Self {
        Self::new(relay, Duration::from_millis(config.reconnect_grace_ms))
    }

    pub fn relay(&self) -> &Arc<SignalingRelay> {
        &self.relay
    }

    /// Register the connection, greet it, announce the user, and resume any
    /// live call they were part of.
    pub async fn on_connect(&self, user_id: &str, connection_id: &str) -> PresenceLease {
        let notifier = self.relay.notifier();
        let presence = notifier.presence();
        let lease = presence.register(user_id, connection_id);
        if let Some(previous) = &lease.replaced {
            info!(
                user_id,
                connection_id,
                replaced = %previous.connection_id,
                "connection replaced an existing one"
            );
        }
        ringline_prometheus::set_online_users(presence.len());

        let connected = ServerEvent::Connected {
            user_id: user_id.to_string(),
            connection_id: connection_id.to_string(),
        };
        notifier.send_to_connection(connection_id, &connected).await;

        let online = ServerEvent::UserOnline {
            user_id: user_id.to_string(),
        };
        notifier.broadcast_except(user_id, &online).await;

        let manager = self.relay.manager();
        match manager.get_active_call_for_user(user_id).await {
            Ok(Some(call)) => match manager.get_participants(&call.id).await {
                Ok(participants) => {
                    debug!(user_id, call_id = %call.id, "resuming active call");
                    let event = ServerEvent::ActiveCall { call, participants };
                    notifier.send_to_connection(connection_id, &event).await;
                }
                Err(e) => warn!(user_id, call_id = %call.id, error = %e, "active call roster lookup failed"),
            },
            Ok(None) => {}
            Err(e) => warn!(user_id, error = %e, "active call lookup failed"),
        }

        info!(user_id, connection_id, generation = lease.generation, "user connected");
        lease
    }

    /// Tear down a closed connection. Waits out the reconnect grace first;
    /// if the user reconnected meanwhile, the newer connection wins and
    /// nothing changes.
    pub async fn on_disconnect(&self, user_id: &str, generation: u64) -> DisconnectOutcome {
        if !self.grace.is_zero() {
            tokio::time::sleep(self.grace).await;
        }

        let notifier = self.relay.notifier();
        let presence = notifier.presence();
        if !presence.unregister_if(user_id, generation) {
            debug!(user_id, generation, "stale disconnect ignored");
            return DisconnectOutcome::Superseded;
        }

        let left_call = self.leave_active_call(user_id).await;

        let offline = ServerEvent::UserOffline {
            user_id: user_id.to_string(),
        };
        notifier.broadcast_except(user_id, &offline).await;
        ringline_prometheus::set_online_users(presence.len());

        info!(user_id, left_call = left_call.as_deref(), "user disconnected");
        DisconnectOutcome::Offline { left_call }
    }

    async fn leave_active_call(&self, user_id: &str) -> Option<String> {
        let manager = self.relay.manager();
        let call = match manager.get_active_call_for_user(user_id).await {
            Ok(Some(call)) => call,
            Ok(None) => return None,
            Err(e) => {
                warn!(user_id, error = %e, "active call lookup failed on disconnect");
                return None;
            }
        };

        let joined = match manager.get_participant(&call.id, user_id).await {
            Ok(p) => p.is_some_and(|p| p.is_active()),
            Err(e) => {
                warn!(user_id, call_id = %call.id, error = %e, "participant lookup failed on disconnect");
                false
            }
        };
        if !joined {
            return None;
        }

        match self.relay.leave_call(user_id, &call.id).await {
            Ok(_) => Some(call.id),
            Err(e) => {
                warn!(user_id, call_id = %call.id, error = %e, "leave on disconnect failed");
                None
            }
        }
    }
}
