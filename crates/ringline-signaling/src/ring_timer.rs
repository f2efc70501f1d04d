// SPDX-FileCopyrightText: 2026 Ringline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One cancellable timeout per ringing call.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use ringline_config::model::CallsConfig;

struct PendingTimer {
    id: u64,
    token: CancellationToken,
}

/// Pending ring timeouts keyed by call id.
///
/// Every timer is a child of one root token, so [`shutdown`](Self::shutdown)
/// stops them all.
pub struct RingTimers {
    timeout: Option<Duration>,
    pending: Arc<DashMap<String, PendingTimer>>,
    next_id: AtomicU64,
    root: CancellationToken,
}

impl RingTimers {
    /// `None` disables ring timeouts.
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            pending: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(0),
            root: CancellationToken::new(),
        }
    }

    pub fn from_config(config: &CallsConfig) -> Self {
        let timeout = (config.ring_timeout_secs > 0)
            .then(|| Duration::from_secs(config.ring_timeout_secs));
        Self::new(timeout)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Start the timer for `call_id`, replacing any earlier one. `on_expire`
    /// runs only if the timer is neither cancelled nor replaced first.
    pub fn arm<F>(&self, call_id: &str, on_expire: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Some(timeout) = self.timeout else {
            return false;
        };
        if self.root.is_cancelled() {
            return false;
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = self.root.child_token();
        let timer = PendingTimer {
            id,
            token: token.clone(),
        };
        if let Some(previous) = self.pending.insert(call_id.to_string(), timer) {
            previous.token.cancel();
        }

        let pending = Arc::clone(&self.pending);
        let call_id = call_id.to_string();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(timeout) => {
                    if pending.remove_if(&call_id, |_, timer| timer.id == id).is_some() {
                        debug!(call_id = %call_id, "ring timeout expired");
                        on_expire.await;
                    }
                }
            }
        });
        true
    }

    /// Returns whether a timer was pending.
    pub fn cancel(&self, call_id: &str) -> bool {
        match self.pending.remove(call_id) {
            Some((_, timer)) => {
                timer.token.cancel();
                debug!(call_id, "ring timer cancelled");
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, call_id: &str) -> bool {
        self.pending.contains_key(call_id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Cancel every timer and refuse new ones.
    pub fn shutdown(&self) {
        self.root.cancel();
        self.pending.clear();
    }
}
