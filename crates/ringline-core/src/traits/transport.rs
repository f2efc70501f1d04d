// SPDX-FileCopyrightText: 2026 Ringline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Real-time transport trait.

use async_trait::async_trait;

use crate::error::RinglineError;
use crate::events::ServerEvent;
use crate::traits::adapter::PluginAdapter;

/// Unicast delivery of server events to one live connection.
///
/// Delivery is best-effort: an `Err` means the event did not reach the
/// connection (closed or saturated queue). Implementations must not block
/// on a slow client.
#[async_trait]
pub trait Transport: PluginAdapter {
    async fn deliver(&self, connection_id: &str, event: &ServerEvent)
        -> Result<(), RinglineError>;
}
