// SPDX-FileCopyrightText: 2026 Ringline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signaling relay and connection lifecycle for Ringline.
//!
//! - [`Notifier`] addresses users through presence and delivers events over
//!   the transport, best-effort.
//! - [`SignalingRelay`] validates the actor, drives the session manager and
//!   fans the result out. Notifications are sent only after the state change
//!   they describe has committed.
//! - [`RingTimers`] moves unanswered calls to `Missed`.
//! - [`ConnectionLifecycle`] handles connect and disconnect.
//! - [`ClientCommand`] is the client wire vocabulary; [`dispatch`] routes a
//!   decoded command to the relay.

pub mod command;
pub mod lifecycle;
pub mod notifier;
pub mod relay;
pub mod ring_timer;

#[cfg(test)]
pub(crate) mod testing;

pub use command::{ClientCommand, dispatch};
pub use lifecycle::{ConnectionLifecycle, DisconnectOutcome};
pub use notifier::Notifier;
pub use relay::SignalingRelay;
pub use ring_timer::RingTimers;
