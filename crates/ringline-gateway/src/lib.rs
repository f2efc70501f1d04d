// SPDX-FileCopyrightText: 2026 Ringline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP/WebSocket gateway for Ringline.
//!
//! REST routes map one-to-one onto call session operations; mutations go
//! through the signaling relay so peers are notified exactly as they would
//! be for the WebSocket command. The `/ws` endpoint carries the signaling
//! protocol, and [`WsTransport`] is the transport the relay delivers through.

pub mod auth;
pub mod handlers;
pub mod server;
pub mod transport;
pub mod ws;

pub use auth::{AuthConfig, Identity};
pub use server::{GatewayState, HealthState, router, start_server};
pub use transport::WsTransport;
