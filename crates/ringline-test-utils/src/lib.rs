// SPDX-FileCopyrightText: 2026 Ringline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Ringline integration tests.
//!
//! # Components
//!
//! - [`MockTransport`] - Transport that captures every delivered event
//! - [`FailingStore`] - Store wrapper that fails chosen writes on demand
//! - [`TestHarness`] - Temp SQLite store, presence, manager, relay and
//!   lifecycle wired together

pub mod failing_store;
pub mod harness;
pub mod mock_transport;

pub use failing_store::{FailingStore, StoreOp};
pub use harness::{Connection, TestHarness, TestHarnessBuilder};
pub use mock_transport::MockTransport;
