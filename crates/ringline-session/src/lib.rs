// SPDX-FileCopyrightText: 2026 Ringline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Call session state machine.
//!
//! [`CallSessionManager`] owns every call mutation. Each one is a single
//! store transaction (validation and write commit together), and the
//! manager additionally serializes work per call id and per user id with
//! [`KeyedLocks`], so unrelated calls never wait on each other.

pub mod locks;
pub mod manager;

pub use locks::{KeyGuard, KeyedLocks};
pub use manager::{CallSessionManager, DeclineOutcome, EndOutcome};
