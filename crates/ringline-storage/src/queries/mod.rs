// SPDX-FileCopyrightText: 2026 Ringline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules, one per table.

pub mod calls;
pub mod groups;
pub mod participants;

/// Closure result inside a transaction: the outer error aborts the
/// connection call, the inner one is a domain rejection (rolled back).
pub(crate) type TxResult<T> = Result<Result<T, ringline_core::RinglineError>, rusqlite::Error>;
