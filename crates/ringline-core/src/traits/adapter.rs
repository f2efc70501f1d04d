// SPDX-FileCopyrightText: 2026 Ringline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity and lifecycle shared by every pluggable backend.

use async_trait::async_trait;

use crate::error::RinglineError;
use crate::types::{AdapterType, HealthStatus};

/// Common surface of the store, transport and observability backends.
///
/// `/health` and shutdown only ever talk to backends through this trait.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Short name used in logs and health output, e.g. `"sqlite"`.
    fn name(&self) -> &str;

    fn version(&self) -> semver::Version;

    fn adapter_type(&self) -> AdapterType;

    /// Probe the backend. `Ok(Unhealthy(..))` is a reachable but broken
    /// backend; `Err` means the probe itself failed.
    async fn health_check(&self) -> Result<HealthStatus, RinglineError>;

    /// Release held resources. Called once, after the server stops.
    async fn shutdown(&self) -> Result<(), RinglineError>;
}
