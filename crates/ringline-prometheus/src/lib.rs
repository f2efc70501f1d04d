// SPDX-FileCopyrightText: 2026 Ringline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prometheus metrics for Ringline.
//!
//! Call sites record through the `metrics` facade via the helpers in
//! [`recording`]; without an installed recorder those calls are no-ops.
//! [`PrometheusAdapter`] installs the exporter and renders the text format
//! served on the gateway's `/metrics` endpoint.

pub mod recording;

use async_trait::async_trait;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use ringline_core::{AdapterType, HealthStatus, PluginAdapter, RinglineError};

pub use recording::{
    record_call_created, record_relay_event, record_transition, set_memory_heap,
    set_memory_resident, set_online_users,
};

/// Installs the global Prometheus recorder and renders its output.
pub struct PrometheusAdapter {
    handle: PrometheusHandle,
}

impl PrometheusAdapter {
    /// Only one recorder can be installed per process; a second call fails.
    pub fn new() -> Result<Self, RinglineError> {
        let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
            RinglineError::Internal(format!("failed to install Prometheus recorder: {e}"))
        })?;

        recording::register_metrics();
        tracing::info!("prometheus metrics recorder installed");

        Ok(Self { handle })
    }

    pub fn handle(&self) -> &PrometheusHandle {
        &self.handle
    }

    pub fn render(&self) -> String {
        self.handle.render()
    }
}

#[async_trait]
impl PluginAdapter for PrometheusAdapter {
    fn name(&self) -> &str {
        "prometheus"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Observability
    }

    async fn health_check(&self) -> Result<HealthStatus, RinglineError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RinglineError> {
        Ok(())
    }
}
