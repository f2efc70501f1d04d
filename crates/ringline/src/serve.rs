// SPDX-FileCopyrightText: 2026 Ringline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `ringline serve`: wire the stack together and run the gateway.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use ringline_config::RinglineConfig;
use ringline_core::{CallStore, PluginAdapter, RinglineError};
use ringline_gateway::{AuthConfig, GatewayState, HealthState, WsTransport};
use ringline_presence::PresenceRegistry;
use ringline_prometheus::PrometheusAdapter;
use ringline_session::CallSessionManager;
use ringline_signaling::{ConnectionLifecycle, Notifier, RingTimers, SignalingRelay};
use ringline_storage::SqliteCallStore;

use crate::shutdown;

/// Run the server until SIGINT/SIGTERM.
pub async fn run_serve(config: RinglineConfig) -> Result<(), RinglineError> {
    init_tracing(&config.logging.level);
    info!(version = env!("CARGO_PKG_VERSION"), "ringline starting");

    let store = SqliteCallStore::new(config.storage.clone());
    store.initialize().await?;
    info!(path = %config.storage.database_path, "call store opened");
    let store: Arc<dyn CallStore> = Arc::new(store);

    let manager = Arc::new(CallSessionManager::new(store.clone(), &config.calls));

    // No presence survives a restart, so live calls from a previous run
    // can never complete.
    let reconciled = manager.reconcile_stale_calls().await?;
    if reconciled > 0 {
        info!(count = reconciled, "closed calls left live by a previous run");
    }

    let prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>> = if config.metrics.enabled
    {
        match PrometheusAdapter::new() {
            Ok(adapter) => {
                let handle = adapter.handle().clone();
                Some(Arc::new(move || handle.render()))
            }
            Err(e) => {
                warn!(error = %e, "metrics disabled");
                None
            }
        }
    } else {
        info!("metrics disabled by configuration");
        None
    };

    let presence = Arc::new(PresenceRegistry::new());
    let transport = Arc::new(WsTransport::new(config.server.outbound_buffer));
    let notifier = Notifier::new(presence, transport.clone());
    let timers = RingTimers::from_config(&config.calls);
    match timers.timeout() {
        Some(timeout) => info!(timeout_secs = timeout.as_secs(), "ring timeout enabled"),
        None => info!("ring timeout disabled"),
    }
    let relay = Arc::new(SignalingRelay::new(manager.clone(), notifier, timers));
    let lifecycle = ConnectionLifecycle::from_config(relay.clone(), &config.calls);

    if config.server.bearer_token.is_none() {
        warn!("server.bearer_token is not set; every request will be rejected");
    }

    let state = GatewayState {
        relay: relay.clone(),
        lifecycle,
        transport: transport.clone(),
        auth: AuthConfig {
            bearer_token: config.server.bearer_token.clone(),
        },
        health: HealthState {
            start_time: std::time::Instant::now(),
            prometheus_render,
        },
    };

    let cancel = shutdown::install_signal_handler();

    {
        let mem_cancel = cancel.clone();
        tokio::spawn(async move {
            memory_monitor(mem_cancel).await;
        });
    }

    let served = ringline_gateway::start_server(&config.server, state, cancel.clone()).await;
    cancel.cancel();

    relay.shutdown();
    if let Err(e) = transport.shutdown().await {
        warn!(error = %e, "transport shutdown failed");
    }
    if let Err(e) = store.close().await {
        error!(error = %e, "call store close failed");
    }

    served?;
    info!("ringline serve shutdown complete");
    Ok(())
}

/// Export jemalloc heap and resident gauges every 15 seconds.
#[cfg(not(target_env = "msvc"))]
async fn memory_monitor(cancel: CancellationToken) {
    let mut interval = tokio::time::interval(Duration::from_secs(15));

    loop {
        tokio::select! {
            _ = interval.tick() => {
                // Stats are cached until the epoch advances.
                let _ = tikv_jemalloc_ctl::epoch::advance();
                let allocated = tikv_jemalloc_ctl::stats::allocated::read().unwrap_or(0);
                let resident = tikv_jemalloc_ctl::stats::resident::read().unwrap_or(0);
                ringline_prometheus::set_memory_heap(allocated as f64);
                ringline_prometheus::set_memory_resident(resident as f64);
            }
            _ = cancel.cancelled() => {
                info!("memory monitor shutting down");
                break;
            }
        }
    }
}

#[cfg(target_env = "msvc")]
async fn memory_monitor(cancel: CancellationToken) {
    cancel.cancelled().await;
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ringline={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
