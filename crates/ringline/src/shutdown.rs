// SPDX-FileCopyrightText: 2026 Ringline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process signals mapped onto the server's root cancellation token.

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Returns a token cancelled on the first SIGINT or SIGTERM.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    let received = tokio::select! {
                        _ = ctrl_c => "SIGINT",
                        _ = sigterm.recv() => "SIGTERM",
                    };
                    info!(signal = received, "stopping server");
                }
                Err(e) => {
                    error!(error = %e, "failed to install SIGTERM handler; only Ctrl+C will stop the server");
                    let _ = ctrl_c.await;
                    info!(signal = "SIGINT", "stopping server");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!(signal = "ctrl-c", "stopping server");
        }

        trigger.cancel();
        debug!("root token cancelled");
    });

    token
}
