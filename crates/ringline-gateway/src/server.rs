// SPDX-FileCopyrightText: 2026 Ringline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post, put},
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use ringline_config::model::ServerConfig;
use ringline_core::RinglineError;
use ringline_session::CallSessionManager;
use ringline_signaling::{ConnectionLifecycle, SignalingRelay};

use crate::auth::{AuthConfig, auth_middleware};
use crate::handlers;
use crate::transport::WsTransport;
use crate::ws;

/// Health state for unauthenticated health/metrics endpoints.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
    /// Prometheus text renderer; `None` leaves `/metrics` empty.
    pub prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub relay: Arc<SignalingRelay>,
    pub lifecycle: ConnectionLifecycle,
    /// Outbound queues of the open WebSocket connections.
    pub transport: Arc<WsTransport>,
    pub auth: AuthConfig,
    pub health: HealthState,
}

impl GatewayState {
    pub fn manager(&self) -> &Arc<CallSessionManager> {
        self.relay.manager()
    }
}

/// Build the full route table.
///
/// - `GET /health`, `GET /metrics`: public
/// - `/v1/...`: bearer token + `X-User-Id`
/// - `GET /ws`: token and user id checked during the handshake
pub fn router(state: GatewayState) -> Router {
    let auth_state = state.auth.clone();

    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .route("/metrics", get(handlers::get_metrics))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/v1/calls", post(handlers::create_call))
        .route("/v1/calls/group", post(handlers::create_group_call))
        .route("/v1/calls/active", get(handlers::get_active_call))
        .route("/v1/calls/history", get(handlers::get_history))
        .route("/v1/calls/missed", get(handlers::get_missed_calls))
        .route("/v1/calls/{id}", get(handlers::get_call))
        .route("/v1/calls/{id}/details", get(handlers::get_call_details))
        .route("/v1/calls/{id}/participants", get(handlers::get_participants))
        .route("/v1/calls/{id}/status", put(handlers::update_status))
        .route("/v1/calls/{id}/end", put(handlers::end_call))
        .route("/v1/calls/{id}/join", post(handlers::join_call))
        .route("/v1/calls/{id}/leave", post(handlers::leave_call))
        .route("/v1/calls/{id}/decline", post(handlers::decline_call))
        .route("/v1/groups/{group_id}/members", get(handlers::get_group_members))
        .route(
            "/v1/groups/{group_id}/members/{user_id}",
            put(handlers::add_group_member).delete(handlers::remove_group_member),
        )
        .route("/v1/presence", get(handlers::get_presence))
        .route_layer(axum_middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .with_state(state.clone());

    let ws_routes = Router::new()
        .route("/ws", get(ws::ws_handler))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .merge(ws_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until `shutdown` is cancelled.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), RinglineError> {
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| RinglineError::Transport {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| RinglineError::Transport {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("gateway stopped");
    Ok(())
}
