// SPDX-FileCopyrightText: 2026 Ringline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for Ringline.

use thiserror::Error;

use crate::types::CallStatus;

/// The primary error type used across all Ringline components.
///
/// A presence miss is not represented here: it is a routing outcome
/// ([`Delivery::Offline`](crate::types::Delivery)), not a failure.
#[derive(Debug, Error)]
pub enum RinglineError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Durable store errors (connection, query failure, constraint violation).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Real-time transport errors (bind failure, closed connection queue).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The call does not exist.
    #[error("call not found: {call_id}")]
    CallNotFound { call_id: String },

    /// The user has no participant row in the call.
    #[error("participant {user_id} not found in call {call_id}")]
    ParticipantNotFound { call_id: String, user_id: String },

    /// The user already has a non-terminal call.
    #[error("user {user_id} already has an active call ({active_call_id})")]
    Conflict {
        user_id: String,
        active_call_id: String,
    },

    /// The actor is not allowed to act on this call.
    #[error("user {user_id} is not allowed to act on call {call_id}")]
    Forbidden { user_id: String, call_id: String },

    /// A status change rejected by the lifecycle table.
    #[error("call {call_id} cannot move from {from} to {to}")]
    InvalidTransition {
        call_id: String,
        from: CallStatus,
        to: CallStatus,
    },

    /// A critical relay target is not connected.
    #[error("user {user_id} is not online")]
    TargetOffline { user_id: String },

    /// Malformed input from a client.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RinglineError {
    /// Stable snake_case code for the wire and for status mapping.
    pub fn code(&self) -> &'static str {
        match self {
            RinglineError::Config(_) => "config",
            RinglineError::Storage { .. } => "storage",
            RinglineError::Transport { .. } => "transport",
            RinglineError::CallNotFound { .. } | RinglineError::ParticipantNotFound { .. } => {
                "not_found"
            }
            RinglineError::Conflict { .. } => "conflict",
            RinglineError::Forbidden { .. } => "forbidden",
            RinglineError::InvalidTransition { .. } => "invalid_transition",
            RinglineError::TargetOffline { .. } => "target_offline",
            RinglineError::InvalidRequest(_) => "invalid_request",
            RinglineError::Internal(_) => "internal",
        }
    }

    /// Returns true for failures caused by the caller's request rather than the server.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            RinglineError::Config(_)
                | RinglineError::Storage { .. }
                | RinglineError::Transport { .. }
                | RinglineError::Internal(_)
        )
    }
}
