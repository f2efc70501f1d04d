// SPDX-FileCopyrightText: 2026 Ringline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for Ringline.
//!
//! This crate holds the call data model, the status table that drives the
//! call lifecycle, the server-to-client event vocabulary, and the adapter
//! traits (durable store, real-time transport) the rest of the workspace is
//! written against.

pub mod error;
pub mod events;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::RinglineError;
pub use events::ServerEvent;
pub use types::{
    AdapterType, CallDetails, CallSession, CallStatus, CallTarget, CallType, Delivery,
    FanoutReport, HealthStatus, JoinOutcome, LeaveOutcome, Participant,
};

pub use traits::{CallStore, PluginAdapter, Transport};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        let cases = [
            (RinglineError::Config("x".into()), "config"),
            (
                RinglineError::Storage {
                    source: Box::new(std::io::Error::other("disk")),
                },
                "storage",
            ),
            (
                RinglineError::CallNotFound {
                    call_id: "c".into(),
                },
                "not_found",
            ),
            (
                RinglineError::ParticipantNotFound {
                    call_id: "c".into(),
                    user_id: "u".into(),
                },
                "not_found",
            ),
            (
                RinglineError::Conflict {
                    user_id: "u".into(),
                    active_call_id: "c".into(),
                },
                "conflict",
            ),
            (
                RinglineError::Forbidden {
                    user_id: "u".into(),
                    call_id: "c".into(),
                },
                "forbidden",
            ),
            (
                RinglineError::InvalidTransition {
                    call_id: "c".into(),
                    from: CallStatus::Ended,
                    to: CallStatus::Ongoing,
                },
                "invalid_transition",
            ),
            (
                RinglineError::TargetOffline {
                    user_id: "u".into(),
                },
                "target_offline",
            ),
            (RinglineError::InvalidRequest("bad".into()), "invalid_request"),
            (RinglineError::Internal("boom".into()), "internal"),
        ];
        for (err, code) in cases {
            assert_eq!(err.code(), code, "{err}");
        }
    }

    #[test]
    fn adapter_type_round_trips_through_strings() {
        use std::str::FromStr;

        for variant in [
            AdapterType::Store,
            AdapterType::Transport,
            AdapterType::Observability,
        ] {
            let parsed = AdapterType::from_str(&variant.to_string()).expect("should parse back");
            assert_eq!(variant, parsed);
        }
    }

    #[test]
    fn all_traits_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_call_store<T: CallStore>() {}
        fn _assert_transport<T: Transport>() {}
    }
}
