// SPDX-FileCopyrightText: 2026 Ringline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.

use metrics::{describe_counter, describe_gauge};

use ringline_core::types::{CallStatus, Delivery};

/// Register all Ringline metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!("ringline_calls_created_total", "Calls created, by kind");
    describe_counter!(
        "ringline_call_transitions_total",
        "Committed call status transitions, by target status"
    );
    describe_counter!(
        "ringline_relay_events_total",
        "Relayed signaling and control events, by event and delivery outcome"
    );
    describe_gauge!("ringline_online_users", "Users currently registered in presence");
    describe_gauge!("ringline_memory_heap_bytes", "Allocated heap bytes");
    describe_gauge!("ringline_memory_resident_bytes", "Resident memory bytes");
}

/// `kind` is `direct` or `group`.
pub fn record_call_created(kind: &'static str) {
    metrics::counter!("ringline_calls_created_total", "kind" => kind).increment(1);
}

pub fn record_transition(to: CallStatus) {
    metrics::counter!("ringline_call_transitions_total", "to" => to.as_ref().to_string())
        .increment(1);
}

pub fn record_relay_event(event: &'static str, outcome: Delivery) {
    metrics::counter!(
        "ringline_relay_events_total",
        "event" => event,
        "outcome" => outcome.as_ref().to_string()
    )
    .increment(1);
}

pub fn set_online_users(count: usize) {
    metrics::gauge!("ringline_online_users").set(count as f64);
}

pub fn set_memory_heap(bytes: f64) {
    metrics::gauge!("ringline_memory_heap_bytes").set(bytes);
}

pub fn set_memory_resident(bytes: f64) {
    metrics::gauge!("ringline_memory_resident_bytes").set(bytes);
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusBuilder;

    #[test]
    fn helpers_render_through_local_recorder() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            register_metrics();
            record_call_created("direct");
            record_call_created("direct");
            record_transition(CallStatus::Missed);
            record_relay_event("send_offer", Delivery::Offline);
            set_online_users(3);
        });

        let out = handle.render();
        assert!(out.contains(r#"ringline_calls_created_total{kind="direct"} 2"#));
        assert!(out.contains(r#"ringline_call_transitions_total{to="missed"} 1"#));
        assert!(out.contains(r#"event="send_offer""#));
        assert!(out.contains(r#"outcome="offline""#));
        assert!(out.contains("ringline_online_users 3"));
    }

    #[test]
    fn recording_without_recorder_is_noop() {
        record_call_created("group");
        set_online_users(0);
    }
}
