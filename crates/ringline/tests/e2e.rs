// SPDX-FileCopyrightText: 2026 Ringline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end call scenarios over the full signaling stack.
//!
//! Each test creates an isolated TestHarness with a temp SQLite store and a
//! mock transport. Tests are independent and order-insensitive.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use ringline_core::types::{CallStatus, CallType};
use ringline_core::{RinglineError, ServerEvent};
use ringline_signaling::{ClientCommand, DisconnectOutcome};
use ringline_test_utils::{StoreOp, TestHarness};

async fn harness() -> TestHarness {
    TestHarness::builder().build().await.unwrap()
}

fn initiate(call_id: &str, recipient: &str) -> ClientCommand {
    ClientCommand::InitiateCall {
        call_id: call_id.to_string(),
        recipient_id: recipient.to_string(),
        call_type: None,
    }
}

fn answer(call_id: &str, offerer: &str) -> ClientCommand {
    ClientCommand::SendAnswer {
        call_id: call_id.to_string(),
        target_user_id: offerer.to_string(),
        payload: json!({"type": "answer", "sdp": "v=0"}),
    }
}

fn leave(call_id: &str) -> ClientCommand {
    ClientCommand::LeaveCall {
        call_id: call_id.to_string(),
    }
}

// ---- Busy users ----

#[tokio::test]
async fn busy_caller_cannot_create_another_call() {
    let h = harness().await;
    let first = h.manager.create_call("a", "b", CallType::Audio).await.unwrap();

    let err = h
        .manager
        .create_call("a", "c", CallType::Video)
        .await
        .unwrap_err();
    assert!(matches!(err, RinglineError::Conflict { ref active_call_id, .. } if *active_call_id == first.id));

    let history = h.manager.get_history("a", 1, 50).await.unwrap();
    assert_eq!(history.len(), 1);
    assert!(h.manager.get_history("c", 1, 50).await.unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_creates_for_one_caller_admit_one() {
    let h = Arc::new(harness().await);
    let mut tasks = Vec::new();
    for recipient in ["b", "c", "d", "e"] {
        let h = h.clone();
        tasks.push(tokio::spawn(async move {
            h.manager.create_call("a", recipient, CallType::Audio).await
        }));
    }
    let mut created = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => created += 1,
            Err(RinglineError::Conflict { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(created, 1);
    assert!(h.manager.get_active_call_for_user("a").await.unwrap().is_some());
}

// ---- Status table ----

#[tokio::test]
async fn terminal_calls_accept_no_further_transition() {
    let h = harness().await;
    let call = h.manager.create_call("a", "b", CallType::Audio).await.unwrap();
    h.manager.update_status(&call.id, CallStatus::Ringing).await.unwrap();
    let ended = h.manager.update_status(&call.id, CallStatus::Ended).await.unwrap();
    assert!(ended.end_time.is_some());

    for status in CallStatus::ALL {
        let err = h.manager.update_status(&call.id, status).await.unwrap_err();
        assert!(
            matches!(err, RinglineError::InvalidTransition { .. }),
            "{status} should be rejected"
        );
    }
    assert_eq!(
        h.manager.get_by_id(&call.id).await.unwrap().status,
        CallStatus::Ended
    );
}

// ---- Join and leave ----

#[tokio::test]
async fn double_join_keeps_one_row_and_first_join_time() {
    let h = harness().await;
    h.connect("a").await;
    h.connect("b").await;
    let call = h.manager.create_call("a", "b", CallType::Audio).await.unwrap();
    h.command("a", initiate(&call.id, "b")).await.unwrap();

    h.manager.join_call(&call.id, "b").await.unwrap();
    let first = h.manager.get_participant(&call.id, "b").await.unwrap().unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    h.manager.join_call(&call.id, "b").await.unwrap();
    let second = h.manager.get_participant(&call.id, "b").await.unwrap().unwrap();

    assert_eq!(first.join_time, second.join_time);
    assert_eq!(h.manager.get_participants(&call.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn last_leave_ends_and_repeat_leave_is_noop() {
    let h = harness().await;
    h.connect("a").await;
    h.connect("b").await;
    let call = h.manager.create_call("a", "b", CallType::Audio).await.unwrap();
    h.command("a", initiate(&call.id, "b")).await.unwrap();
    h.command("b", answer(&call.id, "a")).await.unwrap();

    h.command("a", leave(&call.id)).await.unwrap();
    assert_eq!(
        h.manager.get_by_id(&call.id).await.unwrap().status,
        CallStatus::Ongoing
    );
    h.command("b", leave(&call.id)).await.unwrap();
    let ended = h.manager.get_by_id(&call.id).await.unwrap();
    assert_eq!(ended.status, CallStatus::Ended);
    let end_time = ended.end_time;
    assert!(end_time.is_some());

    let repeat = h.relay.leave_call("b", &call.id).await.unwrap();
    assert!(!repeat.changed);
    assert!(!repeat.ended_call);
    assert_eq!(h.manager.get_by_id(&call.id).await.unwrap().end_time, end_time);
}

#[tokio::test]
async fn concurrent_last_leaves_end_the_call_once() {
    let h = Arc::new(harness().await);
    h.connect("a").await;
    h.connect("b").await;
    let call = h.manager.create_call("a", "b", CallType::Audio).await.unwrap();
    h.command("a", initiate(&call.id, "b")).await.unwrap();
    h.command("b", answer(&call.id, "a")).await.unwrap();

    let (ra, rb) = tokio::join!(
        h.relay.leave_call("a", &call.id),
        h.relay.leave_call("b", &call.id)
    );
    let endings = [ra.unwrap(), rb.unwrap()]
        .iter()
        .filter(|o| o.ended_call)
        .count();
    assert_eq!(endings, 1);
    assert_eq!(
        h.manager.get_by_id(&call.id).await.unwrap().status,
        CallStatus::Ended
    );
}

// ---- Ringing ----

#[tokio::test]
async fn offline_recipient_makes_the_call_missed() {
    let h = harness().await;
    h.connect("a").await;
    let call = h.manager.create_call("a", "b", CallType::Video).await.unwrap();

    h.command("a", initiate(&call.id, "b")).await.unwrap();

    let missed = h.manager.get_by_id(&call.id).await.unwrap();
    assert_eq!(missed.status, CallStatus::Missed);
    assert!(missed.end_time.is_some());
    assert!(
        h.transport
            .deliveries()
            .await
            .iter()
            .all(|(_, e)| e.kind() != "incoming_call")
    );
    assert_eq!(
        h.events_for("a").await.last(),
        Some(&ServerEvent::CallMissed {
            call_id: call.id.clone(),
            reason: "recipient_offline".into(),
        })
    );
    assert_eq!(h.manager.missed_calls("b").await.unwrap().len(), 1);
}

#[tokio::test]
async fn unanswered_call_times_out() {
    let h = TestHarness::builder()
        .with_ring_timeout(Duration::from_millis(50))
        .build()
        .await
        .unwrap();
    h.connect("a").await;
    h.connect("b").await;
    let call = h.manager.create_call("a", "b", CallType::Audio).await.unwrap();
    h.command("a", initiate(&call.id, "b")).await.unwrap();

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(
        h.manager.get_by_id(&call.id).await.unwrap().status,
        CallStatus::Missed
    );
    assert_eq!(h.kinds_for("b").await.last(), Some(&"call_missed"));
    assert_eq!(h.kinds_for("a").await.last(), Some(&"call_missed"));
}

// ---- Scenarios ----

#[tokio::test]
async fn direct_call_survives_caller_drop_until_last_leave() {
    let h = harness().await;
    let a = h.connect("a").await;
    h.connect("b").await;

    let call = h.manager.create_call("a", "b", CallType::Audio).await.unwrap();
    assert_eq!(call.status, CallStatus::Initiated);

    h.command("a", initiate(&call.id, "b")).await.unwrap();
    assert_eq!(
        h.manager.get_by_id(&call.id).await.unwrap().status,
        CallStatus::Ringing
    );
    assert_eq!(h.kinds_for("b").await.last(), Some(&"incoming_call"));

    h.command("b", answer(&call.id, "a")).await.unwrap();
    assert_eq!(h.kinds_for("a").await.last(), Some(&"receive_answer"));
    assert!(
        h.manager
            .get_participant(&call.id, "b")
            .await
            .unwrap()
            .unwrap()
            .has_joined
    );
    assert_eq!(
        h.manager.get_by_id(&call.id).await.unwrap().status,
        CallStatus::Ongoing
    );

    let outcome = h.disconnect(&a).await;
    assert_eq!(
        outcome,
        DisconnectOutcome::Offline {
            left_call: Some(call.id.clone())
        }
    );
    assert_eq!(
        h.manager.get_by_id(&call.id).await.unwrap().status,
        CallStatus::Ongoing
    );
    let b_events = h.kinds_for("b").await;
    assert!(b_events.ends_with(&["user_left_call", "user_offline"]));

    h.command("b", leave(&call.id)).await.unwrap();
    let ended = h.manager.get_by_id(&call.id).await.unwrap();
    assert_eq!(ended.status, CallStatus::Ended);
    assert!(ended.end_time.is_some());
}

#[tokio::test]
async fn group_call_ends_when_last_joiner_leaves() {
    let h = TestHarness::builder()
        .with_group("team", &["a", "b", "c"])
        .build()
        .await
        .unwrap();
    h.connect("a").await;
    h.connect("b").await;
    h.connect("c").await;

    let details = h
        .manager
        .create_group_call("a", "team", CallType::Video)
        .await
        .unwrap();
    let call_id = details.call.id.clone();
    assert_eq!(details.participants.len(), 3);

    h.command(
        "a",
        ClientCommand::InitiateGroupCall {
            call_id: call_id.clone(),
            group_id: "team".into(),
            call_type: Some(CallType::Video),
        },
    )
    .await
    .unwrap();
    assert_eq!(h.kinds_for("b").await.last(), Some(&"incoming_group_call"));
    assert_eq!(h.kinds_for("c").await.last(), Some(&"incoming_group_call"));

    h.command(
        "b",
        ClientCommand::JoinCall {
            call_id: call_id.clone(),
        },
    )
    .await
    .unwrap();

    h.command("a", leave(&call_id)).await.unwrap();
    let details = h.manager.call_details(&call_id).await.unwrap();
    assert_eq!(details.call.status, CallStatus::Ongoing);
    assert_eq!(details.active_user_ids(), vec!["b".to_string()]);

    h.command("b", leave(&call_id)).await.unwrap();
    let call = h.manager.get_by_id(&call_id).await.unwrap();
    assert_eq!(call.status, CallStatus::Ended);
    assert!(call.end_time.is_some());
    assert_eq!(h.kinds_for("c").await.last(), Some(&"call_ended"));
}

// ---- Delivery failures ----

#[tokio::test]
async fn failed_notification_does_not_roll_back() {
    let h = harness().await;
    h.connect("a").await;
    let b = h.connect("b").await;
    let call = h.manager.create_call("a", "b", CallType::Audio).await.unwrap();
    h.command("a", initiate(&call.id, "b")).await.unwrap();
    h.command("b", answer(&call.id, "a")).await.unwrap();

    h.transport.fail_connection(&b.connection_id).await;
    h.command(
        "a",
        ClientCommand::EndCall {
            call_id: call.id.clone(),
        },
    )
    .await
    .unwrap();
    assert_eq!(
        h.manager.get_by_id(&call.id).await.unwrap().status,
        CallStatus::Ended
    );
}

#[tokio::test]
async fn answer_to_departed_offerer_is_reported() {
    let h = harness().await;
    let a = h.connect("a").await;
    h.connect("b").await;
    let call = h.manager.create_call("a", "b", CallType::Audio).await.unwrap();
    h.command("a", initiate(&call.id, "b")).await.unwrap();
    h.disconnect(&a).await;

    let err = h.command("b", answer(&call.id, "a")).await.unwrap_err();
    assert_eq!(err.code(), "target_offline");

    // ICE to the same peer is dropped quietly.
    let reply = h
        .command(
            "b",
            ClientCommand::SendIceCandidate {
                call_id: call.id.clone(),
                target_user_id: "a".into(),
                payload: json!({"candidate": "candidate:1"}),
            },
        )
        .await
        .unwrap();
    assert!(reply.is_none());
}

#[tokio::test]
async fn failed_commit_sends_nothing() {
    let h = harness().await;
    h.connect("a").await;
    h.connect("b").await;
    let call = h.manager.create_call("a", "b", CallType::Audio).await.unwrap();
    h.clear_events().await;

    h.store.fail(StoreOp::Transition).await;
    let err = h.command("a", initiate(&call.id, "b")).await.unwrap_err();
    assert_eq!(err.code(), "storage");
    assert_eq!(h.transport.delivered_count().await, 0);
    assert_eq!(
        h.manager.get_by_id(&call.id).await.unwrap().status,
        CallStatus::Initiated
    );
    h.store.recover(StoreOp::Transition).await;
    h.command("a", initiate(&call.id, "b")).await.unwrap();

    h.clear_events().await;
    h.store.fail(StoreOp::Join).await;
    let err = h.command("b", answer(&call.id, "a")).await.unwrap_err();
    assert_eq!(err.code(), "storage");
    assert_eq!(h.transport.delivered_count().await, 0);
    assert_eq!(
        h.manager.get_by_id(&call.id).await.unwrap().status,
        CallStatus::Ringing
    );
    h.store.recover(StoreOp::Join).await;
    h.command("b", answer(&call.id, "a")).await.unwrap();

    h.clear_events().await;
    h.store.fail(StoreOp::Leave).await;
    let err = h.command("a", leave(&call.id)).await.unwrap_err();
    assert_eq!(err.code(), "storage");
    assert_eq!(h.transport.delivered_count().await, 0);
    assert!(
        h.manager
            .get_participant(&call.id, "a")
            .await
            .unwrap()
            .unwrap()
            .is_active()
    );
}

#[tokio::test]
async fn outsider_cannot_leave() {
    let h = harness().await;
    h.connect("a").await;
    h.connect("b").await;
    let call = h.manager.create_call("a", "b", CallType::Audio).await.unwrap();
    h.command("a", initiate(&call.id, "b")).await.unwrap();

    let err = h.command("mallory", leave(&call.id)).await.unwrap_err();
    assert_eq!(err.code(), "forbidden");
}

// ---- Races ----

async fn ongoing_team_call(h: &TestHarness) -> String {
    let details = h
        .manager
        .create_group_call("a", "team", CallType::Audio)
        .await
        .unwrap();
    let call_id = details.call.id;
    h.relay
        .initiate_group_call("a", &call_id, "team", None)
        .await
        .unwrap();
    call_id
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_group_answers_all_commit() {
    for _ in 0..5 {
        let h = Arc::new(
            TestHarness::builder()
                .with_group("team", &["a", "b", "c"])
                .build()
                .await
                .unwrap(),
        );
        for user in ["a", "b", "c"] {
            h.connect(user).await;
        }
        let call_id = ongoing_team_call(&h).await;

        let answers: Vec<_> = ["b", "c"]
            .into_iter()
            .map(|user| {
                let h = Arc::clone(&h);
                let call_id = call_id.clone();
                tokio::spawn(async move {
                    h.relay
                        .send_answer(user, &call_id, "a", json!({"type": "answer"}))
                        .await
                })
            })
            .collect();
        for answer in answers {
            answer.await.unwrap().unwrap();
        }

        let details = h.manager.call_details(&call_id).await.unwrap();
        assert_eq!(details.call.status, CallStatus::Ongoing);
        let mut active = details.active_user_ids();
        active.sort();
        assert_eq!(active, vec!["a", "b", "c"]);
        assert_eq!(details.participants.len(), 3);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn join_racing_last_leave_never_splits() {
    for _ in 0..5 {
        let h = Arc::new(
            TestHarness::builder()
                .with_group("team", &["a", "b"])
                .build()
                .await
                .unwrap(),
        );
        h.connect("a").await;
        h.connect("b").await;
        let call_id = ongoing_team_call(&h).await;

        let leaving = {
            let (h, call_id) = (Arc::clone(&h), call_id.clone());
            tokio::spawn(async move { h.relay.leave_call("a", &call_id).await })
        };
        let joining = {
            let (h, call_id) = (Arc::clone(&h), call_id.clone());
            tokio::spawn(async move { h.relay.join_call("b", &call_id).await })
        };
        leaving.await.unwrap().unwrap();
        let joined = joining.await.unwrap();

        let details = h.manager.call_details(&call_id).await.unwrap();
        match details.call.status {
            CallStatus::Ended => {
                assert!(details.active_user_ids().is_empty());
                assert!(details.call.end_time.is_some());
                assert_eq!(joined.unwrap_err().code(), "invalid_transition");
            }
            CallStatus::Ongoing => {
                assert_eq!(details.active_user_ids(), vec!["b".to_string()]);
                assert!(details.call.end_time.is_none());
                joined.unwrap();
            }
            other => panic!("unexpected status {other}"),
        }
    }
}

// ---- Reconnects ----

#[tokio::test]
async fn quick_reconnect_keeps_the_call() {
    let h = TestHarness::builder()
        .with_reconnect_grace(Duration::from_millis(100))
        .build()
        .await
        .unwrap();
    h.connect("a").await;
    let b = h.connect("b").await;
    let call = h.manager.create_call("a", "b", CallType::Audio).await.unwrap();
    h.command("a", initiate(&call.id, "b")).await.unwrap();
    h.command("b", answer(&call.id, "a")).await.unwrap();

    let (outcome, b2) = tokio::join!(h.disconnect(&b), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        h.connect("b").await
    });
    assert_eq!(outcome, DisconnectOutcome::Superseded);
    assert!(h.presence.is_current("b", b2.generation));
    assert!(
        h.manager
            .get_participant(&call.id, "b")
            .await
            .unwrap()
            .unwrap()
            .is_active()
    );

    let resumed = h.transport.events_for(&b2.connection_id).await;
    assert!(matches!(
        resumed.last(),
        Some(ServerEvent::ActiveCall { call: active, .. }) if active.id == call.id
    ));
}
