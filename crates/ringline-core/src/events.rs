// SPDX-FileCopyrightText: 2026 Ringline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server-to-client events.
//!
//! Serialized as JSON objects tagged by `type`:
//!
//! ```json
//! {"type": "incoming_call", "call_id": "...", "caller_id": "alice", "call_type": "video"}
//! {"type": "receive_offer", "call_id": "...", "from_user_id": "alice", "payload": {...}}
//! ```
//!
//! Signaling payloads are carried as opaque JSON and never inspected.

use serde::{Deserialize, Serialize};

use crate::types::{CallSession, CallType, Participant};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Connected {
        user_id: String,
        connection_id: String,
    },
    UserOnline {
        user_id: String,
    },
    UserOffline {
        user_id: String,
    },
    /// Reconnect-resume snapshot of the user's live call.
    ActiveCall {
        call: CallSession,
        participants: Vec<Participant>,
    },
    IncomingCall {
        call_id: String,
        caller_id: String,
        call_type: CallType,
    },
    IncomingGroupCall {
        call_id: String,
        caller_id: String,
        group_id: String,
        call_type: CallType,
    },
    CallMissed {
        call_id: String,
        reason: String,
    },
    CallError {
        call_id: Option<String>,
        code: String,
        message: String,
    },
    ReceiveOffer {
        call_id: String,
        from_user_id: String,
        payload: serde_json::Value,
    },
    ReceiveAnswer {
        call_id: String,
        from_user_id: String,
        payload: serde_json::Value,
    },
    ReceiveIceCandidate {
        call_id: String,
        from_user_id: String,
        payload: serde_json::Value,
    },
    CallDeclined {
        call_id: String,
        user_id: String,
    },
    CallEnded {
        call_id: String,
        user_id: String,
    },
    UserJoinedCall {
        call_id: String,
        user_id: String,
    },
    CallParticipants {
        call_id: String,
        user_ids: Vec<String>,
    },
    UserLeftCall {
        call_id: String,
        user_id: String,
    },
    UserAudioState {
        call_id: String,
        user_id: String,
        muted: bool,
    },
    UserVideoState {
        call_id: String,
        user_id: String,
        muted: bool,
    },
    UserStartedScreenSharing {
        call_id: String,
        user_id: String,
    },
    UserStoppedScreenSharing {
        call_id: String,
        user_id: String,
    },
    CallMessage {
        call_id: String,
        user_id: String,
        message: String,
        sent_at: i64,
    },
    UserOnlineStatus {
        user_id: String,
        online: bool,
    },
    OnlineUsers {
        user_ids: Vec<String>,
    },
    MediaDevicesTestResult {
        has_video: bool,
        has_audio: bool,
    },
}

impl ServerEvent {
    /// The `type` tag, used as a metrics label and in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerEvent::Connected { .. } => "connected",
            ServerEvent::UserOnline { .. } => "user_online",
            ServerEvent::UserOffline { .. } => "user_offline",
            ServerEvent::ActiveCall { .. } => "active_call",
            ServerEvent::IncomingCall { .. } => "incoming_call",
            ServerEvent::IncomingGroupCall { .. } => "incoming_group_call",
            ServerEvent::CallMissed { .. } => "call_missed",
            ServerEvent::CallError { .. } => "call_error",
            ServerEvent::ReceiveOffer { .. } => "receive_offer",
            ServerEvent::ReceiveAnswer { .. } => "receive_answer",
            ServerEvent::ReceiveIceCandidate { .. } => "receive_ice_candidate",
            ServerEvent::CallDeclined { .. } => "call_declined",
            ServerEvent::CallEnded { .. } => "call_ended",
            ServerEvent::UserJoinedCall { .. } => "user_joined_call",
            ServerEvent::CallParticipants { .. } => "call_participants",
            ServerEvent::UserLeftCall { .. } => "user_left_call",
            ServerEvent::UserAudioState { .. } => "user_audio_state",
            ServerEvent::UserVideoState { .. } => "user_video_state",
            ServerEvent::UserStartedScreenSharing { .. } => "user_started_screen_sharing",
            ServerEvent::UserStoppedScreenSharing { .. } => "user_stopped_screen_sharing",
            ServerEvent::CallMessage { .. } => "call_message",
            ServerEvent::UserOnlineStatus { .. } => "user_online_status",
            ServerEvent::OnlineUsers { .. } => "online_users",
            ServerEvent::MediaDevicesTestResult { .. } => "media_devices_test_result",
        }
    }

    /// Build a `call_error` event from a failed operation.
    pub fn error(call_id: Option<&str>, err: &crate::RinglineError) -> Self {
        ServerEvent::CallError {
            call_id: call_id.map(str::to_string),
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RinglineError;

    #[test]
    fn kind_matches_serialized_tag() {
        let events = [
            ServerEvent::UserOnline {
                user_id: "a".into(),
            },
            ServerEvent::IncomingCall {
                call_id: "c".into(),
                caller_id: "a".into(),
                call_type: CallType::Audio,
            },
            ServerEvent::UserStartedScreenSharing {
                call_id: "c".into(),
                user_id: "a".into(),
            },
            ServerEvent::MediaDevicesTestResult {
                has_video: true,
                has_audio: false,
            },
        ];
        for event in events {
            let json = serde_json::to_value(&event).unwrap();
            assert_eq!(json["type"], event.kind());
        }
    }

    #[test]
    fn payload_is_carried_verbatim() {
        let payload = serde_json::json!({"sdp": "v=0\r\n", "type": "offer"});
        let event = ServerEvent::ReceiveOffer {
            call_id: "c".into(),
            from_user_id: "alice".into(),
            payload: payload.clone(),
        };
        let text = serde_json::to_string(&event).unwrap();
        let back: ServerEvent = serde_json::from_str(&text).unwrap();
        match back {
            ServerEvent::ReceiveOffer { payload: p, .. } => assert_eq!(p, payload),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn error_event_carries_code() {
        let err = RinglineError::TargetOffline {
            user_id: "bob".into(),
        };
        match ServerEvent::error(Some("c1"), &err) {
            ServerEvent::CallError {
                call_id,
                code,
                message,
            } => {
                assert_eq!(call_id.as_deref(), Some("c1"));
                assert_eq!(code, "target_offline");
                assert!(message.contains("bob"));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
