// SPDX-FileCopyrightText: 2026 Ringline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client-to-server commands and their dispatch onto the relay.
//!
//! ```json
//! {"type": "initiate_call", "call_id": "...", "recipient_id": "bob", "call_type": "audio"}
//! {"type": "send_ice_candidate", "call_id": "...", "target_user_id": "bob", "payload": {...}}
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use ringline_core::types::CallType;
use ringline_core::{RinglineError, ServerEvent};

use crate::relay::SignalingRelay;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    InitiateCall {
        call_id: String,
        recipient_id: String,
        #[serde(default)]
        call_type: Option<CallType>,
    },
    InitiateGroupCall {
        call_id: String,
        group_id: String,
        #[serde(default)]
        call_type: Option<CallType>,
    },
    SendOffer {
        call_id: String,
        target_user_id: String,
        payload: serde_json::Value,
    },
    SendAnswer {
        call_id: String,
        target_user_id: String,
        payload: serde_json::Value,
    },
    SendIceCandidate {
        call_id: String,
        target_user_id: String,
        payload: serde_json::Value,
    },
    DeclineCall {
        call_id: String,
    },
    EndCall {
        call_id: String,
    },
    JoinCall {
        call_id: String,
    },
    LeaveCall {
        call_id: String,
    },
    MuteAudio {
        call_id: String,
        muted: bool,
    },
    MuteVideo {
        call_id: String,
        muted: bool,
    },
    StartScreenSharing {
        call_id: String,
    },
    StopScreenSharing {
        call_id: String,
    },
    SendCallMessage {
        call_id: String,
        message: String,
    },
    CheckOnlineStatus {
        user_id: String,
    },
    GetOnlineUsers,
    TestMediaDevices {
        has_video: bool,
        has_audio: bool,
    },
}

impl ClientCommand {
    pub fn kind(&self) -> &'static str {
        match self {
            ClientCommand::InitiateCall { .. } => "initiate_call",
            ClientCommand::InitiateGroupCall { .. } => "initiate_group_call",
            ClientCommand::SendOffer { .. } => "send_offer",
            ClientCommand::SendAnswer { .. } => "send_answer",
            ClientCommand::SendIceCandidate { .. } => "send_ice_candidate",
            ClientCommand::DeclineCall { .. } => "decline_call",
            ClientCommand::EndCall { .. } => "end_call",
            ClientCommand::JoinCall { .. } => "join_call",
            ClientCommand::LeaveCall { .. } => "leave_call",
            ClientCommand::MuteAudio { .. } => "mute_audio",
            ClientCommand::MuteVideo { .. } => "mute_video",
            ClientCommand::StartScreenSharing { .. } => "start_screen_sharing",
            ClientCommand::StopScreenSharing { .. } => "stop_screen_sharing",
            ClientCommand::SendCallMessage { .. } => "send_call_message",
            ClientCommand::CheckOnlineStatus { .. } => "check_online_status",
            ClientCommand::GetOnlineUsers => "get_online_users",
            ClientCommand::TestMediaDevices { .. } => "test_media_devices",
        }
    }

    /// The call this command acts on, if any. Used to address `call_error`.
    pub fn call_id(&self) -> Option<&str> {
        match self {
            ClientCommand::InitiateCall { call_id, .. }
            | ClientCommand::InitiateGroupCall { call_id, .. }
            | ClientCommand::SendOffer { call_id, .. }
            | ClientCommand::SendAnswer { call_id, .. }
            | ClientCommand::SendIceCandidate { call_id, .. }
            | ClientCommand::DeclineCall { call_id }
            | ClientCommand::EndCall { call_id }
            | ClientCommand::JoinCall { call_id }
            | ClientCommand::LeaveCall { call_id }
            | ClientCommand::MuteAudio { call_id, .. }
            | ClientCommand::MuteVideo { call_id, .. }
            | ClientCommand::StartScreenSharing { call_id }
            | ClientCommand::StopScreenSharing { call_id }
            | ClientCommand::SendCallMessage { call_id, .. } => Some(call_id),
            ClientCommand::CheckOnlineStatus { .. }
            | ClientCommand::GetOnlineUsers
            | ClientCommand::TestMediaDevices { .. } => None,
        }
    }
}

/// Run one command on behalf of `actor`. The returned event, if any, is a
/// direct reply for the actor's own connection; everything addressed to
/// other users has already been sent by the relay.
pub async fn dispatch(
    relay: &SignalingRelay,
    actor: &str,
    command: ClientCommand,
) -> Result<Option<ServerEvent>, RinglineError> {
    debug!(user_id = actor, command = command.kind(), "dispatching command");
    match command {
        ClientCommand::InitiateCall {
            call_id,
            recipient_id,
            call_type,
        } => {
            relay
                .initiate_call(actor, &call_id, &recipient_id, call_type)
                .await?;
        }
        ClientCommand::InitiateGroupCall {
            call_id,
            group_id,
            call_type,
        } => {
            relay
                .initiate_group_call(actor, &call_id, &group_id, call_type)
                .await?;
        }
        ClientCommand::SendOffer {
            call_id,
            target_user_id,
            payload,
        } => relay.send_offer(actor, &call_id, &target_user_id, payload).await?,
        ClientCommand::SendAnswer {
            call_id,
            target_user_id,
            payload,
        } => {
            relay
                .send_answer(actor, &call_id, &target_user_id, payload)
                .await?;
        }
        ClientCommand::SendIceCandidate {
            call_id,
            target_user_id,
            payload,
        } => {
            relay
                .send_ice_candidate(actor, &call_id, &target_user_id, payload)
                .await?;
        }
        ClientCommand::DeclineCall { call_id } => {
            relay.decline_call(actor, &call_id).await?;
        }
        ClientCommand::EndCall { call_id } => {
            relay.end_call(actor, &call_id).await?;
        }
        ClientCommand::JoinCall { call_id } => {
            relay.join_call(actor, &call_id).await?;
        }
        ClientCommand::LeaveCall { call_id } => {
            relay.leave_call(actor, &call_id).await?;
        }
        ClientCommand::MuteAudio { call_id, muted } => {
            relay.set_audio_muted(actor, &call_id, muted).await?;
        }
        ClientCommand::MuteVideo { call_id, muted } => {
            relay.set_video_muted(actor, &call_id, muted).await?;
        }
        ClientCommand::StartScreenSharing { call_id } => {
            relay.set_screen_sharing(actor, &call_id, true).await?;
        }
        ClientCommand::StopScreenSharing { call_id } => {
            relay.set_screen_sharing(actor, &call_id, false).await?;
        }
        ClientCommand::SendCallMessage { call_id, message } => {
            relay.send_call_message(actor, &call_id, &message).await?;
        }
        ClientCommand::CheckOnlineStatus { user_id } => {
            return Ok(Some(relay.online_status(&user_id)));
        }
        ClientCommand::GetOnlineUsers => return Ok(Some(relay.online_users())),
        ClientCommand::TestMediaDevices {
            has_video,
            has_audio,
        } => {
            return Ok(Some(ServerEvent::MediaDevicesTestResult {
                has_video,
                has_audio,
            }));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringline_core::types::CallStatus;
    use serde_json::json;

    use crate::testing::Stack;

    #[test]
    fn decodes_tagged_commands() {
        let cmd: ClientCommand = serde_json::from_value(json!({
            "type": "initiate_call",
            "call_id": "c1",
            "recipient_id": "bob"
        }))
        .unwrap();
        assert_eq!(
            cmd,
            ClientCommand::InitiateCall {
                call_id: "c1".into(),
                recipient_id: "bob".into(),
                call_type: None,
            }
        );
        assert_eq!(cmd.call_id(), Some("c1"));

        let cmd: ClientCommand = serde_json::from_str(r#"{"type":"get_online_users"}"#).unwrap();
        assert_eq!(cmd.kind(), "get_online_users");
        assert_eq!(cmd.call_id(), None);

        let cmd: ClientCommand = serde_json::from_value(json!({
            "type": "initiate_group_call",
            "call_id": "c2",
            "group_id": "team",
            "call_type": "video"
        }))
        .unwrap();
        assert!(matches!(
            cmd,
            ClientCommand::InitiateGroupCall {
                call_type: Some(CallType::Video),
                ..
            }
        ));
    }

    #[test]
    fn rejects_unknown_command() {
        let err = serde_json::from_str::<ClientCommand>(r#"{"type":"format_disk"}"#);
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn replies_only_to_queries() {
        let stack = Stack::basic().await;
        stack.online("alice");

        let reply = dispatch(
            &stack.relay,
            "alice",
            ClientCommand::TestMediaDevices {
                has_video: false,
                has_audio: true,
            },
        )
        .await
        .unwrap();
        assert_eq!(
            reply,
            Some(ServerEvent::MediaDevicesTestResult {
                has_video: false,
                has_audio: true
            })
        );

        let reply = dispatch(
            &stack.relay,
            "alice",
            ClientCommand::CheckOnlineStatus {
                user_id: "bob".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(
            reply,
            Some(ServerEvent::UserOnlineStatus {
                user_id: "bob".into(),
                online: false
            })
        );
    }

    #[tokio::test]
    async fn drives_a_call_through_the_relay() {
        let stack = Stack::basic().await;
        stack.online("alice");
        stack.online("bob");
        let call = stack
            .manager
            .create_call("alice", "bob", CallType::Audio)
            .await
            .unwrap();

        let reply = dispatch(
            &stack.relay,
            "alice",
            ClientCommand::InitiateCall {
                call_id: call.id.clone(),
                recipient_id: "bob".into(),
                call_type: Some(CallType::Audio),
            },
        )
        .await
        .unwrap();
        assert!(reply.is_none());

        dispatch(
            &stack.relay,
            "bob",
            ClientCommand::SendAnswer {
                call_id: call.id.clone(),
                target_user_id: "alice".into(),
                payload: json!({"sdp": "v=0"}),
            },
        )
        .await
        .unwrap();
        dispatch(&stack.relay, "alice", ClientCommand::EndCall { call_id: call.id.clone() })
            .await
            .unwrap();

        assert_eq!(
            stack.manager.get_by_id(&call.id).await.unwrap().status,
            CallStatus::Ended
        );
        assert_eq!(
            stack.kinds("bob").await,
            vec!["incoming_call", "call_ended"]
        );
    }

    #[tokio::test]
    async fn errors_surface_to_the_caller() {
        let stack = Stack::basic().await;
        let err = dispatch(
            &stack.relay,
            "alice",
            ClientCommand::JoinCall {
                call_id: "missing".into(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code(), "not_found");
    }
}
