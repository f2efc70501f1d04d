// SPDX-FileCopyrightText: 2026 Ringline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signaling relay: ringing, offer/answer/ICE forwarding, in-call controls.
//!
//! Every operation validates the actor against the call roster, commits its
//! state change through the session manager, and only then notifies peers.
//! Notification outcomes never turn into errors, except for offers and
//! answers whose target is offline, which the sender needs to know about.

use std::sync::Arc;

use tracing::{debug, info, warn};

use ringline_core::types::{
    CallSession, CallStatus, CallType, Delivery, FanoutReport, JoinOutcome, LeaveOutcome,
    Participant, now_millis,
};
use ringline_core::{RinglineError, ServerEvent};
use ringline_session::{CallSessionManager, DeclineOutcome, EndOutcome};

use crate::notifier::Notifier;
use crate::ring_timer::RingTimers;

/// Users still on the call: joined and not left.
fn active_except<'a>(roster: &'a [Participant], except: &str) -> Vec<&'a str> {
    roster
        .iter()
        .filter(|p| p.is_active() && p.user_id != except)
        .map(|p| p.user_id.as_str())
        .collect()
}

/// Everyone who has not left, joined or still being rung.
fn not_left_except<'a>(roster: &'a [Participant], except: &str) -> Vec<&'a str> {
    roster
        .iter()
        .filter(|p| p.leave_time.is_none() && p.user_id != except)
        .map(|p| p.user_id.as_str())
        .collect()
}

pub struct SignalingRelay {
    manager: Arc<CallSessionManager>,
    notifier: Notifier,
    timers: RingTimers,
}

impl SignalingRelay {
    pub fn new(manager: Arc<CallSessionManager>, notifier: Notifier, timers: RingTimers) -> Self {
        Self {
            manager,
            notifier,
            timers,
        }
    }

    pub fn manager(&self) -> &Arc<CallSessionManager> {
        &self.manager
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn timers(&self) -> &RingTimers {
        &self.timers
    }

    /// Cancel pending ring timers; used on server shutdown.
    pub fn shutdown(&self) {
        self.timers.shutdown();
    }

    fn require_caller(call: &CallSession, actor: &str) -> Result<(), RinglineError> {
        if call.caller_id != actor {
            return Err(RinglineError::Forbidden {
                user_id: actor.to_string(),
                call_id: call.id.clone(),
            });
        }
        Ok(())
    }

    fn check_call_type(call: &CallSession, call_type: Option<CallType>) -> Result<(), RinglineError> {
        match call_type {
            Some(requested) if requested != call.call_type => Err(RinglineError::InvalidRequest(
                format!("call {} is a {} call, not {requested}", call.id, call.call_type),
            )),
            _ => Ok(()),
        }
    }

    // --- Ringing ---

    /// Ring the recipient of a 1:1 call. An unreachable recipient makes the
    /// call `Missed` at once and the caller is told.
    pub async fn initiate_call(
        &self,
        actor: &str,
        call_id: &str,
        recipient_id: &str,
        call_type: Option<CallType>,
    ) -> Result<CallSession, RinglineError> {
        let call = self.manager.get_by_id(call_id).await?;
        Self::require_caller(&call, actor)?;
        if call.target.recipient_id() != Some(recipient_id) {
            return Err(RinglineError::InvalidRequest(format!(
                "call {call_id} is not addressed to {recipient_id}"
            )));
        }
        Self::check_call_type(&call, call_type)?;

        let ringing = self
            .manager
            .transition_from(call_id, CallStatus::Initiated, CallStatus::Ringing)
            .await?;

        let incoming = ServerEvent::IncomingCall {
            call_id: call_id.to_string(),
            caller_id: actor.to_string(),
            call_type: call.call_type,
        };
        match self.notifier.send(recipient_id, &incoming).await {
            Delivery::Delivered => {
                self.arm_ring_timer(call_id);
                info!(call_id, caller_id = actor, recipient_id, "call ringing");
                Ok(ringing)
            }
            outcome => {
                let missed = self
                    .manager
                    .transition_from(call_id, CallStatus::Ringing, CallStatus::Missed)
                    .await?;
                info!(call_id, recipient_id, outcome = %outcome, "recipient unreachable, call missed");
                let event = ServerEvent::CallMissed {
                    call_id: call_id.to_string(),
                    reason: "recipient_offline".to_string(),
                };
                self.notifier.send(actor, &event).await;
                Ok(missed)
            }
        }
    }

    /// Ring every group member on the roster. The caller's join commits the
    /// call; offline members are skipped.
    pub async fn initiate_group_call(
        &self,
        actor: &str,
        call_id: &str,
        group_id: &str,
        call_type: Option<CallType>,
    ) -> Result<FanoutReport, RinglineError> {
        let call = self.manager.get_by_id(call_id).await?;
        Self::require_caller(&call, actor)?;
        if call.target.group_id() != Some(group_id) {
            return Err(RinglineError::InvalidRequest(format!(
                "call {call_id} is not for group {group_id}"
            )));
        }
        Self::check_call_type(&call, call_type)?;

        self.manager
            .transition_from(call_id, CallStatus::Initiated, CallStatus::Ringing)
            .await?;
        self.manager.join_call(call_id, actor).await?;

        let roster = self.manager.get_participants(call_id).await?;
        let incoming = ServerEvent::IncomingGroupCall {
            call_id: call_id.to_string(),
            caller_id: actor.to_string(),
            group_id: group_id.to_string(),
            call_type: call.call_type,
        };
        let invitees: Vec<&str> = roster
            .iter()
            .map(|p| p.user_id.as_str())
            .filter(|user| *user != actor)
            .collect();
        let report = self.notifier.fanout(&invitees, &incoming).await;
        info!(
            call_id,
            group_id,
            delivered = report.delivered.len(),
            offline = report.offline.len(),
            "group call ringing"
        );
        Ok(report)
    }

    fn arm_ring_timer(&self, call_id: &str) {
        let manager = Arc::clone(&self.manager);
        let notifier = self.notifier.clone();
        let id = call_id.to_string();
        self.timers
            .arm(call_id, async move { expire_call(&manager, &notifier, &id).await });
    }

    // --- Offer / answer / ICE ---

    /// Both users must be on the roster of a live call.
    async fn require_live_peers(
        &self,
        call_id: &str,
        actor: &str,
        target: &str,
    ) -> Result<CallSession, RinglineError> {
        let call = self.manager.load_for_member(call_id, actor).await?;
        if !call.is_live() {
            return Err(RinglineError::InvalidRequest(format!(
                "call {call_id} is {}",
                call.status
            )));
        }
        if !self.manager.is_participant(call_id, target).await? {
            return Err(RinglineError::Forbidden {
                user_id: target.to_string(),
                call_id: call_id.to_string(),
            });
        }
        Ok(call)
    }

    pub async fn send_offer(
        &self,
        actor: &str,
        call_id: &str,
        target: &str,
        payload: serde_json::Value,
    ) -> Result<(), RinglineError> {
        self.require_live_peers(call_id, actor, target).await?;
        let event = ServerEvent::ReceiveOffer {
            call_id: call_id.to_string(),
            from_user_id: actor.to_string(),
            payload,
        };
        match self.notifier.send(target, &event).await {
            Delivery::Delivered => Ok(()),
            _ => Err(RinglineError::TargetOffline {
                user_id: target.to_string(),
            }),
        }
    }

    /// Commit the answer (answerer joins, the call goes `Ongoing`), then
    /// forward it to the offerer. Nothing is committed if the offerer is
    /// already offline.
    pub async fn send_answer(
        &self,
        actor: &str,
        call_id: &str,
        target: &str,
        payload: serde_json::Value,
    ) -> Result<JoinOutcome, RinglineError> {
        self.require_live_peers(call_id, actor, target).await?;
        if !self.notifier.presence().is_online(target) {
            return Err(RinglineError::TargetOffline {
                user_id: target.to_string(),
            });
        }

        let outcome = self.manager.commit_answer(call_id, actor, target).await?;
        self.timers.cancel(call_id);

        let event = ServerEvent::ReceiveAnswer {
            call_id: call_id.to_string(),
            from_user_id: actor.to_string(),
            payload,
        };
        if self.notifier.send(target, &event).await != Delivery::Delivered {
            warn!(call_id, target, "answer committed but offerer went away");
        }
        Ok(outcome)
    }

    /// ICE candidates to an offline peer are dropped without error.
    pub async fn send_ice_candidate(
        &self,
        actor: &str,
        call_id: &str,
        target: &str,
        payload: serde_json::Value,
    ) -> Result<Delivery, RinglineError> {
        self.require_live_peers(call_id, actor, target).await?;
        let event = ServerEvent::ReceiveIceCandidate {
            call_id: call_id.to_string(),
            from_user_id: actor.to_string(),
            payload,
        };
        Ok(self.notifier.send(target, &event).await)
    }

    // --- Call control ---

    pub async fn decline_call(&self, actor: &str, call_id: &str) -> Result<DeclineOutcome, RinglineError> {
        let outcome = self.manager.decline_call(call_id, actor).await?;
        if outcome.changed {
            self.timers.cancel(call_id);
        }
        let event = ServerEvent::CallDeclined {
            call_id: call_id.to_string(),
            user_id: actor.to_string(),
        };
        self.notifier.send(&outcome.call.caller_id, &event).await;
        Ok(outcome)
    }

    pub async fn end_call(&self, actor: &str, call_id: &str) -> Result<EndOutcome, RinglineError> {
        let outcome = self.manager.end_call(call_id, actor).await?;
        self.timers.cancel(call_id);
        if outcome.changed {
            let event = ServerEvent::CallEnded {
                call_id: call_id.to_string(),
                user_id: actor.to_string(),
            };
            self.notifier
                .fanout(&not_left_except(&outcome.roster, actor), &event)
                .await;
        }
        Ok(outcome)
    }

    /// Join, tell the others, and send the joiner the current active list.
    pub async fn join_call(&self, actor: &str, call_id: &str) -> Result<JoinOutcome, RinglineError> {
        let outcome = self.manager.join_call(call_id, actor).await?;
        self.timers.cancel(call_id);

        let roster = match self.manager.get_participants(call_id).await {
            Ok(roster) => roster,
            Err(e) => {
                warn!(call_id, error = %e, "joined, but roster reload failed; peers not notified");
                return Ok(outcome);
            }
        };
        let joined = ServerEvent::UserJoinedCall {
            call_id: call_id.to_string(),
            user_id: actor.to_string(),
        };
        self.notifier.fanout(&active_except(&roster, actor), &joined).await;

        let participants = ServerEvent::CallParticipants {
            call_id: call_id.to_string(),
            user_ids: active_except(&roster, "").into_iter().map(str::to_string).collect(),
        };
        self.notifier.send(actor, &participants).await;
        Ok(outcome)
    }

    /// Leave, tell the remaining participants, and if that ended the call
    /// tell anyone still being rung.
    pub async fn leave_call(&self, actor: &str, call_id: &str) -> Result<LeaveOutcome, RinglineError> {
        let outcome = self.manager.leave_call(call_id, actor).await?;
        if !outcome.changed {
            return Ok(outcome);
        }
        self.timers.cancel(call_id);

        let left = ServerEvent::UserLeftCall {
            call_id: call_id.to_string(),
            user_id: actor.to_string(),
        };
        let remaining: Vec<&str> = outcome.remaining_active.iter().map(String::as_str).collect();
        self.notifier.fanout(&remaining, &left).await;

        if outcome.ended_call {
            match self.manager.get_participants(call_id).await {
                Ok(roster) => {
                    let ended = ServerEvent::CallEnded {
                        call_id: call_id.to_string(),
                        user_id: actor.to_string(),
                    };
                    self.notifier.fanout(&not_left_except(&roster, actor), &ended).await;
                }
                Err(e) => warn!(call_id, error = %e, "call ended, but roster reload failed"),
            }
        }
        Ok(outcome)
    }

    /// Status change on behalf of a roster member. Terminal statuses are
    /// announced to everyone still on the call.
    pub async fn update_status(
        &self,
        actor: &str,
        call_id: &str,
        status: CallStatus,
    ) -> Result<CallSession, RinglineError> {
        self.manager.load_for_member(call_id, actor).await?;
        let roster = self.manager.get_participants(call_id).await?;
        let call = self.manager.update_status(call_id, status).await?;
        if status != CallStatus::Ringing {
            self.timers.cancel(call_id);
        }

        if status.is_terminal() {
            let call_id = call_id.to_string();
            let user_id = actor.to_string();
            let event = match status {
                CallStatus::Declined => ServerEvent::CallDeclined { call_id, user_id },
                CallStatus::Missed => ServerEvent::CallMissed {
                    call_id,
                    reason: "status_update".to_string(),
                },
                _ => ServerEvent::CallEnded { call_id, user_id },
            };
            self.notifier.fanout(&not_left_except(&roster, actor), &event).await;
        }
        Ok(call)
    }

    // --- In-call relays ---

    async fn relay_to_call(
        &self,
        actor: &str,
        call_id: &str,
        event: ServerEvent,
    ) -> Result<FanoutReport, RinglineError> {
        self.manager.load_for_member(call_id, actor).await?;
        let roster = self.manager.get_participants(call_id).await?;
        let report = self.notifier.fanout(&active_except(&roster, actor), &event).await;
        debug!(
            call_id,
            event = event.kind(),
            delivered = report.delivered.len(),
            missed = report.missed(),
            "in-call event relayed"
        );
        Ok(report)
    }

    pub async fn set_audio_muted(
        &self,
        actor: &str,
        call_id: &str,
        muted: bool,
    ) -> Result<FanoutReport, RinglineError> {
        let event = ServerEvent::UserAudioState {
            call_id: call_id.to_string(),
            user_id: actor.to_string(),
            muted,
        };
        self.relay_to_call(actor, call_id, event).await
    }

    pub async fn set_video_muted(
        &self,
        actor: &str,
        call_id: &str,
        muted: bool,
    ) -> Result<FanoutReport, RinglineError> {
        let event = ServerEvent::UserVideoState {
            call_id: call_id.to_string(),
            user_id: actor.to_string(),
            muted,
        };
        self.relay_to_call(actor, call_id, event).await
    }

    pub async fn set_screen_sharing(
        &self,
        actor: &str,
        call_id: &str,
        sharing: bool,
    ) -> Result<FanoutReport, RinglineError> {
        let call_id_owned = call_id.to_string();
        let user_id = actor.to_string();
        let event = if sharing {
            ServerEvent::UserStartedScreenSharing {
                call_id: call_id_owned,
                user_id,
            }
        } else {
            ServerEvent::UserStoppedScreenSharing {
                call_id: call_id_owned,
                user_id,
            }
        };
        self.relay_to_call(actor, call_id, event).await
    }

    pub async fn send_call_message(
        &self,
        actor: &str,
        call_id: &str,
        message: &str,
    ) -> Result<FanoutReport, RinglineError> {
        if message.trim().is_empty() {
            return Err(RinglineError::InvalidRequest("message must not be empty".to_string()));
        }
        let event = ServerEvent::CallMessage {
            call_id: call_id.to_string(),
            user_id: actor.to_string(),
            message: message.to_string(),
            sent_at: now_millis(),
        };
        self.relay_to_call(actor, call_id, event).await
    }

    // --- Presence queries ---

    pub fn online_status(&self, user_id: &str) -> ServerEvent {
        ServerEvent::UserOnlineStatus {
            user_id: user_id.to_string(),
            online: self.notifier.presence().is_online(user_id),
        }
    }

    pub fn online_users(&self) -> ServerEvent {
        ServerEvent::OnlineUsers {
            user_ids: self.notifier.presence().snapshot(),
        }
    }
}

/// Ring timeout: mark the call missed and tell the whole roster.
async fn expire_call(manager: &CallSessionManager, notifier: &Notifier, call_id: &str) {
    match manager.expire_ringing(call_id).await {
        Ok(Some(_)) => {
            let roster = match manager.get_participants(call_id).await {
                Ok(roster) => roster,
                Err(e) => {
                    warn!(call_id, error = %e, "call missed, but roster reload failed");
                    return;
                }
            };
            let event = ServerEvent::CallMissed {
                call_id: call_id.to_string(),
                reason: "no_answer".to_string(),
            };
            let targets: Vec<&str> = roster.iter().map(|p| p.user_id.as_str()).collect();
            let report = notifier.fanout(&targets, &event).await;
            info!(call_id, notified = report.delivered.len(), "unanswered call marked missed");
        }
        Ok(None) => debug!(call_id, "ring timeout after call moved on"),
        Err(e) => warn!(call_id, error = %e, "ring timeout failed"),
    }
}
