// SPDX-FileCopyrightText: 2026 Ringline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The call session manager: creation, status changes, join and leave.

use std::sync::Arc;

use tracing::{debug, info, warn};

use ringline_config::model::CallsConfig;
use ringline_core::types::{
    CallDetails, CallSession, CallStatus, CallType, JoinOutcome, LeaveOutcome, Participant,
    now_millis,
};
use ringline_core::{CallStore, RinglineError};

use crate::locks::KeyedLocks;

/// Result of [`CallSessionManager::end_call`].
#[derive(Debug, Clone)]
pub struct EndOutcome {
    pub call: CallSession,
    /// False when the call was already terminal.
    pub changed: bool,
    /// Status before the end was applied.
    pub previous: CallStatus,
    /// Roster as it was before the end was applied.
    pub roster: Vec<Participant>,
}

/// Result of [`CallSessionManager::decline_call`].
#[derive(Debug, Clone)]
pub struct DeclineOutcome {
    pub call: CallSession,
    /// True when the decline moved a 1:1 call to `Declined`. Group declines
    /// leave the call running.
    pub changed: bool,
}

/// Owns the call lifecycle. All mutations go through here.
pub struct CallSessionManager {
    store: Arc<dyn CallStore>,
    call_locks: KeyedLocks,
    user_locks: KeyedLocks,
    max_page_size: u32,
}

fn require_user_id(field: &str, value: &str) -> Result<(), RinglineError> {
    if value.trim().is_empty() {
        return Err(RinglineError::InvalidRequest(format!("{field} must not be empty")));
    }
    Ok(())
}

impl CallSessionManager {
    pub fn new(store: Arc<dyn CallStore>, config: &CallsConfig) -> Self {
        Self {
            store,
            call_locks: KeyedLocks::new(),
            user_locks: KeyedLocks::new(),
            max_page_size: config.max_page_size.max(1),
        }
    }

    pub fn store(&self) -> &Arc<dyn CallStore> {
        &self.store
    }

    // --- Creation ---

    /// Create a 1:1 call in `Initiated` with both roster rows unjoined.
    pub async fn create_call(
        &self,
        caller_id: &str,
        recipient_id: &str,
        call_type: CallType,
    ) -> Result<CallSession, RinglineError> {
        require_user_id("caller_id", caller_id)?;
        require_user_id("recipient_id", recipient_id)?;
        if caller_id == recipient_id {
            return Err(RinglineError::InvalidRequest(
                "caller and recipient must differ".to_string(),
            ));
        }

        let _guard = self.user_locks.lock_many(&[caller_id, recipient_id]).await;
        let call = CallSession::direct(caller_id, recipient_id, call_type, now_millis());
        let roster = [
            Participant::invited(&call.id, caller_id),
            Participant::invited(&call.id, recipient_id),
        ];
        self.store.insert_call(&call, &roster).await?;

        ringline_prometheus::record_call_created("direct");
        info!(call_id = %call.id, caller_id, recipient_id, call_type = %call.call_type, "call created");
        Ok(call)
    }

    /// Create a group call. The roster is a snapshot of the group taken now;
    /// the caller's row starts joined.
    pub async fn create_group_call(
        &self,
        caller_id: &str,
        group_id: &str,
        call_type: CallType,
    ) -> Result<CallDetails, RinglineError> {
        require_user_id("caller_id", caller_id)?;
        require_user_id("group_id", group_id)?;

        let _guard = self.user_locks.lock(caller_id).await;
        let members = self.store.group_members(group_id).await?;
        if !members.iter().any(|m| m == caller_id) {
            return Err(RinglineError::Forbidden {
                user_id: caller_id.to_string(),
                call_id: format!("group:{group_id}"),
            });
        }
        if members.len() < 2 {
            return Err(RinglineError::InvalidRequest(format!(
                "group {group_id} has no other members"
            )));
        }

        let now = now_millis();
        let call = CallSession::group(caller_id, group_id, call_type, now);
        let participants: Vec<Participant> = members
            .iter()
            .map(|member| {
                if member == caller_id {
                    Participant::joined(&call.id, member, now)
                } else {
                    Participant::invited(&call.id, member)
                }
            })
            .collect();
        self.store.insert_call(&call, &participants).await?;

        ringline_prometheus::record_call_created("group");
        info!(
            call_id = %call.id,
            caller_id,
            group_id,
            roster = participants.len(),
            "group call created"
        );
        Ok(CallDetails { call, participants })
    }

    // --- Status ---

    /// Move a call to `status`, validated against the lifecycle table.
    pub async fn update_status(
        &self,
        call_id: &str,
        status: CallStatus,
    ) -> Result<CallSession, RinglineError> {
        let _guard = self.call_locks.lock(call_id).await;
        self.apply_transition(call_id, None, status).await
    }

    /// Like [`update_status`](Self::update_status), but only if the call is
    /// currently in `expected`.
    pub async fn transition_from(
        &self,
        call_id: &str,
        expected: CallStatus,
        to: CallStatus,
    ) -> Result<CallSession, RinglineError> {
        let _guard = self.call_locks.lock(call_id).await;
        self.apply_transition(call_id, Some(expected), to).await
    }

    async fn apply_transition(
        &self,
        call_id: &str,
        expected: Option<CallStatus>,
        to: CallStatus,
    ) -> Result<CallSession, RinglineError> {
        let call = self
            .store
            .transition(call_id, expected, to, now_millis())
            .await?;
        ringline_prometheus::record_transition(to);
        info!(call_id, status = %to, "call status changed");
        Ok(call)
    }

    /// Ring timeout: `Ringing -> Missed`. Returns `None` when the call has
    /// already moved on (answered, declined, ended) or no longer exists.
    pub async fn expire_ringing(
        &self,
        call_id: &str,
    ) -> Result<Option<CallSession>, RinglineError> {
        match self
            .transition_from(call_id, CallStatus::Ringing, CallStatus::Missed)
            .await
        {
            Ok(call) => Ok(Some(call)),
            Err(RinglineError::InvalidTransition { .. } | RinglineError::CallNotFound { .. }) => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// End a call on behalf of a roster member. Ending a terminal call
    /// returns it unchanged.
    pub async fn end_call(&self, call_id: &str, actor_id: &str) -> Result<EndOutcome, RinglineError> {
        let _guard = self.call_locks.lock(call_id).await;
        let call = self.load_for_member(call_id, actor_id).await?;
        let roster = self.store.list_participants(call_id).await?;
        let previous = call.status;

        if previous.is_terminal() {
            debug!(call_id, status = %previous, "end on terminal call ignored");
            return Ok(EndOutcome {
                call,
                changed: false,
                previous,
                roster,
            });
        }

        match self.apply_transition(call_id, None, CallStatus::Ended).await {
            Ok(call) => Ok(EndOutcome {
                call,
                changed: true,
                previous,
                roster,
            }),
            Err(RinglineError::InvalidTransition { from, .. }) if from.is_terminal() => {
                let call = self.get_by_id(call_id).await?;
                Ok(EndOutcome {
                    call,
                    changed: false,
                    previous: from,
                    roster,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Decline by an invitee. A 1:1 recipient's decline moves the call to
    /// `Declined`; a group member's decline changes nothing.
    pub async fn decline_call(
        &self,
        call_id: &str,
        user_id: &str,
    ) -> Result<DeclineOutcome, RinglineError> {
        let _guard = self.call_locks.lock(call_id).await;
        let call = self.load_for_member(call_id, user_id).await?;
        if call.caller_id == user_id {
            return Err(RinglineError::Forbidden {
                user_id: user_id.to_string(),
                call_id: call_id.to_string(),
            });
        }

        if call.target.is_group() {
            debug!(call_id, user_id, "group call declined by member");
            return Ok(DeclineOutcome {
                call,
                changed: false,
            });
        }

        let call = self
            .apply_transition(call_id, None, CallStatus::Declined)
            .await?;
        Ok(DeclineOutcome {
            call,
            changed: true,
        })
    }

    // --- Roster ---

    /// Mark the user joined; the first join commits the call to `Ongoing`.
    pub async fn join_call(&self, call_id: &str, user_id: &str) -> Result<JoinOutcome, RinglineError> {
        require_user_id("user_id", user_id)?;
        let _guard = self.call_locks.lock(call_id).await;
        let outcome = self
            .store
            .join(call_id, &[user_id.to_string()], now_millis())
            .await?;
        self.record_join(&outcome);
        debug!(call_id, user_id, promoted = outcome.promoted, "user joined call");
        Ok(outcome)
    }

    /// An answer commits the answerer, and on a 1:1 call the offerer too,
    /// in one store transaction.
    pub async fn commit_answer(
        &self,
        call_id: &str,
        answerer_id: &str,
        offerer_id: &str,
    ) -> Result<JoinOutcome, RinglineError> {
        let _guard = self.call_locks.lock(call_id).await;
        let call = self.load_for_member(call_id, answerer_id).await?;

        let mut users = vec![answerer_id.to_string()];
        if !call.target.is_group() && offerer_id != answerer_id {
            users.push(offerer_id.to_string());
        }
        let outcome = self.store.join(call_id, &users, now_millis()).await?;
        self.record_join(&outcome);
        debug!(call_id, answerer_id, offerer_id, "answer committed");
        Ok(outcome)
    }

    fn record_join(&self, outcome: &JoinOutcome) {
        if outcome.promoted {
            ringline_prometheus::record_transition(CallStatus::Ongoing);
            info!(call_id = %outcome.call.id, status = %CallStatus::Ongoing, "call status changed");
        }
    }

    /// Stamp the user's leave; the last active participant leaving ends
    /// the call. Leaving twice is a no-op.
    pub async fn leave_call(&self, call_id: &str, user_id: &str) -> Result<LeaveOutcome, RinglineError> {
        let _guard = self.call_locks.lock(call_id).await;
        let outcome = self.store.leave(call_id, user_id, now_millis()).await?;
        if outcome.ended_call {
            ringline_prometheus::record_transition(CallStatus::Ended);
            info!(call_id, user_id, status = %CallStatus::Ended, "last participant left, call ended");
        } else if outcome.changed {
            debug!(call_id, user_id, remaining = outcome.remaining_active.len(), "user left call");
        }
        Ok(outcome)
    }

    /// Close every call a previous process left non-terminal: ringing calls
    /// become `Missed`, the rest `Ended`.
    pub async fn reconcile_stale_calls(&self) -> Result<usize, RinglineError> {
        let stale = self.store.calls_with_status(&CallStatus::LIVE).await?;
        let mut closed = 0;
        for call in stale {
            let to = if call.status == CallStatus::Ringing {
                CallStatus::Missed
            } else {
                CallStatus::Ended
            };
            match self.transition_from(&call.id, call.status, to).await {
                Ok(_) => closed += 1,
                Err(e) => warn!(call_id = %call.id, error = %e, "failed to reconcile stale call"),
            }
        }
        if closed > 0 {
            info!(closed, "reconciled stale calls from previous run");
        }
        Ok(closed)
    }

    // --- Queries ---

    pub async fn get_by_id(&self, call_id: &str) -> Result<CallSession, RinglineError> {
        self.store
            .get_call(call_id)
            .await?
            .ok_or_else(|| RinglineError::CallNotFound {
                call_id: call_id.to_string(),
            })
    }

    /// The call and its roster; `Forbidden` unless `user_id` is on it.
    pub async fn load_for_member(
        &self,
        call_id: &str,
        user_id: &str,
    ) -> Result<CallSession, RinglineError> {
        let call = self.get_by_id(call_id).await?;
        if self.store.get_participant(call_id, user_id).await?.is_none() {
            return Err(RinglineError::Forbidden {
                user_id: user_id.to_string(),
                call_id: call_id.to_string(),
            });
        }
        Ok(call)
    }

    pub async fn get_active_call_for_user(
        &self,
        user_id: &str,
    ) -> Result<Option<CallSession>, RinglineError> {
        self.store.active_call_for_user(user_id).await
    }

    /// One page of the user's calls, newest first. `page` is 1-based;
    /// `page_size` is clamped to `1..=max_page_size`.
    pub async fn get_history(
        &self,
        user_id: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<CallSession>, RinglineError> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, self.max_page_size);
        let offset = (page - 1).saturating_mul(page_size);
        self.store.call_history(user_id, page_size, offset).await
    }

    pub async fn missed_calls(&self, user_id: &str) -> Result<Vec<CallSession>, RinglineError> {
        self.store.missed_calls(user_id).await
    }

    pub async fn get_participants(&self, call_id: &str) -> Result<Vec<Participant>, RinglineError> {
        self.get_by_id(call_id).await?;
        self.store.list_participants(call_id).await
    }

    pub async fn get_participant(
        &self,
        call_id: &str,
        user_id: &str,
    ) -> Result<Option<Participant>, RinglineError> {
        self.store.get_participant(call_id, user_id).await
    }

    /// Whether the user has a roster row on the call.
    pub async fn is_participant(&self, call_id: &str, user_id: &str) -> Result<bool, RinglineError> {
        Ok(self.store.get_participant(call_id, user_id).await?.is_some())
    }

    pub async fn call_details(&self, call_id: &str) -> Result<CallDetails, RinglineError> {
        let call = self.get_by_id(call_id).await?;
        let participants = self.store.list_participants(call_id).await?;
        Ok(CallDetails { call, participants })
    }

    // --- Group directory ---

    pub async fn group_members(&self, group_id: &str) -> Result<Vec<String>, RinglineError> {
        self.store.group_members(group_id).await
    }

    pub async fn add_group_member(&self, group_id: &str, user_id: &str) -> Result<(), RinglineError> {
        require_user_id("group_id", group_id)?;
        require_user_id("user_id", user_id)?;
        self.store.add_group_member(group_id, user_id).await
    }

    pub async fn remove_group_member(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> Result<bool, RinglineError> {
        self.store.remove_group_member(group_id, user_id).await
    }
}
