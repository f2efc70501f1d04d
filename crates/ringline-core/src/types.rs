// SPDX-FileCopyrightText: 2026 Ringline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Call data model shared across the store, session manager and relay.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Milliseconds since the Unix epoch, the timestamp unit used throughout.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Store,
    Transport,
    Observability,
}

/// Media type of a call.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    AsRefStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CallType {
    Audio,
    Video,
}

/// Lifecycle status of a call session.
///
/// ```text
/// Initiated -> Ringing -> Ongoing -> {Ended | Declined | Missed}
///              Ringing -> {Ended | Declined | Missed}
/// Initiated -> Ended
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    AsRefStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    Initiated,
    Ringing,
    Ongoing,
    Declined,
    Ended,
    Missed,
}

impl CallStatus {
    pub const ALL: [CallStatus; 6] = [
        CallStatus::Initiated,
        CallStatus::Ringing,
        CallStatus::Ongoing,
        CallStatus::Declined,
        CallStatus::Ended,
        CallStatus::Missed,
    ];

    /// The statuses a live call can be in.
    pub const LIVE: [CallStatus; 3] = [
        CallStatus::Initiated,
        CallStatus::Ringing,
        CallStatus::Ongoing,
    ];

    /// Ended, Declined and Missed admit no further transition.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CallStatus::Ended | CallStatus::Declined | CallStatus::Missed
        )
    }

    /// Whether `self -> next` is an edge of the lifecycle table.
    pub fn can_transition_to(self, next: CallStatus) -> bool {
        use CallStatus::*;
        matches!(
            (self, next),
            (Initiated, Ringing)
                | (Initiated, Ended)
                | (Ringing, Ongoing)
                | (Ringing, Ended)
                | (Ringing, Declined)
                | (Ringing, Missed)
                | (Ongoing, Ended)
                | (Ongoing, Declined)
                | (Ongoing, Missed)
        )
    }
}

/// Who a call is addressed to: exactly one recipient or exactly one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CallTarget {
    Direct { recipient_id: String },
    Group { group_id: String },
}

impl CallTarget {
    pub fn recipient_id(&self) -> Option<&str> {
        match self {
            CallTarget::Direct { recipient_id } => Some(recipient_id),
            CallTarget::Group { .. } => None,
        }
    }

    pub fn group_id(&self) -> Option<&str> {
        match self {
            CallTarget::Group { group_id } => Some(group_id),
            CallTarget::Direct { .. } => None,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, CallTarget::Group { .. })
    }
}

/// A tracked voice/video conversation. Never deleted, only closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSession {
    pub id: String,
    pub caller_id: String,
    #[serde(flatten)]
    pub target: CallTarget,
    pub call_type: CallType,
    pub status: CallStatus,
    pub start_time: i64,
    pub end_time: Option<i64>,
}

impl CallSession {
    /// A fresh 1:1 call in `Initiated`.
    pub fn direct(caller_id: &str, recipient_id: &str, call_type: CallType, now: i64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            caller_id: caller_id.to_string(),
            target: CallTarget::Direct {
                recipient_id: recipient_id.to_string(),
            },
            call_type,
            status: CallStatus::Initiated,
            start_time: now,
            end_time: None,
        }
    }

    /// A fresh group call in `Initiated`.
    pub fn group(caller_id: &str, group_id: &str, call_type: CallType, now: i64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            caller_id: caller_id.to_string(),
            target: CallTarget::Group {
                group_id: group_id.to_string(),
            },
            call_type,
            status: CallStatus::Initiated,
            start_time: now,
            end_time: None,
        }
    }

    pub fn is_live(&self) -> bool {
        !self.status.is_terminal()
    }
}

/// A user's membership record within a call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub call_id: String,
    pub user_id: String,
    pub has_joined: bool,
    pub join_time: Option<i64>,
    pub leave_time: Option<i64>,
}

impl Participant {
    /// An invited, not yet joined roster entry.
    pub fn invited(call_id: &str, user_id: &str) -> Self {
        Self {
            call_id: call_id.to_string(),
            user_id: user_id.to_string(),
            has_joined: false,
            join_time: None,
            leave_time: None,
        }
    }

    /// A roster entry that is already in the call.
    pub fn joined(call_id: &str, user_id: &str, at: i64) -> Self {
        Self {
            has_joined: true,
            join_time: Some(at),
            ..Self::invited(call_id, user_id)
        }
    }

    /// Joined and not yet left.
    pub fn is_active(&self) -> bool {
        self.has_joined && self.leave_time.is_none()
    }
}

/// A call together with its full roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallDetails {
    pub call: CallSession,
    pub participants: Vec<Participant>,
}

impl CallDetails {
    pub fn active_user_ids(&self) -> Vec<String> {
        self.participants
            .iter()
            .filter(|p| p.is_active())
            .map(|p| p.user_id.clone())
            .collect()
    }
}

/// Result of an atomic join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinOutcome {
    /// The call after the join committed.
    pub call: CallSession,
    /// The joined rows, in the order the users were given.
    pub participants: Vec<Participant>,
    /// Whether this join moved the call to `Ongoing`.
    pub promoted: bool,
}

/// Result of an atomic leave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaveOutcome {
    /// The call after the leave committed.
    pub call: CallSession,
    pub participant: Participant,
    /// False when the participant had already left.
    pub changed: bool,
    /// Users still joined after this leave.
    pub remaining_active: Vec<String>,
    /// Whether this leave closed the call.
    pub ended_call: bool,
}

/// Outcome of a single best-effort delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Delivery {
    Delivered,
    /// Presence miss.
    Offline,
    /// The connection was registered but the transport refused the event.
    Failed,
}

/// Tally of a fan-out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FanoutReport {
    pub delivered: Vec<String>,
    pub offline: Vec<String>,
    pub failed: Vec<String>,
}

impl FanoutReport {
    pub fn record(&mut self, user_id: &str, delivery: Delivery) {
        let bucket = match delivery {
            Delivery::Delivered => &mut self.delivered,
            Delivery::Offline => &mut self.offline,
            Delivery::Failed => &mut self.failed,
        };
        bucket.push(user_id.to_string());
    }

    /// Number of targets that did not receive the event.
    pub fn missed(&self) -> usize {
        self.offline.len() + self.failed.len()
    }
}
