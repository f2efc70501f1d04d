// SPDX-FileCopyrightText: 2026 Ringline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable call store trait.

use async_trait::async_trait;

use crate::error::RinglineError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{CallSession, CallStatus, JoinOutcome, LeaveOutcome, Participant};

/// Durable storage for calls, rosters and the group directory.
///
/// Every mutating method is a single atomic read-modify-write: the checks it
/// documents and the write it performs commit together or not at all.
#[async_trait]
pub trait CallStore: PluginAdapter {
    /// Opens the backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), RinglineError>;

    /// Flushes pending writes and releases the backend.
    async fn close(&self) -> Result<(), RinglineError>;

    /// Inserts a new call and its roster.
    ///
    /// Fails with `Conflict` if the caller, or the recipient of a 1:1 call,
    /// already has a live call.
    async fn insert_call(
        &self,
        call: &CallSession,
        roster: &[Participant],
    ) -> Result<(), RinglineError>;

    async fn get_call(&self, call_id: &str) -> Result<Option<CallSession>, RinglineError>;

    /// Most recent live call where the user is caller, 1:1 recipient, or an
    /// active participant.
    async fn active_call_for_user(
        &self,
        user_id: &str,
    ) -> Result<Option<CallSession>, RinglineError>;

    /// Calls the user is on the roster of, newest first.
    async fn call_history(
        &self,
        user_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<CallSession>, RinglineError>;

    /// Missed 1:1 calls addressed to the user, newest first.
    async fn missed_calls(&self, user_id: &str) -> Result<Vec<CallSession>, RinglineError>;

    async fn calls_with_status(
        &self,
        statuses: &[CallStatus],
    ) -> Result<Vec<CallSession>, RinglineError>;

    /// Moves a call to `to`, stamping `end_time` when `to` is terminal.
    ///
    /// Rejects edges outside the lifecycle table with `InvalidTransition`.
    /// When `expected` is set, the current status must equal it.
    async fn transition(
        &self,
        call_id: &str,
        expected: Option<CallStatus>,
        to: CallStatus,
        at: i64,
    ) -> Result<CallSession, RinglineError>;

    /// Marks every given user joined and promotes the call to `Ongoing`.
    ///
    /// The call must be `Ringing` or `Ongoing`. Users without a roster row
    /// get one if they belong to the call's group, otherwise `Forbidden`.
    async fn join(
        &self,
        call_id: &str,
        user_ids: &[String],
        at: i64,
    ) -> Result<JoinOutcome, RinglineError>;

    /// Stamps the user's leave time and closes the call as `Ended` when no
    /// joined participant remains.
    async fn leave(
        &self,
        call_id: &str,
        user_id: &str,
        at: i64,
    ) -> Result<LeaveOutcome, RinglineError>;

    async fn get_participant(
        &self,
        call_id: &str,
        user_id: &str,
    ) -> Result<Option<Participant>, RinglineError>;

    async fn list_participants(&self, call_id: &str) -> Result<Vec<Participant>, RinglineError>;

    async fn group_members(&self, group_id: &str) -> Result<Vec<String>, RinglineError>;

    async fn add_group_member(&self, group_id: &str, user_id: &str) -> Result<(), RinglineError>;

    async fn remove_group_member(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> Result<bool, RinglineError>;
}
