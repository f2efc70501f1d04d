// SPDX-FileCopyrightText: 2026 Ringline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store wrapper that fails selected writes on demand.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use ringline_core::types::{CallSession, CallStatus, JoinOutcome, LeaveOutcome, Participant};
use ringline_core::{AdapterType, CallStore, HealthStatus, PluginAdapter, RinglineError};

/// Store writes that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Transition,
    Join,
    Leave,
}

/// Forwards to an inner [`CallStore`]. Operations marked with
/// [`fail`](Self::fail) return `Storage` without touching the inner store.
pub struct FailingStore {
    inner: Arc<dyn CallStore>,
    failing: Mutex<HashSet<StoreOp>>,
}

impl FailingStore {
    pub fn new(inner: Arc<dyn CallStore>) -> Self {
        Self {
            inner,
            failing: Mutex::new(HashSet::new()),
        }
    }

    pub async fn fail(&self, op: StoreOp) {
        self.failing.lock().await.insert(op);
    }

    pub async fn recover(&self, op: StoreOp) {
        self.failing.lock().await.remove(&op);
    }

    async fn check(&self, op: StoreOp) -> Result<(), RinglineError> {
        if self.failing.lock().await.contains(&op) {
            return Err(RinglineError::Storage {
                source: format!("injected {op:?} failure").into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for FailingStore {
    fn name(&self) -> &str {
        "failing-store"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Store
    }

    async fn health_check(&self) -> Result<HealthStatus, RinglineError> {
        self.inner.health_check().await
    }

    async fn shutdown(&self) -> Result<(), RinglineError> {
        self.inner.shutdown().await
    }
}

#[async_trait]
impl CallStore for FailingStore {
    async fn initialize(&self) -> Result<(), RinglineError> {
        self.inner.initialize().await
    }

    async fn close(&self) -> Result<(), RinglineError> {
        self.inner.close().await
    }

    async fn insert_call(
        &self,
        call: &CallSession,
        roster: &[Participant],
    ) -> Result<(), RinglineError> {
        self.inner.insert_call(call, roster).await
    }

    async fn get_call(&self, call_id: &str) -> Result<Option<CallSession>, RinglineError> {
        self.inner.get_call(call_id).await
    }

    async fn active_call_for_user(
        &self,
        user_id: &str,
    ) -> Result<Option<CallSession>, RinglineError> {
        self.inner.active_call_for_user(user_id).await
    }

    async fn call_history(
        &self,
        user_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<CallSession>, RinglineError> {
        self.inner.call_history(user_id, limit, offset).await
    }

    async fn missed_calls(&self, user_id: &str) -> Result<Vec<CallSession>, RinglineError> {
        self.inner.missed_calls(user_id).await
    }

    async fn calls_with_status(
        &self,
        statuses: &[CallStatus],
    ) -> Result<Vec<CallSession>, RinglineError> {
        self.inner.calls_with_status(statuses).await
    }

    async fn transition(
        &self,
        call_id: &str,
        expected: Option<CallStatus>,
        to: CallStatus,
        at: i64,
    ) -> Result<CallSession, RinglineError> {
        self.check(StoreOp::Transition).await?;
        self.inner.transition(call_id, expected, to, at).await
    }

    async fn join(
        &self,
        call_id: &str,
        user_ids: &[String],
        at: i64,
    ) -> Result<JoinOutcome, RinglineError> {
        self.check(StoreOp::Join).await?;
        self.inner.join(call_id, user_ids, at).await
    }

    async fn leave(
        &self,
        call_id: &str,
        user_id: &str,
        at: i64,
    ) -> Result<LeaveOutcome, RinglineError> {
        self.check(StoreOp::Leave).await?;
        self.inner.leave(call_id, user_id, at).await
    }

    async fn get_participant(
        &self,
        call_id: &str,
        user_id: &str,
    ) -> Result<Option<Participant>, RinglineError> {
        self.inner.get_participant(call_id, user_id).await
    }

    async fn list_participants(&self, call_id: &str) -> Result<Vec<Participant>, RinglineError> {
        self.inner.list_participants(call_id).await
    }

    async fn group_members(&self, group_id: &str) -> Result<Vec<String>, RinglineError> {
        self.inner.group_members(group_id).await
    }

    async fn add_group_member(&self, group_id: &str, user_id: &str) -> Result<(), RinglineError> {
        self.inner.add_group_member(group_id, user_id).await
    }

    async fn remove_group_member(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> Result<bool, RinglineError> {
        self.inner.remove_group_member(group_id, user_id).await
    }
}
