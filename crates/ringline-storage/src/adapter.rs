// SPDX-FileCopyrightText: 2026 Ringline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the CallStore trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use ringline_config::model::StorageConfig;
use ringline_core::types::{
    CallSession, CallStatus, JoinOutcome, LeaveOutcome, Participant, now_millis,
};
use ringline_core::{AdapterType, CallStore, HealthStatus, PluginAdapter, RinglineError};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed call store.
///
/// The database is opened lazily by [`CallStore::initialize`]; every other
/// method fails with a storage error until then.
pub struct SqliteCallStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteCallStore {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, RinglineError> {
        self.db.get().ok_or_else(|| RinglineError::Storage {
            source: "call store not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteCallStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Store
    }

    async fn health_check(&self) -> Result<HealthStatus, RinglineError> {
        let db = match self.db() {
            Ok(db) => db,
            Err(_) => return Ok(HealthStatus::Unhealthy("not initialized".into())),
        };
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RinglineError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl CallStore for SqliteCallStore {
    async fn initialize(&self) -> Result<(), RinglineError> {
        let path = self.config.database_path.clone();
        let db = Database::open_with(&path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| RinglineError::Storage {
            source: "call store already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite call store initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), RinglineError> {
        self.db()?.checkpoint().await
    }

    // --- Calls ---

    async fn insert_call(
        &self,
        call: &CallSession,
        roster: &[Participant],
    ) -> Result<(), RinglineError> {
        queries::calls::insert_call(self.db()?, call, roster).await
    }

    async fn get_call(&self, call_id: &str) -> Result<Option<CallSession>, RinglineError> {
        queries::calls::get_call(self.db()?, call_id).await
    }

    async fn active_call_for_user(
        &self,
        user_id: &str,
    ) -> Result<Option<CallSession>, RinglineError> {
        queries::calls::active_call_for_user(self.db()?, user_id).await
    }

    async fn call_history(
        &self,
        user_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<CallSession>, RinglineError> {
        queries::calls::call_history(self.db()?, user_id, limit, offset).await
    }

    async fn missed_calls(&self, user_id: &str) -> Result<Vec<CallSession>, RinglineError> {
        queries::calls::missed_calls(self.db()?, user_id).await
    }

    async fn calls_with_status(
        &self,
        statuses: &[CallStatus],
    ) -> Result<Vec<CallSession>, RinglineError> {
        queries::calls::calls_with_status(self.db()?, statuses).await
    }

    async fn transition(
        &self,
        call_id: &str,
        expected: Option<CallStatus>,
        to: CallStatus,
        at: i64,
    ) -> Result<CallSession, RinglineError> {
        queries::calls::transition(self.db()?, call_id, expected, to, at).await
    }

    // --- Participants ---

    async fn join(
        &self,
        call_id: &str,
        user_ids: &[String],
        at: i64,
    ) -> Result<JoinOutcome, RinglineError> {
        queries::participants::join(self.db()?, call_id, user_ids, at).await
    }

    async fn leave(
        &self,
        call_id: &str,
        user_id: &str,
        at: i64,
    ) -> Result<LeaveOutcome, RinglineError> {
        queries::participants::leave(self.db()?, call_id, user_id, at).await
    }

    async fn get_participant(
        &self,
        call_id: &str,
        user_id: &str,
    ) -> Result<Option<Participant>, RinglineError> {
        queries::participants::get_participant(self.db()?, call_id, user_id).await
    }

    async fn list_participants(&self, call_id: &str) -> Result<Vec<Participant>, RinglineError> {
        queries::participants::list_participants(self.db()?, call_id).await
    }

    // --- Groups ---

    async fn group_members(&self, group_id: &str) -> Result<Vec<String>, RinglineError> {
        queries::groups::group_members(self.db()?, group_id).await
    }

    async fn add_group_member(&self, group_id: &str, user_id: &str) -> Result<(), RinglineError> {
        queries::groups::add_member(self.db()?, group_id, user_id, now_millis()).await
    }

    async fn remove_group_member(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> Result<bool, RinglineError> {
        queries::groups::remove_member(self.db()?, group_id, user_id).await
    }
}
