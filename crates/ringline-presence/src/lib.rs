// SPDX-FileCopyrightText: 2026 Ringline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Presence registry: which user is reachable on which connection.
//!
//! Backed by a sharded [`DashMap`], so register/unregister/lookup for
//! different users never contend on one lock. Each registration is stamped
//! with a process-wide generation number; disconnect handling uses it to
//! make sure a stale socket never evicts a newer connection of the same user.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::Serialize;
use tracing::debug;

use ringline_core::types::now_millis;

/// A user's current registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresenceEntry {
    pub connection_id: String,
    pub generation: u64,
    pub connected_at: i64,
}

/// Result of [`PresenceRegistry::register`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceLease {
    /// Generation to present when this connection goes away.
    pub generation: u64,
    /// The registration this one overwrote, if any.
    pub replaced: Option<PresenceEntry>,
}

/// userId -> connection, last registration wins.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    entries: DashMap<String, PresenceEntry>,
    next_generation: AtomicU64,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert the user's connection, overwriting any previous one.
    pub fn register(&self, user_id: &str, connection_id: &str) -> PresenceLease {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
        let entry = PresenceEntry {
            connection_id: connection_id.to_string(),
            generation,
            connected_at: now_millis(),
        };
        let replaced = self.entries.insert(user_id.to_string(), entry);
        if let Some(old) = &replaced {
            debug!(
                user_id,
                connection_id,
                replaced_connection_id = %old.connection_id,
                "presence registration replaced"
            );
        }
        PresenceLease {
            generation,
            replaced,
        }
    }

    /// Remove the user unconditionally.
    pub fn unregister(&self, user_id: &str) -> Option<PresenceEntry> {
        self.entries.remove(user_id).map(|(_, entry)| entry)
    }

    /// Remove the user only if `generation` is still the registered one.
    ///
    /// The check and the removal happen under the shard lock, so of several
    /// racing callers holding the same generation exactly one gets `true`.
    pub fn unregister_if(&self, user_id: &str, generation: u64) -> bool {
        self.entries
            .remove_if(user_id, |_, entry| entry.generation == generation)
            .is_some()
    }

    pub fn lookup(&self, user_id: &str) -> Option<String> {
        self.entries
            .get(user_id)
            .map(|entry| entry.connection_id.clone())
    }

    pub fn entry(&self, user_id: &str) -> Option<PresenceEntry> {
        self.entries.get(user_id).map(|entry| entry.clone())
    }

    /// Whether `generation` still owns the user's registration.
    pub fn is_current(&self, user_id: &str, generation: u64) -> bool {
        self.entries
            .get(user_id)
            .is_some_and(|entry| entry.generation == generation)
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.entries.contains_key(user_id)
    }

    /// Online user ids, sorted.
    pub fn snapshot(&self) -> Vec<String> {
        let mut users: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        users.sort();
        users
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
