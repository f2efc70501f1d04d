// SPDX-FileCopyrightText: 2026 Ringline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Group membership, the source of group call rosters.

use rusqlite::{Connection, params};

use ringline_core::RinglineError;

use crate::database::{Database, map_tr_err};

pub(crate) fn is_member(conn: &Connection, group_id: &str, user_id: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM group_members WHERE group_id = ?1 AND user_id = ?2)",
        params![group_id, user_id],
        |row| row.get(0),
    )
}

/// Members ordered by when they were added.
pub async fn group_members(db: &Database, group_id: &str) -> Result<Vec<String>, RinglineError> {
    let group_id = group_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id FROM group_members WHERE group_id = ?1 ORDER BY added_at, rowid",
            )?;
            let rows = stmt.query_map(params![group_id], |row| row.get(0))?;
            rows.collect::<rusqlite::Result<Vec<String>>>()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn add_member(
    db: &Database,
    group_id: &str,
    user_id: &str,
    at: i64,
) -> Result<(), RinglineError> {
    let group_id = group_id.to_string();
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO group_members (group_id, user_id, added_at) VALUES (?1, ?2, ?3)",
                params![group_id, user_id, at],
            )
        })
        .await
        .map_err(map_tr_err)?;
    Ok(())
}

/// Returns whether a membership row was removed.
pub async fn remove_member(
    db: &Database,
    group_id: &str,
    user_id: &str,
) -> Result<bool, RinglineError> {
    let group_id = group_id.to_string();
    let user_id = user_id.to_string();
    let removed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM group_members WHERE group_id = ?1 AND user_id = ?2",
                params![group_id, user_id],
            )
        })
        .await
        .map_err(map_tr_err)?;
    Ok(removed > 0)
}
