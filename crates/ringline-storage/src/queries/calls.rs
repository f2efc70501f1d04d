// SPDX-FileCopyrightText: 2026 Ringline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Call session reads and status transitions.

use rusqlite::{Connection, OptionalExtension, params};

use ringline_core::RinglineError;
use ringline_core::types::{CallSession, CallStatus, Participant};

use crate::database::{Database, map_tr_err};
use crate::models::{CALL_COLUMNS, call_from_row, live_status_list, status_list};
use crate::queries::TxResult;
use crate::queries::participants::insert_participant;

pub(crate) fn load_call(conn: &Connection, call_id: &str) -> rusqlite::Result<Option<CallSession>> {
    conn.query_row(
        &format!("SELECT {CALL_COLUMNS} FROM calls c WHERE c.id = ?1"),
        params![call_id],
        call_from_row,
    )
    .optional()
}

/// The user's most recent live call: as caller, as 1:1 recipient, or as a
/// joined participant who has not left.
pub(crate) fn live_call_for(conn: &Connection, user_id: &str) -> rusqlite::Result<Option<CallSession>> {
    conn.query_row(
        &format!(
            "SELECT {CALL_COLUMNS} FROM calls c
             WHERE c.status IN ({live})
               AND (c.caller_id = ?1
                    OR c.recipient_id = ?1
                    OR EXISTS (SELECT 1 FROM call_participants p
                               WHERE p.call_id = c.id AND p.user_id = ?1
                                 AND p.has_joined = 1 AND p.leave_time IS NULL))
             ORDER BY c.start_time DESC, c.rowid DESC
             LIMIT 1",
            live = live_status_list()
        ),
        params![user_id],
        call_from_row,
    )
    .optional()
}

fn collect_calls(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> rusqlite::Result<Vec<CallSession>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, call_from_row)?;
    rows.collect()
}

/// Insert a call and its roster after checking that neither the caller nor
/// a 1:1 recipient is already busy.
pub async fn insert_call(
    db: &Database,
    call: &CallSession,
    roster: &[Participant],
) -> Result<(), RinglineError> {
    let call = call.clone();
    let roster = roster.to_vec();
    db.connection()
        .call(move |conn| -> TxResult<()> {
            let tx = conn.transaction()?;

            let exclusive = std::iter::once(call.caller_id.as_str()).chain(call.target.recipient_id());
            for user_id in exclusive {
                if let Some(active) = live_call_for(&tx, user_id)? {
                    return Ok(Err(RinglineError::Conflict {
                        user_id: user_id.to_string(),
                        active_call_id: active.id,
                    }));
                }
            }

            tx.execute(
                "INSERT INTO calls (id, caller_id, recipient_id, group_id, call_type, status, start_time, end_time)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    call.id,
                    call.caller_id,
                    call.target.recipient_id(),
                    call.target.group_id(),
                    call.call_type.as_ref(),
                    call.status.as_ref(),
                    call.start_time,
                    call.end_time,
                ],
            )?;
            for participant in &roster {
                insert_participant(&tx, participant)?;
            }
            tx.commit()?;
            Ok(Ok(()))
        })
        .await
        .map_err(map_tr_err)?
}

pub async fn get_call(db: &Database, call_id: &str) -> Result<Option<CallSession>, RinglineError> {
    let call_id = call_id.to_string();
    db.connection()
        .call(move |conn| load_call(conn, &call_id))
        .await
        .map_err(map_tr_err)
}

pub async fn active_call_for_user(
    db: &Database,
    user_id: &str,
) -> Result<Option<CallSession>, RinglineError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| live_call_for(conn, &user_id))
        .await
        .map_err(map_tr_err)
}

/// Calls the user is on, newest first.
pub async fn call_history(
    db: &Database,
    user_id: &str,
    limit: u32,
    offset: u32,
) -> Result<Vec<CallSession>, RinglineError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            collect_calls(
                conn,
                &format!(
                    "SELECT {CALL_COLUMNS} FROM calls c
                     WHERE c.caller_id = ?1
                        OR c.recipient_id = ?1
                        OR EXISTS (SELECT 1 FROM call_participants p
                                   WHERE p.call_id = c.id AND p.user_id = ?1)
                     ORDER BY c.start_time DESC, c.rowid DESC
                     LIMIT ?2 OFFSET ?3"
                ),
                params![user_id, limit, offset],
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Missed 1:1 calls addressed to the user, newest first.
pub async fn missed_calls(db: &Database, user_id: &str) -> Result<Vec<CallSession>, RinglineError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            collect_calls(
                conn,
                &format!(
                    "SELECT {CALL_COLUMNS} FROM calls c
                     WHERE c.recipient_id = ?1 AND c.status = 'missed'
                     ORDER BY c.start_time DESC, c.rowid DESC"
                ),
                params![user_id],
            )
        })
        .await
        .map_err(map_tr_err)
}

pub async fn calls_with_status(
    db: &Database,
    statuses: &[CallStatus],
) -> Result<Vec<CallSession>, RinglineError> {
    if statuses.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!(
        "SELECT {CALL_COLUMNS} FROM calls c WHERE c.status IN ({}) ORDER BY c.start_time ASC",
        status_list(statuses)
    );
    db.connection()
        .call(move |conn| collect_calls(conn, &sql, []))
        .await
        .map_err(map_tr_err)
}

/// Validated status change. `end_time` is stamped iff `to` is terminal, and
/// a terminal status also closes out every still-active participant row.
pub async fn transition(
    db: &Database,
    call_id: &str,
    expected: Option<CallStatus>,
    to: CallStatus,
    at: i64,
) -> Result<CallSession, RinglineError> {
    let call_id = call_id.to_string();
    db.connection()
        .call(move |conn| -> TxResult<CallSession> {
            let tx = conn.transaction()?;
            let Some(call) = load_call(&tx, &call_id)? else {
                return Ok(Err(RinglineError::CallNotFound { call_id }));
            };
            let expected_ok = expected.is_none_or(|status| status == call.status);
            if !expected_ok || !call.status.can_transition_to(to) {
                return Ok(Err(RinglineError::InvalidTransition {
                    call_id,
                    from: call.status,
                    to,
                }));
            }

            let end_time = to.is_terminal().then_some(at);
            tx.execute(
                "UPDATE calls SET status = ?1, end_time = ?2 WHERE id = ?3",
                params![to.as_ref(), end_time, call_id],
            )?;
            if let Some(at) = end_time {
                tx.execute(
                    "UPDATE call_participants SET leave_time = ?1
                     WHERE call_id = ?2 AND has_joined = 1 AND leave_time IS NULL",
                    params![at, call_id],
                )?;
            }
            tx.commit()?;
            Ok(Ok(CallSession {
                status: to,
                end_time,
                ..call
            }))
        })
        .await
        .map_err(map_tr_err)?
}
