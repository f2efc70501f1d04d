// SPDX-FileCopyrightText: 2026 Ringline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Roster operations: atomic join and leave, participant reads.

use rusqlite::{Connection, OptionalExtension, params};

use ringline_core::RinglineError;
use ringline_core::types::{CallStatus, JoinOutcome, LeaveOutcome, Participant};

use crate::database::{Database, map_tr_err};
use crate::models::{PARTICIPANT_COLUMNS, participant_from_row};
use crate::queries::TxResult;
use crate::queries::calls::{live_call_for, load_call};
use crate::queries::groups::is_member;

pub(crate) fn insert_participant(conn: &Connection, p: &Participant) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO call_participants (call_id, user_id, has_joined, join_time, leave_time)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![p.call_id, p.user_id, p.has_joined, p.join_time, p.leave_time],
    )?;
    Ok(())
}

fn load_participant(
    conn: &Connection,
    call_id: &str,
    user_id: &str,
) -> rusqlite::Result<Option<Participant>> {
    conn.query_row(
        &format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM call_participants WHERE call_id = ?1 AND user_id = ?2"
        ),
        params![call_id, user_id],
        participant_from_row,
    )
    .optional()
}

fn load_roster(conn: &Connection, call_id: &str) -> rusqlite::Result<Vec<Participant>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PARTICIPANT_COLUMNS} FROM call_participants WHERE call_id = ?1 ORDER BY rowid"
    ))?;
    let rows = stmt.query_map(params![call_id], participant_from_row)?;
    rows.collect()
}

fn active_user_ids(conn: &Connection, call_id: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT user_id FROM call_participants
         WHERE call_id = ?1 AND has_joined = 1 AND leave_time IS NULL
         ORDER BY rowid",
    )?;
    let rows = stmt.query_map(params![call_id], |row| row.get(0))?;
    rows.collect()
}

/// Join every user to a ringing or ongoing call and promote it to `Ongoing`.
///
/// A user already joined keeps their original join time. A user who left
/// rejoins with a fresh join time. A user with no row gets one only if the
/// call is a group call and they are in the group.
pub async fn join(
    db: &Database,
    call_id: &str,
    user_ids: &[String],
    at: i64,
) -> Result<JoinOutcome, RinglineError> {
    let call_id = call_id.to_string();
    let user_ids = user_ids.to_vec();
    db.connection()
        .call(move |conn| -> TxResult<JoinOutcome> {
            let tx = conn.transaction()?;
            let Some(call) = load_call(&tx, &call_id)? else {
                return Ok(Err(RinglineError::CallNotFound { call_id }));
            };
            if !matches!(call.status, CallStatus::Ringing | CallStatus::Ongoing) {
                return Ok(Err(RinglineError::InvalidTransition {
                    call_id,
                    from: call.status,
                    to: CallStatus::Ongoing,
                }));
            }

            let mut joined = Vec::with_capacity(user_ids.len());
            for user_id in &user_ids {
                if let Some(other) = live_call_for(&tx, user_id)?.filter(|c| c.id != call.id) {
                    return Ok(Err(RinglineError::Conflict {
                        user_id: user_id.clone(),
                        active_call_id: other.id,
                    }));
                }

                let participant = match load_participant(&tx, &call.id, user_id)? {
                    Some(existing) if existing.is_active() => existing,
                    Some(existing) => {
                        tx.execute(
                            "UPDATE call_participants
                             SET has_joined = 1, join_time = ?1, leave_time = NULL
                             WHERE call_id = ?2 AND user_id = ?3",
                            params![at, call.id, user_id],
                        )?;
                        Participant {
                            has_joined: true,
                            join_time: Some(at),
                            leave_time: None,
                            ..existing
                        }
                    }
                    None => {
                        let in_group = match call.target.group_id() {
                            Some(group_id) => is_member(&tx, group_id, user_id)?,
                            None => false,
                        };
                        if !in_group {
                            return Ok(Err(RinglineError::Forbidden {
                                user_id: user_id.clone(),
                                call_id: call.id,
                            }));
                        }
                        let participant = Participant::joined(&call.id, user_id, at);
                        insert_participant(&tx, &participant)?;
                        participant
                    }
                };
                joined.push(participant);
            }

            let promoted = call.status != CallStatus::Ongoing;
            if promoted {
                tx.execute(
                    "UPDATE calls SET status = ?1 WHERE id = ?2",
                    params![CallStatus::Ongoing.as_ref(), call.id],
                )?;
            }
            tx.commit()?;

            let mut call = call;
            call.status = CallStatus::Ongoing;
            Ok(Ok(JoinOutcome {
                call,
                participants: joined,
                promoted,
            }))
        })
        .await
        .map_err(map_tr_err)?
}

/// Stamp the user's leave time; when nobody joined remains, close the call
/// as `Ended` in the same transaction. Leaving twice changes nothing.
pub async fn leave(
    db: &Database,
    call_id: &str,
    user_id: &str,
    at: i64,
) -> Result<LeaveOutcome, RinglineError> {
    let call_id = call_id.to_string();
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| -> TxResult<LeaveOutcome> {
            let tx = conn.transaction()?;
            let Some(mut call) = load_call(&tx, &call_id)? else {
                return Ok(Err(RinglineError::CallNotFound { call_id }));
            };
            let Some(mut participant) = load_participant(&tx, &call_id, &user_id)? else {
                return Ok(Err(RinglineError::Forbidden { user_id, call_id }));
            };

            if participant.leave_time.is_some() {
                let remaining_active = active_user_ids(&tx, &call_id)?;
                return Ok(Ok(LeaveOutcome {
                    call,
                    participant,
                    changed: false,
                    remaining_active,
                    ended_call: false,
                }));
            }

            tx.execute(
                "UPDATE call_participants SET leave_time = ?1 WHERE call_id = ?2 AND user_id = ?3",
                params![at, call_id, user_id],
            )?;
            participant.leave_time = Some(at);

            let remaining_active = active_user_ids(&tx, &call_id)?;
            let ended_call =
                remaining_active.is_empty() && call.status.can_transition_to(CallStatus::Ended);
            if ended_call {
                tx.execute(
                    "UPDATE calls SET status = ?1, end_time = ?2 WHERE id = ?3",
                    params![CallStatus::Ended.as_ref(), at, call_id],
                )?;
                call.status = CallStatus::Ended;
                call.end_time = Some(at);
            }
            tx.commit()?;

            Ok(Ok(LeaveOutcome {
                call,
                participant,
                changed: true,
                remaining_active,
                ended_call,
            }))
        })
        .await
        .map_err(map_tr_err)?
}

pub async fn get_participant(
    db: &Database,
    call_id: &str,
    user_id: &str,
) -> Result<Option<Participant>, RinglineError> {
    let call_id = call_id.to_string();
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| load_participant(conn, &call_id, &user_id))
        .await
        .map_err(map_tr_err)
}

/// The full roster in insertion order.
pub async fn list_participants(
    db: &Database,
    call_id: &str,
) -> Result<Vec<Participant>, RinglineError> {
    let call_id = call_id.to_string();
    db.connection()
        .call(move |conn| load_roster(conn, &call_id))
        .await
        .map_err(map_tr_err)
}
