// SPDX-FileCopyrightText: 2026 Ringline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row mapping between SQLite and the core call model.

use std::str::FromStr;

use rusqlite::Row;
use rusqlite::types::Type;

use ringline_core::types::{CallSession, CallStatus, CallTarget, CallType, Participant};

/// Column list matching [`call_from_row`].
pub const CALL_COLUMNS: &str =
    "c.id, c.caller_id, c.recipient_id, c.group_id, c.call_type, c.status, c.start_time, c.end_time";

/// Column list matching [`participant_from_row`].
pub const PARTICIPANT_COLUMNS: &str = "call_id, user_id, has_joined, join_time, leave_time";

fn parse_enum<T: FromStr>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    T::from_str(&raw).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub fn call_from_row(row: &Row<'_>) -> rusqlite::Result<CallSession> {
    let recipient_id: Option<String> = row.get(2)?;
    let group_id: Option<String> = row.get(3)?;
    let target = match (recipient_id, group_id) {
        (Some(recipient_id), None) => CallTarget::Direct { recipient_id },
        (None, Some(group_id)) => CallTarget::Group { group_id },
        _ => {
            return Err(rusqlite::Error::FromSqlConversionFailure(
                2,
                Type::Text,
                "call row must have exactly one of recipient_id, group_id".into(),
            ));
        }
    };
    Ok(CallSession {
        id: row.get(0)?,
        caller_id: row.get(1)?,
        target,
        call_type: parse_enum::<CallType>(row, 4)?,
        status: parse_enum::<CallStatus>(row, 5)?,
        start_time: row.get(6)?,
        end_time: row.get(7)?,
    })
}

pub fn participant_from_row(row: &Row<'_>) -> rusqlite::Result<Participant> {
    Ok(Participant {
        call_id: row.get(0)?,
        user_id: row.get(1)?,
        has_joined: row.get(2)?,
        join_time: row.get(3)?,
        leave_time: row.get(4)?,
    })
}

/// SQL list literal of the live statuses, for `status IN (...)`.
pub fn live_status_list() -> String {
    status_list(&CallStatus::LIVE)
}

pub fn status_list(statuses: &[CallStatus]) -> String {
    statuses
        .iter()
        .map(|s| format!("'{}'", s.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_statuses_render_as_sql_list() {
        assert_eq!(live_status_list(), "'initiated', 'ringing', 'ongoing'");
    }
}
