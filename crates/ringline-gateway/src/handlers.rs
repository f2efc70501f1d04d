// SPDX-FileCopyrightText: 2026 Ringline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.
//!
//! Every `/v1` handler acts as the [`Identity`] attached by the auth
//! middleware. Call reads require the actor to be on the call's roster.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use ringline_core::types::{
    CallDetails, CallSession, CallStatus, CallType, HealthStatus, JoinOutcome, LeaveOutcome,
    Participant,
};
use ringline_core::RinglineError;

use crate::auth::Identity;
use crate::server::GatewayState;

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable error code, as in `call_error` events.
    pub code: String,
    pub error: String,
}

/// A [`RinglineError`] rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub RinglineError);

impl From<RinglineError> for ApiError {
    fn from(err: RinglineError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            RinglineError::CallNotFound { .. } | RinglineError::ParticipantNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            RinglineError::Conflict { .. } | RinglineError::TargetOffline { .. } => {
                StatusCode::CONFLICT
            }
            RinglineError::Forbidden { .. } => StatusCode::FORBIDDEN,
            RinglineError::InvalidTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            RinglineError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            RinglineError::Storage { .. } | RinglineError::Transport { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            RinglineError::Config(_) | RinglineError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.0.code(), error = %self.0, "request failed");
        }
        let body = ErrorResponse {
            code: self.0.code().to_string(),
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Request body for POST /v1/calls.
#[derive(Debug, Deserialize)]
pub struct CreateCallRequest {
    pub recipient_id: String,
    pub call_type: CallType,
}

/// Request body for POST /v1/calls/group.
#[derive(Debug, Deserialize)]
pub struct CreateGroupCallRequest {
    pub group_id: String,
    pub call_type: CallType,
}

/// Request body for PUT /v1/calls/{id}/status.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: CallStatus,
}

/// Query string for GET /v1/calls/history.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    20
}

/// Response body for GET /v1/calls/active.
#[derive(Debug, Serialize, Deserialize)]
pub struct ActiveCallResponse {
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call: Option<CallSession>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub participants: Vec<Participant>,
}

/// Response body for GET /v1/presence.
#[derive(Debug, Serialize, Deserialize)]
pub struct PresenceResponse {
    pub online: Vec<String>,
}

/// Response body for GET /v1/groups/{group_id}/members.
#[derive(Debug, Serialize, Deserialize)]
pub struct GroupMembersResponse {
    pub group_id: String,
    pub members: Vec<String>,
}

/// Response body for GET /health.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub online_users: usize,
    pub connections: usize,
}

// --- Public ---

/// GET /health
///
/// 503 when the store is unhealthy.
pub async fn get_health(State(state): State<GatewayState>) -> Response {
    let store_status = match state.manager().store().health_check().await {
        Ok(status) => status,
        Err(e) => HealthStatus::Unhealthy(e.to_string()),
    };
    let (code, status) = match store_status {
        HealthStatus::Healthy => (StatusCode::OK, "ok".to_string()),
        HealthStatus::Degraded(reason) => (StatusCode::OK, format!("degraded: {reason}")),
        HealthStatus::Unhealthy(reason) => {
            (StatusCode::SERVICE_UNAVAILABLE, format!("unhealthy: {reason}"))
        }
    };
    let body = HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
        online_users: state.relay.notifier().presence().len(),
        connections: state.transport.connection_count(),
    };
    (code, Json(body)).into_response()
}

/// GET /metrics
pub async fn get_metrics(State(state): State<GatewayState>) -> Response {
    match &state.health.prometheus_render {
        Some(render) => (
            [("content-type", "text/plain; version=0.0.4")],
            render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

// --- Calls ---

/// POST /v1/calls
pub async fn create_call(
    State(state): State<GatewayState>,
    Extension(Identity(actor)): Extension<Identity>,
    Json(body): Json<CreateCallRequest>,
) -> Result<(StatusCode, Json<CallSession>), ApiError> {
    let call = state
        .manager()
        .create_call(&actor, &body.recipient_id, body.call_type)
        .await?;
    Ok((StatusCode::CREATED, Json(call)))
}

/// POST /v1/calls/group
pub async fn create_group_call(
    State(state): State<GatewayState>,
    Extension(Identity(actor)): Extension<Identity>,
    Json(body): Json<CreateGroupCallRequest>,
) -> Result<(StatusCode, Json<CallDetails>), ApiError> {
    let details = state
        .manager()
        .create_group_call(&actor, &body.group_id, body.call_type)
        .await?;
    Ok((StatusCode::CREATED, Json(details)))
}

/// GET /v1/calls/active
pub async fn get_active_call(
    State(state): State<GatewayState>,
    Extension(Identity(actor)): Extension<Identity>,
) -> ApiResult<ActiveCallResponse> {
    let manager = state.manager();
    let Some(call) = manager.get_active_call_for_user(&actor).await? else {
        return Ok(Json(ActiveCallResponse {
            active: false,
            call: None,
            participants: Vec::new(),
        }));
    };
    let participants = manager.get_participants(&call.id).await?;
    Ok(Json(ActiveCallResponse {
        active: true,
        call: Some(call),
        participants,
    }))
}

/// GET /v1/calls/history?page=&page_size=
pub async fn get_history(
    State(state): State<GatewayState>,
    Extension(Identity(actor)): Extension<Identity>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Vec<CallSession>> {
    let calls = state
        .manager()
        .get_history(&actor, query.page, query.page_size)
        .await?;
    Ok(Json(calls))
}

/// GET /v1/calls/missed
pub async fn get_missed_calls(
    State(state): State<GatewayState>,
    Extension(Identity(actor)): Extension<Identity>,
) -> ApiResult<Vec<CallSession>> {
    Ok(Json(state.manager().missed_calls(&actor).await?))
}

/// GET /v1/calls/{id}
pub async fn get_call(
    State(state): State<GatewayState>,
    Extension(Identity(actor)): Extension<Identity>,
    Path(call_id): Path<String>,
) -> ApiResult<CallSession> {
    Ok(Json(state.manager().load_for_member(&call_id, &actor).await?))
}

/// GET /v1/calls/{id}/details
pub async fn get_call_details(
    State(state): State<GatewayState>,
    Extension(Identity(actor)): Extension<Identity>,
    Path(call_id): Path<String>,
) -> ApiResult<CallDetails> {
    let manager = state.manager();
    manager.load_for_member(&call_id, &actor).await?;
    Ok(Json(manager.call_details(&call_id).await?))
}

/// GET /v1/calls/{id}/participants
pub async fn get_participants(
    State(state): State<GatewayState>,
    Extension(Identity(actor)): Extension<Identity>,
    Path(call_id): Path<String>,
) -> ApiResult<Vec<Participant>> {
    let manager = state.manager();
    manager.load_for_member(&call_id, &actor).await?;
    Ok(Json(manager.get_participants(&call_id).await?))
}

/// PUT /v1/calls/{id}/status
pub async fn update_status(
    State(state): State<GatewayState>,
    Extension(Identity(actor)): Extension<Identity>,
    Path(call_id): Path<String>,
    Json(body): Json<UpdateStatusRequest>,
) -> ApiResult<CallSession> {
    let call = state
        .relay
        .update_status(&actor, &call_id, body.status)
        .await?;
    Ok(Json(call))
}

/// PUT /v1/calls/{id}/end
pub async fn end_call(
    State(state): State<GatewayState>,
    Extension(Identity(actor)): Extension<Identity>,
    Path(call_id): Path<String>,
) -> ApiResult<CallSession> {
    Ok(Json(state.relay.end_call(&actor, &call_id).await?.call))
}

/// POST /v1/calls/{id}/join
pub async fn join_call(
    State(state): State<GatewayState>,
    Extension(Identity(actor)): Extension<Identity>,
    Path(call_id): Path<String>,
) -> ApiResult<JoinOutcome> {
    Ok(Json(state.relay.join_call(&actor, &call_id).await?))
}

/// POST /v1/calls/{id}/leave
pub async fn leave_call(
    State(state): State<GatewayState>,
    Extension(Identity(actor)): Extension<Identity>,
    Path(call_id): Path<String>,
) -> ApiResult<LeaveOutcome> {
    Ok(Json(state.relay.leave_call(&actor, &call_id).await?))
}

/// POST /v1/calls/{id}/decline
pub async fn decline_call(
    State(state): State<GatewayState>,
    Extension(Identity(actor)): Extension<Identity>,
    Path(call_id): Path<String>,
) -> ApiResult<CallSession> {
    Ok(Json(state.relay.decline_call(&actor, &call_id).await?.call))
}

// --- Groups and presence ---

/// GET /v1/groups/{group_id}/members
pub async fn get_group_members(
    State(state): State<GatewayState>,
    Path(group_id): Path<String>,
) -> ApiResult<GroupMembersResponse> {
    let members = state.manager().group_members(&group_id).await?;
    Ok(Json(GroupMembersResponse { group_id, members }))
}

/// PUT /v1/groups/{group_id}/members/{user_id}
pub async fn add_group_member(
    State(state): State<GatewayState>,
    Path((group_id, user_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state.manager().add_group_member(&group_id, &user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /v1/groups/{group_id}/members/{user_id}
pub async fn remove_group_member(
    State(state): State<GatewayState>,
    Path((group_id, user_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    if state
        .manager()
        .remove_group_member(&group_id, &user_id)
        .await?
    {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Ok(StatusCode::NOT_FOUND)
    }
}

/// GET /v1/presence
pub async fn get_presence(State(state): State<GatewayState>) -> Json<PresenceResponse> {
    Json(PresenceResponse {
        online: state.relay.notifier().presence().snapshot(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_statuses() {
        let cases = [
            (
                RinglineError::CallNotFound {
                    call_id: "c".into(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                RinglineError::Conflict {
                    user_id: "u".into(),
                    active_call_id: "c".into(),
                },
                StatusCode::CONFLICT,
            ),
            (
                RinglineError::Forbidden {
                    user_id: "u".into(),
                    call_id: "c".into(),
                },
                StatusCode::FORBIDDEN,
            ),
            (
                RinglineError::InvalidTransition {
                    call_id: "c".into(),
                    from: CallStatus::Ended,
                    to: CallStatus::Ongoing,
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (RinglineError::InvalidRequest("x".into()), StatusCode::BAD_REQUEST),
            (RinglineError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).status(), status);
        }
    }

    #[test]
    fn history_query_defaults() {
        let query: HistoryQuery = serde_json::from_str("{}").unwrap();
        assert_eq!((query.page, query.page_size), (1, 20));
    }

    #[test]
    fn inactive_response_omits_call() {
        let body = ActiveCallResponse {
            active: false,
            call: None,
            participants: Vec::new(),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"active": false})
        );
    }
}
