// SPDX-FileCopyrightText: 2026 Ringline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authentication for the gateway.
//!
//! REST requests carry `Authorization: Bearer <token>` plus an opaque
//! `X-User-Id`. The WebSocket handshake carries both as query parameters
//! (`/ws?user_id=...&token=...`) since browsers cannot set headers on it.
//!
//! When no token is configured, all requests are rejected (fail-closed).

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use serde::Deserialize;

/// Header carrying the caller's user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Authentication configuration for the gateway.
#[derive(Clone)]
pub struct AuthConfig {
    /// Expected bearer token. `None` rejects everything.
    pub bearer_token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}

impl AuthConfig {
    fn token_matches(&self, presented: Option<&str>) -> bool {
        match (&self.bearer_token, presented) {
            (Some(expected), Some(token)) => expected == token,
            _ => false,
        }
    }
}

/// The authenticated user id, inserted into request extensions by
/// [`auth_middleware`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity(pub String);

/// WebSocket handshake parameters.
#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub user_id: Option<String>,
    pub token: Option<String>,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Middleware that checks the bearer token and attaches the caller's
/// [`Identity`].
pub async fn auth_middleware(
    State(auth): State<AuthConfig>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if auth.bearer_token.is_none() {
        tracing::error!("gateway has no bearer token configured -- rejecting request");
        return Err(StatusCode::UNAUTHORIZED);
    }

    let presented = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    if !auth.token_matches(presented) {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let user_id = non_blank(
        request
            .headers()
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok()),
    )
    .map(str::to_string)
    .ok_or(StatusCode::UNAUTHORIZED)?;

    request.extensions_mut().insert(Identity(user_id));
    Ok(next.run(request).await)
}

/// Authenticate a WebSocket handshake, returning the user id.
pub fn authorize_ws(auth: &AuthConfig, params: &WsParams) -> Result<String, StatusCode> {
    if auth.bearer_token.is_none() {
        tracing::error!("gateway has no bearer token configured -- rejecting websocket");
        return Err(StatusCode::UNAUTHORIZED);
    }
    if !auth.token_matches(params.token.as_deref()) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    non_blank(params.user_id.as_deref())
        .map(str::to_string)
        .ok_or(StatusCode::UNAUTHORIZED)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(token: Option<&str>) -> AuthConfig {
        AuthConfig {
            bearer_token: token.map(str::to_string),
        }
    }

    fn params(user: Option<&str>, token: Option<&str>) -> WsParams {
        WsParams {
            user_id: user.map(str::to_string),
            token: token.map(str::to_string),
        }
    }

    #[test]
    fn debug_redacts_token() {
        let debug_output = format!("{:?}", config(Some("secret-token")));
        assert!(!debug_output.contains("secret-token"));
        assert!(debug_output.contains("[redacted]"));
    }

    #[test]
    fn ws_requires_token_and_user() {
        let auth = config(Some("s3cret"));
        assert_eq!(
            authorize_ws(&auth, &params(Some("alice"), Some("s3cret"))),
            Ok("alice".to_string())
        );
        assert_eq!(
            authorize_ws(&auth, &params(Some("alice"), Some("wrong"))),
            Err(StatusCode::UNAUTHORIZED)
        );
        assert_eq!(
            authorize_ws(&auth, &params(Some("  "), Some("s3cret"))),
            Err(StatusCode::UNAUTHORIZED)
        );
        assert_eq!(
            authorize_ws(&auth, &params(Some("alice"), None)),
            Err(StatusCode::UNAUTHORIZED)
        );
    }

    #[test]
    fn ws_fails_closed_without_token() {
        assert_eq!(
            authorize_ws(&config(None), &params(Some("alice"), Some("anything"))),
            Err(StatusCode::UNAUTHORIZED)
        );
    }
}
