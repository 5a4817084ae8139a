// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bearer token authentication for the API routes.
//!
//! When no token is configured, all authenticated routes are rejected
//! (fail-closed). `/health` is mounted outside this middleware.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};

/// Authentication configuration for the gateway.
#[derive(Clone)]
pub struct AuthConfig {
    /// Expected bearer token. `None` rejects every authenticated request.
    pub api_token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("api_token", &self.api_token.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

impl AuthConfig {
    /// Validate a raw `Authorization` header value.
    pub fn check_header(&self, header: Option<&str>) -> bool {
        let Some(ref expected) = self.api_token else {
            return false;
        };
        header
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token == expected)
    }

    /// Validate a bare token (WebSocket handshake query parameter).
    pub fn check_token(&self, token: Option<&str>) -> bool {
        let Some(ref expected) = self.api_token else {
            return false;
        };
        token.is_some_and(|t| t == expected)
    }
}

/// Middleware validating `Authorization: Bearer <token>`.
pub async fn auth_middleware(
    State(auth): State<AuthConfig>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if auth.api_token.is_none() {
        tracing::error!("gateway has no api_token configured, rejecting request");
        return Err(StatusCode::UNAUTHORIZED);
    }

    let header = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok());
    if auth.check_header(header) {
        return Ok(next.run(request).await);
    }

    Err(StatusCode::UNAUTHORIZED)
}
