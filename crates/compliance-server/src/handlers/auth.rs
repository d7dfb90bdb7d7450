// crates/compliance-server/src/handlers/auth.rs
// ============================================================================
// Module: Auth Endpoints
// Description: `/api/auth/login`, `/api/auth/refresh`, `/api/auth/logout`,
//              and `/api/auth/me` (§4.K, §6).
// Purpose: Thin HTTP adapters over `compliance_auth::AuthService`; all
//          lockout/rotation/revocation logic lives there.
// Dependencies: axum, axum-extra, compliance-auth, chrono, serde
// ============================================================================

//! ## Overview
//! Every handler here builds a [`RequestContext`] from the peer address and
//! `User-Agent` header, the same inputs the teacher's own request-context
//! helper draws from, so every audit entry records who asked.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;

use axum::Json;
use axum::extract::ConnectInfo;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::header::USER_AGENT;
use chrono::Utc;
use compliance_auth::LoginOutcome;
use compliance_auth::RequestContext;
use serde::Deserialize;
use serde::Serialize;

use crate::error::ApiError;
use crate::middleware::AccessTokenIdentity;
use crate::state::ServerState;

/// Builds a [`RequestContext`] from the connecting peer and request headers.
fn request_context(peer: SocketAddr, headers: &HeaderMap) -> RequestContext {
    RequestContext {
        ip_address: Some(peer.ip().to_string()),
        user_agent: headers.get(USER_AGENT).and_then(|value| value.to_str().ok()).map(str::to_owned),
    }
}

// ============================================================================
// SECTION: Login
// ============================================================================

/// Body of `POST /api/auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Account username.
    pub username: String,
    /// Account password, in cleartext over the wire (transport security is
    /// the caller's responsibility, per the ambient TLS termination layer).
    pub password: String,
}

/// `POST /api/auth/login` — username+password to token pair.
///
/// # Errors
/// Returns [`ApiError::Auth`] on invalid credentials or a locked account.
pub async fn login(
    State(state): State<ServerState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginOutcome>, ApiError> {
    let ctx = request_context(peer, &headers);
    let outcome = state.auth.login(&body.username, &body.password, &ctx, Utc::now())?;
    Ok(Json(outcome))
}

// ============================================================================
// SECTION: Refresh
// ============================================================================

/// Body of `POST /api/auth/refresh`.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// The refresh token to rotate.
    pub refresh_token: String,
}

/// `POST /api/auth/refresh` — rotates a refresh token for a new pair.
///
/// # Errors
/// Returns [`ApiError::Auth`] if the token is unknown, expired, or reused
/// (which also revokes the whole token family).
pub async fn refresh(
    State(state): State<ServerState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<LoginOutcome>, ApiError> {
    let ctx = request_context(peer, &headers);
    let outcome = state.auth.refresh(&body.refresh_token, &ctx, Utc::now())?;
    Ok(Json(outcome))
}

// ============================================================================
// SECTION: Logout
// ============================================================================

/// Body of `POST /api/auth/logout`.
#[derive(Debug, Default, Deserialize)]
pub struct LogoutRequest {
    /// The refresh token belonging to the session being closed, if any.
    pub refresh_token: Option<String>,
    /// When `true`, revokes every refresh token for this user instead of
    /// just the presented one.
    #[serde(default)]
    pub all: bool,
}

/// The body returned by logout.
#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    /// A human-readable confirmation.
    pub message: &'static str,
}

/// `POST /api/auth/logout` — revokes the current session, or every session
/// for the user when `all` is set.
///
/// # Errors
/// Returns [`ApiError::Auth`] on an invalid access token.
pub async fn logout(
    State(state): State<ServerState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    AccessTokenIdentity(claims): AccessTokenIdentity,
    Json(body): Json<LogoutRequest>,
) -> Result<Json<LogoutResponse>, ApiError> {
    let ctx = request_context(peer, &headers);
    state.auth.logout(&claims, body.refresh_token.as_deref(), body.all, &ctx, Utc::now())?;
    Ok(Json(LogoutResponse { message: "logged out" }))
}

// ============================================================================
// SECTION: Me
// ============================================================================

/// The body returned by `GET /api/auth/me`.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    /// Subject user identifier.
    pub id: compliance_core::UserId,
    /// Username.
    pub username: String,
    /// Role.
    pub role: compliance_core::UserRole,
    /// Flattened permission set at issuance time.
    pub permissions: Vec<String>,
}

/// `GET /api/auth/me` — returns the caller's own identity.
pub async fn me(AccessTokenIdentity(claims): AccessTokenIdentity) -> Json<MeResponse> {
    Json(MeResponse { id: claims.user_id, username: claims.username, role: claims.role, permissions: claims.permissions })
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;
    use std::net::SocketAddrV4;

    use super::*;

    #[test]
    fn request_context_carries_peer_and_user_agent() {
        let peer = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 1), 4242));
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, "compliance-agent/1.0".parse().expect("valid header value"));
        let ctx = request_context(peer, &headers);
        assert_eq!(ctx.ip_address.as_deref(), Some("10.0.0.1"));
        assert_eq!(ctx.user_agent.as_deref(), Some("compliance-agent/1.0"));
    }
}
