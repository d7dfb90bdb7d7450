// crates/compliance-server/src/middleware.rs
// ============================================================================
// Module: Triple-Modal Auth Extractors
// Description: Session cookie -> JWT bearer -> API key resolution, in that
//              fixed order, first match wins (§4.J/§4.K).
// Purpose: Let handlers declare what they require (any auth, session only,
//          or a bearer/cookie access token) as an extractor argument instead
//          of hand-rolling header inspection per route.
// Dependencies: axum, axum-extra, compliance-auth, compliance-core
// ============================================================================

//! ## Overview
//! Three extractor types cover the HTTP surface table's three auth columns:
//! [`AnyAuthIdentity`] ("any auth"), [`SessionIdentity`] ("session", the
//! dashboard), and [`AccessTokenIdentity`] ("access token", login/refresh's
//! siblings). Role and permission guards compose above these via
//! [`Identity::require_permission`], per the fixed middleware order
//! auth -> role/permission guard -> handler.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;
use chrono::Utc;
use compliance_auth::AccessClaims;
use compliance_core::AuthMethod;
use compliance_store::ApiKeyRecord;

use crate::error::ApiError;
use crate::state::ServerState;

/// The `session_user` cookie name carrying a JWT access token for browser
/// (dashboard) clients.
const SESSION_COOKIE: &str = "session_user";

/// The `api_token` cookie name carrying a raw API key.
const API_TOKEN_COOKIE: &str = "api_token";

// ============================================================================
// SECTION: Identity
// ============================================================================

/// The authenticated principal behind a request, regardless of which of the
/// three admission paths matched.
#[derive(Debug, Clone)]
pub enum Identity {
    /// A dashboard or API user, admitted via session cookie or JWT bearer.
    User {
        /// The validated access claims.
        claims: AccessClaims,
        /// Which path admitted this request.
        method: AuthMethod,
    },
    /// A provisioned API key, admitted via bearer header or `api_token`
    /// cookie.
    ApiKey {
        /// The matched key record.
        record: ApiKeyRecord,
    },
}

impl Identity {
    /// Returns the username or key display name, for audit/logging.
    #[must_use]
    pub fn display_name(&self) -> &str {
        match self {
            Self::User { claims, .. } => &claims.username,
            Self::ApiKey { record } => &record.name,
        }
    }

    /// Checks the caller carries `permission`. API keys are provisioned for
    /// a single purpose (agent submission) and carry no granular permission
    /// set of their own, so they satisfy every check; user identities defer
    /// to the role-derived permission list baked into their access claims at
    /// issuance.
    #[must_use]
    pub fn has_permission(&self, permission: &str) -> bool {
        match self {
            Self::User { claims, .. } => claims.permissions.iter().any(|held| held == permission),
            Self::ApiKey { .. } => true,
        }
    }

    /// Returns [`ApiError::Forbidden`] unless [`Self::has_permission`] holds.
    ///
    /// # Errors
    /// Returns [`ApiError::Forbidden`] if the caller lacks `permission`.
    pub fn require_permission(&self, permission: &str) -> Result<(), ApiError> {
        if self.has_permission(permission) {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }
}

/// Reads a bearer token from the `Authorization` header, if present.
fn bearer_token(parts: &Parts) -> Option<String> {
    parts.headers.get(AUTHORIZATION)?.to_str().ok()?.strip_prefix("Bearer ").map(str::to_owned)
}

// ============================================================================
// SECTION: Any Auth
// ============================================================================

/// Admits a request via session cookie, then JWT bearer, then API key
/// (bearer or `api_token` cookie) — first match wins. Used by every "any
/// auth" endpoint in the HTTP surface table.
#[derive(Debug, Clone)]
pub struct AnyAuthIdentity(pub Identity);

impl FromRequestParts<ServerState> for AnyAuthIdentity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &ServerState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let now = Utc::now();

        if let Some(cookie) = jar.get(SESSION_COOKIE)
            && let Ok(claims) = state.auth.authenticate_access(cookie.value())
        {
            return Ok(Self(Identity::User { claims, method: AuthMethod::SessionCookie }));
        }

        if let Some(token) = bearer_token(parts) {
            if let Ok(claims) = state.auth.authenticate_access(&token) {
                return Ok(Self(Identity::User { claims, method: AuthMethod::JwtBearer }));
            }
            if let Ok(record) = state.auth.verify_api_key(&token, now) {
                return Ok(Self(Identity::ApiKey { record }));
            }
        }

        if let Some(cookie) = jar.get(API_TOKEN_COOKIE)
            && let Ok(record) = state.auth.verify_api_key(cookie.value(), now)
        {
            return Ok(Self(Identity::ApiKey { record }));
        }

        Err(ApiError::Unauthenticated)
    }
}

// ============================================================================
// SECTION: Session Only
// ============================================================================

/// Admits a request only via the `session_user` cookie. Used by the
/// dashboard, which is not meant to be driven by API clients.
#[derive(Debug, Clone)]
pub struct SessionIdentity(pub AccessClaims);

impl FromRequestParts<ServerState> for SessionIdentity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &ServerState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let cookie = jar.get(SESSION_COOKIE).ok_or(ApiError::Unauthenticated)?;
        let claims = state.auth.authenticate_access(cookie.value())?;
        Ok(Self(claims))
    }
}

// ============================================================================
// SECTION: Access Token
// ============================================================================

/// Admits a request via a JWT access token, presented either as a bearer
/// header or the `session_user` cookie. Used by `/api/auth/logout` and
/// `/api/auth/me`, whose surface-table auth column is "access token"
/// regardless of transport.
#[derive(Debug, Clone)]
pub struct AccessTokenIdentity(pub AccessClaims);

impl FromRequestParts<ServerState> for AccessTokenIdentity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &ServerState) -> Result<Self, Self::Rejection> {
        if let Some(token) = bearer_token(parts) {
            return Ok(Self(state.auth.authenticate_access(&token)?));
        }
        let jar = CookieJar::from_headers(&parts.headers);
        if let Some(cookie) = jar.get(SESSION_COOKIE) {
            return Ok(Self(state.auth.authenticate_access(cookie.value())?));
        }
        Err(ApiError::Unauthenticated)
    }
}
