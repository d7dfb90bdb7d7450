// crates/compliance-auth/src/claims.rs
// ============================================================================
// Module: JWT Claim Shapes
// Description: Access and refresh token claim sets (§4.J).
// Purpose: Give the codec and the server's middleware one typed shape each,
//          instead of hand-indexing a JSON map per call site.
// Dependencies: serde, compliance-core, uuid
// ============================================================================

//! ## Overview
//! Both claim sets carry `iss`/`aud`/`exp`/`nbf`/`iat`/`jti` alongside the
//! identity fields `jsonwebtoken` doesn't know about. `jwt_version` appears
//! in both so a password change invalidates tokens of either kind.

use compliance_core::UserId;
use compliance_core::UserRole;
use serde::Deserialize;
use serde::Serialize;

/// Claims carried by a signed access token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject; mirrors `user_id` as a string, per JWT convention.
    pub sub: String,
    /// Subject user identifier.
    pub user_id: UserId,
    /// Username at issuance time.
    pub username: String,
    /// Role at issuance time.
    pub role: UserRole,
    /// Flattened permission set for this role.
    pub permissions: Vec<String>,
    /// The user's `jwt_version` at issuance; must match the live value.
    pub jwt_version: i64,
    /// Issuer.
    pub iss: String,
    /// Audience.
    pub aud: String,
    /// Expiry, Unix seconds.
    pub exp: i64,
    /// Not-before, Unix seconds.
    pub nbf: i64,
    /// Issued-at, Unix seconds.
    pub iat: i64,
    /// Unique token identifier, used for blacklisting.
    pub jti: String,
}

/// Claims carried by a signed refresh token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// Subject; mirrors `user_id` as a string.
    pub sub: String,
    /// Subject user identifier.
    pub user_id: UserId,
    /// Username at issuance time.
    pub username: String,
    /// Rotation chain identifier, shared across every descendant token.
    pub token_family: String,
    /// The user's `jwt_version` at issuance.
    pub jwt_version: i64,
    /// Issuer.
    pub iss: String,
    /// Audience.
    pub aud: String,
    /// Expiry, Unix seconds.
    pub exp: i64,
    /// Not-before, Unix seconds.
    pub nbf: i64,
    /// Issued-at, Unix seconds.
    pub iat: i64,
    /// Unique token identifier; also the refresh record's lookup key.
    pub jti: String,
}
