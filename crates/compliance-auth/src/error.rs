// crates/compliance-auth/src/error.rs
// ============================================================================
// Module: Auth Core Errors
// Description: Failure modes for login, token validation, and rotation.
// Purpose: Let callers (the Ingestion Server's middleware and handlers) map
//          each variant to the right HTTP status without string matching.
// Dependencies: thiserror, compliance-store
// ============================================================================

//! ## Overview
//! Every variant here is one the server turns into a response; none of them
//! are meant to propagate as an opaque 500 except [`AuthError::Store`].

use compliance_store::StoreError;

/// Failures produced by the Auth Core.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No user exists with the given username.
    #[error("invalid credentials")]
    InvalidCredentials,
    /// The account is currently locked out.
    #[error("account locked until {until}")]
    AccountLocked {
        /// RFC 3339 lockout expiry, for the error response body.
        until: String,
    },
    /// The presented JWT failed to parse, verify, or is expired/not-yet-valid.
    #[error("invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
    /// The token's `jwt_version` claim no longer matches the user's current
    /// version (password changed since issuance).
    #[error("token was issued before the most recent password change")]
    StaleJwtVersion,
    /// The token's `jti` is on the blacklist.
    #[error("token has been revoked")]
    TokenBlacklisted,
    /// The referenced refresh token record does not exist.
    #[error("unknown refresh token")]
    UnknownRefreshToken,
    /// The refresh token record is already revoked or expired.
    #[error("refresh token is no longer valid")]
    RefreshTokenInvalid,
    /// The subject referenced by a validated token no longer exists.
    #[error("token subject no longer exists")]
    UnknownSubject,
    /// The underlying store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    /// A bcrypt operation failed.
    #[error("password hashing error: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}
