// crates/compliance-auth/src/lib.rs
// ============================================================================
// Module: Auth Core
// Description: Password login, JWT issuance/validation, refresh rotation
//              with replay detection, revocation, lockout, audit, and
//              housekeeping sweepers (§4.J).
// Purpose: Everything the Ingestion Server's auth middleware and handlers
//          need, independent of HTTP framing.
// Dependencies: compliance-store, jsonwebtoken, bcrypt, chrono, uuid
// ============================================================================

//! ## Overview
//! This crate has no knowledge of HTTP: it takes already-extracted
//! credentials or tokens and a [`service::RequestContext`], and returns
//! typed outcomes or [`error::AuthError`]. `compliance-server` is
//! responsible for framing these as responses and status codes.

pub mod claims;
pub mod error;
pub mod jwt;
pub mod service;

pub use claims::AccessClaims;
pub use claims::RefreshClaims;
pub use error::AuthError;
pub use jwt::JwtCodec;
pub use jwt::TokenPair;
pub use service::AuthService;
pub use service::LoginOutcome;
pub use service::RequestContext;
pub use service::UserSummary;

/// Hashes a plaintext password with bcrypt at the library's default cost.
///
/// # Errors
/// Returns [`bcrypt::BcryptError`] if hashing fails.
pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
}
