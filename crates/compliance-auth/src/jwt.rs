// crates/compliance-auth/src/jwt.rs
// ============================================================================
// Module: JWT Codec
// Description: HMAC-SHA256 issuance and structural validation for access and
//              refresh tokens (§4.J).
// Purpose: Isolate `jsonwebtoken` usage to one place; the codec knows
//          nothing about storage, blacklists, or lockout.
// Dependencies: jsonwebtoken, chrono, uuid, compliance-core
// ============================================================================

//! ## Overview
//! [`JwtCodec::validate_access`] and [`JwtCodec::validate_refresh`] only
//! check what the token itself proves: signature, issuer, audience, and
//! time bounds. Blacklist lookups and `jwt_version` comparison happen one
//! layer up, in [`crate::service::AuthService`], since those require a
//! store round trip.

use chrono::Duration;
use chrono::Utc;
use compliance_core::UserId;
use compliance_core::UserRole;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;
use jsonwebtoken::decode;
use jsonwebtoken::encode;
use uuid::Uuid;

use crate::claims::AccessClaims;
use crate::claims::RefreshClaims;

/// A freshly issued access/refresh pair, always carrying the same identity
/// and (for the refresh half) token family.
#[derive(Debug, Clone)]
pub struct TokenPair {
    /// Encoded access token.
    pub access_token: String,
    /// Encoded refresh token.
    pub refresh_token: String,
    /// The access claims, for the caller to read `jti`/`exp` without
    /// re-decoding.
    pub access_claims: AccessClaims,
    /// The refresh claims, for the caller to persist the refresh record.
    pub refresh_claims: RefreshClaims,
}

/// Encodes and validates access/refresh JWTs against one server-wide secret.
pub struct JwtCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    access_lifetime: Duration,
    refresh_lifetime: Duration,
}

/// Clock-skew tolerance applied to `exp`/`nbf` checks.
const CLOCK_SKEW_SECONDS: u64 = 30;

impl JwtCodec {
    /// Builds a codec from the configured secret, issuer, audience, and
    /// token lifetimes.
    #[must_use]
    pub fn new(secret: &str, issuer: impl Into<String>, audience: impl Into<String>, access_lifetime_minutes: i64, refresh_lifetime_days: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.into(),
            audience: audience.into(),
            access_lifetime: Duration::minutes(access_lifetime_minutes),
            refresh_lifetime: Duration::days(refresh_lifetime_days),
        }
    }

    /// Issues a fresh access/refresh pair sharing `token_family`, so both
    /// halves carry consistent identity.
    ///
    /// # Errors
    /// Returns the underlying `jsonwebtoken` error if either half fails to
    /// encode.
    pub fn issue_pair(
        &self,
        user_id: UserId,
        username: &str,
        role: UserRole,
        jwt_version: i64,
        token_family: Uuid,
    ) -> Result<TokenPair, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let access_claims = AccessClaims {
            sub: user_id.to_string(),
            user_id,
            username: username.to_owned(),
            role,
            permissions: role.default_permissions().into_iter().map(str::to_owned).collect(),
            jwt_version,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            exp: (now + self.access_lifetime).timestamp(),
            nbf: now.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        let refresh_claims = RefreshClaims {
            sub: user_id.to_string(),
            user_id,
            username: username.to_owned(),
            token_family: token_family.to_string(),
            jwt_version,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            exp: (now + self.refresh_lifetime).timestamp(),
            nbf: now.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        let access_token = encode(&Header::new(Algorithm::HS256), &access_claims, &self.encoding_key)?;
        let refresh_token = encode(&Header::new(Algorithm::HS256), &refresh_claims, &self.encoding_key)?;
        Ok(TokenPair { access_token, refresh_token, access_claims, refresh_claims })
    }

    /// Decodes and structurally validates an access token: signature,
    /// issuer, audience, `exp`/`nbf` within clock-skew tolerance.
    ///
    /// # Errors
    /// Returns the underlying `jsonwebtoken` error on any failure.
    pub fn validate_access(&self, token: &str) -> Result<AccessClaims, jsonwebtoken::errors::Error> {
        decode::<AccessClaims>(token, &self.decoding_key, &self.validation()).map(|data| data.claims)
    }

    /// Decodes and structurally validates a refresh token.
    ///
    /// # Errors
    /// Returns the underlying `jsonwebtoken` error on any failure.
    pub fn validate_refresh(&self, token: &str) -> Result<RefreshClaims, jsonwebtoken::errors::Error> {
        decode::<RefreshClaims>(token, &self.decoding_key, &self.validation()).map(|data| data.claims)
    }

    /// Returns the access token lifetime, in seconds, for wire responses.
    #[must_use]
    pub fn access_lifetime_seconds(&self) -> i64 {
        self.access_lifetime.num_seconds()
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.issuer.clone()]);
        validation.set_audience(&[self.audience.clone()]);
        validation.leeway = CLOCK_SKEW_SECONDS;
        validation
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test fixtures favor direct unwraps for setup clarity.")]

    use super::*;

    fn codec() -> JwtCodec {
        JwtCodec::new("test-secret-key-at-least-32-bytes-long", "compliance-toolkit", "compliance-toolkit-clients", 15, 7)
    }

    #[test]
    fn issued_pair_shares_token_family_and_validates() {
        let codec = codec();
        let user_id = UserId::new_random();
        let family = Uuid::new_v4();
        let pair = codec.issue_pair(user_id, "admin", UserRole::Admin, 0, family).unwrap();
        let access = codec.validate_access(&pair.access_token).unwrap();
        let refresh = codec.validate_refresh(&pair.refresh_token).unwrap();
        assert_eq!(access.user_id, user_id);
        assert_eq!(refresh.token_family, family.to_string());
        assert_ne!(access.jti, refresh.jti);
    }

    #[test]
    fn wrong_audience_is_rejected() {
        let issuer_codec = JwtCodec::new("test-secret-key-at-least-32-bytes-long", "compliance-toolkit", "compliance-toolkit-clients", 15, 7);
        let other_codec = JwtCodec::new("test-secret-key-at-least-32-bytes-long", "compliance-toolkit", "someone-else", 15, 7);
        let pair = issuer_codec.issue_pair(UserId::new_random(), "admin", UserRole::Admin, 0, Uuid::new_v4()).unwrap();
        assert!(other_codec.validate_access(&pair.access_token).is_err());
    }

    #[test]
    fn access_lifetime_seconds_matches_configured_minutes() {
        let codec = codec();
        assert_eq!(codec.access_lifetime_seconds(), 15 * 60);
    }
}
