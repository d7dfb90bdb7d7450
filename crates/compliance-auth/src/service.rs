// crates/compliance-auth/src/service.rs
// ============================================================================
// Module: Auth Service
// Description: Login, refresh rotation, logout, access-token authentication,
//              API key verification, and housekeeping sweeps (§4.J).
// Purpose: The one place that combines the JWT codec with the Ingestion
//          Store to enforce lockout, replay detection, and revocation.
// Dependencies: compliance-store, bcrypt, chrono, uuid, tracing
// ============================================================================

//! ## Overview
//! [`AuthService`] owns a [`crate::jwt::JwtCodec`] and a
//! [`compliance_store::ComplianceStore`]. Every state-changing call writes
//! an [`compliance_store::AuthAuditEntry`] before returning, success or
//! failure, so the audit log is never behind the outcome it describes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use compliance_core::AuditEntryId;
use compliance_core::AuthMethod;
use compliance_core::UserId;
use compliance_core::UserRole;
use compliance_store::ApiKeyRecord;
use compliance_store::AuthAuditEntry;
use compliance_store::ComplianceStore;
use compliance_store::JwtBlacklistEntry;
use compliance_store::RefreshTokenRecord;
use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use tracing::info;
use tracing::warn;
use uuid::Uuid;

use crate::claims::AccessClaims;
use crate::error::AuthError;
use crate::jwt::JwtCodec;

// ============================================================================
// SECTION: Request context
// ============================================================================

/// Per-request metadata recorded on every audit entry.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Client IP address, if known.
    pub ip_address: Option<String>,
    /// Client user agent, if known.
    pub user_agent: Option<String>,
}

// ============================================================================
// SECTION: Wire shapes
// ============================================================================

/// The `user` object embedded in login/refresh responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    /// User identifier.
    pub id: UserId,
    /// Username.
    pub username: String,
    /// Role.
    pub role: UserRole,
    /// Flattened permission set.
    pub permissions: Vec<String>,
}

/// The shape returned by login and refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginOutcome {
    /// Encoded access token.
    pub access_token: String,
    /// Encoded refresh token.
    pub refresh_token: String,
    /// Always `"Bearer"`.
    pub token_type: &'static str,
    /// Access token lifetime, in seconds.
    pub expires_in: i64,
    /// Access token expiry, RFC 3339.
    pub expires_at: String,
    /// Subject summary.
    pub user: UserSummary,
}

// ============================================================================
// SECTION: Service
// ============================================================================

/// Orchestrates password login, JWT issuance/validation, refresh rotation,
/// revocation, lockout, and the three housekeeping sweepers.
pub struct AuthService {
    store: Arc<ComplianceStore>,
    jwt: JwtCodec,
    audit_log_retention_days: i64,
}

const MAX_FAILED_LOGINS: i64 = 5;

/// Hex-encoded SHA-256 digest of an encoded token, stored alongside the
/// record so a database read alone never discloses a usable refresh token.
fn hash_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

impl AuthService {
    /// Builds a service over an already-open store and a configured codec.
    #[must_use]
    pub fn new(store: Arc<ComplianceStore>, jwt: JwtCodec, audit_log_retention_days: i64) -> Self {
        Self { store, jwt, audit_log_retention_days }
    }

    /// Verifies a username/password pair, enforcing lockout, and on success
    /// issues a fresh token pair and persists its refresh half.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidCredentials`] for an unknown user or bad
    /// password, [`AuthError::AccountLocked`] while locked out, or a store
    /// error.
    pub fn login(&self, username: &str, password: &str, ctx: &RequestContext, now: DateTime<Utc>) -> Result<LoginOutcome, AuthError> {
        let Some(user) = self.store.get_user_by_username(username)? else {
            self.audit(None, username, "login_failure", None, ctx, false, Some("unknown_user"), now)?;
            return Err(AuthError::InvalidCredentials);
        };

        if user.is_locked(now) {
            self.audit(Some(user.id), username, "login_failure", None, ctx, false, Some("account_locked"), now)?;
            return Err(AuthError::AccountLocked { until: user.account_locked_until.map_or_else(String::new, |t| t.to_rfc3339()) });
        }

        let password_ok = bcrypt::verify(password, &user.password_hash)?;
        if !password_ok {
            let attempts = self.store.record_login_failure(user.id, now)?;
            self.audit(Some(user.id), username, "login_failure", None, ctx, false, Some("bad_password"), now)?;
            if attempts >= MAX_FAILED_LOGINS {
                warn!(username, attempts, "account locked after repeated failed logins");
            }
            return Err(AuthError::InvalidCredentials);
        }

        self.store.record_login_success(user.id)?;
        let family = Uuid::new_v4();
        let pair = self.jwt.issue_pair(user.id, &user.username, user.role, user.jwt_version, family)?;
        self.persist_refresh_record(&pair.refresh_claims, &pair.refresh_token, ctx, now)?;
        self.audit(Some(user.id), username, "login_success", None, ctx, true, None, now)?;

        Ok(self.to_outcome(&pair, user.role))
    }

    /// Validates a refresh token, rotates it, and returns a new pair. Replay
    /// of an already-rotated token revokes its whole family.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidToken`] on a malformed/expired JWT,
    /// [`AuthError::UnknownRefreshToken`] if no record matches its `jti`,
    /// [`AuthError::RefreshTokenInvalid`] if the record is revoked or
    /// expired, or a store error.
    pub fn refresh(&self, refresh_token: &str, ctx: &RequestContext, now: DateTime<Utc>) -> Result<LoginOutcome, AuthError> {
        let claims = self.jwt.validate_refresh(refresh_token)?;
        let record_id = claims.jti.parse().map_err(|_| AuthError::UnknownRefreshToken)?;
        let Some(record) = self.store.get_refresh_token(record_id)? else {
            return Err(AuthError::UnknownRefreshToken);
        };

        if record.revoked {
            let family = record.token_family;
            self.store.revoke_token_family(family, "security_incident", now)?;
            self.audit(Some(record.user_id), &claims.username, "refresh_replay_detected", Some(AuthMethod::JwtBearer), ctx, false, Some("token_already_revoked"), now)?;
            return Err(AuthError::RefreshTokenInvalid);
        }
        if !record.is_valid(now) {
            return Err(AuthError::RefreshTokenInvalid);
        }

        let Some(user) = self.store.get_user(record.user_id)? else {
            return Err(AuthError::UnknownSubject);
        };

        let family: Uuid = record.token_family.get();
        let pair = self.jwt.issue_pair(user.id, &user.username, user.role, user.jwt_version, family)?;
        self.store.revoke_refresh_token(record.id, "rotation", now)?;
        self.persist_refresh_record(&pair.refresh_claims, &pair.refresh_token, ctx, now)?;
        self.audit(Some(user.id), &user.username, "refresh", Some(AuthMethod::JwtBearer), ctx, true, None, now)?;

        Ok(self.to_outcome(&pair, user.role))
    }

    /// Revokes the presented refresh token (if any) and blacklists the
    /// current access token by `jti`. When `all` is set, every active
    /// refresh token for the user is revoked instead of just the one
    /// presented.
    ///
    /// # Errors
    /// Returns [`AuthError`] on invalid tokens or a store failure.
    pub fn logout(&self, access_claims: &AccessClaims, refresh_token: Option<&str>, all: bool, ctx: &RequestContext, now: DateTime<Utc>) -> Result<(), AuthError> {
        self.store.blacklist_token(&JwtBlacklistEntry {
            jti: access_claims.jti.clone(),
            user_id: access_claims.user_id,
            expires_at: DateTime::from_timestamp(access_claims.exp, 0).unwrap_or(now),
            blacklisted_at: now,
            reason: "logout".to_owned(),
        })?;

        if let Some(refresh_token) = refresh_token
            && let Ok(claims) = self.jwt.validate_refresh(refresh_token)
            && let Ok(record_id) = claims.jti.parse()
        {
            self.store.revoke_refresh_token(record_id, "logout", now)?;
        }

        if all {
            self.revoke_all_refresh_tokens_for(access_claims.user_id, now)?;
        }

        self.audit(Some(access_claims.user_id), &access_claims.username, "logout", Some(AuthMethod::JwtBearer), ctx, true, None, now)?;
        Ok(())
    }

    /// Fully authenticates a presented access token: signature, issuer,
    /// audience, time bounds, live `jwt_version`, and blacklist.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidToken`], [`AuthError::StaleJwtVersion`],
    /// [`AuthError::TokenBlacklisted`], [`AuthError::UnknownSubject`], or a
    /// store error.
    pub fn authenticate_access(&self, token: &str) -> Result<AccessClaims, AuthError> {
        let claims = self.jwt.validate_access(token)?;
        let Some(user) = self.store.get_user(claims.user_id)? else {
            return Err(AuthError::UnknownSubject);
        };
        if user.jwt_version != claims.jwt_version {
            return Err(AuthError::StaleJwtVersion);
        }
        if self.store.is_token_blacklisted(&claims.jti)? {
            return Err(AuthError::TokenBlacklisted);
        }
        Ok(claims)
    }

    /// Verifies a presented API key against every active, non-expired key,
    /// returning the matched record and stamping its `last_used`.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidCredentials`] if no active key matches,
    /// or a store/hash error.
    pub fn verify_api_key(&self, presented_key: &str, now: DateTime<Utc>) -> Result<ApiKeyRecord, AuthError> {
        for candidate in self.store.list_active_api_keys(now)? {
            if bcrypt::verify(presented_key, &candidate.key_hash)? {
                self.store.touch_api_key(candidate.id, now)?;
                return Ok(candidate);
            }
        }
        Err(AuthError::InvalidCredentials)
    }

    /// Bumps the user's `jwt_version`, invalidating every outstanding
    /// access and refresh token without touching either store table.
    ///
    /// # Errors
    /// Returns [`AuthError`] on a store failure.
    pub fn change_password(&self, user_id: UserId, username: &str, ctx: &RequestContext, now: DateTime<Utc>) -> Result<(), AuthError> {
        self.store.bump_jwt_version(user_id)?;
        self.audit(Some(user_id), username, "password_change", None, ctx, true, None, now)?;
        Ok(())
    }

    /// Deletes refresh token records more than 30 days past expiry or
    /// revocation. Intended to run hourly.
    ///
    /// # Errors
    /// Returns [`AuthError`] on a store failure.
    pub fn run_refresh_token_sweep(&self, now: DateTime<Utc>) -> Result<u32, AuthError> {
        let removed = self.store.sweep_refresh_tokens(now)?;
        info!(removed, "refresh token sweep complete");
        Ok(removed)
    }

    /// Deletes blacklist entries whose token has naturally expired.
    /// Intended to run hourly.
    ///
    /// # Errors
    /// Returns [`AuthError`] on a store failure.
    pub fn run_blacklist_sweep(&self, now: DateTime<Utc>) -> Result<u32, AuthError> {
        let removed = self.store.sweep_jwt_blacklist(now)?;
        info!(removed, "jwt blacklist sweep complete");
        Ok(removed)
    }

    /// Deletes audit entries older than the configured retention window.
    /// Intended to run daily.
    ///
    /// # Errors
    /// Returns [`AuthError`] on a store failure.
    pub fn run_audit_log_sweep(&self, now: DateTime<Utc>) -> Result<u32, AuthError> {
        let removed = self.store.sweep_audit_log(now, self.audit_log_retention_days)?;
        info!(removed, retention_days = self.audit_log_retention_days, "auth audit log sweep complete");
        Ok(removed)
    }

    fn revoke_all_refresh_tokens_for(&self, user_id: UserId, now: DateTime<Utc>) -> Result<(), AuthError> {
        self.store.revoke_all_refresh_tokens_for_user(user_id, "logout_all", now)?;
        Ok(())
    }

    fn persist_refresh_record(&self, claims: &crate::claims::RefreshClaims, encoded_token: &str, ctx: &RequestContext, now: DateTime<Utc>) -> Result<(), AuthError> {
        let id = claims.jti.parse().unwrap_or_else(|_| compliance_core::RefreshTokenId::new_random().get());
        let expires_at = DateTime::from_timestamp(claims.exp, 0).unwrap_or(now + Duration::days(7));
        let record = RefreshTokenRecord {
            id: compliance_core::RefreshTokenId::from_uuid(id),
            user_id: claims.user_id,
            token_hash: hash_token(encoded_token),
            token_family: compliance_core::TokenFamilyId::from_uuid(claims.token_family.parse().unwrap_or_else(|_| Uuid::new_v4())),
            expires_at,
            created_at: now,
            last_used: None,
            revoked: false,
            revoked_at: None,
            revoked_reason: None,
            ip_address: ctx.ip_address.clone(),
            user_agent: ctx.user_agent.clone(),
            device_fingerprint: None,
        };
        self.store.insert_refresh_token(&record)?;
        Ok(())
    }

    fn to_outcome(&self, pair: &crate::jwt::TokenPair, role: UserRole) -> LoginOutcome {
        let expires_at = DateTime::from_timestamp(pair.access_claims.exp, 0).unwrap_or_else(Utc::now);
        LoginOutcome {
            access_token: pair.access_token.clone(),
            refresh_token: pair.refresh_token.clone(),
            token_type: "Bearer",
            expires_in: self.jwt.access_lifetime_seconds(),
            expires_at: expires_at.to_rfc3339(),
            user: UserSummary {
                id: pair.access_claims.user_id,
                username: pair.access_claims.username.clone(),
                role,
                permissions: pair.access_claims.permissions.clone(),
            },
        }
    }

    #[allow(clippy::too_many_arguments, reason = "every field is required by the auth audit schema; grouping into a struct would just move the arity to a constructor")]
    fn audit(
        &self,
        user_id: Option<UserId>,
        username: &str,
        event_type: &str,
        auth_method: Option<AuthMethod>,
        ctx: &RequestContext,
        success: bool,
        failure_reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        self.store.record_audit_entry(&AuthAuditEntry {
            id: AuditEntryId::new_random(),
            user_id,
            username: username.to_owned(),
            event_type: event_type.to_owned(),
            auth_method,
            ip_address: ctx.ip_address.clone(),
            user_agent: ctx.user_agent.clone(),
            success,
            failure_reason: failure_reason.map(str::to_owned),
            timestamp: now,
            metadata: serde_json::json!({}),
        })?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test fixtures favor direct unwraps for setup clarity.")]

    use super::*;

    fn service() -> AuthService {
        let store = Arc::new(ComplianceStore::open_in_memory().unwrap());
        let jwt = JwtCodec::new("test-secret-key-at-least-32-bytes-long", "compliance-toolkit", "compliance-toolkit-clients", 15, 7);
        AuthService::new(store, jwt, 90)
    }

    fn ctx() -> RequestContext {
        RequestContext { ip_address: Some("127.0.0.1".to_owned()), user_agent: Some("test-agent".to_owned()) }
    }

    #[test]
    fn login_with_unknown_user_fails() {
        let service = service();
        let err = service.login("nobody", "whatever", &ctx(), Utc::now()).unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[test]
    fn login_succeeds_and_access_token_authenticates() {
        let service = service();
        let now = Utc::now();
        let hash = crate::hash_password("correct horse").unwrap();
        service.store.create_user("admin", &hash, UserRole::Admin, now).unwrap();

        let outcome = service.login("admin", "correct horse", &ctx(), now).unwrap();
        let claims = service.authenticate_access(&outcome.access_token).unwrap();
        assert_eq!(claims.username, "admin");
    }

    #[test]
    fn five_failed_logins_lock_the_account() {
        let service = service();
        let now = Utc::now();
        let hash = crate::hash_password("correct horse").unwrap();
        service.store.create_user("admin", &hash, UserRole::Admin, now).unwrap();

        for _ in 0..5 {
            let _ = service.login("admin", "wrong", &ctx(), now);
        }
        let err = service.login("admin", "correct horse", &ctx(), now).unwrap_err();
        assert!(matches!(err, AuthError::AccountLocked { .. }));
    }

    #[test]
    fn refresh_rotates_and_old_token_cannot_be_reused() {
        let service = service();
        let now = Utc::now();
        let hash = crate::hash_password("correct horse").unwrap();
        service.store.create_user("admin", &hash, UserRole::Admin, now).unwrap();
        let first = service.login("admin", "correct horse", &ctx(), now).unwrap();

        let rotated = service.refresh(&first.refresh_token, &ctx(), now).unwrap();
        assert_ne!(rotated.access_token, first.access_token);

        let replay = service.refresh(&first.refresh_token, &ctx(), now);
        assert!(replay.is_err());
    }

    #[test]
    fn replaying_a_rotated_refresh_token_burns_the_whole_family() {
        let service = service();
        let now = Utc::now();
        let hash = crate::hash_password("correct horse").unwrap();
        service.store.create_user("admin", &hash, UserRole::Admin, now).unwrap();
        let first = service.login("admin", "correct horse", &ctx(), now).unwrap();
        let rotated = service.refresh(&first.refresh_token, &ctx(), now).unwrap();

        // Replaying the already-rotated token should burn the family, so the
        // freshly rotated descendant stops working too.
        let _ = service.refresh(&first.refresh_token, &ctx(), now);
        let descendant_replay = service.refresh(&rotated.refresh_token, &ctx(), now);
        assert!(descendant_replay.is_err());
    }

    #[test]
    fn logout_blacklists_the_access_token() {
        let service = service();
        let now = Utc::now();
        let hash = crate::hash_password("correct horse").unwrap();
        service.store.create_user("admin", &hash, UserRole::Admin, now).unwrap();
        let outcome = service.login("admin", "correct horse", &ctx(), now).unwrap();
        let claims = service.jwt.validate_access(&outcome.access_token).unwrap();

        service.logout(&claims, Some(&outcome.refresh_token), false, &ctx(), now).unwrap();

        let err = service.authenticate_access(&outcome.access_token).unwrap_err();
        assert!(matches!(err, AuthError::TokenBlacklisted));
    }

    #[test]
    fn password_change_invalidates_outstanding_access_tokens() {
        let service = service();
        let now = Utc::now();
        let hash = crate::hash_password("correct horse").unwrap();
        let user = service.store.create_user("admin", &hash, UserRole::Admin, now).unwrap();
        let outcome = service.login("admin", "correct horse", &ctx(), now).unwrap();

        service.change_password(user.id, "admin", &ctx(), now).unwrap();

        let err = service.authenticate_access(&outcome.access_token).unwrap_err();
        assert!(matches!(err, AuthError::StaleJwtVersion));
    }

    #[test]
    fn api_key_verification_matches_active_keys_only() {
        let service = service();
        let now = Utc::now();
        let key_hash = bcrypt::hash("shh-its-a-secret", bcrypt::DEFAULT_COST).unwrap();
        service
            .store
            .create_api_key(&ApiKeyRecord {
                id: compliance_core::ApiKeyId::new_random(),
                name: "ci".to_owned(),
                key_hash,
                key_prefix: "ck_live".to_owned(),
                created_by: "system".to_owned(),
                created_at: now,
                last_used: None,
                expires_at: None,
                is_active: true,
            })
            .unwrap();

        let matched = service.verify_api_key("shh-its-a-secret", now).unwrap();
        assert_eq!(matched.name, "ci");
        assert!(service.verify_api_key("wrong-key", now).is_err());
    }
}
