// crates/compliance-store/src/types.rs
// ============================================================================
// Module: Ingestion Store Domain Types
// Description: Row types persisted by the Ingestion Store (§3 data model).
// Purpose: One typed shape per table, shared by `compliance-store`,
//          `compliance-auth`, and `compliance-server`.
// Dependencies: compliance-core, chrono, serde, uuid
// ============================================================================

//! ## Overview
//! These types mirror table rows exactly; no normalization or joining
//! happens above this layer. `compliance-auth` and `compliance-server`
//! depend on this crate for the shapes, not just the storage.

// ============================================================================
// SECTION: Imports
// ============================================================================

use chrono::DateTime;
use chrono::Utc;
use compliance_core::ClientId;
use compliance_core::EvidenceRecord;
use compliance_core::RefreshTokenId;
use compliance_core::SubmissionId;
use compliance_core::TokenFamilyId;
use compliance_core::UserId;
use compliance_core::UserRole;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Client
// ============================================================================

/// An enrolled endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    /// Server-assigned identifier.
    pub id: ClientId,
    /// Reported hostname; unique.
    pub hostname: String,
    /// Agent-chosen logical client id; unique.
    pub client_id: String,
    /// First submission's arrival time.
    pub first_seen: DateTime<Utc>,
    /// Most recent submission's arrival time.
    pub last_seen: DateTime<Utc>,
    /// Free-text status (e.g. `"active"`).
    pub status: String,
    /// Opaque JSON metadata.
    pub metadata: serde_json::Value,
}

// ============================================================================
// SECTION: Submission
// ============================================================================

/// A persisted scan submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    /// Globally unique submission identifier.
    pub submission_id: SubmissionId,
    /// Owning client.
    pub client_id: ClientId,
    /// Hostname at submission time, denormalized for quick listing.
    pub hostname: String,
    /// Submission arrival time.
    pub timestamp: DateTime<Utc>,
    /// Logical report type.
    pub report_type: String,
    /// Report content version.
    pub report_version: String,
    /// Overall status summary, e.g. `"COMPLETED"`.
    pub overall_status: String,
    /// Aggregate counts, serialized from `compliance_core::ScanSummary`.
    pub counts: serde_json::Value,
    /// The full evidence record, serialized.
    pub evidence: EvidenceRecord,
    /// Row insertion time.
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// SECTION: User
// ============================================================================

/// A dashboard/API user account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Server-assigned identifier.
    pub id: UserId,
    /// Unique login name.
    pub username: String,
    /// Bcrypt password hash.
    pub password_hash: String,
    /// Authorization role.
    pub role: UserRole,
    /// Incremented on password change; invalidates all outstanding JWTs.
    pub jwt_version: i64,
    /// When the password was last changed.
    pub password_changed_at: DateTime<Utc>,
    /// Consecutive failed login attempts since the last success.
    pub failed_login_attempts: i64,
    /// Set when locked; `None` or in the past means not locked.
    pub account_locked_until: Option<DateTime<Utc>>,
    /// Whether MFA is enabled for this account.
    pub mfa_enabled: bool,
    /// MFA secret, if enrolled.
    pub mfa_secret: Option<String>,
}

impl User {
    /// True when `account_locked_until` is set and in the future.
    #[must_use]
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.account_locked_until.is_some_and(|until| until > now)
    }
}

// ============================================================================
// SECTION: Refresh Token
// ============================================================================

/// A single refresh token rotation record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshTokenRecord {
    /// Record identifier.
    pub id: RefreshTokenId,
    /// Owning user.
    pub user_id: UserId,
    /// Bcrypt hash of the refresh token's `jti`-derived secret.
    pub token_hash: String,
    /// Rotation chain identifier; shared by every descendant token.
    pub token_family: TokenFamilyId,
    /// Expiry time.
    pub expires_at: DateTime<Utc>,
    /// Record creation time.
    pub created_at: DateTime<Utc>,
    /// Last time this token was presented.
    pub last_used: Option<DateTime<Utc>>,
    /// Whether this record has been revoked.
    pub revoked: bool,
    /// Revocation time, if any.
    pub revoked_at: Option<DateTime<Utc>>,
    /// Revocation reason, e.g. `"rotation"` or `"security_incident"`.
    pub revoked_reason: Option<String>,
    /// Client IP at issuance.
    pub ip_address: Option<String>,
    /// User agent at issuance.
    pub user_agent: Option<String>,
    /// Opaque device fingerprint, if supplied.
    pub device_fingerprint: Option<String>,
}

impl RefreshTokenRecord {
    /// True when not revoked and not yet expired.
    #[must_use]
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && self.expires_at > now
    }
}

// ============================================================================
// SECTION: JWT Blacklist
// ============================================================================

/// A blacklisted access-token `jti`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JwtBlacklistEntry {
    /// The blacklisted token's `jti` claim; unique.
    pub jti: String,
    /// Owning user.
    pub user_id: UserId,
    /// The token's natural expiry; entries are pruned once past this.
    pub expires_at: DateTime<Utc>,
    /// When the entry was added.
    pub blacklisted_at: DateTime<Utc>,
    /// Reason, e.g. `"logout"`.
    pub reason: String,
}

// ============================================================================
// SECTION: Auth Audit
// ============================================================================

/// One authentication-related audit log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthAuditEntry {
    /// Server-assigned identifier.
    pub id: compliance_core::AuditEntryId,
    /// Subject user, if resolvable at the time of the event.
    pub user_id: Option<UserId>,
    /// Username as presented, even if the user does not exist.
    pub username: String,
    /// Event kind, e.g. `"login_success"`, `"login_failure"`, `"refresh"`.
    pub event_type: String,
    /// Authentication method involved, if any.
    pub auth_method: Option<compliance_core::AuthMethod>,
    /// Client IP address.
    pub ip_address: Option<String>,
    /// Client user agent.
    pub user_agent: Option<String>,
    /// Whether the underlying operation succeeded.
    pub success: bool,
    /// Failure reason, if `success` is false.
    pub failure_reason: Option<String>,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Opaque JSON metadata.
    pub metadata: serde_json::Value,
}

// ============================================================================
// SECTION: API Key
// ============================================================================

/// A statically provisioned or server-issued API key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKeyRecord {
    /// Server-assigned identifier.
    pub id: compliance_core::ApiKeyId,
    /// Display name.
    pub name: String,
    /// Bcrypt hash of the full key.
    pub key_hash: String,
    /// First several characters of the key, for display/lookup hints.
    pub key_prefix: String,
    /// Username or `"system"` that created the key.
    pub created_by: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last time this key authenticated a request.
    pub last_used: Option<DateTime<Utc>>,
    /// Optional expiry.
    pub expires_at: Option<DateTime<Utc>>,
    /// Whether the key is currently usable.
    pub is_active: bool,
}
