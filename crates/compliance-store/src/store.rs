// crates/compliance-store/src/store.rs
// ============================================================================
// Module: SQLite-backed Ingestion Store
// Description: Connection setup, versioned schema migration, and typed CRUD
//              over the nine Ingestion Store tables.
// Purpose: Give `compliance-auth` and `compliance-server` a single,
//          WAL-mode-safe persistence handle.
// Dependencies: rusqlite (bundled), chrono, serde_json, compliance-core,
//               tracing, uuid
// ============================================================================

//! ## Overview
//! Mirrors the pragma and versioned-migration shape used throughout the
//! pack's embedded-SQLite stores: open in WAL mode with a busy timeout,
//! track applied migrations in a `schema_migrations` table, and apply each
//! migration in its own transaction. A migration is applied only if its
//! version is absent from that table.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::sync::Mutex;

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use compliance_core::AuditEntryId;
use compliance_core::AuthMethod;
use compliance_core::ClientId;
use compliance_core::RefreshTokenId;
use compliance_core::SubmissionId;
use compliance_core::TokenFamilyId;
use compliance_core::UserId;
use compliance_core::UserRole;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;
use tracing::debug;
use tracing::info;
use uuid::Uuid;

use crate::types::ApiKeyRecord;
use crate::types::AuthAuditEntry;
use crate::types::Client;
use crate::types::JwtBlacklistEntry;
use crate::types::RefreshTokenRecord;
use crate::types::Submission;
use crate::types::User;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failures arising from opening, migrating, or querying the store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The underlying SQLite driver returned an error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored JSON column failed to parse.
    #[error("malformed json in column {column}: {source}")]
    MalformedJson {
        /// Offending column name.
        column: &'static str,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
    /// A stored identifier or timestamp column failed to parse.
    #[error("malformed value in column {column}: {reason}")]
    MalformedValue {
        /// Offending column name.
        column: &'static str,
        /// Human-readable reason.
        reason: String,
    },
    /// The connection mutex was poisoned by a panicking holder.
    #[error("store connection lock poisoned")]
    LockPoisoned,
}

type StoreResult<T> = Result<T, StoreError>;

// ============================================================================
// SECTION: Schema
// ============================================================================

const MIGRATIONS: &[(i64, &str, &str)] = &[
    (
        1,
        "clients and submissions",
        r"
        CREATE TABLE clients (
            id TEXT PRIMARY KEY,
            hostname TEXT NOT NULL UNIQUE,
            client_id TEXT NOT NULL UNIQUE,
            first_seen TEXT NOT NULL,
            last_seen TEXT NOT NULL,
            status TEXT NOT NULL,
            metadata TEXT NOT NULL
        );
        CREATE TABLE submissions (
            submission_id TEXT PRIMARY KEY,
            client_id TEXT NOT NULL REFERENCES clients(id),
            hostname TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            report_type TEXT NOT NULL,
            report_version TEXT NOT NULL,
            overall_status TEXT NOT NULL,
            counts TEXT NOT NULL,
            evidence TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        CREATE TABLE query_results (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            submission_id TEXT NOT NULL REFERENCES submissions(submission_id),
            query_name TEXT NOT NULL,
            status TEXT NOT NULL
        );
        CREATE INDEX idx_query_results_name_status ON query_results(query_name, status);
        ",
    ),
    (
        2,
        "users",
        r"
        CREATE TABLE users (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL,
            jwt_version INTEGER NOT NULL,
            password_changed_at TEXT NOT NULL,
            failed_login_attempts INTEGER NOT NULL,
            account_locked_until TEXT,
            mfa_enabled INTEGER NOT NULL,
            mfa_secret TEXT
        );
        ",
    ),
    (
        3,
        "refresh tokens and jwt blacklist",
        r"
        CREATE TABLE refresh_tokens (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id),
            token_hash TEXT NOT NULL,
            token_family TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            created_at TEXT NOT NULL,
            last_used TEXT,
            revoked INTEGER NOT NULL,
            revoked_at TEXT,
            revoked_reason TEXT,
            ip_address TEXT,
            user_agent TEXT,
            device_fingerprint TEXT
        );
        CREATE INDEX idx_refresh_tokens_user_id ON refresh_tokens(user_id);
        CREATE INDEX idx_refresh_tokens_expires_at ON refresh_tokens(expires_at);
        CREATE INDEX idx_refresh_tokens_revoked ON refresh_tokens(revoked);
        CREATE INDEX idx_refresh_tokens_token_family ON refresh_tokens(token_family);
        CREATE TABLE jwt_blacklist (
            jti TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id),
            expires_at TEXT NOT NULL,
            blacklisted_at TEXT NOT NULL,
            reason TEXT NOT NULL
        );
        CREATE INDEX idx_jwt_blacklist_expires_at ON jwt_blacklist(expires_at);
        ",
    ),
    (
        4,
        "auth audit log and api keys",
        r"
        CREATE TABLE auth_audit_log (
            id TEXT PRIMARY KEY,
            user_id TEXT,
            username TEXT NOT NULL,
            event_type TEXT NOT NULL,
            auth_method TEXT,
            ip_address TEXT,
            user_agent TEXT,
            success INTEGER NOT NULL,
            failure_reason TEXT,
            timestamp TEXT NOT NULL,
            metadata TEXT NOT NULL
        );
        CREATE INDEX idx_auth_audit_user_id ON auth_audit_log(user_id);
        CREATE INDEX idx_auth_audit_timestamp ON auth_audit_log(timestamp);
        CREATE INDEX idx_auth_audit_event_type ON auth_audit_log(event_type);
        CREATE TABLE api_keys (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            key_hash TEXT NOT NULL,
            key_prefix TEXT NOT NULL,
            created_by TEXT NOT NULL,
            created_at TEXT NOT NULL,
            last_used TEXT,
            expires_at TEXT,
            is_active INTEGER NOT NULL
        );
        ",
    ),
];

// ============================================================================
// SECTION: Store
// ============================================================================

/// A handle to the Ingestion Store's SQLite database.
///
/// Cloning the handle is not supported; share one `ComplianceStore` behind
/// an `Arc` across request handlers and sweeper tasks.
pub struct ComplianceStore {
    conn: Mutex<Connection>,
}

impl ComplianceStore {
    /// Opens (creating if absent) the database at `path`, applies pragmas,
    /// and runs any migration whose version is not yet recorded.
    ///
    /// # Errors
    /// Returns [`StoreError::Sqlite`] if the file cannot be opened or a
    /// migration statement fails.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let mut conn = Connection::open(path.as_ref())?;
        apply_pragmas(&conn)?;
        run_migrations(&mut conn)?;
        info!(path = %path.as_ref().display(), "ingestion store opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens an in-memory database, primarily for tests.
    ///
    /// # Errors
    /// Returns [`StoreError::Sqlite`] if a migration statement fails.
    pub fn open_in_memory() -> StoreResult<Self> {
        let mut conn = Connection::open_in_memory()?;
        apply_pragmas(&conn)?;
        run_migrations(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Locks the underlying connection, mapping a poisoned mutex to
    /// [`StoreError::LockPoisoned`].
    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    // ------------------------------------------------------------------
    // Clients
    // ------------------------------------------------------------------

    /// Inserts a new client, or touches `last_seen` if the hostname already
    /// exists, returning the resolved row.
    ///
    /// # Errors
    /// Returns [`StoreError`] on any underlying SQLite failure.
    pub fn upsert_client(&self, hostname: &str, client_id: &str, now: DateTime<Utc>) -> StoreResult<Client> {
        let conn = self.lock()?;
        let existing: Option<String> = conn
            .query_row("SELECT id FROM clients WHERE hostname = ?1", params![hostname], |row| row.get(0))
            .optional()?;
        let id = match existing {
            Some(raw) => {
                conn.execute(
                    "UPDATE clients SET last_seen = ?1 WHERE hostname = ?2",
                    params![now.to_rfc3339(), hostname],
                )?;
                raw
            }
            None => {
                let id = ClientId::new_random();
                conn.execute(
                    "INSERT INTO clients (id, hostname, client_id, first_seen, last_seen, status, metadata)
                     VALUES (?1, ?2, ?3, ?4, ?4, 'active', '{}')",
                    params![id.to_string(), hostname, client_id, now.to_rfc3339()],
                )?;
                id.to_string()
            }
        };
        drop(conn);
        self.get_client_by_id_str(&id)
    }

    /// Re-reads a client row by its string-form identifier, used right
    /// after an insert or update to return the canonical row.
    fn get_client_by_id_str(&self, id: &str) -> StoreResult<Client> {
        let conn = self.lock()?;
        conn.query_row("SELECT id, hostname, client_id, first_seen, last_seen, status, metadata FROM clients WHERE id = ?1", params![id], row_to_client)
            .map_err(StoreError::from)
    }

    /// Looks up a client by its server-assigned identifier.
    ///
    /// # Errors
    /// Returns [`StoreError`] on any underlying SQLite failure.
    pub fn get_client(&self, id: ClientId) -> StoreResult<Option<Client>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, hostname, client_id, first_seen, last_seen, status, metadata FROM clients WHERE id = ?1",
            params![id.to_string()],
            row_to_client,
        )
        .optional()
        .map_err(StoreError::from)
    }

    /// Lists every known client, ordered by most recently seen.
    ///
    /// # Errors
    /// Returns [`StoreError`] on any underlying SQLite failure.
    pub fn list_clients(&self) -> StoreResult<Vec<Client>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, hostname, client_id, first_seen, last_seen, status, metadata FROM clients ORDER BY last_seen DESC",
        )?;
        let rows = stmt.query_map([], row_to_client)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }

    // ------------------------------------------------------------------
    // Submissions
    // ------------------------------------------------------------------

    /// Persists one submission and its per-check result index rows.
    ///
    /// # Errors
    /// Returns [`StoreError`] on any underlying SQLite or serialization
    /// failure.
    pub fn insert_submission(&self, submission: &Submission) -> StoreResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let counts = serde_json::to_string(&submission.counts).map_err(|source| StoreError::MalformedJson { column: "counts", source })?;
        let evidence = serde_json::to_string(&submission.evidence).map_err(|source| StoreError::MalformedJson { column: "evidence", source })?;
        tx.execute(
            "INSERT INTO submissions (submission_id, client_id, hostname, timestamp, report_type, report_version, overall_status, counts, evidence, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                submission.submission_id.to_string(),
                submission.client_id.to_string(),
                submission.hostname,
                submission.timestamp.to_rfc3339(),
                submission.report_type,
                submission.report_version,
                submission.overall_status,
                counts,
                evidence,
                submission.created_at.to_rfc3339(),
            ],
        )?;
        for (name, result) in &submission.evidence.scan_results {
            tx.execute(
                "INSERT INTO query_results (submission_id, query_name, status) VALUES (?1, ?2, ?3)",
                params![submission.submission_id.to_string(), name, query_status_label(result.status)],
            )?;
        }
        tx.commit()?;
        debug!(submission_id = %submission.submission_id, "submission persisted");
        Ok(())
    }

    /// Looks up one submission by its identifier.
    ///
    /// # Errors
    /// Returns [`StoreError`] on any underlying SQLite or deserialization
    /// failure.
    pub fn get_submission(&self, id: SubmissionId) -> StoreResult<Option<Submission>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT submission_id, client_id, hostname, timestamp, report_type, report_version, overall_status, counts, evidence, created_at
             FROM submissions WHERE submission_id = ?1",
            params![id.to_string()],
            row_to_submission,
        )
        .optional()
        .map_err(StoreError::from)
    }

    /// Lists the most recent submissions for a client, newest first.
    ///
    /// # Errors
    /// Returns [`StoreError`] on any underlying SQLite or deserialization
    /// failure.
    pub fn list_submissions_for_client(&self, client_id: ClientId, limit: u32) -> StoreResult<Vec<Submission>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT submission_id, client_id, hostname, timestamp, report_type, report_version, overall_status, counts, evidence, created_at
             FROM submissions WHERE client_id = ?1 ORDER BY timestamp DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![client_id.to_string(), limit], row_to_submission)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// Inserts a new user account.
    ///
    /// # Errors
    /// Returns [`StoreError`] on any underlying SQLite failure, including a
    /// unique-constraint violation on `username`.
    pub fn create_user(&self, username: &str, password_hash: &str, role: UserRole, now: DateTime<Utc>) -> StoreResult<User> {
        let conn = self.lock()?;
        let id = UserId::new_random();
        conn.execute(
            "INSERT INTO users (id, username, password_hash, role, jwt_version, password_changed_at, failed_login_attempts, account_locked_until, mfa_enabled, mfa_secret)
             VALUES (?1, ?2, ?3, ?4, 0, ?5, 0, NULL, 0, NULL)",
            params![id.to_string(), username, password_hash, role.to_string(), now.to_rfc3339()],
        )?;
        Ok(User {
            id,
            username: username.to_owned(),
            password_hash: password_hash.to_owned(),
            role,
            jwt_version: 0,
            password_changed_at: now,
            failed_login_attempts: 0,
            account_locked_until: None,
            mfa_enabled: false,
            mfa_secret: None,
        })
    }

    /// Looks up a user by username.
    ///
    /// # Errors
    /// Returns [`StoreError`] on any underlying SQLite or deserialization
    /// failure.
    pub fn get_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, username, password_hash, role, jwt_version, password_changed_at, failed_login_attempts, account_locked_until, mfa_enabled, mfa_secret
             FROM users WHERE username = ?1",
            params![username],
            row_to_user,
        )
        .optional()
        .map_err(StoreError::from)
    }

    /// Looks up a user by identifier.
    ///
    /// # Errors
    /// Returns [`StoreError`] on any underlying SQLite or deserialization
    /// failure.
    pub fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, username, password_hash, role, jwt_version, password_changed_at, failed_login_attempts, account_locked_until, mfa_enabled, mfa_secret
             FROM users WHERE id = ?1",
            params![id.to_string()],
            row_to_user,
        )
        .optional()
        .map_err(StoreError::from)
    }

    /// Records a failed login attempt, locking the account for 30 minutes
    /// once the 5th consecutive failure is recorded.
    ///
    /// # Errors
    /// Returns [`StoreError`] on any underlying SQLite failure.
    pub fn record_login_failure(&self, user_id: UserId, now: DateTime<Utc>) -> StoreResult<i64> {
        const MAX_ATTEMPTS: i64 = 5;
        const LOCKOUT_MINUTES: i64 = 30;
        let conn = self.lock()?;
        let attempts: i64 = conn.query_row(
            "UPDATE users SET failed_login_attempts = failed_login_attempts + 1 WHERE id = ?1 RETURNING failed_login_attempts",
            params![user_id.to_string()],
            |row| row.get(0),
        )?;
        if attempts >= MAX_ATTEMPTS {
            let until = now + Duration::minutes(LOCKOUT_MINUTES);
            conn.execute(
                "UPDATE users SET account_locked_until = ?1 WHERE id = ?2",
                params![until.to_rfc3339(), user_id.to_string()],
            )?;
        }
        Ok(attempts)
    }

    /// Clears the failure counter and any lock after a successful login.
    ///
    /// # Errors
    /// Returns [`StoreError`] on any underlying SQLite failure.
    pub fn record_login_success(&self, user_id: UserId) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE users SET failed_login_attempts = 0, account_locked_until = NULL WHERE id = ?1",
            params![user_id.to_string()],
        )?;
        Ok(())
    }

    /// Increments `jwt_version`, invalidating every outstanding access token.
    ///
    /// # Errors
    /// Returns [`StoreError`] on any underlying SQLite failure.
    pub fn bump_jwt_version(&self, user_id: UserId) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute("UPDATE users SET jwt_version = jwt_version + 1 WHERE id = ?1", params![user_id.to_string()])?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Refresh tokens
    // ------------------------------------------------------------------

    /// Inserts a new refresh token record.
    ///
    /// # Errors
    /// Returns [`StoreError`] on any underlying SQLite failure.
    pub fn insert_refresh_token(&self, record: &RefreshTokenRecord) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO refresh_tokens (id, user_id, token_hash, token_family, expires_at, created_at, last_used, revoked, revoked_at, revoked_reason, ip_address, user_agent, device_fingerprint)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                record.id.to_string(),
                record.user_id.to_string(),
                record.token_hash,
                record.token_family.to_string(),
                record.expires_at.to_rfc3339(),
                record.created_at.to_rfc3339(),
                record.last_used.map(|t| t.to_rfc3339()),
                record.revoked,
                record.revoked_at.map(|t| t.to_rfc3339()),
                record.revoked_reason,
                record.ip_address,
                record.user_agent,
                record.device_fingerprint,
            ],
        )?;
        Ok(())
    }

    /// Looks up a refresh token record by identifier.
    ///
    /// # Errors
    /// Returns [`StoreError`] on any underlying SQLite or deserialization
    /// failure.
    pub fn get_refresh_token(&self, id: RefreshTokenId) -> StoreResult<Option<RefreshTokenRecord>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, user_id, token_hash, token_family, expires_at, created_at, last_used, revoked, revoked_at, revoked_reason, ip_address, user_agent, device_fingerprint
             FROM refresh_tokens WHERE id = ?1",
            params![id.to_string()],
            row_to_refresh_token,
        )
        .optional()
        .map_err(StoreError::from)
    }

    /// Marks a single refresh token revoked.
    ///
    /// # Errors
    /// Returns [`StoreError`] on any underlying SQLite failure.
    pub fn revoke_refresh_token(&self, id: RefreshTokenId, reason: &str, now: DateTime<Utc>) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE refresh_tokens SET revoked = 1, revoked_at = ?1, revoked_reason = ?2 WHERE id = ?3",
            params![now.to_rfc3339(), reason, id.to_string()],
        )?;
        Ok(())
    }

    /// Revokes every refresh token in a rotation family. Used when replay of
    /// an already-rotated token is detected.
    ///
    /// # Errors
    /// Returns [`StoreError`] on any underlying SQLite failure.
    pub fn revoke_token_family(&self, family: TokenFamilyId, reason: &str, now: DateTime<Utc>) -> StoreResult<u32> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE refresh_tokens SET revoked = 1, revoked_at = ?1, revoked_reason = ?2 WHERE token_family = ?3 AND revoked = 0",
            params![now.to_rfc3339(), reason, family.to_string()],
        )?;
        #[allow(clippy::cast_possible_truncation, reason = "a rotation family never grows near u32::MAX")]
        Ok(changed as u32)
    }

    /// Revokes every active refresh token owned by one user. Used by
    /// "logout all".
    ///
    /// # Errors
    /// Returns [`StoreError`] on any underlying SQLite failure.
    pub fn revoke_all_refresh_tokens_for_user(&self, user_id: UserId, reason: &str, now: DateTime<Utc>) -> StoreResult<u32> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE refresh_tokens SET revoked = 1, revoked_at = ?1, revoked_reason = ?2 WHERE user_id = ?3 AND revoked = 0",
            params![now.to_rfc3339(), reason, user_id.to_string()],
        )?;
        #[allow(clippy::cast_possible_truncation, reason = "one user's active refresh tokens never approach u32::MAX")]
        Ok(changed as u32)
    }

    /// Deletes refresh tokens expired or revoked more than 30 days ago.
    ///
    /// # Errors
    /// Returns [`StoreError`] on any underlying SQLite failure.
    pub fn sweep_refresh_tokens(&self, now: DateTime<Utc>) -> StoreResult<u32> {
        let cutoff = (now - Duration::days(30)).to_rfc3339();
        let conn = self.lock()?;
        let changed = conn.execute(
            "DELETE FROM refresh_tokens WHERE expires_at < ?1 OR (revoked = 1 AND revoked_at < ?1)",
            params![cutoff],
        )?;
        #[allow(clippy::cast_possible_truncation, reason = "deleted row counts stay far below u32::MAX")]
        Ok(changed as u32)
    }

    // ------------------------------------------------------------------
    // JWT blacklist
    // ------------------------------------------------------------------

    /// Adds a `jti` to the blacklist, e.g. on logout.
    ///
    /// # Errors
    /// Returns [`StoreError`] on any underlying SQLite failure.
    pub fn blacklist_token(&self, entry: &JwtBlacklistEntry) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO jwt_blacklist (jti, user_id, expires_at, blacklisted_at, reason)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.jti,
                entry.user_id.to_string(),
                entry.expires_at.to_rfc3339(),
                entry.blacklisted_at.to_rfc3339(),
                entry.reason,
            ],
        )?;
        Ok(())
    }

    /// True if `jti` is present on the blacklist.
    ///
    /// # Errors
    /// Returns [`StoreError`] on any underlying SQLite failure.
    pub fn is_token_blacklisted(&self, jti: &str) -> StoreResult<bool> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM jwt_blacklist WHERE jti = ?1", params![jti], |row| row.get(0))?;
        Ok(count > 0)
    }

    /// Deletes blacklist entries whose token has already expired naturally.
    ///
    /// # Errors
    /// Returns [`StoreError`] on any underlying SQLite failure.
    pub fn sweep_jwt_blacklist(&self, now: DateTime<Utc>) -> StoreResult<u32> {
        let conn = self.lock()?;
        let changed = conn.execute("DELETE FROM jwt_blacklist WHERE expires_at < ?1", params![now.to_rfc3339()])?;
        #[allow(clippy::cast_possible_truncation, reason = "deleted row counts stay far below u32::MAX")]
        Ok(changed as u32)
    }

    // ------------------------------------------------------------------
    // Auth audit log
    // ------------------------------------------------------------------

    /// Appends one auth audit entry.
    ///
    /// # Errors
    /// Returns [`StoreError`] on any underlying SQLite or serialization
    /// failure.
    pub fn record_audit_entry(&self, entry: &AuthAuditEntry) -> StoreResult<()> {
        let conn = self.lock()?;
        let metadata = serde_json::to_string(&entry.metadata).map_err(|source| StoreError::MalformedJson { column: "metadata", source })?;
        conn.execute(
            "INSERT INTO auth_audit_log (id, user_id, username, event_type, auth_method, ip_address, user_agent, success, failure_reason, timestamp, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                entry.id.to_string(),
                entry.user_id.map(|id| id.to_string()),
                entry.username,
                entry.event_type,
                entry.auth_method.map(|m| m.to_string()),
                entry.ip_address,
                entry.user_agent,
                entry.success,
                entry.failure_reason,
                entry.timestamp.to_rfc3339(),
                metadata,
            ],
        )?;
        Ok(())
    }

    /// Lists the most recent audit entries for one user, newest first.
    ///
    /// # Errors
    /// Returns [`StoreError`] on any underlying SQLite or deserialization
    /// failure.
    pub fn list_audit_entries_for_user(&self, user_id: UserId, limit: u32) -> StoreResult<Vec<AuthAuditEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, username, event_type, auth_method, ip_address, user_agent, success, failure_reason, timestamp, metadata
             FROM auth_audit_log WHERE user_id = ?1 ORDER BY timestamp DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![user_id.to_string(), limit], row_to_audit_entry)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }

    /// Deletes audit entries older than `retention_days`.
    ///
    /// # Errors
    /// Returns [`StoreError`] on any underlying SQLite failure.
    pub fn sweep_audit_log(&self, now: DateTime<Utc>, retention_days: i64) -> StoreResult<u32> {
        let cutoff = (now - Duration::days(retention_days)).to_rfc3339();
        let conn = self.lock()?;
        let changed = conn.execute("DELETE FROM auth_audit_log WHERE timestamp < ?1", params![cutoff])?;
        #[allow(clippy::cast_possible_truncation, reason = "deleted row counts stay far below u32::MAX")]
        Ok(changed as u32)
    }

    // ------------------------------------------------------------------
    // API keys
    // ------------------------------------------------------------------

    /// Inserts a new API key record.
    ///
    /// # Errors
    /// Returns [`StoreError`] on any underlying SQLite failure.
    pub fn create_api_key(&self, record: &ApiKeyRecord) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO api_keys (id, name, key_hash, key_prefix, created_by, created_at, last_used, expires_at, is_active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                record.id.to_string(),
                record.name,
                record.key_hash,
                record.key_prefix,
                record.created_by,
                record.created_at.to_rfc3339(),
                record.last_used.map(|t| t.to_rfc3339()),
                record.expires_at.map(|t| t.to_rfc3339()),
                record.is_active,
            ],
        )?;
        Ok(())
    }

    /// Lists active, non-expired API keys as of `now`.
    ///
    /// # Errors
    /// Returns [`StoreError`] on any underlying SQLite or deserialization
    /// failure.
    pub fn list_active_api_keys(&self, now: DateTime<Utc>) -> StoreResult<Vec<ApiKeyRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, key_hash, key_prefix, created_by, created_at, last_used, expires_at, is_active
             FROM api_keys WHERE is_active = 1 AND (expires_at IS NULL OR expires_at > ?1)",
        )?;
        let rows = stmt.query_map(params![now.to_rfc3339()], row_to_api_key)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }

    /// Stamps `last_used` on an API key.
    ///
    /// # Errors
    /// Returns [`StoreError`] on any underlying SQLite failure.
    pub fn touch_api_key(&self, id: compliance_core::ApiKeyId, now: DateTime<Utc>) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute("UPDATE api_keys SET last_used = ?1 WHERE id = ?2", params![now.to_rfc3339(), id.to_string()])?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Connection setup
// ============================================================================

/// Sets WAL mode, normal sync, foreign keys, and a busy timeout.
fn apply_pragmas(conn: &Connection) -> StoreResult<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    Ok(())
}

/// Applies every migration in `MIGRATIONS` whose version is not yet
/// recorded in `schema_migrations`.
fn run_migrations(conn: &mut Connection) -> StoreResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL
        );",
    )?;
    for &(version, description, ddl) in MIGRATIONS {
        let already_applied: Option<i64> = conn
            .query_row("SELECT version FROM schema_migrations WHERE version = ?1", params![version], |row| row.get(0))
            .optional()?;
        if already_applied.is_some() {
            continue;
        }
        debug!(version, description, "applying migration");
        let tx = conn.transaction()?;
        tx.execute_batch(ddl)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, description, applied_at) VALUES (?1, ?2, ?3)",
            params![version, description, Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;
    }
    Ok(())
}

// ============================================================================
// SECTION: Row mapping
// ============================================================================

/// Parses a stored UUID column, naming the offending column on failure.
fn parse_uuid(raw: &str, column: &'static str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(raw).map_err(|err| StoreError::MalformedValue { column, reason: err.to_string() })
}

/// Parses a stored RFC 3339 timestamp column, naming the offending column
/// on failure.
fn parse_timestamp(raw: &str, column: &'static str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| StoreError::MalformedValue { column, reason: err.to_string() })
}

/// Maps one `clients` row.
fn row_to_client(row: &rusqlite::Row<'_>) -> rusqlite::Result<Client> {
    let id: String = row.get(0)?;
    let first_seen: String = row.get(3)?;
    let last_seen: String = row.get(4)?;
    let metadata: String = row.get(6)?;
    Ok(Client {
        id: compliance_core::ClientId::from_uuid(parse_uuid(&id, "clients.id").map_err(sqlite_err)?),
        hostname: row.get(1)?,
        client_id: row.get(2)?,
        first_seen: parse_timestamp(&first_seen, "clients.first_seen").map_err(sqlite_err)?,
        last_seen: parse_timestamp(&last_seen, "clients.last_seen").map_err(sqlite_err)?,
        status: row.get(5)?,
        metadata: serde_json::from_str(&metadata).unwrap_or(serde_json::Value::Null),
    })
}

/// Maps one `submissions` row.
fn row_to_submission(row: &rusqlite::Row<'_>) -> rusqlite::Result<Submission> {
    let submission_id: String = row.get(0)?;
    let client_id: String = row.get(1)?;
    let timestamp: String = row.get(3)?;
    let counts: String = row.get(7)?;
    let evidence: String = row.get(8)?;
    let created_at: String = row.get(9)?;
    Ok(Submission {
        submission_id: compliance_core::SubmissionId::from_uuid(parse_uuid(&submission_id, "submissions.submission_id").map_err(sqlite_err)?),
        client_id: compliance_core::ClientId::from_uuid(parse_uuid(&client_id, "submissions.client_id").map_err(sqlite_err)?),
        hostname: row.get(2)?,
        timestamp: parse_timestamp(&timestamp, "submissions.timestamp").map_err(sqlite_err)?,
        report_type: row.get(4)?,
        report_version: row.get(5)?,
        overall_status: row.get(6)?,
        counts: serde_json::from_str(&counts).map_err(|source| sqlite_err(StoreError::MalformedJson { column: "counts", source }))?,
        evidence: serde_json::from_str(&evidence).map_err(|source| sqlite_err(StoreError::MalformedJson { column: "evidence", source }))?,
        created_at: parse_timestamp(&created_at, "submissions.created_at").map_err(sqlite_err)?,
    })
}

/// Maps one `users` row.
fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let id: String = row.get(0)?;
    let role: String = row.get(3)?;
    let password_changed_at: String = row.get(5)?;
    let account_locked_until: Option<String> = row.get(7)?;
    Ok(User {
        id: compliance_core::UserId::from_uuid(parse_uuid(&id, "users.id").map_err(sqlite_err)?),
        username: row.get(1)?,
        password_hash: row.get(2)?,
        role: parse_role(&role).map_err(sqlite_err)?,
        jwt_version: row.get(4)?,
        password_changed_at: parse_timestamp(&password_changed_at, "users.password_changed_at").map_err(sqlite_err)?,
        failed_login_attempts: row.get(6)?,
        account_locked_until: account_locked_until.map(|raw| parse_timestamp(&raw, "users.account_locked_until")).transpose().map_err(sqlite_err)?,
        mfa_enabled: row.get(8)?,
        mfa_secret: row.get(9)?,
    })
}

/// Renders a [`compliance_core::QueryStatus`] the way the wire format does,
/// for the `query_results.status` index column.
fn query_status_label(status: compliance_core::QueryStatus) -> &'static str {
    match status {
        compliance_core::QueryStatus::Pass => "PASS",
        compliance_core::QueryStatus::Fail => "FAIL",
        compliance_core::QueryStatus::NotFound => "NOT_FOUND",
        compliance_core::QueryStatus::Error => "ERROR",
    }
}

/// Parses the `users.role` column.
fn parse_role(raw: &str) -> Result<UserRole, StoreError> {
    match raw {
        "admin" => Ok(UserRole::Admin),
        "viewer" => Ok(UserRole::Viewer),
        "auditor" => Ok(UserRole::Auditor),
        other => Err(StoreError::MalformedValue { column: "users.role", reason: format!("unknown role {other}") }),
    }
}

/// Parses the `auth_audit_log.auth_method` column.
fn parse_auth_method(raw: &str) -> Result<AuthMethod, StoreError> {
    match raw {
        "session_cookie" => Ok(AuthMethod::SessionCookie),
        "jwt_bearer" => Ok(AuthMethod::JwtBearer),
        "api_key" => Ok(AuthMethod::ApiKey),
        other => Err(StoreError::MalformedValue { column: "auth_audit_log.auth_method", reason: format!("unknown auth method {other}") }),
    }
}

/// Maps one `refresh_tokens` row.
fn row_to_refresh_token(row: &rusqlite::Row<'_>) -> rusqlite::Result<RefreshTokenRecord> {
    let id: String = row.get(0)?;
    let user_id: String = row.get(1)?;
    let token_family: String = row.get(3)?;
    let expires_at: String = row.get(4)?;
    let created_at: String = row.get(5)?;
    let last_used: Option<String> = row.get(6)?;
    let revoked_at: Option<String> = row.get(8)?;
    Ok(RefreshTokenRecord {
        id: compliance_core::RefreshTokenId::from_uuid(parse_uuid(&id, "refresh_tokens.id").map_err(sqlite_err)?),
        user_id: compliance_core::UserId::from_uuid(parse_uuid(&user_id, "refresh_tokens.user_id").map_err(sqlite_err)?),
        token_hash: row.get(2)?,
        token_family: compliance_core::TokenFamilyId::from_uuid(parse_uuid(&token_family, "refresh_tokens.token_family").map_err(sqlite_err)?),
        expires_at: parse_timestamp(&expires_at, "refresh_tokens.expires_at").map_err(sqlite_err)?,
        created_at: parse_timestamp(&created_at, "refresh_tokens.created_at").map_err(sqlite_err)?,
        last_used: last_used.map(|raw| parse_timestamp(&raw, "refresh_tokens.last_used")).transpose().map_err(sqlite_err)?,
        revoked: row.get(7)?,
        revoked_at: revoked_at.map(|raw| parse_timestamp(&raw, "refresh_tokens.revoked_at")).transpose().map_err(sqlite_err)?,
        revoked_reason: row.get(9)?,
        ip_address: row.get(10)?,
        user_agent: row.get(11)?,
        device_fingerprint: row.get(12)?,
    })
}

/// Maps one `auth_audit_log` row.
fn row_to_audit_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<AuthAuditEntry> {
    let id: String = row.get(0)?;
    let user_id: Option<String> = row.get(1)?;
    let auth_method: Option<String> = row.get(4)?;
    let timestamp: String = row.get(9)?;
    let metadata: String = row.get(10)?;
    Ok(AuthAuditEntry {
        id: AuditEntryId::from_uuid(parse_uuid(&id, "auth_audit_log.id").map_err(sqlite_err)?),
        user_id: user_id.map(|raw| parse_uuid(&raw, "auth_audit_log.user_id")).transpose().map_err(sqlite_err)?.map(compliance_core::UserId::from_uuid),
        username: row.get(2)?,
        event_type: row.get(3)?,
        auth_method: auth_method.map(|raw| parse_auth_method(&raw)).transpose().map_err(sqlite_err)?,
        ip_address: row.get(5)?,
        user_agent: row.get(6)?,
        success: row.get(7)?,
        failure_reason: row.get(8)?,
        timestamp: parse_timestamp(&timestamp, "auth_audit_log.timestamp").map_err(sqlite_err)?,
        metadata: serde_json::from_str(&metadata).unwrap_or(serde_json::Value::Null),
    })
}

/// Maps one `api_keys` row.
fn row_to_api_key(row: &rusqlite::Row<'_>) -> rusqlite::Result<ApiKeyRecord> {
    let id: String = row.get(0)?;
    let created_at: String = row.get(5)?;
    let last_used: Option<String> = row.get(6)?;
    let expires_at: Option<String> = row.get(7)?;
    Ok(ApiKeyRecord {
        id: compliance_core::ApiKeyId::from_uuid(parse_uuid(&id, "api_keys.id").map_err(sqlite_err)?),
        name: row.get(1)?,
        key_hash: row.get(2)?,
        key_prefix: row.get(3)?,
        created_by: row.get(4)?,
        created_at: parse_timestamp(&created_at, "api_keys.created_at").map_err(sqlite_err)?,
        last_used: last_used.map(|raw| parse_timestamp(&raw, "api_keys.last_used")).transpose().map_err(sqlite_err)?,
        expires_at: expires_at.map(|raw| parse_timestamp(&raw, "api_keys.expires_at")).transpose().map_err(sqlite_err)?,
        is_active: row.get(8)?,
    })
}

/// Bridges a [`StoreError`] produced inside a row-mapping closure back into
/// `rusqlite`'s error type, since `query_row`/`query_map` require it.
fn sqlite_err(err: StoreError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(err))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test fixtures favor direct unwraps for setup clarity.")]

    use compliance_core::EvidenceRecord;
    use compliance_core::MachineInfo;
    use compliance_core::ScanMetadata;
    use compliance_core::summarize;

    use super::*;

    fn sample_evidence(scan_id: &str) -> EvidenceRecord {
        let now = Utc::now();
        EvidenceRecord {
            scan_metadata: ScanMetadata {
                scan_id: scan_id.to_owned(),
                start: now,
                end: now,
                duration_ms: 0,
                operator: "tester".to_owned(),
                report_type: "baseline".to_owned(),
                tool_version: "0.1.0".to_owned(),
            },
            machine_information: MachineInfo {
                hostname: "HOST".to_owned(),
                os_version: "Windows".to_owned(),
                build_number: "19045".to_owned(),
                architecture: "x86_64".to_owned(),
                owner: "UNKNOWN".to_owned(),
                organization: "UNKNOWN".to_owned(),
                install_date: "UNKNOWN".to_owned(),
                system_root: "C:\\Windows".to_owned(),
                domain: None,
                ip_address: None,
                mac_address: None,
            },
            scan_results: std::collections::BTreeMap::new(),
            summary: summarize(std::iter::empty()),
        }
    }

    #[test]
    fn migrations_are_idempotent() {
        let store = ComplianceStore::open_in_memory().unwrap();
        run_migrations(&mut store.lock().unwrap()).unwrap();
    }

    #[test]
    fn upsert_client_is_idempotent_on_hostname() {
        let store = ComplianceStore::open_in_memory().unwrap();
        let now = Utc::now();
        let first = store.upsert_client("HOST-A", "agent-1", now).unwrap();
        let second = store.upsert_client("HOST-A", "agent-1", now).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.list_clients().unwrap().len(), 1);
    }

    #[test]
    fn submission_round_trips() {
        let store = ComplianceStore::open_in_memory().unwrap();
        let now = Utc::now();
        let client = store.upsert_client("HOST-B", "agent-2", now).unwrap();
        let submission = Submission {
            submission_id: SubmissionId::new_random(),
            client_id: client.id,
            hostname: "HOST-B".to_owned(),
            timestamp: now,
            report_type: "baseline".to_owned(),
            report_version: "1".to_owned(),
            overall_status: "COMPLETED".to_owned(),
            counts: serde_json::json!({"total": 0}),
            evidence: sample_evidence("SCAN_20260101_000000"),
            created_at: now,
        };
        store.insert_submission(&submission).unwrap();
        let fetched = store.get_submission(submission.submission_id).unwrap().unwrap();
        assert_eq!(fetched.hostname, "HOST-B");
        assert_eq!(store.list_submissions_for_client(client.id, 10).unwrap().len(), 1);
    }

    #[test]
    fn login_failures_lock_account_after_five() {
        let store = ComplianceStore::open_in_memory().unwrap();
        let now = Utc::now();
        let user = store.create_user("admin", "hash", UserRole::Admin, now).unwrap();
        for _ in 0..4 {
            store.record_login_failure(user.id, now).unwrap();
        }
        assert!(!store.get_user(user.id).unwrap().unwrap().is_locked(now));
        store.record_login_failure(user.id, now).unwrap();
        assert!(store.get_user(user.id).unwrap().unwrap().is_locked(now));
    }

    #[test]
    fn login_success_clears_lock() {
        let store = ComplianceStore::open_in_memory().unwrap();
        let now = Utc::now();
        let user = store.create_user("admin", "hash", UserRole::Admin, now).unwrap();
        for _ in 0..5 {
            store.record_login_failure(user.id, now).unwrap();
        }
        store.record_login_success(user.id).unwrap();
        let refreshed = store.get_user(user.id).unwrap().unwrap();
        assert_eq!(refreshed.failed_login_attempts, 0);
        assert!(!refreshed.is_locked(now));
    }

    #[test]
    fn revoking_a_family_revokes_every_descendant() {
        let store = ComplianceStore::open_in_memory().unwrap();
        let now = Utc::now();
        let user = store.create_user("admin", "hash", UserRole::Admin, now).unwrap();
        let family = TokenFamilyId::new_random();
        for _ in 0..3 {
            let record = RefreshTokenRecord {
                id: RefreshTokenId::new_random(),
                user_id: user.id,
                token_hash: "hash".to_owned(),
                token_family: family,
                expires_at: now + Duration::days(7),
                created_at: now,
                last_used: None,
                revoked: false,
                revoked_at: None,
                revoked_reason: None,
                ip_address: None,
                user_agent: None,
                device_fingerprint: None,
            };
            store.insert_refresh_token(&record).unwrap();
        }
        let changed = store.revoke_token_family(family, "replay_detected", now).unwrap();
        assert_eq!(changed, 3);
    }

    #[test]
    fn revoke_all_for_user_ignores_other_users_tokens() {
        let store = ComplianceStore::open_in_memory().unwrap();
        let now = Utc::now();
        let user_a = store.create_user("alice", "hash", UserRole::Admin, now).unwrap();
        let user_b = store.create_user("bob", "hash", UserRole::Viewer, now).unwrap();
        for user in [user_a.id, user_a.id, user_b.id] {
            let record = RefreshTokenRecord {
                id: RefreshTokenId::new_random(),
                user_id: user,
                token_hash: "hash".to_owned(),
                token_family: TokenFamilyId::new_random(),
                expires_at: now + Duration::days(7),
                created_at: now,
                last_used: None,
                revoked: false,
                revoked_at: None,
                revoked_reason: None,
                ip_address: None,
                user_agent: None,
                device_fingerprint: None,
            };
            store.insert_refresh_token(&record).unwrap();
        }
        let changed = store.revoke_all_refresh_tokens_for_user(user_a.id, "logout_all", now).unwrap();
        assert_eq!(changed, 2);
    }

    #[test]
    fn sweep_refresh_tokens_removes_only_old_rows() {
        let store = ComplianceStore::open_in_memory().unwrap();
        let now = Utc::now();
        let user = store.create_user("admin", "hash", UserRole::Admin, now).unwrap();
        let stale = RefreshTokenRecord {
            id: RefreshTokenId::new_random(),
            user_id: user.id,
            token_hash: "hash".to_owned(),
            token_family: TokenFamilyId::new_random(),
            expires_at: now - Duration::days(31),
            created_at: now - Duration::days(45),
            last_used: None,
            revoked: false,
            revoked_at: None,
            revoked_reason: None,
            ip_address: None,
            user_agent: None,
            device_fingerprint: None,
        };
        let fresh = RefreshTokenRecord {
            id: RefreshTokenId::new_random(),
            user_id: user.id,
            token_hash: "hash".to_owned(),
            token_family: TokenFamilyId::new_random(),
            expires_at: now + Duration::days(7),
            created_at: now,
            last_used: None,
            revoked: false,
            revoked_at: None,
            revoked_reason: None,
            ip_address: None,
            user_agent: None,
            device_fingerprint: None,
        };
        store.insert_refresh_token(&stale).unwrap();
        store.insert_refresh_token(&fresh).unwrap();
        let removed = store.sweep_refresh_tokens(now).unwrap();
        assert_eq!(removed, 1);
        assert!(store.get_refresh_token(fresh.id).unwrap().is_some());
    }

    #[test]
    fn blacklist_sweep_only_removes_expired_entries() {
        let store = ComplianceStore::open_in_memory().unwrap();
        let now = Utc::now();
        let user = store.create_user("admin", "hash", UserRole::Admin, now).unwrap();
        store
            .blacklist_token(&JwtBlacklistEntry {
                jti: "expired".to_owned(),
                user_id: user.id,
                expires_at: now - Duration::hours(1),
                blacklisted_at: now - Duration::hours(2),
                reason: "logout".to_owned(),
            })
            .unwrap();
        store
            .blacklist_token(&JwtBlacklistEntry {
                jti: "still-valid".to_owned(),
                user_id: user.id,
                expires_at: now + Duration::hours(1),
                blacklisted_at: now,
                reason: "logout".to_owned(),
            })
            .unwrap();
        let removed = store.sweep_jwt_blacklist(now).unwrap();
        assert_eq!(removed, 1);
        assert!(store.is_token_blacklisted("still-valid").unwrap());
        assert!(!store.is_token_blacklisted("expired").unwrap());
    }

    #[test]
    fn audit_log_sweep_respects_retention_window() {
        let store = ComplianceStore::open_in_memory().unwrap();
        let now = Utc::now();
        store
            .record_audit_entry(&AuthAuditEntry {
                id: AuditEntryId::new_random(),
                user_id: None,
                username: "admin".to_owned(),
                event_type: "login_success".to_owned(),
                auth_method: Some(AuthMethod::SessionCookie),
                ip_address: None,
                user_agent: None,
                success: true,
                failure_reason: None,
                timestamp: now - Duration::days(100),
                metadata: serde_json::json!({}),
            })
            .unwrap();
        let removed = store.sweep_audit_log(now, 90).unwrap();
        assert_eq!(removed, 1);
    }

    #[test]
    fn active_api_keys_excludes_expired_and_inactive() {
        let store = ComplianceStore::open_in_memory().unwrap();
        let now = Utc::now();
        store
            .create_api_key(&ApiKeyRecord {
                id: compliance_core::ApiKeyId::new_random(),
                name: "ci".to_owned(),
                key_hash: "hash".to_owned(),
                key_prefix: "ck_live".to_owned(),
                created_by: "system".to_owned(),
                created_at: now,
                last_used: None,
                expires_at: Some(now - Duration::days(1)),
                is_active: true,
            })
            .unwrap();
        store
            .create_api_key(&ApiKeyRecord {
                id: compliance_core::ApiKeyId::new_random(),
                name: "dashboard".to_owned(),
                key_hash: "hash".to_owned(),
                key_prefix: "ck_live".to_owned(),
                created_by: "system".to_owned(),
                created_at: now,
                last_used: None,
                expires_at: None,
                is_active: true,
            })
            .unwrap();
        let active = store.list_active_api_keys(now).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "dashboard");
    }
}
