// crates/compliance-core/src/interfaces/mod.rs
// ============================================================================
// Module: Compliance Core Interfaces
// Description: Backend-agnostic trait contracts shared by the registry read
//              engine, audit logger, and the components that consume them.
// Purpose: Define the contract surfaces so the scan executor never depends
//          on concrete `winreg` or file-system types.
// Dependencies: crate::core, async-trait, serde, thiserror
// ============================================================================

//! ## Overview
//! Interfaces define how the scan pipeline integrates with the registry and
//! the audit trail without embedding backend-specific details in
//! `compliance-executor`. Implementations must fail closed on missing or
//! invalid data and must never request write access.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::auth::AuthMethod;
use crate::core::registry::RegistryValue;
use crate::core::registry::RootKey;

// ============================================================================
// SECTION: Registry Reader
// ============================================================================

/// A structured error from the registry read engine.
///
/// # Invariants
/// - `is_not_found` is the sole authority for "does not exist" semantics;
///   callers must use it instead of matching on `underlying` text.
#[derive(Debug, Clone, Error)]
#[error("registry {operation} failed for {key}\\{value}: {underlying}")]
pub struct RegistryReadError {
    /// The operation attempted (e.g. `"GetStringValue"`).
    pub operation: String,
    /// The fully-qualified key path.
    pub key: String,
    /// The value name, or empty for the default value.
    pub value: String,
    /// Underlying OS or cancellation error text.
    pub underlying: String,
    /// Set when this error represents "does not exist" rather than a real
    /// failure.
    pub not_found: bool,
    /// Set when this error represents a caller-initiated cancellation.
    pub cancelled: bool,
}

impl RegistryReadError {
    /// Returns true when this error represents "does not exist" rather than
    /// an access failure.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        self.not_found
    }

    /// Returns true when this error represents a caller-initiated
    /// cancellation rather than an OS-level failure.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

/// Per-call deadline passed to every registry operation.
///
/// # Invariants
/// - A per-call default of 5 seconds is applied by implementations when the
///   caller supplies `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadDeadline(pub Option<Duration>);

impl ReadDeadline {
    /// The default per-call timeout when the caller supplies none.
    pub const DEFAULT: Duration = Duration::from_secs(5);

    /// Resolves this deadline to a concrete duration.
    #[must_use]
    pub fn resolve(self) -> Duration {
        self.0.unwrap_or(Self::DEFAULT)
    }
}

/// Cancellation-aware, type-probing, batched reader over the registry.
///
/// Every method is read-only: implementations must request only
/// `KEY_QUERY_VALUE` access.
#[async_trait]
pub trait RegistryReader: Send + Sync {
    /// Reads a typed string value.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryReadError`] when the key or value cannot be opened,
    /// is not a string, or the read is cancelled.
    async fn read_string(
        &self,
        root_key: RootKey,
        path: &str,
        value_name: &str,
        deadline: ReadDeadline,
    ) -> Result<String, RegistryReadError>;

    /// Reads a typed 64-bit integer value (DWORD or QWORD).
    ///
    /// # Errors
    ///
    /// Returns [`RegistryReadError`] under the same conditions as
    /// [`RegistryReader::read_string`].
    async fn read_uint64(
        &self,
        root_key: RootKey,
        path: &str,
        value_name: &str,
        deadline: ReadDeadline,
    ) -> Result<u64, RegistryReadError>;

    /// Reads a typed binary value.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryReadError`] under the same conditions as
    /// [`RegistryReader::read_string`].
    async fn read_binary(
        &self,
        root_key: RootKey,
        path: &str,
        value_name: &str,
        deadline: ReadDeadline,
    ) -> Result<Vec<u8>, RegistryReadError>;

    /// Reads a typed multi-string value.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryReadError`] under the same conditions as
    /// [`RegistryReader::read_string`].
    async fn read_multi_string(
        &self,
        root_key: RootKey,
        path: &str,
        value_name: &str,
        deadline: ReadDeadline,
    ) -> Result<Vec<String>, RegistryReadError>;

    /// Attempts string, then multi-string, then integer, then binary, in
    /// that order, and returns the first success.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryReadError`] citing every attempted type when all
    /// four attempts fail.
    async fn read_auto(
        &self,
        root_key: RootKey,
        path: &str,
        value_name: &str,
        deadline: ReadDeadline,
    ) -> Result<RegistryValue, RegistryReadError>;

    /// Opens `path` once and reads every value name present, trying string,
    /// integer, binary, then multi-string for each. Values that fail every
    /// type are simply absent from the returned map; the batch itself never
    /// fails because of a partial miss.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryReadError`] only when the key itself cannot be
    /// opened.
    async fn read_all(
        &self,
        root_key: RootKey,
        path: &str,
        deadline: ReadDeadline,
    ) -> Result<BTreeMap<String, RegistryValue>, RegistryReadError>;
}

// ============================================================================
// SECTION: Audit Sink
// ============================================================================

/// One structured event recorded by the audit logger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Event kind, e.g. `"registry_read"`, `"policy_violation"`, `"login"`.
    pub kind: String,
    /// The target the event concerns (a registry path, a username, ...).
    pub target: String,
    /// Whether the underlying operation succeeded.
    pub success: bool,
    /// Free-text detail, never a credential or token value.
    pub detail: Option<String>,
    /// The auth method in play, if this event is auth-related.
    pub auth_method: Option<AuthMethod>,
}

/// Audit sink errors.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The sink failed to persist or buffer an event.
    #[error("audit sink error: {0}")]
    Sink(String),
}

/// Append-only structured event stream with in-memory counters.
///
/// # Invariants
/// - `record` never blocks the caller on failure; sinks that cannot persist
///   an event still keep an in-memory tally (see `compliance-audit`).
pub trait AuditSink: Send + Sync {
    /// Records one audit event.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError`] when the event cannot be buffered at all.
    fn record(&self, event: AuditEvent) -> Result<(), AuditError>;

    /// Returns the number of events recorded with `success == false`.
    fn failure_count(&self) -> u64;
}
