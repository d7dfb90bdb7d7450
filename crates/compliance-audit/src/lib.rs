// crates/compliance-audit/src/lib.rs
// ============================================================================
// Module: Compliance Audit Logger
// Description: Append-only structured event stream for access, security, and
//              system events, with in-memory counters.
// Purpose: Implement `compliance_core::interfaces::AuditSink` for the rest of
//          the workspace to depend on.
// Dependencies: compliance-core, tracing, thiserror
// ============================================================================

//! ## Overview
//! Every event is both emitted as a `tracing` record (debug level for routine
//! access, warn for security events) and tallied in a mutex-protected counter
//! set. The counters back the failed-login lockout check in
//! `compliance-auth` and the per-scan success/error counts in
//! `compliance-executor`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;

use compliance_core::interfaces::AuditError;
use compliance_core::interfaces::AuditEvent;
use compliance_core::interfaces::AuditSink;

// ============================================================================
// SECTION: Counters
// ============================================================================

#[derive(Debug, Default)]
struct Counters {
    total: u64,
    failures: u64,
    by_kind: std::collections::BTreeMap<String, u64>,
}

// ============================================================================
// SECTION: Logger
// ============================================================================

/// In-process audit logger. Construct one per server/agent process and share
/// it behind an `Arc`.
///
/// # Invariants
/// - `record` never returns an error for a well-formed event; the `Result`
///   return exists to satisfy the [`AuditSink`] contract for sinks that can
///   fail (e.g. a future file-backed sink).
#[derive(Debug, Default)]
pub struct AuditLogger {
    counters: Mutex<Counters>,
}

impl AuditLogger {
    /// Creates a new, empty audit logger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of events recorded.
    #[must_use]
    pub fn total_count(&self) -> u64 {
        self.counters.lock().map(|c| c.total).unwrap_or_default()
    }

    /// Returns the number of events recorded for a specific kind.
    #[must_use]
    pub fn count_for_kind(&self, kind: &str) -> u64 {
        self.counters
            .lock()
            .map(|c| c.by_kind.get(kind).copied().unwrap_or_default())
            .unwrap_or_default()
    }
}

impl AuditSink for AuditLogger {
    fn record(&self, event: AuditEvent) -> Result<(), AuditError> {
        if event.success {
            tracing::debug!(
                kind = %event.kind,
                target = %event.target,
                auth_method = ?event.auth_method,
                "audit event"
            );
        } else {
            tracing::warn!(
                kind = %event.kind,
                target = %event.target,
                detail = ?event.detail,
                auth_method = ?event.auth_method,
                "audit event (failure)"
            );
        }

        let mut counters = self
            .counters
            .lock()
            .map_err(|_| AuditError::Sink("audit counter lock poisoned".to_owned()))?;
        counters.total += 1;
        if !event.success {
            counters.failures += 1;
        }
        *counters.by_kind.entry(event.kind).or_insert(0) += 1;
        Ok(())
    }

    fn failure_count(&self) -> u64 {
        self.counters.lock().map(|c| c.failures).unwrap_or_default()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]
    use super::*;

    fn event(kind: &str, success: bool) -> AuditEvent {
        AuditEvent {
            kind: kind.to_owned(),
            target: "target".to_owned(),
            success,
            detail: None,
            auth_method: None,
        }
    }

    #[test]
    fn counts_total_and_failures() {
        let logger = AuditLogger::new();
        logger.record(event("login", true)).unwrap();
        logger.record(event("login", false)).unwrap();
        logger.record(event("login", false)).unwrap();
        assert_eq!(logger.total_count(), 3);
        assert_eq!(logger.failure_count(), 2);
        assert_eq!(logger.count_for_kind("login"), 3);
    }

    #[test]
    fn counts_are_independent_per_kind() {
        let logger = AuditLogger::new();
        logger.record(event("login", true)).unwrap();
        logger.record(event("policy_violation", false)).unwrap();
        assert_eq!(logger.count_for_kind("login"), 1);
        assert_eq!(logger.count_for_kind("policy_violation"), 1);
        assert_eq!(logger.count_for_kind("nonexistent"), 0);
    }
}
