// crates/compliance-core/src/core/result.rs
// ============================================================================
// Module: Compliance Core Query Result
// Description: Per-query outcome types produced by the scan executor and
//              consumed by the evidence recorder and report renderer.
// Purpose: One shared outcome shape for both artifacts.
// Dependencies: serde, chrono, crate::core::registry
// ============================================================================

//! ## Overview
//! A [`QueryResult`] is the unit the Evidence Recorder appends and the Report
//! Renderer sorts and displays. Once appended it is never mutated (see
//! `EvidenceRecord` invariants) — only `finalize` may compute derived
//! summaries from the accumulated set.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Status
// ============================================================================

/// The outcome of one query.
///
/// # Invariants
/// - `Pass` implies an actual value is present and no error message is set.
/// - `Fail` is reserved for policy/security blocks at the executor layer; the
///   read path itself never produces it (see design notes on `expected_value`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryStatus {
    /// The read succeeded and produced a value.
    Pass,
    /// A policy or security rule rejected the query before it was dispatched.
    Fail,
    /// The underlying registry key or value does not exist.
    NotFound,
    /// The read failed for a reason other than non-existence.
    Error,
}

// ============================================================================
// SECTION: Query Result
// ============================================================================

/// The value produced by a single query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryResultValue {
    /// A single scalar value, already rendered as a display string.
    Scalar(String),
    /// A read-all result: value name to display string.
    Map(BTreeMap<String, String>),
}

/// The outcome of executing one [`crate::core::registry::RegistryQuery`].
///
/// # Invariants
/// - `status == Pass` if and only if `actual` is `Some` and `error` is
///   `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Check name, copied from the originating query.
    pub name: String,
    /// Free-text description, copied from the originating query.
    pub description: String,
    /// Registry path, copied from the originating query.
    pub registry_path: String,
    /// Value name, copied from the originating query.
    pub value_name: String,
    /// Outcome classification.
    pub status: QueryStatus,
    /// The value actually read, if any.
    pub actual: Option<QueryResultValue>,
    /// Error message, if any.
    pub error: Option<String>,
    /// Expected value as declared in the query; recorded but not compared.
    pub expected: Option<String>,
    /// When this outcome was recorded.
    pub timestamp: DateTime<Utc>,
}

impl QueryResult {
    /// Returns true if this result counts as a compliance pass.
    #[must_use]
    pub const fn is_pass(&self) -> bool {
        matches!(self.status, QueryStatus::Pass)
    }
}

/// Classifies a read outcome: no error is `PASS`; an error whose origin
/// reported "does not exist" is `NOT_FOUND`; any other error is `ERROR`.
/// `FAIL` is never produced here — only the executor's policy/security
/// block assigns it. Shared by the Evidence Recorder and Report Renderer so
/// the two artifacts can never classify the same outcome differently.
#[must_use]
pub fn classify(error: Option<&str>, not_found: bool) -> QueryStatus {
    match error {
        None => QueryStatus::Pass,
        Some(_) if not_found => QueryStatus::NotFound,
        Some(_) => QueryStatus::Error,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_matches_pass_not_found_error() {
        assert_eq!(classify(None, false), QueryStatus::Pass);
        assert_eq!(classify(Some("missing"), true), QueryStatus::NotFound);
        assert_eq!(classify(Some("denied"), false), QueryStatus::Error);
    }
}
