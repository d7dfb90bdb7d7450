// crates/compliance-core/src/core/evidence.rs
// ============================================================================
// Module: Compliance Core Evidence Model
// Description: Scan metadata, machine identity, and summary types shared by
//              the evidence recorder, report renderer, and submission wire
//              format.
// Purpose: Guarantee the evidence recorder and report renderer compute the
//          compliance summary identically (see testable property).
// Dependencies: serde, chrono, crate::core::result
// ============================================================================

//! ## Overview
//! `EvidenceRecord` is the archival, on-disk canonical form (§9 design
//! notes: "treat the on-disk format as the archival canonical form and the
//! wire format as a projection"). The submission wire format is built from
//! this type, not the other way around.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::core::result::QueryResult;
use crate::core::result::QueryStatus;

// ============================================================================
// SECTION: Machine Info
// ============================================================================

/// Host identity gathered once at scan start.
///
/// # Invariants
/// - Individual field failures are reported as the literal `"UNKNOWN"`; the
///   scan never aborts because machine info could not be fully gathered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineInfo {
    /// Host name.
    pub hostname: String,
    /// OS identity (product name).
    pub os_version: String,
    /// OS build number.
    pub build_number: String,
    /// CPU architecture.
    pub architecture: String,
    /// Registered owner.
    pub owner: String,
    /// Registered organization.
    pub organization: String,
    /// OS install date, as read from the registry.
    pub install_date: String,
    /// System root directory.
    pub system_root: String,
    /// Domain, if joined.
    pub domain: Option<String>,
    /// Primary IPv4 address, if discoverable.
    pub ip_address: Option<String>,
    /// Primary MAC address, if discoverable.
    pub mac_address: Option<String>,
}

impl MachineInfo {
    /// The literal placeholder used for fields that could not be read.
    pub const UNKNOWN: &'static str = "UNKNOWN";
}

// ============================================================================
// SECTION: Scan Metadata
// ============================================================================

/// Bookkeeping for one scan execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanMetadata {
    /// Scan identifier, formatted `SCAN_<YYYYMMDD_HHMMSS>`.
    pub scan_id: String,
    /// Scan start time.
    pub start: DateTime<Utc>,
    /// Scan end time.
    pub end: DateTime<Utc>,
    /// Wall-clock duration of the scan, in milliseconds.
    pub duration_ms: i64,
    /// Current host user, or `"UNKNOWN"`.
    pub operator: String,
    /// Logical report type, derived from the config file's base name.
    pub report_type: String,
    /// Agent/tool version string.
    pub tool_version: String,
}

// ============================================================================
// SECTION: Summary
// ============================================================================

/// Aggregate compliance counts for a finalized scan.
///
/// # Invariants
/// - `passed + failed + not_found + errors == total`.
/// - `compliance_rate = passed / (passed + failed + errors) * 100`, or `0.0`
///   when that denominator is zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Total number of queries executed.
    pub total: u32,
    /// Number of `PASS` results.
    pub passed: u32,
    /// Number of `FAIL` results.
    pub failed: u32,
    /// Number of `NOT_FOUND` results.
    pub not_found: u32,
    /// Number of `ERROR` results.
    pub errors: u32,
    /// Percentage, `passed / (passed + failed + errors) * 100`.
    pub compliance_rate: f64,
}

/// Computes a [`ScanSummary`] from a set of query results.
///
/// Both the evidence recorder and the report renderer call this so the two
/// artifacts can never disagree on the published compliance rate.
#[must_use]
pub fn summarize<'a>(results: impl IntoIterator<Item = &'a QueryResult>) -> ScanSummary {
    let mut summary = ScanSummary::default();
    for result in results {
        summary.total += 1;
        match result.status {
            QueryStatus::Pass => summary.passed += 1,
            QueryStatus::Fail => summary.failed += 1,
            QueryStatus::NotFound => summary.not_found += 1,
            QueryStatus::Error => summary.errors += 1,
        }
    }
    let denom = summary.passed + summary.failed + summary.errors;
    summary.compliance_rate = if denom == 0 {
        0.0
    } else {
        (f64::from(summary.passed) / f64::from(denom)) * 100.0
    };
    summary
}

// ============================================================================
// SECTION: Evidence Record
// ============================================================================

/// The finalized, immutable archival record of one scan.
///
/// # Invariants
/// - Produced by calling [`crate::core::evidence::summarize`] over
///   `scan_results` exactly once, at finalize time.
/// - Immutable after construction; callers must not mutate the map used to
///   build `scan_results` once a record has been finalized from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    /// Scan bookkeeping.
    pub scan_metadata: ScanMetadata,
    /// Host identity.
    pub machine_information: MachineInfo,
    /// Per-check outcomes, keyed by check name.
    pub scan_results: BTreeMap<String, QueryResult>,
    /// Aggregate counts.
    pub summary: ScanSummary,
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn result(status: QueryStatus) -> QueryResult {
        QueryResult {
            name: "check".to_owned(),
            description: String::new(),
            registry_path: "SOFTWARE\\Example".to_owned(),
            value_name: "Value".to_owned(),
            status,
            actual: None,
            error: None,
            expected: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn summary_counts_add_up_to_total() {
        let results = vec![
            result(QueryStatus::Pass),
            result(QueryStatus::Fail),
            result(QueryStatus::NotFound),
            result(QueryStatus::Error),
        ];
        let summary = summarize(&results);
        assert_eq!(summary.total, 4);
        assert_eq!(
            summary.passed + summary.failed + summary.not_found + summary.errors,
            summary.total
        );
    }

    #[test]
    fn compliance_rate_is_zero_when_denominator_is_zero() {
        let results = vec![result(QueryStatus::NotFound)];
        let summary = summarize(&results);
        assert_eq!(summary.compliance_rate, 0.0);
    }

    #[test]
    fn compliance_rate_is_hundred_when_all_pass() {
        let results = vec![result(QueryStatus::Pass), result(QueryStatus::Pass)];
        let summary = summarize(&results);
        assert!((summary.compliance_rate - 100.0).abs() < f64::EPSILON);
    }
}
