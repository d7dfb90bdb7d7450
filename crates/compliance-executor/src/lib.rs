// crates/compliance-executor/src/lib.rs
// ============================================================================
// Module: Scan Executor
// Description: Drives a Report Config's queries through the Validator and
//              Registry Read Engine, appending every outcome to the Evidence
//              Recorder and Report Renderer.
// Purpose: Implements §4.G — the one place that decides PASS/FAIL/NOT_FOUND
//          /ERROR for a scan.
// Dependencies: compliance-core, compliance-evidence, compliance-report,
//               compliance-validator, thiserror, tracing
// ============================================================================

//! ## Overview
//! Per query, in declaration order: skip non-`read` operations, enforce the
//! deny-then-allow policy (a hit is `FAIL` and the scan continues), parse
//! the root key (failure is `ERROR` and the scan continues), dispatch a
//! batch (`read_all`) or auto-detect single read, then append the
//! identical classified [`compliance_core::QueryResult`] to both the
//! Evidence Recorder and the Report Renderer. On completion the executor
//! renders the HTML artifact, finalizes the evidence artifact, and reports
//! `{successful, errors}` — a scan is successful for its caller if the HTML
//! artifact was written; individual query errors are not fatal.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;

use compliance_core::EvidenceRecord;
use compliance_core::QueryResult;
use compliance_core::QueryResultValue;
use compliance_core::QueryStatus;
use compliance_core::ReportConfig;
use compliance_core::RootKey;
use compliance_core::interfaces::ReadDeadline;
use compliance_core::interfaces::RegistryReader;
use compliance_core::now;
use compliance_evidence::EvidenceError;
use compliance_evidence::EvidenceRecorder;
use compliance_report::ReportError;
use compliance_report::ReportRenderer;
use thiserror::Error;

// ============================================================================
// SECTION: Error
// ============================================================================

/// Scan Executor failures. Individual query failures are never surfaced
/// this way — only artifact-writing failures are.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// The evidence artifact could not be finalized.
    #[error("failed to finalize evidence: {0}")]
    Evidence(#[source] EvidenceError),
    /// The HTML report could not be rendered.
    #[error("failed to render report: {0}")]
    Report(#[source] ReportError),
}

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Deny-then-allow access policy applied to every query's registry path.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    /// Path prefixes to reject outright.
    pub deny_list: Vec<String>,
    /// Path prefixes to permit; empty means "permit all".
    pub allow_list: Vec<String>,
}

// ============================================================================
// SECTION: Outcome
// ============================================================================

/// The per-scan counts the caller sees: a scan is successful if the HTML
/// artifact was written, regardless of how many individual queries failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanCounts {
    /// Queries that reached `PASS`, `NOT_FOUND`, or a policy `FAIL`.
    pub successful: u32,
    /// Queries that reached `ERROR`.
    pub errors: u32,
}

/// The full result of running one scan.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    /// The finalized evidence record.
    pub evidence: EvidenceRecord,
    /// Path of the rendered HTML artifact.
    pub report_path: PathBuf,
    /// Per-scan success/error counts.
    pub counts: ScanCounts,
}

// ============================================================================
// SECTION: Executor
// ============================================================================

/// Runs every query in `config` against `reader`, subject to `policy`, and
/// emits both artifacts.
///
/// # Errors
///
/// Returns [`ExecutorError`] only if the evidence or report artifact itself
/// cannot be written; individual query failures are recorded as `ERROR`
/// results and do not abort the scan.
#[allow(clippy::too_many_arguments, reason = "One call wires together the five collaborators a scan needs.")]
pub async fn run_scan(
    config: &ReportConfig,
    reader: &dyn RegistryReader,
    policy: &AccessPolicy,
    report_type: &str,
    title: &str,
    tool_version: &str,
    evidence_dir: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
) -> Result<ScanOutcome, ExecutorError> {
    let mut evidence = EvidenceRecorder::new(report_type, tool_version, evidence_dir.as_ref());
    let mut renderer = ReportRenderer::new(title, report_type, tool_version, output_dir.as_ref());

    let machine_info = compliance_evidence::gather_machine_info(reader).await;
    evidence.set_machine_information(machine_info.clone());
    renderer.set_machine_information(machine_info);

    let mut counts = ScanCounts::default();

    for query in &config.queries {
        if query.operation != compliance_core::QueryOperation::Read {
            continue;
        }

        if let Err(violation) = compliance_validator::validate_against_policy(&query.path, &policy.deny_list, &policy.allow_list) {
            tracing::warn!(query = %query.name, path = %query.path, "query rejected by access policy");
            let result = policy_rejection(query, &violation.message);
            evidence.append(result.clone());
            renderer.append(result);
            counts.successful += 1;
            continue;
        }

        let Some(root_key) = RootKey::parse(&query.root_key) else {
            tracing::warn!(query = %query.name, root_key = %query.root_key, "invalid root key");
            let result = invalid_root_key(query);
            evidence.append(result.clone());
            renderer.append(result);
            counts.errors += 1;
            continue;
        };

        let result = if query.read_all {
            dispatch_read_all(&mut evidence, reader, query, root_key).await
        } else {
            dispatch_auto_detect(&mut evidence, reader, query, root_key).await
        };
        renderer.append(result.clone());
        match result.status {
            QueryStatus::Error => counts.errors += 1,
            QueryStatus::Pass | QueryStatus::Fail | QueryStatus::NotFound => counts.successful += 1,
        }
    }

    let report_path = renderer.render().map_err(ExecutorError::Report)?;
    let evidence_record = evidence.finalize().map_err(ExecutorError::Evidence)?;

    Ok(ScanOutcome {
        evidence: evidence_record,
        report_path,
        counts,
    })
}

/// Batch-reads every value under `query.path` and logs the combined map.
async fn dispatch_read_all(
    evidence: &mut EvidenceRecorder,
    reader: &dyn RegistryReader,
    query: &compliance_core::RegistryQuery,
    root_key: RootKey,
) -> QueryResult {
    match reader.read_all(root_key, &query.path, ReadDeadline::default()).await {
        Ok(values) => {
            let map = values.into_iter().map(|(name, value)| (name, value.display_string())).collect();
            evidence.log_result(
                &query.name,
                &query.description,
                &query.path,
                String::new(),
                Some(QueryResultValue::Map(map)),
                query.expected_value.clone(),
                None,
                false,
            )
        }
        Err(error) => evidence.log_result(
            &query.name,
            &query.description,
            &query.path,
            String::new(),
            None,
            query.expected_value.clone(),
            Some(error.underlying),
            error.not_found,
        ),
    }
}

/// Auto-detects and reads `query.value_name` under `query.path`.
async fn dispatch_auto_detect(
    evidence: &mut EvidenceRecorder,
    reader: &dyn RegistryReader,
    query: &compliance_core::RegistryQuery,
    root_key: RootKey,
) -> QueryResult {
    match reader
        .read_auto(root_key, &query.path, &query.value_name, ReadDeadline::default())
        .await
    {
        Ok(value) => evidence.log_result(
            &query.name,
            &query.description,
            &query.path,
            &query.value_name,
            Some(QueryResultValue::Scalar(value.display_string())),
            query.expected_value.clone(),
            None,
            false,
        ),
        Err(error) => evidence.log_result(
            &query.name,
            &query.description,
            &query.path,
            &query.value_name,
            None,
            query.expected_value.clone(),
            Some(error.underlying),
            error.not_found,
        ),
    }
}

/// Builds the `FAIL` result recorded when the access policy rejects a query.
fn policy_rejection(query: &compliance_core::RegistryQuery, message: &str) -> QueryResult {
    QueryResult {
        name: query.name.clone(),
        description: query.description.clone(),
        registry_path: query.path.clone(),
        value_name: query.value_name.clone(),
        status: QueryStatus::Fail,
        actual: None,
        error: Some(message.to_owned()),
        expected: query.expected_value.clone(),
        timestamp: now(),
    }
}

/// Builds the `ERROR` result recorded when a query's root key cannot be parsed.
fn invalid_root_key(query: &compliance_core::RegistryQuery) -> QueryResult {
    QueryResult {
        name: query.name.clone(),
        description: query.description.clone(),
        registry_path: query.path.clone(),
        value_name: query.value_name.clone(),
        status: QueryStatus::Error,
        actual: None,
        error: Some(format!("unrecognized root key: {}", query.root_key)),
        expected: query.expected_value.clone(),
        timestamp: now(),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test fixtures favor direct unwraps for setup clarity.")]
    use std::collections::BTreeMap;

    use compliance_core::RegistryQuery;
    use compliance_core::RegistryValue;
    use compliance_core::ReportMetadata;
    use compliance_core::interfaces::RegistryReadError;

    use super::*;

    struct StubReader;

    #[async_trait::async_trait]
    impl RegistryReader for StubReader {
        async fn read_string(
            &self,
            _root_key: RootKey,
            _path: &str,
            _value_name: &str,
            _deadline: ReadDeadline,
        ) -> Result<String, RegistryReadError> {
            unreachable!("tests use read_auto/read_all only")
        }

        async fn read_uint64(
            &self,
            _root_key: RootKey,
            _path: &str,
            _value_name: &str,
            _deadline: ReadDeadline,
        ) -> Result<u64, RegistryReadError> {
            unreachable!("tests use read_auto/read_all only")
        }

        async fn read_binary(
            &self,
            _root_key: RootKey,
            _path: &str,
            _value_name: &str,
            _deadline: ReadDeadline,
        ) -> Result<Vec<u8>, RegistryReadError> {
            unreachable!("tests use read_auto/read_all only")
        }

        async fn read_multi_string(
            &self,
            _root_key: RootKey,
            _path: &str,
            _value_name: &str,
            _deadline: ReadDeadline,
        ) -> Result<Vec<String>, RegistryReadError> {
            unreachable!("tests use read_auto/read_all only")
        }

        async fn read_auto(
            &self,
            _root_key: RootKey,
            path: &str,
            value_name: &str,
            _deadline: ReadDeadline,
        ) -> Result<RegistryValue, RegistryReadError> {
            if path.contains("Missing") {
                return Err(RegistryReadError {
                    operation: "GetValue".to_owned(),
                    key: path.to_owned(),
                    value: value_name.to_owned(),
                    underlying: "value does not exist".to_owned(),
                    not_found: true,
                    cancelled: false,
                });
            }
            Ok(RegistryValue::Str("Windows 11 Pro".to_owned()))
        }

        async fn read_all(
            &self,
            _root_key: RootKey,
            _path: &str,
            _deadline: ReadDeadline,
        ) -> Result<BTreeMap<String, RegistryValue>, RegistryReadError> {
            let mut map = BTreeMap::new();
            map.insert("ProductName".to_owned(), RegistryValue::Str("Windows 11 Pro".to_owned()));
            Ok(map)
        }
    }

    fn query(name: &str, path: &str, read_all: bool) -> RegistryQuery {
        RegistryQuery {
            name: name.to_owned(),
            description: "desc".to_owned(),
            root_key: "HKLM".to_owned(),
            path: path.to_owned(),
            value_name: "ProductName".to_owned(),
            operation: compliance_core::QueryOperation::Read,
            read_all,
            expected_value: None,
            write_type: None,
            write_value: None,
        }
    }

    #[tokio::test]
    async fn policy_rejection_is_fail_and_does_not_abort_scan() {
        let dir = tempfile::tempdir().unwrap();
        let config = ReportConfig {
            version: "1.0".to_owned(),
            metadata: ReportMetadata::default(),
            queries: vec![query("denied_check", r"SOFTWARE\Denied\Area", false)],
        };
        let policy = AccessPolicy {
            deny_list: vec![r"SOFTWARE\Denied".to_owned()],
            allow_list: Vec::new(),
        };

        let outcome = run_scan(
            &config,
            &StubReader,
            &policy,
            "cis_level1",
            "CIS Level 1",
            "1.0.0",
            dir.path().join("evidence"),
            dir.path().join("output"),
        )
        .await
        .unwrap();

        assert_eq!(outcome.counts.successful, 1);
        assert_eq!(outcome.counts.errors, 0);
        assert_eq!(
            outcome.evidence.scan_results["denied_check"].status,
            QueryStatus::Fail
        );
    }

    #[tokio::test]
    async fn invalid_root_key_is_error_and_does_not_abort_scan() {
        let dir = tempfile::tempdir().unwrap();
        let mut bad_query = query("bad_root", r"SOFTWARE\Example", false);
        bad_query.root_key = "NOT_A_HIVE".to_owned();
        let config = ReportConfig {
            version: "1.0".to_owned(),
            metadata: ReportMetadata::default(),
            queries: vec![bad_query],
        };

        let outcome = run_scan(
            &config,
            &StubReader,
            &AccessPolicy::default(),
            "cis_level1",
            "CIS Level 1",
            "1.0.0",
            dir.path().join("evidence"),
            dir.path().join("output"),
        )
        .await
        .unwrap();

        assert_eq!(outcome.counts.errors, 1);
        assert_eq!(outcome.evidence.scan_results["bad_root"].status, QueryStatus::Error);
    }

    #[tokio::test]
    async fn read_all_and_auto_detect_both_produce_pass() {
        let dir = tempfile::tempdir().unwrap();
        let config = ReportConfig {
            version: "1.0".to_owned(),
            metadata: ReportMetadata::default(),
            queries: vec![
                query("scalar_check", r"SOFTWARE\Example", false),
                query("batch_check", r"SOFTWARE\Example", true),
                query("missing_check", r"SOFTWARE\Missing", false),
            ],
        };

        let outcome = run_scan(
            &config,
            &StubReader,
            &AccessPolicy::default(),
            "cis_level1",
            "CIS Level 1",
            "1.0.0",
            dir.path().join("evidence"),
            dir.path().join("output"),
        )
        .await
        .unwrap();

        assert_eq!(outcome.evidence.scan_results["scalar_check"].status, QueryStatus::Pass);
        assert_eq!(outcome.evidence.scan_results["batch_check"].status, QueryStatus::Pass);
        assert_eq!(outcome.evidence.scan_results["missing_check"].status, QueryStatus::NotFound);
        assert_eq!(outcome.counts.successful, 3);
        assert_eq!(outcome.counts.errors, 0);
        assert!(outcome.report_path.exists());
    }
}
