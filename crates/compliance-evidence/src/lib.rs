// crates/compliance-evidence/src/lib.rs
// ============================================================================
// Module: Evidence Recorder
// Description: Accumulates per-check outcomes plus host identity into a
//              finalized JSON artifact with summary statistics.
// Purpose: Implements §4.E — the scan-time bookkeeper the Scan Executor
//          drives one query at a time.
// Dependencies: compliance-core, chrono, serde_json, tempfile, thiserror,
//               tracing
// ============================================================================

//! ## Overview
//! `gather_machine_info` drives a [`RegistryReader`] against well-known
//! system keys and tolerates individual read failures — missing fields
//! become the literal `"UNKNOWN"`, the scan never aborts because host
//! identity could not be fully gathered. `log_result` classifies each
//! outcome; `finalize` computes the summary via
//! `compliance_core::summarize` and writes the record atomically. A second
//! `finalize` call is a no-op that returns the already-written record (see
//! `DESIGN.md`, Open Question 2).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use chrono::DateTime;
use chrono::Utc;
use compliance_core::EvidenceRecord;
use compliance_core::MachineInfo;
use compliance_core::QueryResult;
use compliance_core::QueryResultValue;
use compliance_core::QueryStatus;
use compliance_core::RootKey;
use compliance_core::ScanMetadata;
use compliance_core::compact_timestamp;
use compliance_core::interfaces::ReadDeadline;
use compliance_core::interfaces::RegistryReader;
use compliance_core::now;
use compliance_core::summarize;
use thiserror::Error;

// ============================================================================
// SECTION: Error
// ============================================================================

/// Evidence Recorder failures.
#[derive(Debug, Error)]
pub enum EvidenceError {
    /// The evidence JSON could not be serialized.
    #[error("failed to serialize evidence record: {0}")]
    Serialize(#[source] serde_json::Error),
    /// The artifact could not be written atomically.
    #[error("failed to write evidence artifact {path}: {source}")]
    Write {
        /// Destination path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

// ============================================================================
// SECTION: Machine Info Gathering
// ============================================================================

const CURRENT_VERSION_KEY: &str = r"SOFTWARE\Microsoft\Windows NT\CurrentVersion";

/// Drives `reader` against well-known system keys to assemble a
/// [`MachineInfo`]. Tolerates individual read failures; a field that could
/// not be read is reported as [`MachineInfo::UNKNOWN`].
pub async fn gather_machine_info(reader: &dyn RegistryReader) -> MachineInfo {
    let deadline = ReadDeadline::default();
    let os_version = read_string_or_unknown(reader, CURRENT_VERSION_KEY, "ProductName", deadline).await;
    let build_number =
        read_string_or_unknown(reader, CURRENT_VERSION_KEY, "CurrentBuildNumber", deadline).await;
    let owner = read_string_or_unknown(reader, CURRENT_VERSION_KEY, "RegisteredOwner", deadline).await;
    let organization =
        read_string_or_unknown(reader, CURRENT_VERSION_KEY, "RegisteredOrganization", deadline).await;
    let system_root = read_string_or_unknown(reader, CURRENT_VERSION_KEY, "PathName", deadline).await;
    let install_date = read_install_date(reader, deadline).await;

    MachineInfo {
        hostname: env_or_unknown("COMPUTERNAME"),
        os_version,
        build_number,
        architecture: std::env::consts::ARCH.to_owned(),
        owner,
        organization,
        install_date,
        system_root,
        domain: std::env::var("USERDOMAIN").ok(),
        ip_address: None,
        mac_address: None,
    }
}

/// Reads a string value, collapsing any failure to `"UNKNOWN"`.
async fn read_string_or_unknown(
    reader: &dyn RegistryReader,
    path: &str,
    value_name: &str,
    deadline: ReadDeadline,
) -> String {
    reader
        .read_string(RootKey::LocalMachine, path, value_name, deadline)
        .await
        .unwrap_or_else(|_| MachineInfo::UNKNOWN.to_owned())
}

/// Reads `InstallDate` as a raw registry integer and renders it as a
/// decimal string, collapsing any failure to `"UNKNOWN"`.
async fn read_install_date(reader: &dyn RegistryReader, deadline: ReadDeadline) -> String {
    reader
        .read_uint64(RootKey::LocalMachine, CURRENT_VERSION_KEY, "InstallDate", deadline)
        .await
        .map(|value| value.to_string())
        .unwrap_or_else(|_| MachineInfo::UNKNOWN.to_owned())
}

/// Reads an environment variable, collapsing its absence to `"UNKNOWN"`.
fn env_or_unknown(name: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| MachineInfo::UNKNOWN.to_owned())
}

/// Returns the current host user, or [`MachineInfo::UNKNOWN`] if it cannot
/// be determined.
#[must_use]
pub fn current_operator() -> String {
    std::env::var("USERNAME")
        .or_else(|_| std::env::var("USER"))
        .unwrap_or_else(|_| MachineInfo::UNKNOWN.to_owned())
}

// ============================================================================
// SECTION: Recorder
// ============================================================================

/// Accumulates query outcomes for one scan, then finalizes them into an
/// [`EvidenceRecord`] written atomically to `evidence_dir`.
#[derive(Debug)]
pub struct EvidenceRecorder {
    /// `SCAN_<YYYYMMDD_HHMMSS>`, fixed at construction time.
    scan_id: String,
    /// Scan start timestamp.
    start: DateTime<Utc>,
    /// Current host user, or `"UNKNOWN"`.
    operator: String,
    /// Logical report type, used in the output file name.
    report_type: String,
    /// Agent/tool version string recorded into scan metadata.
    tool_version: String,
    /// Directory the finalized artifact is written into.
    evidence_dir: PathBuf,
    /// Host identity, all `"UNKNOWN"` until `set_machine_information` runs.
    machine_information: MachineInfo,
    /// Accumulated outcomes, keyed by check name.
    results: BTreeMap<String, QueryResult>,
    /// Cached result and path of the first `finalize` call, if any.
    finalized: Option<(EvidenceRecord, PathBuf)>,
}

impl EvidenceRecorder {
    /// Starts a new scan's recorder. `machine_information` starts as all
    /// `"UNKNOWN"` fields until [`Self::set_machine_information`] is called.
    #[must_use]
    pub fn new(report_type: impl Into<String>, tool_version: impl Into<String>, evidence_dir: impl Into<PathBuf>) -> Self {
        let start = now();
        Self {
            scan_id: format!("SCAN_{}", compact_timestamp(start)),
            start,
            operator: current_operator(),
            report_type: report_type.into(),
            tool_version: tool_version.into(),
            evidence_dir: evidence_dir.into(),
            machine_information: unknown_machine_info(),
            results: BTreeMap::new(),
            finalized: None,
        }
    }

    /// Records host identity gathered via [`gather_machine_info`].
    pub fn set_machine_information(&mut self, info: MachineInfo) {
        self.machine_information = info;
    }

    /// The scan identifier, `SCAN_<YYYYMMDD_HHMMSS>`.
    #[must_use]
    pub fn scan_id(&self) -> &str {
        &self.scan_id
    }

    /// Records one query outcome and returns the classified
    /// [`QueryResult`] so the caller can hand the identical record to the
    /// Report Renderer. `error == None` classifies as `PASS`; `not_found`
    /// (meaningful only when `error.is_some()`) classifies as `NOT_FOUND`;
    /// any other error classifies as `ERROR`. `FAIL` is never produced
    /// here — it is reserved for the executor's policy/security block.
    #[allow(clippy::too_many_arguments, reason = "Mirrors the five logical fields of one query outcome plus classification inputs.")]
    pub fn log_result(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        registry_path: impl Into<String>,
        value_name: impl Into<String>,
        actual: Option<QueryResultValue>,
        expected: Option<String>,
        error: Option<String>,
        not_found: bool,
    ) -> QueryResult {
        let name = name.into();
        let status = compliance_core::classify(error.as_deref(), not_found);
        let result = QueryResult {
            name: name.clone(),
            description: description.into(),
            registry_path: registry_path.into(),
            value_name: value_name.into(),
            status,
            actual,
            error,
            expected,
            timestamp: now(),
        };
        self.results.insert(name, result.clone());
        result
    }

    /// Appends an already-built outcome directly, bypassing classification.
    /// Used by the scan executor for outcomes it classifies itself — a
    /// policy rejection (`FAIL`) or a root-key parse failure (`ERROR`) —
    /// so the identical record can also be handed to the Report Renderer.
    pub fn append(&mut self, result: QueryResult) {
        self.results.insert(result.name.clone(), result);
    }

    /// Returns the outcomes recorded so far, unsorted by anything but key
    /// order (the map is `BTreeMap`, so iteration is already alphabetical).
    #[must_use]
    pub fn results(&self) -> &BTreeMap<String, QueryResult> {
        &self.results
    }

    /// Computes the summary and writes the evidence artifact atomically to
    /// `<evidence_dir>/<report_type>_evidence_<YYYYMMDD_HHMMSS>.json`.
    ///
    /// Idempotent: a second call returns the record computed by the first
    /// call without writing a second file.
    ///
    /// # Errors
    ///
    /// Returns [`EvidenceError`] if the record cannot be serialized or the
    /// artifact cannot be written.
    pub fn finalize(&mut self) -> Result<EvidenceRecord, EvidenceError> {
        if let Some((record, _path)) = &self.finalized {
            return Ok(record.clone());
        }
        let end = now();
        let summary = summarize(self.results.values());
        let record = EvidenceRecord {
            scan_metadata: ScanMetadata {
                scan_id: self.scan_id.clone(),
                start: self.start,
                end,
                duration_ms: (end - self.start).num_milliseconds(),
                operator: self.operator.clone(),
                report_type: self.report_type.clone(),
                tool_version: self.tool_version.clone(),
            },
            machine_information: self.machine_information.clone(),
            scan_results: self.results.clone(),
            summary,
        };
        let path = self.evidence_dir.join(format!(
            "{}_evidence_{}.json",
            self.report_type,
            compact_timestamp(end)
        ));
        write_atomically(&self.evidence_dir, &path, &record)?;
        tracing::debug!(scan_id = %self.scan_id, path = %path.display(), "evidence finalized");
        self.finalized = Some((record.clone(), path));
        Ok(record)
    }
}

/// An all-`"UNKNOWN"` placeholder used before machine info is gathered.
fn unknown_machine_info() -> MachineInfo {
    MachineInfo {
        hostname: MachineInfo::UNKNOWN.to_owned(),
        os_version: MachineInfo::UNKNOWN.to_owned(),
        build_number: MachineInfo::UNKNOWN.to_owned(),
        architecture: MachineInfo::UNKNOWN.to_owned(),
        owner: MachineInfo::UNKNOWN.to_owned(),
        organization: MachineInfo::UNKNOWN.to_owned(),
        install_date: MachineInfo::UNKNOWN.to_owned(),
        system_root: MachineInfo::UNKNOWN.to_owned(),
        domain: None,
        ip_address: None,
        mac_address: None,
    }
}

/// Writes `record` to a temp file in `dir` then renames it into place at
/// `final_path`, so readers never observe a partially written artifact.
fn write_atomically(dir: &Path, final_path: &Path, record: &EvidenceRecord) -> Result<(), EvidenceError> {
    std::fs::create_dir_all(dir).map_err(|source| EvidenceError::Write {
        path: dir.display().to_string(),
        source,
    })?;
    let json = serde_json::to_string_pretty(record).map_err(EvidenceError::Serialize)?;
    let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(|source| EvidenceError::Write {
        path: final_path.display().to_string(),
        source,
    })?;
    use std::io::Write as _;
    temp.write_all(json.as_bytes())
        .map_err(|source| EvidenceError::Write {
            path: final_path.display().to_string(),
            source,
        })?;
    temp.persist(final_path)
        .map_err(|error| EvidenceError::Write {
            path: final_path.display().to_string(),
            source: error.error,
        })?;
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test fixtures favor direct unwraps for setup clarity.")]
    use compliance_core::QueryResultValue;

    use super::*;

    #[test]
    fn log_result_classifies_pass_not_found_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = EvidenceRecorder::new("cis_level1", "1.0.0", dir.path());

        recorder.log_result(
            "product_name",
            "desc",
            r"SOFTWARE\Example",
            "ProductName",
            Some(QueryResultValue::Scalar("Windows 11 Pro".to_owned())),
            None,
            None,
            false,
        );
        recorder.log_result(
            "missing_value",
            "desc",
            r"SOFTWARE\Example",
            "Missing",
            None,
            None,
            Some("value does not exist".to_owned()),
            true,
        );
        recorder.log_result(
            "broken_read",
            "desc",
            r"SOFTWARE\Example",
            "Broken",
            None,
            None,
            Some("access denied".to_owned()),
            false,
        );

        assert_eq!(recorder.results()["product_name"].status, QueryStatus::Pass);
        assert_eq!(recorder.results()["missing_value"].status, QueryStatus::NotFound);
        assert_eq!(recorder.results()["broken_read"].status, QueryStatus::Error);
    }

    #[test]
    fn finalize_is_idempotent_and_writes_one_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = EvidenceRecorder::new("cis_level1", "1.0.0", dir.path());
        recorder.log_result(
            "check",
            "desc",
            r"SOFTWARE\Example",
            "Value",
            Some(QueryResultValue::Scalar("ok".to_owned())),
            None,
            None,
            false,
        );

        let first = recorder.finalize().unwrap();
        let second = recorder.finalize().unwrap();
        assert_eq!(first.scan_metadata.scan_id, second.scan_metadata.scan_id);
        assert_eq!(first.summary.total, 1);

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn scan_id_has_expected_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = EvidenceRecorder::new("cis_level1", "1.0.0", dir.path());
        assert!(recorder.scan_id().starts_with("SCAN_"));
    }

    /// Fails every read, so `gather_machine_info` must fall back to
    /// `"UNKNOWN"` for every field rather than abort.
    struct AlwaysFailingReader;

    #[async_trait::async_trait]
    impl RegistryReader for AlwaysFailingReader {
        async fn read_string(
            &self,
            _root_key: RootKey,
            _path: &str,
            _value_name: &str,
            _deadline: ReadDeadline,
        ) -> Result<String, compliance_core::interfaces::RegistryReadError> {
            Err(stub_error())
        }

        async fn read_uint64(
            &self,
            _root_key: RootKey,
            _path: &str,
            _value_name: &str,
            _deadline: ReadDeadline,
        ) -> Result<u64, compliance_core::interfaces::RegistryReadError> {
            Err(stub_error())
        }

        async fn read_binary(
            &self,
            _root_key: RootKey,
            _path: &str,
            _value_name: &str,
            _deadline: ReadDeadline,
        ) -> Result<Vec<u8>, compliance_core::interfaces::RegistryReadError> {
            Err(stub_error())
        }

        async fn read_multi_string(
            &self,
            _root_key: RootKey,
            _path: &str,
            _value_name: &str,
            _deadline: ReadDeadline,
        ) -> Result<Vec<String>, compliance_core::interfaces::RegistryReadError> {
            Err(stub_error())
        }

        async fn read_auto(
            &self,
            _root_key: RootKey,
            _path: &str,
            _value_name: &str,
            _deadline: ReadDeadline,
        ) -> Result<compliance_core::RegistryValue, compliance_core::interfaces::RegistryReadError> {
            Err(stub_error())
        }

        async fn read_all(
            &self,
            _root_key: RootKey,
            _path: &str,
            _deadline: ReadDeadline,
        ) -> Result<BTreeMap<String, compliance_core::RegistryValue>, compliance_core::interfaces::RegistryReadError>
        {
            Err(stub_error())
        }
    }

    fn stub_error() -> compliance_core::interfaces::RegistryReadError {
        compliance_core::interfaces::RegistryReadError {
            operation: "GetStringValue".to_owned(),
            key: "HKLM\\SOFTWARE".to_owned(),
            value: String::new(),
            underlying: "simulated failure".to_owned(),
            not_found: true,
            cancelled: false,
        }
    }

    #[tokio::test]
    async fn gather_machine_info_falls_back_to_unknown_on_read_failure() {
        let info = gather_machine_info(&AlwaysFailingReader).await;
        assert_eq!(info.os_version, MachineInfo::UNKNOWN);
        assert_eq!(info.build_number, MachineInfo::UNKNOWN);
        assert_eq!(info.install_date, MachineInfo::UNKNOWN);
    }
}
