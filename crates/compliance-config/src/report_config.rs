// crates/compliance-config/src/report_config.rs
// ============================================================================
// Module: Report Config Loader
// Description: Parses a Report Config JSON document and validates it.
// Purpose: Implements §4.D Config Loader.
// Dependencies: compliance-core, compliance-validator, serde_json
// ============================================================================

//! ## Overview
//! The report config file itself is an external collaborator's artifact;
//! this loader only consumes it. Root-key parsing (short/long hive forms)
//! lives in `compliance-core::RootKey::parse` and is exercised through
//! `compliance-validator::validate_config`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;

use compliance_core::ReportConfig;
use compliance_validator::ValidationError;
use thiserror::Error;

// ============================================================================
// SECTION: Error
// ============================================================================

/// Report config loading failures.
#[derive(Debug, Error)]
pub enum ReportConfigError {
    /// The file could not be read.
    #[error("failed to read report config {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file was not well-formed JSON.
    #[error("failed to parse report config {path}: {source}")]
    Parse {
        /// Path that failed to parse.
        path: String,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
    /// The parsed config failed validation.
    #[error("report config {path} is invalid: {source}")]
    Invalid {
        /// Path that failed validation.
        path: String,
        /// The first validation failure encountered.
        #[source]
        source: ValidationError,
    },
}

// ============================================================================
// SECTION: Loaded Config
// ============================================================================

/// A validated report config plus the logical report type derived from the
/// file's base name.
#[derive(Debug, Clone)]
pub struct LoadedReportConfig {
    /// The validated, in-memory config.
    pub config: ReportConfig,
    /// Logical report type, derived from the config file's base name
    /// (e.g. `cis_level1.json` -> `"cis_level1"`).
    pub report_type: String,
}

// ============================================================================
// SECTION: Loader
// ============================================================================

/// Loads and validates a Report Config JSON document.
///
/// # Errors
///
/// Returns [`ReportConfigError`] when the file cannot be read, is not
/// well-formed JSON, or fails validation. On validation failure the error
/// carries the first failure, prefixed `queries[i] (name): …` for
/// query-level failures (see [`compliance_validator::validate_config`]).
pub fn load_report_config(path: &Path) -> Result<LoadedReportConfig, ReportConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ReportConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let config: ReportConfig = serde_json::from_str(&raw).map_err(|source| ReportConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    compliance_validator::validate_config(&config).map_err(|source| ReportConfigError::Invalid {
        path: path.display().to_string(),
        source,
    })?;
    let report_type = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unknown".to_owned());
    Ok(LoadedReportConfig { config, report_type })
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test fixtures favor direct unwraps for setup clarity.")]
    use super::*;

    fn write_config(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn loads_valid_config_and_derives_report_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "cis_level1.json",
            r#"{
                "version": "1.0",
                "metadata": {"title": "CIS Level 1"},
                "queries": [
                    {
                        "name": "product_name",
                        "description": "Windows product name",
                        "root_key": "HKLM",
                        "path": "SOFTWARE\\Microsoft\\Windows NT\\CurrentVersion",
                        "value_name": "ProductName",
                        "operation": "read"
                    }
                ]
            }"#,
        );
        let loaded = load_report_config(&path).unwrap();
        assert_eq!(loaded.report_type, "cis_level1");
        assert_eq!(loaded.config.queries.len(), 1);
    }

    #[test]
    fn rejects_config_with_traversal_in_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "bad.json",
            r#"{
                "version": "1.0",
                "metadata": {},
                "queries": [
                    {
                        "name": "q",
                        "description": "",
                        "root_key": "HKLM",
                        "path": "SOFTWARE\\..\\SAM",
                        "value_name": "",
                        "operation": "read"
                    }
                ]
            }"#,
        );
        assert!(matches!(load_report_config(&path), Err(ReportConfigError::Invalid { .. })));
    }

    #[test]
    fn rejects_missing_file() {
        let result = load_report_config(Path::new("/nonexistent/does-not-exist.json"));
        assert!(matches!(result, Err(ReportConfigError::Io { .. })));
    }
}
