// crates/compliance-agent/src/cache.rs
// ============================================================================
// Module: Offline Submission Cache
// Description: Filesystem-backed FIFO queue of submissions that exhausted
//              retry, drained in the background when connectivity returns
//              (§4.H).
// Purpose: Give a submission a `CACHED` resting state instead of dropping it.
// Dependencies: serde_json, tracing, uuid
// ============================================================================

//! ## Overview
//! Each cached payload is one JSON file named `<submission-timestamp>-<id>.json`
//! under the cache directory; lexical order is FIFO order since the
//! timestamp prefix sorts chronologically. A successful drain deletes the
//! file; a failed drain leaves it for the next pass.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use thiserror::Error;
use tracing::info;
use tracing::warn;
use uuid::Uuid;

use crate::submission::SubmissionClient;
use crate::submission::SubmissionError;
use crate::submission::SubmissionPayload;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Offline cache failures.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The cache directory could not be created or read.
    #[error("cache directory {path} inaccessible: {source}")]
    Io {
        /// The offending path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A cached payload failed to serialize or deserialize.
    #[error("cached payload {path} malformed: {source}")]
    Serde {
        /// The offending path.
        path: String,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
}

// ============================================================================
// SECTION: Cache
// ============================================================================

/// A directory of pending submissions, enqueued on delivery failure.
#[derive(Debug, Clone)]
pub struct OfflineCache {
    directory: PathBuf,
}

impl OfflineCache {
    /// Opens (creating if absent) the cache directory at `directory`.
    ///
    /// # Errors
    /// Returns [`CacheError::Io`] if the directory cannot be created.
    pub fn open(directory: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let directory = directory.into();
        fs::create_dir_all(&directory).map_err(|source| CacheError::Io { path: directory.display().to_string(), source })?;
        Ok(Self { directory })
    }

    /// Enqueues `payload`, returning the file it was written to.
    ///
    /// # Errors
    /// Returns [`CacheError`] if the payload cannot be serialized or the
    /// file cannot be written.
    pub fn enqueue(&self, payload: &SubmissionPayload) -> Result<PathBuf, CacheError> {
        let filename = format!("{}-{}.json", payload.timestamp.format("%Y%m%dT%H%M%S"), Uuid::new_v4());
        let path = self.directory.join(filename);
        let body = serde_json::to_vec_pretty(payload).map_err(|source| CacheError::Serde { path: path.display().to_string(), source })?;
        fs::write(&path, body).map_err(|source| CacheError::Io { path: path.display().to_string(), source })?;
        info!(path = %path.display(), "submission cached for later delivery");
        Ok(path)
    }

    /// Lists cached payload files in FIFO (lexical) order.
    ///
    /// # Errors
    /// Returns [`CacheError::Io`] if the directory cannot be read.
    pub fn pending(&self) -> Result<Vec<PathBuf>, CacheError> {
        let mut entries = fs::read_dir(&self.directory)
            .map_err(|source| CacheError::Io { path: self.directory.display().to_string(), source })?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect::<Vec<_>>();
        entries.sort();
        Ok(entries)
    }

    /// Attempts delivery of every cached payload via `client`, in FIFO
    /// order, deleting each file on success and leaving it otherwise.
    /// Returns the count successfully drained.
    pub async fn drain(&self, client: &SubmissionClient, retry: &compliance_config::RetrySection) -> usize {
        let pending = match self.pending() {
            Ok(pending) => pending,
            Err(error) => {
                warn!(%error, "failed to list offline cache");
                return 0;
            }
        };

        let mut drained = 0;
        for path in pending {
            match load_payload(&path) {
                Ok(payload) => match client.submit_with_retry(&payload, retry).await {
                    Ok(()) => {
                        if let Err(error) = fs::remove_file(&path) {
                            warn!(path = %path.display(), %error, "drained submission but failed to remove cache file");
                        }
                        drained += 1;
                    }
                    Err(SubmissionError::Rejected { status, body }) => {
                        warn!(path = %path.display(), %status, %body, "cached submission permanently rejected on drain, leaving in cache");
                    }
                    Err(error @ SubmissionError::Transport(_)) => {
                        warn!(path = %path.display(), %error, "cached submission still undeliverable");
                    }
                },
                Err(error) => warn!(path = %path.display(), %error, "skipping malformed cache entry"),
            }
        }
        drained
    }
}

/// Reads and parses one cached payload file.
fn load_payload(path: &Path) -> Result<SubmissionPayload, CacheError> {
    let body = fs::read(path).map_err(|source| CacheError::Io { path: path.display().to_string(), source })?;
    serde_json::from_slice(&body).map_err(|source| CacheError::Serde { path: path.display().to_string(), source })
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test fixtures favor direct unwraps for setup clarity.")]
    use chrono::Utc;

    use super::*;
    use crate::submission::ComplianceBlock;
    use crate::submission::SystemInfoWire;

    fn sample_payload() -> SubmissionPayload {
        SubmissionPayload {
            submission_id: None,
            client_id: "client-abc".to_owned(),
            hostname: "HOST-1".to_owned(),
            timestamp: Utc::now(),
            report_type: "baseline".to_owned(),
            report_version: "1.0".to_owned(),
            compliance: ComplianceBlock { overall_status: "COMPLIANT".to_owned(), total_checks: 0, passed_checks: 0, failed_checks: 0, warning_checks: 0, queries: Vec::new() },
            evidence: vec![serde_json::json!({"scan_id": "SCAN_1"})],
            system_info: SystemInfoWire { os_version: "Windows".to_owned(), build_number: "1".to_owned(), architecture: "x86_64".to_owned(), domain: None, ip_address: None },
        }
    }

    #[test]
    fn enqueue_then_pending_round_trips_one_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = OfflineCache::open(dir.path()).unwrap();
        cache.enqueue(&sample_payload()).unwrap();
        let pending = cache.pending().unwrap();
        assert_eq!(pending.len(), 1);
        let loaded = load_payload(&pending[0]).unwrap();
        assert_eq!(loaded.client_id, "client-abc");
    }

    #[test]
    fn pending_is_empty_on_a_fresh_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = OfflineCache::open(dir.path()).unwrap();
        assert!(cache.pending().unwrap().is_empty());
    }
}
