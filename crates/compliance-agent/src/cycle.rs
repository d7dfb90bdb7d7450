// crates/compliance-agent/src/cycle.rs
// ============================================================================
// Module: Scan Cycle
// Description: Runs every configured report through the Scan Executor, then
//              submits (or caches) each resulting scan's evidence (§4.H).
// Purpose: The "what running means" half of the agent; `scheduler` owns
//          "when".
// Dependencies: compliance-config, compliance-core, compliance-executor,
//               compliance-registry, tracing
// ============================================================================

//! ## Overview
//! One cycle: resolve this host's client identity, discover every
//! configured report file, run each through the executor, and submit each
//! scan's evidence independently — one scan's delivery failure never stops
//! the others from running or submitting. Before returning, the cycle
//! drains whatever the offline cache was already holding.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use compliance_config::AppConfig;
use compliance_executor::AccessPolicy;
use compliance_registry::WinRegistryReader;
use thiserror::Error;
use tracing::error;
use tracing::info;
use tracing::warn;
use uuid::Uuid;

use crate::cache::CacheError;
use crate::cache::OfflineCache;
use crate::submission::SubmissionClient;
use crate::submission::payload_from_evidence;

/// Tool version stamped on every evidence artifact and submission.
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Cycle-level failures; an individual report's executor or submission
/// failure is recorded in [`CycleOutcome`] instead of aborting the cycle.
#[derive(Debug, Error)]
pub enum CycleError {
    /// The offline cache directory could not be opened.
    #[error("failed to open offline cache: {0}")]
    Cache(#[source] CacheError),
    /// The submission HTTP client could not be built.
    #[error("failed to build submission client: {0}")]
    Client(#[source] reqwest::Error),
    /// No report configs were found to run.
    #[error("no report configs found under the configured paths")]
    NoReports,
}

// ============================================================================
// SECTION: Outcome
// ============================================================================

/// What happened to one configured report during a cycle.
#[derive(Debug, Clone)]
pub struct ReportOutcome {
    /// The report config path that was run.
    pub path: PathBuf,
    /// Scan executor counts, if the scan itself completed.
    pub counts: Option<compliance_executor::ScanCounts>,
    /// Whether the resulting evidence was delivered, cached, or neither.
    pub delivery: DeliveryOutcome,
}

/// The delivery result of one report's evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The scan itself failed before delivery was attempted.
    ScanFailed,
    /// Delivered to the server on this attempt.
    Delivered,
    /// Delivery failed; the payload was written to the offline cache.
    Cached,
}

/// The full outcome of one scan cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleOutcome {
    /// Per-report outcomes, in discovery order.
    pub reports: Vec<ReportOutcome>,
    /// Payloads successfully drained from the offline cache this cycle.
    pub drained: usize,
}

impl CycleOutcome {
    /// Whether every report in the cycle both scanned and delivered
    /// cleanly — the signal a one-shot invocation's exit code reflects.
    #[must_use]
    pub fn fully_successful(&self) -> bool {
        self.reports.iter().all(|report| matches!(report.delivery, DeliveryOutcome::Delivered))
    }
}

// ============================================================================
// SECTION: Cycle
// ============================================================================

/// Runs one full scan cycle against `config`.
///
/// # Errors
/// Returns [`CycleError`] for cycle-level setup failures (cache, HTTP
/// client, no reports discovered); per-report scan or delivery failures are
/// recorded in the returned [`CycleOutcome`] instead.
pub async fn run_cycle(config: &AppConfig) -> Result<CycleOutcome, CycleError> {
    let report_paths = discover_reports(&config.client.reports);
    if report_paths.is_empty() {
        return Err(CycleError::NoReports);
    }

    let cache = OfflineCache::open(&config.client.cache.path).map_err(CycleError::Cache)?;
    let api_key = config.client.api_key.clone().unwrap_or_default();
    let client = SubmissionClient::new(&config.client.server_url, &api_key).map_err(CycleError::Client)?;
    let client_id = resolve_client_id(config);
    let reader = WinRegistryReader::new();
    let policy = AccessPolicy { deny_list: config.security.deny_list.clone(), allow_list: config.security.allow_list.clone() };

    let mut outcome = CycleOutcome::default();
    for path in report_paths {
        let report_outcome = run_one_report(&path, &reader, &policy, config, &client, &client_id, &cache).await;
        outcome.reports.push(report_outcome);
    }

    outcome.drained = cache.drain(&client, &config.client.retry).await;
    Ok(outcome)
}

/// Loads, runs, and submits (or caches) one report config.
async fn run_one_report(
    path: &Path,
    reader: &WinRegistryReader,
    policy: &AccessPolicy,
    config: &AppConfig,
    client: &SubmissionClient,
    client_id: &str,
    cache: &OfflineCache,
) -> ReportOutcome {
    let loaded = match compliance_config::load_report_config(path) {
        Ok(loaded) => loaded,
        Err(error) => {
            error!(path = %path.display(), %error, "failed to load report config");
            return ReportOutcome { path: path.to_path_buf(), counts: None, delivery: DeliveryOutcome::ScanFailed };
        }
    };

    let scan = compliance_executor::run_scan(
        &loaded.config,
        reader,
        policy,
        &loaded.report_type,
        &loaded.config.metadata.title,
        TOOL_VERSION,
        &config.reports.evidence_dir,
        &config.reports.output_dir,
    )
    .await;

    let outcome = match scan {
        Ok(outcome) => outcome,
        Err(error) => {
            error!(path = %path.display(), %error, "scan execution failed");
            return ReportOutcome { path: path.to_path_buf(), counts: None, delivery: DeliveryOutcome::ScanFailed };
        }
    };

    let mut payload = payload_from_evidence(&outcome.evidence, client_id);
    if let Some(hostname) = &config.client.hostname {
        payload.hostname = hostname.clone();
    }

    let delivery = match client.submit_with_retry(&payload, &config.client.retry).await {
        Ok(()) => DeliveryOutcome::Delivered,
        Err(error) => {
            warn!(path = %path.display(), %error, "delivery exhausted, falling back to offline cache");
            if let Err(cache_error) = cache.enqueue(&payload) {
                error!(path = %path.display(), %cache_error, "failed to cache undeliverable submission");
            }
            DeliveryOutcome::Cached
        }
    };

    info!(path = %path.display(), report_path = %outcome.report_path.display(), successful = outcome.counts.successful, errors = outcome.counts.errors, "scan complete");
    ReportOutcome { path: path.to_path_buf(), counts: Some(outcome.counts), delivery }
}

/// Expands `configured` paths into concrete report config files: a file
/// entry is used as-is, a directory entry contributes every `*.json` file
/// directly inside it.
fn discover_reports(configured: &[PathBuf]) -> Vec<PathBuf> {
    let mut discovered = Vec::new();
    for entry in configured {
        if entry.is_dir() {
            let Ok(read_dir) = fs::read_dir(entry) else {
                warn!(path = %entry.display(), "configured report directory is not readable");
                continue;
            };
            let mut files = read_dir
                .filter_map(Result::ok)
                .map(|dir_entry| dir_entry.path())
                .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
                .collect::<Vec<_>>();
            files.sort();
            discovered.extend(files);
        } else {
            discovered.push(entry.clone());
        }
    }
    discovered
}

/// Resolves this host's stable client identity: the configured value, or a
/// UUID minted once and persisted under the cache directory.
fn resolve_client_id(config: &AppConfig) -> String {
    if let Some(client_id) = &config.client.client_id {
        return client_id.clone();
    }

    let marker = config.client.cache.path.join(".client_id");
    if let Ok(existing) = fs::read_to_string(&marker) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_owned();
        }
    }

    let minted = Uuid::new_v4().to_string();
    if let Err(error) = fs::create_dir_all(&config.client.cache.path).and_then(|()| fs::write(&marker, &minted)) {
        warn!(%error, "failed to persist minted client id; it will be re-minted next run");
    }
    minted
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test fixtures favor direct unwraps for setup clarity.")]
    use super::*;

    #[test]
    fn discover_reports_expands_directories_to_json_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.json"), "{}").unwrap();
        fs::write(dir.path().join("b.json"), "{}").unwrap();
        fs::write(dir.path().join("ignore.txt"), "x").unwrap();

        let discovered = discover_reports(&[dir.path().to_path_buf()]);
        assert_eq!(discovered.len(), 2);
    }

    #[test]
    fn discover_reports_keeps_explicit_files_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("one.json");
        fs::write(&file, "{}").unwrap();

        let discovered = discover_reports(&[file.clone()]);
        assert_eq!(discovered, vec![file]);
    }

    #[test]
    fn resolve_client_id_mints_and_persists_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.client.cache.path = dir.path().to_path_buf();

        let first = resolve_client_id(&config);
        let second = resolve_client_id(&config);
        assert_eq!(first, second);
    }

    #[test]
    fn resolve_client_id_prefers_configured_value() {
        let mut config = AppConfig::default();
        config.client.client_id = Some("fixed-id".to_owned());
        assert_eq!(resolve_client_id(&config), "fixed-id");
    }
}
