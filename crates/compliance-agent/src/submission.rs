// crates/compliance-agent/src/submission.rs
// ============================================================================
// Module: Submission Client
// Description: Wire payload construction and retrying HTTP delivery of a
//              scan's evidence to the Ingestion Server (§4.H, §6).
// Purpose: The only place that talks to the network; the scheduler and
//          cycle runner only see `Submission`/`SubmissionOutcome`.
// Dependencies: compliance-config, compliance-core, reqwest, serde_json,
//               thiserror, tokio, tracing
// ============================================================================

//! ## Overview
//! Retry is bounded by `max_attempts`, starts at `initial_backoff`, doubles
//! (or whatever `backoff_multiplier` says) each attempt up to `max_backoff`.
//! A 4xx other than 408/425/429 is treated as permanent — no amount of
//! retrying fixes a malformed payload or a revoked API key. A 429 honors
//! `Retry-After` when the server sends one, overriding the computed delay.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use chrono::DateTime;
use chrono::Utc;
use compliance_config::RetrySection;
use compliance_core::EvidenceRecord;
use reqwest::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use tracing::warn;

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// The submission payload shape accepted by `POST /api/v1/compliance/submit`.
///
/// Mirrors the Ingestion Server's inbound DTO field-for-field (§6); the two
/// sides are independently maintained, not code-shared, because one speaks
/// for "what this agent sends" and the other for "what the server accepts".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionPayload {
    /// Caller-chosen submission identifier; omitted lets the server mint one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_id: Option<String>,
    /// Stable client identity.
    pub client_id: String,
    /// Reported hostname.
    pub hostname: String,
    /// Scan timestamp.
    pub timestamp: DateTime<Utc>,
    /// Logical report type.
    pub report_type: String,
    /// Report config schema version.
    pub report_version: String,
    /// Per-check outcomes and the free-text overall status.
    pub compliance: ComplianceBlock,
    /// Opaque evidence entries; validated for non-emptiness only.
    pub evidence: Vec<serde_json::Value>,
    /// Host identity reported alongside the scan.
    pub system_info: SystemInfoWire,
}

/// The `compliance` block of a [`SubmissionPayload`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceBlock {
    /// Free-text overall status, stored verbatim.
    pub overall_status: String,
    /// Total queries executed.
    pub total_checks: u32,
    /// Queries that passed.
    pub passed_checks: u32,
    /// Queries that failed.
    pub failed_checks: u32,
    /// Queries that produced a warning-equivalent outcome (`NOT_FOUND`/`ERROR`).
    pub warning_checks: u32,
    /// Per-check results.
    pub queries: Vec<QueryWire>,
}

/// One per-check entry in a [`SubmissionPayload`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryWire {
    /// Check name.
    pub name: String,
    /// Check description.
    pub description: String,
    /// `PASS`/`FAIL`/`NOT_FOUND`/`ERROR`.
    pub status: compliance_core::QueryStatus,
    /// Expected value, if the config declared one.
    pub expected: Option<String>,
    /// Actual value observed, rendered as a display string.
    pub actual: Option<String>,
    /// Error message, if any.
    pub message: Option<String>,
}

/// Host identity reported alongside a [`SubmissionPayload`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfoWire {
    /// OS product name.
    pub os_version: String,
    /// OS build number.
    pub build_number: String,
    /// CPU architecture.
    pub architecture: String,
    /// Domain, if joined.
    pub domain: Option<String>,
    /// Primary IPv4 address, if discoverable.
    pub ip_address: Option<String>,
}

/// Builds a [`SubmissionPayload`] from one finalized scan's evidence.
#[must_use]
pub fn payload_from_evidence(evidence: &EvidenceRecord, client_id: &str) -> SubmissionPayload {
    let warning_checks = evidence.summary.not_found + evidence.summary.errors;
    let queries = evidence
        .scan_results
        .values()
        .map(|result| QueryWire {
            name: result.name.clone(),
            description: result.description.clone(),
            status: result.status,
            expected: result.expected.clone(),
            actual: result.actual.as_ref().map(render_query_value),
            message: result.error.clone(),
        })
        .collect();

    SubmissionPayload {
        submission_id: None,
        client_id: client_id.to_owned(),
        hostname: evidence.machine_information.hostname.clone(),
        timestamp: evidence.scan_metadata.end,
        report_type: evidence.scan_metadata.report_type.clone(),
        report_version: evidence.scan_metadata.tool_version.clone(),
        compliance: ComplianceBlock {
            overall_status: overall_status(evidence),
            total_checks: evidence.summary.total,
            passed_checks: evidence.summary.passed,
            failed_checks: evidence.summary.failed,
            warning_checks,
            queries,
        },
        evidence: vec![serde_json::json!({"scan_id": evidence.scan_metadata.scan_id})],
        system_info: SystemInfoWire {
            os_version: evidence.machine_information.os_version.clone(),
            build_number: evidence.machine_information.build_number.clone(),
            architecture: evidence.machine_information.architecture.clone(),
            domain: evidence.machine_information.domain.clone(),
            ip_address: evidence.machine_information.ip_address.clone(),
        },
    }
}

/// Renders a [`compliance_core::QueryResultValue`] to the flat string the
/// wire format's `actual` field expects; a read-all map is joined as
/// `name=value` pairs.
fn render_query_value(value: &compliance_core::QueryResultValue) -> String {
    match value {
        compliance_core::QueryResultValue::Scalar(scalar) => scalar.clone(),
        compliance_core::QueryResultValue::Map(map) => {
            map.iter().map(|(name, value)| format!("{name}={value}")).collect::<Vec<_>>().join("; ")
        }
    }
}

/// Free-text overall status derived from the scan's summary counts.
fn overall_status(evidence: &EvidenceRecord) -> String {
    if evidence.summary.errors > 0 {
        "ERROR".to_owned()
    } else if evidence.summary.failed > 0 {
        "NON_COMPLIANT".to_owned()
    } else {
        "COMPLIANT".to_owned()
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Submission delivery failures.
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// The request could not be sent at all (DNS, connect, TLS, timeout).
    #[error("submission request failed: {0}")]
    Transport(#[source] reqwest::Error),
    /// The server rejected the payload with a non-retryable status.
    #[error("submission rejected with status {status}: {body}")]
    Rejected {
        /// The response status code.
        status: StatusCode,
        /// The response body, truncated for logging.
        body: String,
    },
}

/// Whether a [`SubmissionError`] is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retryable {
    /// Try again, honoring the next backoff delay.
    Yes,
    /// Stop; this payload will never succeed unmodified.
    No,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Thin `reqwest`-backed client for the compliance submission endpoint.
#[derive(Clone)]
pub struct SubmissionClient {
    http: Client,
    submit_url: String,
    api_key: String,
}

impl std::fmt::Debug for SubmissionClient {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("SubmissionClient")
            .field("submit_url", &self.submit_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl SubmissionClient {
    /// Builds a client targeting `server_url`'s submission endpoint,
    /// presenting `api_key` as a bearer credential on every request.
    ///
    /// # Errors
    /// Returns an error if the underlying `reqwest::Client` cannot be built
    /// (invalid TLS configuration, for example).
    pub fn new(server_url: &str, api_key: &str) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        let submit_url = format!("{}/api/v1/compliance/submit", server_url.trim_end_matches('/'));
        Ok(Self { http, submit_url, api_key: api_key.to_owned() })
    }

    /// Attempts one POST of `payload`. Returns the rejection's retryability
    /// alongside the error so the caller can decide whether to retry.
    async fn attempt(&self, payload: &SubmissionPayload) -> Result<(), (SubmissionError, Retryable, Option<Duration>)> {
        let response = self
            .http
            .post(&self.submit_url)
            .bearer_auth(&self.api_key)
            .json(payload)
            .send()
            .await
            .map_err(|error| (SubmissionError::Transport(error), Retryable::Yes, None))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok())
            .map(Duration::from_secs);

        let body_text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body_text).map(|parsed| parsed.message).unwrap_or(body_text);

        let retryable = if status.is_server_error() {
            Retryable::Yes
        } else if matches!(status.as_u16(), 408 | 425 | 429) {
            Retryable::Yes
        } else {
            Retryable::No
        };

        Err((SubmissionError::Rejected { status, body: message }, retryable, retry_after))
    }

    /// Submits `payload`, retrying transient failures per `retry` up to
    /// `max_attempts`. Returns the final error if every attempt fails.
    pub async fn submit_with_retry(&self, payload: &SubmissionPayload, retry: &RetrySection) -> Result<(), SubmissionError> {
        let mut delay = Duration::from_millis(retry.initial_backoff_ms);
        let max_delay = Duration::from_millis(retry.max_backoff_ms);

        for attempt in 1..=retry.max_attempts.max(1) {
            match self.attempt(payload).await {
                Ok(()) => {
                    info!(attempt, "submission accepted");
                    return Ok(());
                }
                Err((error, Retryable::No, _)) => {
                    warn!(attempt, %error, "submission permanently rejected");
                    return Err(error);
                }
                Err((error, Retryable::Yes, retry_after)) => {
                    if attempt == retry.max_attempts.max(1) {
                        warn!(attempt, %error, "submission retries exhausted");
                        return Err(error);
                    }
                    let wait = retry_after.unwrap_or(delay);
                    warn!(attempt, %error, wait_ms = wait.as_millis(), "submission failed, retrying");
                    tokio::time::sleep(wait).await;
                    delay = next_delay(delay, retry.backoff_multiplier, max_delay);
                }
            }
        }
        unreachable!("loop always returns on its final iteration")
    }
}

/// Computes the next backoff delay, capped at `max`.
fn next_delay(current: Duration, multiplier: f64, max: Duration) -> Duration {
    let scaled_ms = (current.as_millis() as f64 * multiplier).round();
    #[allow(clippy::cast_possible_truncation, reason = "Backoff delays never approach u64::MAX milliseconds.")]
    let scaled = Duration::from_millis(scaled_ms as u64);
    scaled.min(max)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test fixtures favor direct unwraps for setup clarity.")]
    use std::collections::BTreeMap;

    use compliance_core::MachineInfo;
    use compliance_core::QueryResult;
    use compliance_core::QueryStatus;
    use compliance_core::ScanMetadata;
    use compliance_core::ScanSummary;
    use compliance_core::now;

    use super::*;

    fn sample_evidence() -> EvidenceRecord {
        let mut scan_results = BTreeMap::new();
        scan_results.insert(
            "check-one".to_owned(),
            QueryResult {
                name: "check-one".to_owned(),
                description: "desc".to_owned(),
                registry_path: String::new(),
                value_name: String::new(),
                status: QueryStatus::Pass,
                actual: None,
                error: None,
                expected: None,
                timestamp: now(),
            },
        );
        EvidenceRecord {
            scan_metadata: ScanMetadata {
                scan_id: "SCAN_20260101_000000".to_owned(),
                start: now(),
                end: now(),
                duration_ms: 0,
                operator: MachineInfo::UNKNOWN.to_owned(),
                report_type: "baseline".to_owned(),
                tool_version: "1.0".to_owned(),
            },
            machine_information: MachineInfo {
                hostname: "HOST-1".to_owned(),
                os_version: MachineInfo::UNKNOWN.to_owned(),
                build_number: MachineInfo::UNKNOWN.to_owned(),
                architecture: MachineInfo::UNKNOWN.to_owned(),
                owner: MachineInfo::UNKNOWN.to_owned(),
                organization: MachineInfo::UNKNOWN.to_owned(),
                install_date: MachineInfo::UNKNOWN.to_owned(),
                system_root: MachineInfo::UNKNOWN.to_owned(),
                domain: None,
                ip_address: None,
            },
            summary: ScanSummary { total: 1, passed: 1, failed: 0, not_found: 0, errors: 0 },
            scan_results,
        }
    }

    #[test]
    fn payload_from_evidence_carries_hostname_and_counts() {
        let evidence = sample_evidence();
        let payload = payload_from_evidence(&evidence, "client-abc");
        assert_eq!(payload.hostname, "HOST-1");
        assert_eq!(payload.compliance.total_checks, 1);
        assert_eq!(payload.compliance.overall_status, "COMPLIANT");
        assert_eq!(payload.compliance.queries.len(), 1);
    }

    #[test]
    fn next_delay_doubles_and_caps() {
        let max = Duration::from_millis(1_000);
        let first = next_delay(Duration::from_millis(500), 2.0, max);
        assert_eq!(first, Duration::from_millis(1_000));
        let second = next_delay(first, 2.0, max);
        assert_eq!(second, max);
    }
}
