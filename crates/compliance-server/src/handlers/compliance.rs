// crates/compliance-server/src/handlers/compliance.rs
// ============================================================================
// Module: Compliance Endpoints
// Description: `/api/v1/compliance/submit`, `/api/v1/clients`,
//              `/api/v1/clients/:id/history` (§4.K, §6).
// Purpose: Accept agent submissions, reconstruct the evidence record the
//          rest of the workspace already knows how to summarize, and serve
//          the client/history read paths any authenticated caller may use.
// Dependencies: axum, chrono, compliance-core, compliance-store, serde_json
// ============================================================================

//! ## Overview
//! The submission wire format (§6) carries the authoritative per-check
//! outcomes in `compliance.queries[]` but omits several fields
//! [`compliance_core::EvidenceRecord`] expects (scan timing, most of
//! [`compliance_core::MachineInfo`], and the registry path/value name per
//! check). Those are synthesized with the same `"UNKNOWN"` placeholder the
//! Registry Read Engine itself uses for fields it cannot determine. The
//! wire format's separate `evidence` array is redundant with `compliance`
//! for this system's purposes and is checked only for presence, never
//! reconciled against it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::DateTime;
use chrono::Utc;
use compliance_core::ClientId;
use compliance_core::EvidenceRecord;
use compliance_core::MachineInfo;
use compliance_core::QueryResult;
use compliance_core::QueryResultValue;
use compliance_core::QueryStatus;
use compliance_core::ScanMetadata;
use compliance_core::SubmissionId;
use compliance_core::summarize;
use compliance_store::Client;
use compliance_store::Submission;
use serde::Deserialize;
use serde::Serialize;

use crate::error::ApiError;
use crate::middleware::AnyAuthIdentity;
use crate::state::ServerState;

// ============================================================================
// SECTION: Submission wire shapes
// ============================================================================

/// Body of `POST /api/v1/compliance/submit`.
#[derive(Debug, Deserialize)]
pub struct SubmissionRequest {
    /// Caller-supplied submission id; must be unique if present.
    pub submission_id: Option<String>,
    /// The agent's self-chosen logical client id.
    pub client_id: String,
    /// Reported hostname.
    pub hostname: String,
    /// When the agent finished this scan.
    pub timestamp: DateTime<Utc>,
    /// Logical report type.
    pub report_type: String,
    /// Report content version.
    pub report_version: String,
    /// Per-check outcomes and their rollup.
    pub compliance: ComplianceBlock,
    /// Redundant evidence payload; only its presence is validated.
    pub evidence: Vec<serde_json::Value>,
    /// Host identity supplement.
    pub system_info: SystemInfoWire,
}

/// The `compliance` object within [`SubmissionRequest`].
#[derive(Debug, Deserialize)]
pub struct ComplianceBlock {
    /// Agent-reported overall status label; stored verbatim, not
    /// recomputed (the counts are — see [`summarize`]).
    pub overall_status: String,
    /// Per-check outcomes.
    pub queries: Vec<QueryWire>,
}

/// One entry of `compliance.queries[]`.
#[derive(Debug, Deserialize)]
pub struct QueryWire {
    /// Check name.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Outcome classification.
    pub status: QueryStatus,
    /// Expected value, as declared by the report config.
    pub expected: Option<String>,
    /// The value actually observed.
    pub actual: Option<String>,
    /// Error or explanatory message.
    pub message: Option<String>,
}

/// The `system_info` object within [`SubmissionRequest`].
#[derive(Debug, Deserialize)]
pub struct SystemInfoWire {
    /// OS product name.
    pub os_version: String,
    /// OS build number.
    pub build_number: String,
    /// CPU architecture.
    pub architecture: String,
    /// Domain, if joined.
    pub domain: Option<String>,
    /// Primary IPv4 address, if known.
    pub ip_address: Option<String>,
}

/// Body returned on a successful submission.
#[derive(Debug, Serialize)]
pub struct SubmissionAccepted {
    /// The assigned (or caller-supplied) submission id.
    pub submission_id: SubmissionId,
    /// Always `"accepted"`.
    pub status: &'static str,
}

// ============================================================================
// SECTION: Submit
// ============================================================================

/// `POST /api/v1/compliance/submit` — validates, persists, and expands a
/// submission into the `query_results` table.
///
/// # Errors
/// Returns [`ApiError::Validation`] if the submission is malformed or
/// reuses an existing `submission_id`; [`ApiError::Store`] on a persistence
/// failure.
pub async fn submit(
    State(state): State<ServerState>,
    AnyAuthIdentity(identity): AnyAuthIdentity,
    Json(body): Json<SubmissionRequest>,
) -> Result<(StatusCode, Json<SubmissionAccepted>), ApiError> {
    identity.require_permission("write")?;

    if body.compliance.queries.is_empty() {
        return Err(ApiError::Validation("compliance.queries must not be empty".to_owned()));
    }
    if body.evidence.is_empty() {
        return Err(ApiError::Validation("evidence must not be empty".to_owned()));
    }

    let submission_id = resolve_submission_id(&state, body.submission_id.as_deref())?;
    let now = Utc::now();
    let client = state.store.upsert_client(&body.hostname, &body.client_id, now)?;

    let scan_results: BTreeMap<String, QueryResult> = body
        .compliance
        .queries
        .into_iter()
        .map(|query| {
            let result = QueryResult {
                name: query.name.clone(),
                description: query.description,
                registry_path: String::new(),
                value_name: String::new(),
                status: query.status,
                actual: query.actual.map(QueryResultValue::Scalar),
                error: query.message,
                expected: query.expected,
                timestamp: body.timestamp,
            };
            (query.name, result)
        })
        .collect();
    let summary = summarize(scan_results.values());

    let evidence = EvidenceRecord {
        scan_metadata: ScanMetadata {
            scan_id: format!("SCAN_{}", body.timestamp.format("%Y%m%d_%H%M%S")),
            start: body.timestamp,
            end: body.timestamp,
            duration_ms: 0,
            operator: MachineInfo::UNKNOWN.to_owned(),
            report_type: body.report_type.clone(),
            tool_version: body.report_version.clone(),
        },
        machine_information: MachineInfo {
            hostname: body.hostname.clone(),
            os_version: body.system_info.os_version,
            build_number: body.system_info.build_number,
            architecture: body.system_info.architecture,
            owner: MachineInfo::UNKNOWN.to_owned(),
            organization: MachineInfo::UNKNOWN.to_owned(),
            install_date: MachineInfo::UNKNOWN.to_owned(),
            system_root: MachineInfo::UNKNOWN.to_owned(),
            domain: body.system_info.domain,
            ip_address: body.system_info.ip_address,
            mac_address: None,
        },
        scan_results,
        summary: summary.clone(),
    };

    let submission = Submission {
        submission_id,
        client_id: client.id,
        hostname: body.hostname,
        timestamp: body.timestamp,
        report_type: body.report_type,
        report_version: body.report_version,
        overall_status: body.compliance.overall_status,
        counts: serde_json::to_value(&summary).map_err(|source| ApiError::Validation(source.to_string()))?,
        evidence,
        created_at: now,
    };
    state.store.insert_submission(&submission)?;

    Ok((StatusCode::CREATED, Json(SubmissionAccepted { submission_id, status: "accepted" })))
}

/// Parses and uniqueness-checks a caller-supplied `submission_id`, or mints
/// a fresh one when absent.
fn resolve_submission_id(state: &ServerState, raw: Option<&str>) -> Result<SubmissionId, ApiError> {
    let Some(raw) = raw else {
        return Ok(SubmissionId::new_random());
    };
    let id: SubmissionId = raw.parse().map_err(|_err| ApiError::Validation("submission_id must be a UUID".to_owned()))?;
    if state.store.get_submission(id)?.is_some() {
        return Err(ApiError::Validation("submission_id already exists".to_owned()));
    }
    Ok(id)
}

// ============================================================================
// SECTION: Clients
// ============================================================================

/// `GET /api/v1/clients` — lists every enrolled client.
///
/// # Errors
/// Returns [`ApiError::Store`] on a persistence failure.
pub async fn list_clients(
    State(state): State<ServerState>,
    AnyAuthIdentity(identity): AnyAuthIdentity,
) -> Result<Json<Vec<Client>>, ApiError> {
    identity.require_permission("read")?;
    Ok(Json(state.store.list_clients()?))
}

// ============================================================================
// SECTION: History
// ============================================================================

/// Query parameters accepted by `GET /api/v1/clients/:id/history`.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Maximum number of submissions to return, newest first.
    #[serde(default = "default_history_limit")]
    pub limit: u32,
}

/// The default page size for submission history, matching the teacher's
/// own listing defaults.
const fn default_history_limit() -> u32 {
    50
}

/// `GET /api/v1/clients/:id/history` — the most recent submissions for one
/// client, newest first.
///
/// # Errors
/// Returns [`ApiError::NotFound`] if the client does not exist;
/// [`ApiError::Store`] on a persistence failure.
pub async fn client_history(
    State(state): State<ServerState>,
    AnyAuthIdentity(identity): AnyAuthIdentity,
    Path(client_id): Path<ClientId>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<Submission>>, ApiError> {
    identity.require_permission("read")?;
    if state.store.get_client(client_id)?.is_none() {
        return Err(ApiError::NotFound);
    }
    Ok(Json(state.store.list_submissions_for_client(client_id, query.limit)?))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_submission_id_mints_when_absent() {
        let store = compliance_store::ComplianceStore::open_in_memory().expect("open store");
        let state = ServerState {
            store: std::sync::Arc::new(store),
            auth: test_auth_service(),
            config: std::sync::Arc::new(compliance_config::AppConfig::default()),
        };
        let minted = resolve_submission_id(&state, None).expect("mints a fresh id");
        assert!(resolve_submission_id(&state, Some(&minted.to_string())).is_ok());
    }

    fn test_auth_service() -> std::sync::Arc<compliance_auth::AuthService> {
        let store = std::sync::Arc::new(compliance_store::ComplianceStore::open_in_memory().expect("open store"));
        let jwt = compliance_auth::JwtCodec::new("test-secret-value-long-enough", "compliance-toolkit", "compliance-toolkit-clients", 15, 30);
        std::sync::Arc::new(compliance_auth::AuthService::new(store, jwt, 90))
    }
}
