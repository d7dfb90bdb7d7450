// crates/compliance-core/src/core/config.rs
// ============================================================================
// Module: Compliance Core Report Config
// Description: Declarative scan definition types loaded from disk.
// Purpose: Shared shape between the config loader, validator, and executor.
// Dependencies: serde, crate::core::registry
// ============================================================================

//! ## Overview
//! A report config is an external collaborator's artifact (the JSON report
//! definitions themselves are out of scope); this module only defines the
//! schema the loader parses into and the validator checks.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::registry::RegistryQuery;

// ============================================================================
// SECTION: Metadata
// ============================================================================

/// Free-text metadata describing a report config, carried through to
/// evidence and reports unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Human-readable report title.
    #[serde(default)]
    pub title: String,
    /// Report content version, distinct from the config schema `version`.
    #[serde(default)]
    pub version: String,
    /// Author attribution.
    #[serde(default)]
    pub author: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Compliance category (e.g. "CIS Benchmark").
    #[serde(default)]
    pub category: String,
    /// Last-updated date string, as authored.
    #[serde(default)]
    pub last_updated: String,
}

// ============================================================================
// SECTION: Report Config
// ============================================================================

/// A fully parsed, not-yet-validated report config.
///
/// # Invariants
/// - `queries` preserves declaration order; the executor runs them in that
///   order and never reorders or parallelizes them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Config schema version; must be non-empty to pass validation.
    pub version: String,
    /// Report metadata.
    #[serde(default)]
    pub metadata: ReportMetadata,
    /// Ordered list of registry queries.
    pub queries: Vec<RegistryQuery>,
}
