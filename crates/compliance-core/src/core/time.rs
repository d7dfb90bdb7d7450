// crates/compliance-core/src/core/time.rs
// ============================================================================
// Module: Compliance Core Time Helpers
// Description: Wall-clock timestamp helpers shared across crates.
// Purpose: Provide a single place that reads the system clock so call sites
//          stay free of ad-hoc `Utc::now()` calls.
// Dependencies: chrono
// ============================================================================

//! ## Overview
//! Unlike a replay-oriented engine, this system genuinely samples wall-clock
//! time: scan timestamps, JWT claims, and audit entries all need the real
//! current time. This module exists so every crate reads it the same way and
//! so tests can see, at a glance, every call site that touches the clock.

// ============================================================================
// SECTION: Imports
// ============================================================================

use chrono::DateTime;
use chrono::Utc;

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Returns the current UTC time.
///
/// # Invariants
/// - Thin wrapper; callers needing a fixed clock for tests should construct
///   timestamps directly rather than mocking this function.
#[must_use]
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Formats a timestamp as `YYYYMMDD_HHMMSS`, used for scan IDs and artifact
/// file names.
#[must_use]
pub fn compact_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y%m%d_%H%M%S").to_string()
}
