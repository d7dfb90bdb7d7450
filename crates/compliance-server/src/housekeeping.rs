// crates/compliance-server/src/housekeeping.rs
// ============================================================================
// Module: Housekeeping Tasks
// Description: Periodic sweeps of expired refresh tokens, blacklisted JWT
//              ids, and stale audit log entries (§4.J, §4.K).
// Purpose: Run the Auth Core's three sweepers on their own interval so
//          expired rows don't accumulate forever between requests.
// Dependencies: compliance-auth, tokio, tracing
// ============================================================================

//! ## Overview
//! Housekeeping errors are logged and swallowed, per §7's propagation
//! policy — a failed sweep pass is retried on the next tick, never fatal to
//! the server.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use compliance_auth::AuthService;
use tracing::error;
use tracing::info;

/// How often the refresh-token and JWT-blacklist sweeps run.
const HOURLY: Duration = Duration::from_secs(3600);

/// How often the audit log retention sweep runs.
const DAILY: Duration = Duration::from_secs(86400);

/// Spawns the three housekeeping loops, returning their join handles so the
/// caller can await them at shutdown if desired.
pub fn spawn(auth: Arc<AuthService>, audit_log_retention_days: i64) -> Vec<tokio::task::JoinHandle<()>> {
    vec![spawn_refresh_token_sweep(Arc::clone(&auth)), spawn_blacklist_sweep(Arc::clone(&auth)), spawn_audit_log_sweep(auth, audit_log_retention_days)]
}

/// Sweeps expired refresh tokens on an hourly interval.
fn spawn_refresh_token_sweep(auth: Arc<AuthService>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(HOURLY);
        loop {
            ticker.tick().await;
            match auth.run_refresh_token_sweep(Utc::now()) {
                Ok(removed) if removed > 0 => info!(removed, "swept expired refresh tokens"),
                Ok(_) => {}
                Err(error) => error!(%error, "refresh token sweep failed"),
            }
        }
    })
}

/// Sweeps expired JWT blacklist entries on an hourly interval.
fn spawn_blacklist_sweep(auth: Arc<AuthService>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(HOURLY);
        loop {
            ticker.tick().await;
            match auth.run_blacklist_sweep(Utc::now()) {
                Ok(removed) if removed > 0 => info!(removed, "swept expired jwt blacklist entries"),
                Ok(_) => {}
                Err(error) => error!(%error, "jwt blacklist sweep failed"),
            }
        }
    })
}

/// Sweeps audit log entries past the retention window on a daily interval.
fn spawn_audit_log_sweep(auth: Arc<AuthService>, retention_days: i64) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(DAILY);
        loop {
            ticker.tick().await;
            match auth.run_audit_log_sweep(Utc::now(), retention_days) {
                Ok(removed) if removed > 0 => info!(removed, "swept stale audit log entries"),
                Ok(_) => {}
                Err(error) => error!(%error, "audit log sweep failed"),
            }
        }
    })
}
