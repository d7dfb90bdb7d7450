// crates/compliance-agent/src/scheduler.rs
// ============================================================================
// Module: Cron Scheduler
// Description: Drives one scan cycle per cron fire, serially, with a
//              skip-with-warn missed-fire policy and a manual-trigger
//              bypass (§4.H).
// Purpose: Own "when to run", not "what running means" — that's `cycle`.
// Dependencies: cron, tokio, tracing
// ============================================================================

//! ## Overview
//! The scheduler never overlaps a cycle with itself: if the next scheduled
//! fire arrives while a cycle is still in flight, that fire is skipped (with
//! a warning) rather than queued. A manual trigger runs immediately, on its
//! own, and never disturbs the next scheduled fire time — it does not reset
//! or consume the schedule's cadence.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use cron::Schedule;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::sync::mpsc;
use tracing::info;
use tracing::warn;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Scheduler construction failures.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The configured cron expression could not be parsed.
    #[error("invalid cron expression {expression:?}: {source}")]
    InvalidCron {
        /// The offending expression.
        expression: String,
        /// Underlying parse error.
        #[source]
        source: cron::error::Error,
    },
}

// ============================================================================
// SECTION: Scheduler
// ============================================================================

/// A sender used to request an immediate, out-of-band cycle.
#[derive(Debug, Clone)]
pub struct ManualTrigger(mpsc::UnboundedSender<()>);

impl ManualTrigger {
    /// Requests an immediate cycle. A no-op if the scheduler has stopped.
    pub fn fire(&self) {
        let _ = self.0.send(());
    }
}

/// Creates the channel pair a caller uses to request manual triggers; the
/// sender half is cheap to clone and hand to a signal handler or command
/// dispatcher, the receiver half is consumed by [`run`].
#[must_use]
pub fn manual_trigger_channel() -> (ManualTrigger, mpsc::UnboundedReceiver<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ManualTrigger(tx), rx)
}

/// Runs `on_cycle` serially on `cron_expression`'s schedule, plus on demand
/// whenever `manual_rx` yields a trigger, until the process is asked to
/// stop.
///
/// A cycle already in flight when the next scheduled fire arrives causes
/// that fire to be skipped, with a warning — never queued, never run
/// concurrently with itself.
///
/// # Errors
/// Returns [`SchedulerError::InvalidCron`] if `cron_expression` does not
/// parse.
pub async fn run<F, Fut>(cron_expression: &str, mut manual_rx: mpsc::UnboundedReceiver<()>, mut on_cycle: F) -> Result<(), SchedulerError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    let schedule = Schedule::from_str(cron_expression).map_err(|source| SchedulerError::InvalidCron { expression: cron_expression.to_owned(), source })?;
    let running = Arc::new(Mutex::new(()));

    loop {
        let Some(next_fire) = schedule.upcoming(Utc).next() else {
            warn!("cron schedule has no further upcoming fires; stopping scheduler");
            return Ok(());
        };
        let delay = (next_fire - Utc::now()).to_std().unwrap_or(std::time::Duration::ZERO);

        tokio::select! {
            () = tokio::time::sleep(delay) => {
                run_if_not_busy(&running, &mut on_cycle, "scheduled fire").await;
            }
            Some(()) = manual_rx.recv() => {
                info!("manual trigger received; running a cycle without disturbing the schedule");
                run_if_not_busy(&running, &mut on_cycle, "manual trigger").await;
            }
        }
    }
}

/// Runs one cycle unless another is already in flight, in which case the
/// fire is skipped with a warning.
async fn run_if_not_busy<F, Fut>(running: &Arc<Mutex<()>>, on_cycle: &mut F, source: &str)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    let Ok(guard) = running.clone().try_lock_owned() else {
        warn!(source, "previous cycle still in flight; skipping this fire");
        return;
    };
    on_cycle().await;
    drop(guard);
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test fixtures favor direct unwraps for setup clarity.")]
    use super::*;

    #[test]
    fn invalid_cron_expression_is_rejected() {
        let schedule = Schedule::from_str("not a cron expression");
        assert!(schedule.is_err());
    }

    #[test]
    fn valid_cron_expression_parses() {
        let schedule = Schedule::from_str("0 0 * * * *").unwrap();
        assert!(schedule.upcoming(Utc).next().is_some());
    }
}
