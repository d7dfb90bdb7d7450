// crates/compliance-agent/src/lib.rs
// ============================================================================
// Module: Agent Runtime
// Description: Library surface backing the `compliance-agent` binary — scan
//              cycle orchestration, cron scheduling, submission retry, and
//              the offline cache (§4.H).
// Purpose: Keep `main.rs` a thin CLI dispatcher; everything a test needs to
//          drive lives here.
// Dependencies: compliance-config, compliance-core, compliance-evidence,
//               compliance-executor, compliance-registry, compliance-report,
//               compliance-validator, cron, reqwest, tokio, tracing
// ============================================================================

//! ## Overview
//! One scan cycle is: validate and run every configured report, submit each
//! scan's evidence, and fall back to the offline cache on exhausted retry.
//! The scheduler drives cycles on a cron expression; the service module
//! hosts the same cycle under a platform service manager.

pub mod cache;
pub mod cycle;
pub mod scheduler;
pub mod service;
pub mod submission;

pub use cycle::CycleError;
pub use cycle::CycleOutcome;
pub use cycle::run_cycle;
