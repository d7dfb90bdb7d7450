// crates/compliance-server/src/lib.rs
// ============================================================================
// Module: Ingestion Server
// Description: Plain-HTTP server fronting submissions, client/history
//              queries, and the dashboard, behind triple-modal auth (§4.K).
// Purpose: Expose `build_router` and the housekeeping sweepers so `main.rs`
//          (and integration tests) can assemble and drive the service.
// Dependencies: axum, axum-extra, compliance-auth, compliance-config,
//               compliance-core, compliance-store, tokio, tower-http,
//               tracing
// ============================================================================

//! ## Overview
//! This crate has three parts: [`middleware`] (the three auth extractors),
//! [`handlers`] (one module per row-group of the HTTP surface table), and
//! [`routes`] (wiring). [`state`] and [`error`] are the shared plumbing both
//! depend on. [`housekeeping`] spawns the three periodic sweepers the Auth
//! Core and Ingestion Store need but cannot schedule themselves.

pub mod error;
pub mod handlers;
pub mod housekeeping;
pub mod middleware;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::build_router;
pub use state::ServerState;
