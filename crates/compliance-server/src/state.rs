// crates/compliance-server/src/state.rs
// ============================================================================
// Module: Server State
// Description: Shared handle every handler and extractor borrows through
//              axum's `State` extractor.
// Purpose: One `Clone`-able bundle instead of threading the store, auth
//          service, and config separately through every route.
// Dependencies: compliance-auth, compliance-config, compliance-store
// ============================================================================

//! ## Overview
//! Everything here is already internally `Arc`-shared (`ComplianceStore` and
//! `AuthService` are cheap to clone); cloning `ServerState` is a handful of
//! pointer copies, the idiom axum expects for its `State<S>` extractor.

use std::sync::Arc;

use compliance_auth::AuthService;
use compliance_config::AppConfig;
use compliance_store::ComplianceStore;

/// Shared handles available to every HTTP handler.
#[derive(Clone)]
pub struct ServerState {
    /// The embedded Ingestion Store.
    pub store: Arc<ComplianceStore>,
    /// The Auth Core service.
    pub auth: Arc<AuthService>,
    /// The loaded application configuration.
    pub config: Arc<AppConfig>,
}
