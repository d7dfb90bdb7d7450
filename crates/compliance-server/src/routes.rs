// crates/compliance-server/src/routes.rs
// ============================================================================
// Module: Router Assembly
// Description: Wires the HTTP surface table (§4.K) to handlers.
// Purpose: One function, one look, to see the whole API shape; auth and
//          permission guards live inside each handler via its extractor.
// Dependencies: axum, tower-http
// ============================================================================

//! ## Overview
//! Middleware order is auth -> role/permission guard -> handler: the first
//! two happen inside the handler's extractor arguments
//! ([`crate::middleware`]) rather than as separate `tower` layers, since
//! axum runs extractors before the handler body in declaration order.
//! [`tower_http`] layers below only add cross-cutting concerns (tracing,
//! request timeout) that apply uniformly regardless of auth outcome.

use std::time::Duration;

use axum::Router;
use axum::routing::get;
use axum::routing::post;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::auth;
use crate::handlers::compliance;
use crate::handlers::dashboard;
use crate::state::ServerState;

/// The default per-request timeout applied to every route.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds the full application router over `state`.
#[must_use]
pub fn build_router(state: ServerState) -> Router {
    Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/refresh", post(auth::refresh))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/v1/compliance/submit", post(compliance::submit))
        .route("/api/v1/clients", get(compliance::list_clients))
        .route("/api/v1/clients/{id}/history", get(compliance::client_history))
        .route("/dashboard", get(dashboard::index))
        .route("/dashboard/{*rest}", get(dashboard::index))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .with_state(state)
}
