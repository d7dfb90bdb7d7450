// crates/compliance-server/src/handlers/dashboard.rs
// ============================================================================
// Module: Dashboard Endpoint
// Description: `GET /dashboard/*` (§4.K).
// Purpose: Serve the session-gated HTML surface. The interactive template
//          asset set itself is out of scope; this renders a minimal,
//          self-contained summary page from live store data.
// Dependencies: axum, compliance-store
// ============================================================================

//! ## Overview
//! Unlike the API routes, the dashboard is reachable only by the
//! `session_user` cookie ([`crate::middleware::SessionIdentity`]) — it is
//! not meant to be driven by non-browser clients.

use axum::extract::State;
use axum::response::Html;

use crate::error::ApiError;
use crate::middleware::SessionIdentity;
use crate::state::ServerState;

/// `GET /dashboard` and `GET /dashboard/*` — a minimal HTML summary of
/// enrolled clients and their most recent submission.
///
/// # Errors
/// Returns [`ApiError::Store`] on a persistence failure.
pub async fn index(State(state): State<ServerState>, SessionIdentity(claims): SessionIdentity) -> Result<Html<String>, ApiError> {
    let clients = state.store.list_clients()?;
    let mut rows = String::new();
    for client in &clients {
        let latest = state.store.list_submissions_for_client(client.id, 1)?;
        let status = latest.first().map_or("no submissions yet", |submission| submission.overall_status.as_str());
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            html_escape(&client.hostname),
            html_escape(&client.client_id),
            html_escape(status),
        ));
    }
    let body = format!(
        "<!doctype html>\n<html><head><title>Compliance Toolkit</title></head><body>\n\
         <h1>Compliance Toolkit</h1>\n<p>Signed in as {}</p>\n\
         <table border=\"1\"><tr><th>Hostname</th><th>Client ID</th><th>Latest Status</th></tr>\n{rows}</table>\n\
         </body></html>\n",
        html_escape(&claims.username),
    );
    Ok(Html(body))
}

/// Minimal HTML escaping for the handful of values this page interpolates.
fn html_escape(value: &str) -> String {
    value.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}
