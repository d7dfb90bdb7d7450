// crates/compliance-server/src/main.rs
// ============================================================================
// Module: Ingestion Server Entry Point
// Description: Startup sequence for the HTTP server: load config, init
//              logging, provision a JWT secret if unset, open the store,
//              start housekeeping, serve until a grace-bounded shutdown
//              (§4.K, §5).
// Purpose: Binary entry point; all behavior beyond wiring lives in
//          `compliance_server::{routes, middleware, handlers, housekeeping}`.
// Dependencies: axum, clap, compliance-auth, compliance-config,
//               compliance-store, rand, tokio, tracing-subscriber
// ============================================================================

//! ## Overview
//! Startup order matters: config, then logging (so every later step is
//! observed), then the secret check (so a generated secret is warned about
//! before anything depends on it), then the store (migrations apply inside
//! `ComplianceStore::open`), then housekeeping, then the listener.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use compliance_auth::AuthService;
use compliance_config::AppConfig;
use compliance_server::ServerState;
use compliance_server::build_router;
use compliance_store::ComplianceStore;
use rand::Rng;
use rand::distributions::Alphanumeric;
use tracing::error;
use tracing::info;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// The number of retained days for the auth audit log, swept daily.
///
/// Not part of the layered YAML/env/flag configuration surface: the data
/// retained here is compliance evidence, not an operational knob an
/// operator is expected to tune per deployment.
const AUDIT_LOG_RETENTION_DAYS: i64 = 90;

/// Byte length of an auto-generated JWT secret.
const GENERATED_SECRET_LEN: usize = 48;

/// Ingestion server for the compliance toolkit.
#[derive(Debug, Parser)]
#[command(name = "compliance-server", version, about)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;
    init_tracing(&config.logging.level, &config.logging.format);

    if config.auth.jwt.secret_key.is_none() {
        let generated = generate_secret();
        warn!("no auth.jwt.secret_key configured; generated an ephemeral secret for this process. Persist one in config or COMPLIANCE_TOOLKIT_AUTH__JWT__SECRET_KEY or every session is invalidated on restart");
        config.auth.jwt.secret_key = Some(generated);
    }
    // Safe: populated above if absent.
    let secret = config.auth.jwt.secret_key.clone().unwrap_or_default();

    let store = Arc::new(ComplianceStore::open(&config.server.database_path)?);
    let jwt = compliance_auth::JwtCodec::new(
        &secret,
        config.auth.jwt.issuer.clone(),
        config.auth.jwt.audience.clone(),
        config.auth.jwt.access_token_lifetime_minutes,
        config.auth.jwt.refresh_token_lifetime_days,
    );
    let auth = Arc::new(AuthService::new(Arc::clone(&store), jwt, AUDIT_LOG_RETENTION_DAYS));

    let housekeeping_handles = compliance_server::housekeeping::spawn(Arc::clone(&auth), AUDIT_LOG_RETENTION_DAYS);

    let config = Arc::new(config);
    let state = ServerState { store, auth, config: Arc::clone(&config) };
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.bind_address, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "compliance-server listening");

    serve_until_shutdown(app, listener, Duration::from_secs(config.server.shutdown_grace_seconds)).await?;

    for handle in housekeeping_handles {
        handle.abort();
    }
    Ok(())
}

/// Initializes `tracing-subscriber` from an env-filter directive, falling
/// back to the configured default level when `RUST_LOG` is unset, in
/// either `json` or human-readable text per `logging.format`.
fn init_tracing(default_level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level.to_owned()));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if format.eq_ignore_ascii_case("json") {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Generates an ephemeral, sufficiently long HMAC secret.
fn generate_secret() -> String {
    rand::thread_rng().sample_iter(&Alphanumeric).take(GENERATED_SECRET_LEN).map(char::from).collect()
}

/// Serves `app` on `listener` until a termination signal arrives, then
/// drains in-flight requests for up to `grace` before forcing a return.
async fn serve_until_shutdown(app: axum::Router, listener: tokio::net::TcpListener, grace: Duration) -> Result<(), std::io::Error> {
    let (grace_tx, grace_rx) = tokio::sync::oneshot::channel::<()>();
    let shutdown = async move {
        wait_for_termination().await;
        warn!(grace_seconds = grace.as_secs(), "shutdown signal received; draining in-flight requests");
        let _ = grace_tx.send(());
    };
    let serve = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).with_graceful_shutdown(shutdown);

    tokio::select! {
        result = serve => result,
        () = async move {
            let _ = grace_rx.await;
            tokio::time::sleep(grace).await;
        } => {
            error!("shutdown grace period elapsed before all requests drained; forcing exit");
            Ok(())
        }
    }
}

/// Resolves on Ctrl+C or, on Unix, `SIGTERM`.
async fn wait_for_termination() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            error!(%error, "failed to install ctrl+c handler");
        }
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => error!(%error, "failed to install sigterm handler"),
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
