// crates/compliance-agent/src/main.rs
// ============================================================================
// Module: Agent Entry Point
// Description: CLI dispatcher for the one-shot, scheduled-daemon, and
//              service modes of the Agent Runtime (§4.H, §6).
// Purpose: Binary entry point; all behavior beyond flag parsing and mode
//          dispatch lives in `compliance_agent::{cycle, scheduler, service}`.
// Dependencies: clap, compliance-agent, compliance-config, tokio,
//               tracing-subscriber
// ============================================================================

//! ## Overview
//! Exit codes follow §6: `0` success, `1` generic failure, `2` misuse (bad
//! flags or a config that fails to load). A plain invocation with no mode
//! flags runs the schedule from config if `client.schedule.enabled`,
//! otherwise runs exactly one cycle and exits.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use compliance_agent::cycle;
use compliance_agent::scheduler;
use compliance_agent::service;
use compliance_config::AppConfig;
use tracing::error;
use tracing::info;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Compliance Toolkit agent: scans the local registry against configured
/// reports and submits the evidence to an ingestion server.
#[derive(Debug, Parser)]
#[command(name = "compliance-agent", version, about)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Run exactly one scan cycle and exit, ignoring the configured schedule.
    #[arg(long)]
    once: bool,
    /// Register this binary as a host service.
    #[arg(long)]
    install_service: bool,
    /// Remove this agent's host service registration.
    #[arg(long)]
    uninstall_service: bool,
    /// Start the registered host service.
    #[arg(long)]
    start_service: bool,
    /// Stop the registered host service.
    #[arg(long)]
    stop_service: bool,
    /// Print the registered host service's current state.
    #[arg(long)]
    service_status: bool,
    /// Print a default configuration document to stdout and exit.
    #[arg(long)]
    generate_config: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    if cli.generate_config {
        return print_default_config();
    }
    if cli.install_service || cli.uninstall_service || cli.start_service || cli.stop_service || cli.service_status {
        return run_service_command(&cli);
    }

    let config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(error) => {
            error!(%error, "failed to load configuration");
            return ExitCode::from(2);
        }
    };

    if cli.once {
        run_once(&config).await
    } else if config.client.schedule.enabled {
        run_scheduled(&config).await
    } else {
        run_once(&config).await
    }
}

/// Initializes `tracing-subscriber` from `RUST_LOG`, falling back to `info`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Prints a default configuration document to stdout for an operator to
/// copy and edit.
fn print_default_config() -> ExitCode {
    match serde_yaml::to_string(&AppConfig::default()) {
        Ok(yaml) => {
            println!("{yaml}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            error!(%error, "failed to render default configuration");
            ExitCode::FAILURE
        }
    }
}

/// Runs exactly one scan cycle and maps its outcome to an exit code.
async fn run_once(config: &AppConfig) -> ExitCode {
    match cycle::run_cycle(config).await {
        Ok(outcome) => {
            info!(reports = outcome.reports.len(), drained = outcome.drained, "cycle complete");
            if outcome.fully_successful() { ExitCode::SUCCESS } else { ExitCode::FAILURE }
        }
        Err(error) => {
            error!(%error, "cycle failed");
            ExitCode::FAILURE
        }
    }
}

/// Runs the cron scheduler until the process is terminated.
async fn run_scheduled(config: &AppConfig) -> ExitCode {
    let (_manual, manual_rx) = scheduler::manual_trigger_channel();
    let cron_expression = config.client.schedule.cron.clone();
    let result = scheduler::run(&cron_expression, manual_rx, || async {
        match cycle::run_cycle(config).await {
            Ok(outcome) => info!(reports = outcome.reports.len(), drained = outcome.drained, "scheduled cycle complete"),
            Err(error) => error!(%error, "scheduled cycle failed"),
        }
    })
    .await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!(%error, "scheduler stopped");
            ExitCode::from(2)
        }
    }
}

/// Dispatches one of the `--install-service`/`--uninstall-service`/
/// `--start-service`/`--stop-service`/`--service-status` flags.
fn run_service_command(cli: &Cli) -> ExitCode {
    if cli.install_service {
        return match std::env::current_exe() {
            Ok(path) => match service::install(path) {
                Ok(()) => ExitCode::SUCCESS,
                Err(error) => {
                    warn!(%error, "service command failed");
                    ExitCode::FAILURE
                }
            },
            Err(error) => {
                warn!(%error, "failed to resolve this binary's own path");
                ExitCode::FAILURE
            }
        };
    }

    let outcome = if cli.uninstall_service {
        service::uninstall()
    } else if cli.start_service {
        service::start()
    } else if cli.stop_service {
        service::stop()
    } else {
        match service::status() {
            Ok(state) => {
                println!("{state:?}");
                Ok(())
            }
            Err(error) => Err(error),
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            warn!(%error, "service command failed");
            ExitCode::FAILURE
        }
    }
}
