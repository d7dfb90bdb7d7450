// crates/compliance-config/src/app_config.rs
// ============================================================================
// Module: Application Configuration
// Description: Hierarchical agent/server configuration (§6): flags > env >
//              YAML file > defaults.
// Purpose: One typed config shared by `compliance-agent` and
//          `compliance-server`.
// Dependencies: serde, serde_yaml
// ============================================================================

//! ## Overview
//! Environment overrides use the `COMPLIANCE_TOOLKIT_` prefix with `__` as
//! the section separator (e.g. `COMPLIANCE_TOOLKIT_SERVER__PORT`). Flags are
//! applied by the caller (the CLI layer) on top of the value this module
//! returns — this module never parses `argv` itself.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Error
// ============================================================================

/// Application configuration loading failures.
#[derive(Debug, Error)]
pub enum AppConfigError {
    /// The YAML file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file was not well-formed YAML.
    #[error("failed to parse config {path}: {source}")]
    Parse {
        /// Path that failed to parse.
        path: String,
        /// Underlying parse error.
        #[source]
        source: serde_yaml::Error,
    },
    /// An environment variable override could not be parsed.
    #[error("environment variable {name} has an invalid value: {value}")]
    InvalidEnvValue {
        /// The environment variable name.
        name: String,
        /// The offending value.
        value: String,
    },
}

// ============================================================================
// SECTION: Sections
// ============================================================================

/// HTTP server bind configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Bind address, e.g. `0.0.0.0`.
    pub bind_address: String,
    /// Bind port.
    pub port: u16,
    /// Embedded database file path.
    pub database_path: PathBuf,
    /// Graceful shutdown grace period, in seconds.
    pub shutdown_grace_seconds: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_owned(),
            port: 8443,
            database_path: PathBuf::from("compliance_toolkit.db"),
            shutdown_grace_seconds: 30,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// `tracing` env-filter directive, e.g. `"info"`.
    pub level: String,
    /// `"json"` or `"text"`.
    pub format: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "json".to_owned(),
        }
    }
}

/// Artifact directory configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportsSection {
    /// Directory containing Report Config JSON documents.
    pub config_dir: PathBuf,
    /// Directory evidence JSON artifacts are written to.
    pub evidence_dir: PathBuf,
    /// Directory HTML artifacts are written to.
    pub output_dir: PathBuf,
}

impl Default for ReportsSection {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from("reports"),
            evidence_dir: PathBuf::from("evidence"),
            output_dir: PathBuf::from("output"),
        }
    }
}

/// Validator policy configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecuritySection {
    /// Registry path prefixes to deny, regardless of the allow list.
    pub deny_list: Vec<String>,
    /// Registry path prefixes to allow; empty means "allow all".
    pub allow_list: Vec<String>,
    /// File extensions permitted for artifact output, lowercase, no leading dot.
    pub allowed_file_extensions: Vec<String>,
}

/// JWT issuance configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JwtSection {
    /// Signing secret. If `None`, the server generates one at startup and
    /// warns the operator to persist it.
    pub secret_key: Option<String>,
    /// Access token lifetime, in minutes.
    pub access_token_lifetime_minutes: i64,
    /// Refresh token lifetime, in days.
    pub refresh_token_lifetime_days: i64,
    /// JWT `iss` claim.
    pub issuer: String,
    /// JWT `aud` claim.
    pub audience: String,
}

impl Default for JwtSection {
    fn default() -> Self {
        Self {
            secret_key: None,
            access_token_lifetime_minutes: 15,
            refresh_token_lifetime_days: 7,
            issuer: "compliance-toolkit".to_owned(),
            audience: "compliance-toolkit-clients".to_owned(),
        }
    }
}

/// A statically configured API key, distinct from server-issued keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKeyEntry {
    /// Display name for the key.
    pub name: String,
    /// The raw key value (hashed on first load by `compliance-auth`).
    pub key: String,
}

/// Server-side auth configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    /// JWT settings.
    pub jwt: JwtSection,
    /// Pre-provisioned API keys.
    pub api_keys: Vec<ApiKeyEntry>,
}

/// Agent schedule configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleSection {
    /// Whether the scheduler runs at all (false implies one-shot-only use).
    pub enabled: bool,
    /// A standard cron expression.
    pub cron: String,
}

impl Default for ScheduleSection {
    fn default() -> Self {
        Self {
            enabled: true,
            cron: "0 0 * * * *".to_owned(),
        }
    }
}

/// Submission retry configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    /// Maximum submission attempts before falling back to the offline cache.
    pub max_attempts: u32,
    /// Initial backoff delay, in milliseconds.
    pub initial_backoff_ms: u64,
    /// Maximum backoff delay, in milliseconds.
    pub max_backoff_ms: u64,
    /// Multiplicative backoff factor applied after each attempt.
    pub backoff_multiplier: f64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff_ms: 500,
            max_backoff_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

/// Offline submission cache configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    /// Whether the offline cache is enabled.
    pub enabled: bool,
    /// Directory holding cached submission JSON files.
    pub path: PathBuf,
    /// Maximum age, in seconds, before a cached submission is dropped.
    pub max_age_seconds: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from("cache"),
            max_age_seconds: 7 * 24 * 60 * 60,
        }
    }
}

/// Agent-side client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSection {
    /// Stable client identity presented on submission; `None` means the
    /// agent mints and persists one under the cache directory on first run.
    pub client_id: Option<String>,
    /// Override for the reported hostname; `None` uses the OS hostname.
    pub hostname: Option<String>,
    /// Ingestion server base URL.
    pub server_url: String,
    /// API key presented on submission.
    pub api_key: Option<String>,
    /// Scan schedule.
    pub schedule: ScheduleSection,
    /// Report config files (or directories) to run each cycle.
    pub reports: Vec<PathBuf>,
    /// Submission retry policy.
    pub retry: RetrySection,
    /// Offline cache policy.
    pub cache: CacheSection,
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            client_id: None,
            hostname: None,
            server_url: "http://localhost:8443".to_owned(),
            api_key: None,
            schedule: ScheduleSection::default(),
            reports: Vec::new(),
            retry: RetrySection::default(),
            cache: CacheSection::default(),
        }
    }
}

// ============================================================================
// SECTION: Top-Level Config
// ============================================================================

/// The full layered application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Ingestion server settings.
    pub server: ServerSection,
    /// Logging settings.
    pub logging: LoggingSection,
    /// Report artifact directories.
    pub reports: ReportsSection,
    /// Validator policy.
    pub security: SecuritySection,
    /// Auth settings.
    pub auth: AuthSection,
    /// Agent settings.
    pub client: ClientSection,
}

const ENV_PREFIX: &str = "COMPLIANCE_TOOLKIT_";

impl AppConfig {
    /// Loads configuration from a YAML file if present, falling back to
    /// defaults, then applies environment variable overrides.
    ///
    /// # Errors
    ///
    /// Returns [`AppConfigError`] when the file exists but cannot be read or
    /// parsed, or when an environment override cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, AppConfigError> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let raw = std::fs::read_to_string(path).map_err(|source| AppConfigError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
                serde_yaml::from_str(&raw).map_err(|source| AppConfigError::Parse {
                    path: path.display().to_string(),
                    source,
                })?
            }
            _ => Self::default(),
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Applies the curated set of `COMPLIANCE_TOOLKIT_…` environment
    /// variable overrides on top of the current values.
    ///
    /// # Errors
    ///
    /// Returns [`AppConfigError::InvalidEnvValue`] when a recognized
    /// override variable is set but cannot be parsed into its target type.
    pub fn apply_env_overrides(&mut self) -> Result<(), AppConfigError> {
        if let Some(value) = env_var("SERVER__PORT") {
            self.server.port = parse_env("SERVER__PORT", &value)?;
        }
        if let Some(value) = env_var("SERVER__BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = env_var("LOGGING__LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = env_var("AUTH__JWT__SECRET_KEY") {
            self.auth.jwt.secret_key = Some(value);
        }
        if let Some(value) = env_var("AUTH__JWT__ISSUER") {
            self.auth.jwt.issuer = value;
        }
        if let Some(value) = env_var("CLIENT__SERVER_URL") {
            self.client.server_url = value;
        }
        if let Some(value) = env_var("CLIENT__API_KEY") {
            self.client.api_key = Some(value);
        }
        if let Some(value) = env_var("CLIENT__SCHEDULE__CRON") {
            self.client.schedule.cron = value;
        }
        Ok(())
    }
}

fn env_var(suffix: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}{suffix}")).ok()
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, AppConfigError> {
    value.parse().map_err(|_| AppConfigError::InvalidEnvValue {
        name: format!("{ENV_PREFIX}{name}"),
        value: value.to_owned(),
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test fixtures favor direct unwraps for setup clarity.")]
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8443);
        assert_eq!(config.auth.jwt.access_token_lifetime_minutes, 15);
        assert_eq!(config.auth.jwt.refresh_token_lifetime_days, 7);
        assert!(config.client.schedule.enabled);
    }

    #[test]
    fn loads_from_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "server:\n  port: 9443\nclient:\n  server_url: \"https://example.test\"\n",
        )
        .unwrap();
        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.server.port, 9443);
        assert_eq!(config.client.server_url, "https://example.test");
        // Unset sections keep their defaults.
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = AppConfig::load(Some(Path::new("/nonexistent/config.yaml"))).unwrap();
        assert_eq!(config, AppConfig::default());
    }
}
