// crates/compliance-config/src/lib.rs
// ============================================================================
// Module: Compliance Config
// Description: Report Config (JSON) loader plus hierarchical agent/server
//              configuration (YAML) loader.
// Purpose: One crate for "load declarative configuration, validate, return
//          an in-memory form" — both schemas share that shape.
// Dependencies: compliance-core, compliance-validator, serde_json, serde_yaml
// ============================================================================

//! ## Overview
//! Two loaders live here because they share one responsibility: parse a
//! config document, validate it, and hand back a typed in-memory value. The
//! Report Config schema is the scan-definition document (§3/§4.D); the
//! application config schema is the agent/server's own layered YAML (§6).

pub mod app_config;
pub mod report_config;

pub use app_config::AppConfig;
pub use app_config::AppConfigError;
pub use app_config::CacheSection;
pub use app_config::ClientSection;
pub use app_config::RetrySection;
pub use app_config::ScheduleSection;
pub use report_config::LoadedReportConfig;
pub use report_config::ReportConfigError;
pub use report_config::load_report_config;
