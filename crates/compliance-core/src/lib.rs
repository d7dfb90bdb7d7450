// crates/compliance-core/src/lib.rs
// ============================================================================
// Module: Compliance Core
// Description: Shared domain types and trait contracts for the compliance
//              toolkit workspace.
// Purpose: Give every other crate (validator, registry, executor, evidence,
//          report, store, auth, server, agent) one dependency-free vocabulary
//          for registry queries, scan results, evidence, and identifiers.
// Dependencies: serde, serde_json, chrono, uuid, thiserror, async-trait
// ============================================================================

//! ## Overview
//! This crate has no knowledge of Windows, HTTP, or SQL. It defines the
//! nouns (`RegistryQuery`, `QueryResult`, `EvidenceRecord`, `ClientId`, ...)
//! and the two trait seams (`RegistryReader`, `AuditSink`) that let the rest
//! of the workspace depend on shapes instead of on each other directly.

pub mod core;
pub mod interfaces;

pub use core::auth::AuthMethod;
pub use core::auth::UserRole;
pub use core::config::ReportConfig;
pub use core::config::ReportMetadata;
pub use core::evidence::EvidenceRecord;
pub use core::evidence::MachineInfo;
pub use core::evidence::ScanMetadata;
pub use core::evidence::ScanSummary;
pub use core::evidence::summarize;
pub use core::identifiers::ApiKeyId;
pub use core::identifiers::AuditEntryId;
pub use core::identifiers::ClientId;
pub use core::identifiers::RefreshTokenId;
pub use core::identifiers::SubmissionId;
pub use core::identifiers::TokenFamilyId;
pub use core::identifiers::UserId;
pub use core::registry::QueryOperation;
pub use core::registry::RegistryQuery;
pub use core::registry::RegistryValue;
pub use core::registry::RootKey;
pub use core::result::QueryResult;
pub use core::result::QueryResultValue;
pub use core::result::QueryStatus;
pub use core::result::classify;
pub use core::time::compact_timestamp;
pub use core::time::now;
