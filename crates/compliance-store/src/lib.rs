// crates/compliance-store/src/lib.rs
// ============================================================================
// Module: Ingestion Store
// Description: Embedded SQLite persistence for the Ingestion Server and Auth
//              Core (§4.I, §4.J data model).
// Purpose: Own the on-disk schema, versioned migrations, and typed CRUD used
//          by `compliance-auth` and `compliance-server`.
// Dependencies: compliance-core, rusqlite, chrono, serde_json, thiserror,
//               tracing, uuid
// ============================================================================

//! ## Overview
//! One SQLite database file backs clients, submissions, users, refresh
//! tokens, the JWT blacklist, the auth audit log, and API keys. The store
//! opens the connection in WAL mode, applies pending migrations in order,
//! and exposes typed methods; callers never see a bare [`rusqlite::Connection`].

pub mod store;
pub mod types;

pub use store::ComplianceStore;
pub use store::StoreError;
pub use types::ApiKeyRecord;
pub use types::AuthAuditEntry;
pub use types::Client;
pub use types::JwtBlacklistEntry;
pub use types::RefreshTokenRecord;
pub use types::Submission;
pub use types::User;
