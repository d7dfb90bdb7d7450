// crates/compliance-core/src/core/auth.rs
// ============================================================================
// Module: Compliance Core Auth Model
// Description: Role, permission, and auth-method enumerations shared by the
//              auth core, ingestion server middleware, and audit log.
// Purpose: Keep role/permission/auth-method vocabulary in one place so the
//          server's middleware and the auth crate never drift.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! These are intentionally small, closed enumerations. New roles or auth
//! methods are additive changes to this module, never string literals
//! sprinkled through handler code.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Role
// ============================================================================

/// A user's role, controlling the default permission set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Full read/write access, including user management.
    Admin,
    /// Read-only access to submissions and clients.
    Viewer,
    /// Read-only access plus audit log visibility.
    Auditor,
}

impl UserRole {
    /// Returns the default permission set granted to this role.
    #[must_use]
    pub fn default_permissions(self) -> Vec<&'static str> {
        match self {
            Self::Admin => vec!["read", "write", "manage_users", "view_audit"],
            Self::Viewer => vec!["read"],
            Self::Auditor => vec!["read", "view_audit"],
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Admin => "admin",
            Self::Viewer => "viewer",
            Self::Auditor => "auditor",
        };
        f.write_str(s)
    }
}

// ============================================================================
// SECTION: Auth Method
// ============================================================================

/// Which admission path authenticated a request.
///
/// # Invariants
/// - Ordered by middleware precedence: session is attempted first, then
///   JWT bearer, then API key. First match wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// `session_user` cookie.
    SessionCookie,
    /// `Authorization: Bearer <jwt>`.
    JwtBearer,
    /// `Authorization: Bearer <key>` or `api_token` cookie.
    ApiKey,
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::SessionCookie => "session_cookie",
            Self::JwtBearer => "jwt_bearer",
            Self::ApiKey => "api_key",
        };
        f.write_str(s)
    }
}
