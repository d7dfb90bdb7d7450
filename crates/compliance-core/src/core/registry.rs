// crates/compliance-core/src/core/registry.rs
// ============================================================================
// Module: Compliance Core Registry Model
// Description: Declarative registry query types shared by the config loader,
//              validator, registry read engine, and scan executor.
// Purpose: Give every crate that touches a registry query the same types.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! These types describe *what to read*, never *how*. The Registry Read Engine
//! (`compliance-registry`) is the only crate that actually opens a Windows
//! registry key; everyone else passes these values around.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Root Key
// ============================================================================

/// One of the five well-known registry hives.
///
/// # Invariants
/// - Parsing accepts both short (`HKLM`) and long (`HKEY_LOCAL_MACHINE`)
///   aliases, case-sensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RootKey {
    /// `HKLM` / `HKEY_LOCAL_MACHINE`.
    LocalMachine,
    /// `HKCU` / `HKEY_CURRENT_USER`.
    CurrentUser,
    /// `HKCR` / `HKEY_CLASSES_ROOT`.
    ClassesRoot,
    /// `HKU` / `HKEY_USERS`.
    Users,
    /// `HKCC` / `HKEY_CURRENT_CONFIG`.
    CurrentConfig,
}

impl RootKey {
    /// Parses a short or long root key alias.
    ///
    /// # Invariants
    /// - Case-sensitive exact match against the enumerated aliases.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "HKLM" | "HKEY_LOCAL_MACHINE" => Some(Self::LocalMachine),
            "HKCU" | "HKEY_CURRENT_USER" => Some(Self::CurrentUser),
            "HKCR" | "HKEY_CLASSES_ROOT" => Some(Self::ClassesRoot),
            "HKU" | "HKEY_USERS" => Some(Self::Users),
            "HKCC" | "HKEY_CURRENT_CONFIG" => Some(Self::CurrentConfig),
            _ => None,
        }
    }

    /// Returns the canonical long-form name.
    #[must_use]
    pub const fn long_name(self) -> &'static str {
        match self {
            Self::LocalMachine => "HKEY_LOCAL_MACHINE",
            Self::CurrentUser => "HKEY_CURRENT_USER",
            Self::ClassesRoot => "HKEY_CLASSES_ROOT",
            Self::Users => "HKEY_USERS",
            Self::CurrentConfig => "HKEY_CURRENT_CONFIG",
        }
    }
}

impl fmt::Display for RootKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.long_name())
    }
}

// ============================================================================
// SECTION: Operation
// ============================================================================

/// The operation a query requests. Only `Read` is ever executed; `write_type`
/// and `write_value` on [`RegistryQuery`] are reserved and never dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryOperation {
    /// Read a value (or all values) from the registry.
    Read,
}

// ============================================================================
// SECTION: Registry Query
// ============================================================================

/// One declarative registry lookup inside a report config.
///
/// # Invariants
/// - `value_name` empty implies `read_all` true, unless the query is a
///   single default-value read (empty name, `read_all` false).
/// - `write_type` / `write_value` are reserved fields; the executor never
///   acts on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryQuery {
    /// Human-readable check name, used as the key in result maps and as the
    /// alphabetical sort key at render time.
    pub name: String,
    /// Free-text description surfaced in reports.
    pub description: String,
    /// Registry hive, in short or long form as read from disk.
    pub root_key: String,
    /// Backslash-delimited key path relative to `root_key`.
    pub path: String,
    /// Value name to read; empty means the key's default value.
    #[serde(default)]
    pub value_name: String,
    /// Requested operation; only `read` is executed.
    pub operation: QueryOperation,
    /// When true, read every value under `path` instead of just
    /// `value_name`.
    #[serde(default)]
    pub read_all: bool,
    /// Optional expected value, recorded but not compared (see design notes).
    #[serde(default)]
    pub expected_value: Option<String>,
    /// Reserved; never executed.
    #[serde(default)]
    pub write_type: Option<String>,
    /// Reserved; never executed.
    #[serde(default)]
    pub write_value: Option<String>,
}

// ============================================================================
// SECTION: Registry Value
// ============================================================================

/// A value retrieved from the registry, tagged by the type that produced it.
///
/// # Invariants
/// - Auto-detect reads try string, then multi-string, then integer, then
///   binary, in that fixed order, and stop at the first success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RegistryValue {
    /// `REG_SZ` / `REG_EXPAND_SZ`.
    Str(String),
    /// `REG_DWORD` / `REG_QWORD`, always widened to 64 bits.
    Uint64(u64),
    /// `REG_BINARY`.
    Binary(Vec<u8>),
    /// `REG_MULTI_SZ`.
    MultiString(Vec<String>),
}

impl RegistryValue {
    /// Renders the value the way the auto-detect path and reports display it:
    /// strings as-is, multi-strings comma-joined, integers in decimal, and
    /// binary as lowercase hex.
    #[must_use]
    pub fn display_string(&self) -> String {
        match self {
            Self::Str(s) => s.clone(),
            Self::Uint64(n) => n.to_string(),
            Self::Binary(bytes) => bytes.iter().map(|b| format!("{b:02x}")).collect(),
            Self::MultiString(items) => items.join(", "),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_key_accepts_short_and_long_forms() {
        assert_eq!(RootKey::parse("HKLM"), Some(RootKey::LocalMachine));
        assert_eq!(
            RootKey::parse("HKEY_LOCAL_MACHINE"),
            Some(RootKey::LocalMachine)
        );
        assert_eq!(RootKey::parse("hklm"), None);
        assert_eq!(RootKey::parse("nonsense"), None);
    }

    #[test]
    fn binary_renders_as_lowercase_hex() {
        let value = RegistryValue::Binary(vec![0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(value.display_string(), "deadbeef");
    }

    #[test]
    fn multi_string_renders_comma_joined() {
        let value = RegistryValue::MultiString(vec!["a".to_owned(), "b".to_owned()]);
        assert_eq!(value.display_string(), "a, b");
    }
}
