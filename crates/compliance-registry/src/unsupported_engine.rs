// crates/compliance-registry/src/unsupported_engine.rs
// ============================================================================
// Module: Unsupported Platform Engine
// Description: Stub `RegistryReader` for non-Windows targets.
// Purpose: Let the rest of the workspace build and test on any host while
//          making the Windows-only substrate explicit rather than a link error.
// Dependencies: compliance-core
// ============================================================================

//! ## Overview
//! Every call returns a structured error with `operation = "Unsupported"`.
//! The Windows implementation lives in `windows_engine` and is selected by
//! `cfg(windows)` in `lib.rs`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use async_trait::async_trait;
use compliance_core::RegistryValue;
use compliance_core::RootKey;
use compliance_core::interfaces::ReadDeadline;
use compliance_core::interfaces::RegistryReadError;
use compliance_core::interfaces::RegistryReader;

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Stub engine used when compiling for a non-Windows target.
#[derive(Debug, Default, Clone, Copy)]
pub struct WinRegistryReader;

impl WinRegistryReader {
    /// Creates a new stub engine instance.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn unsupported(operation: &str, key: &str, value: &str) -> RegistryReadError {
    RegistryReadError {
        operation: operation.to_owned(),
        key: key.to_owned(),
        value: value.to_owned(),
        underlying: "the registry read engine is only available on Windows".to_owned(),
        not_found: false,
        cancelled: false,
    }
}

#[async_trait]
impl RegistryReader for WinRegistryReader {
    async fn read_string(
        &self,
        root_key: RootKey,
        path: &str,
        value_name: &str,
        _deadline: ReadDeadline,
    ) -> Result<String, RegistryReadError> {
        Err(unsupported("GetStringValue", &format!("{root_key}\\{path}"), value_name))
    }

    async fn read_uint64(
        &self,
        root_key: RootKey,
        path: &str,
        value_name: &str,
        _deadline: ReadDeadline,
    ) -> Result<u64, RegistryReadError> {
        Err(unsupported("GetIntegerValue", &format!("{root_key}\\{path}"), value_name))
    }

    async fn read_binary(
        &self,
        root_key: RootKey,
        path: &str,
        value_name: &str,
        _deadline: ReadDeadline,
    ) -> Result<Vec<u8>, RegistryReadError> {
        Err(unsupported("GetBinaryValue", &format!("{root_key}\\{path}"), value_name))
    }

    async fn read_multi_string(
        &self,
        root_key: RootKey,
        path: &str,
        value_name: &str,
        _deadline: ReadDeadline,
    ) -> Result<Vec<String>, RegistryReadError> {
        Err(unsupported("GetMultiStringValue", &format!("{root_key}\\{path}"), value_name))
    }

    async fn read_auto(
        &self,
        root_key: RootKey,
        path: &str,
        value_name: &str,
        _deadline: ReadDeadline,
    ) -> Result<RegistryValue, RegistryReadError> {
        Err(unsupported("GetValue", &format!("{root_key}\\{path}"), value_name))
    }

    async fn read_all(
        &self,
        root_key: RootKey,
        path: &str,
        _deadline: ReadDeadline,
    ) -> Result<BTreeMap<String, RegistryValue>, RegistryReadError> {
        Err(unsupported("EnumValues", &format!("{root_key}\\{path}"), ""))
    }
}
