// crates/compliance-registry/src/windows_engine.rs
// ============================================================================
// Module: Windows Registry Engine
// Description: `winreg`-backed implementation of `RegistryReader`.
// Purpose: Typed reads, auto-detect, and batch reads with cancellation via
//          a deadline timeout, as prescribed by the design notes' "a
//          language's native deadline-aware I/O" alternative.
// Dependencies: winreg, tokio, compliance-core
// ============================================================================

//! ## Overview
//! Every blocking `winreg` call runs on a `tokio::task::spawn_blocking`
//! worker; the caller's deadline races the worker via `tokio::time::timeout`.
//! If the deadline elapses first, the worker keeps running to completion in
//! the background and its key handle is still released when it finishes or
//! drops — cancellation here means "stop waiting", not "force the OS call to
//! abort", which is the only safe option for a blocking `winreg` call.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::time::Duration;
use std::time::Instant;

use async_trait::async_trait;
use compliance_core::RegistryValue;
use compliance_core::RootKey;
use compliance_core::interfaces::ReadDeadline;
use compliance_core::interfaces::RegistryReadError;
use compliance_core::interfaces::RegistryReader;
use winreg::RegKey;
use winreg::enums::HKEY_CLASSES_ROOT;
use winreg::enums::HKEY_CURRENT_CONFIG;
use winreg::enums::HKEY_CURRENT_USER;
use winreg::enums::HKEY_LOCAL_MACHINE;
use winreg::enums::HKEY_USERS;
use winreg::enums::KEY_QUERY_VALUE;
use winreg::enums::RegType;

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Cancellation-aware reader backed by the real Windows Registry.
#[derive(Debug, Default, Clone, Copy)]
pub struct WinRegistryReader;

impl WinRegistryReader {
    /// Creates a new engine instance. The engine is stateless across calls.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn predef_hkey(root: RootKey) -> RegKey {
    let hkey = match root {
        RootKey::LocalMachine => HKEY_LOCAL_MACHINE,
        RootKey::CurrentUser => HKEY_CURRENT_USER,
        RootKey::ClassesRoot => HKEY_CLASSES_ROOT,
        RootKey::Users => HKEY_USERS,
        RootKey::CurrentConfig => HKEY_CURRENT_CONFIG,
    };
    RegKey::predef(hkey)
}

fn open_key(root: RootKey, path: &str) -> std::io::Result<RegKey> {
    predef_hkey(root).open_subkey_with_flags(path, KEY_QUERY_VALUE)
}

fn io_error_is_not_found(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::NotFound
}

fn make_error(
    operation: &str,
    key: &str,
    value: &str,
    underlying: impl std::fmt::Display,
    not_found: bool,
) -> RegistryReadError {
    RegistryReadError {
        operation: operation.to_owned(),
        key: key.to_owned(),
        value: value.to_owned(),
        underlying: underlying.to_string(),
        not_found,
        cancelled: false,
    }
}

fn timeout_error(operation: &str, key: &str, value: &str, elapsed: Duration) -> RegistryReadError {
    RegistryReadError {
        operation: operation.to_owned(),
        key: key.to_owned(),
        value: value.to_owned(),
        underlying: format!("operation cancelled after {elapsed:?}"),
        not_found: false,
        cancelled: true,
    }
}

/// Decodes a raw registry value into a [`RegistryValue`], returning `None`
/// when `wanted` does not match the stored type.
fn decode_as(raw: &winreg::RegValue, wanted: RegType) -> Option<RegistryValue> {
    if raw.vtype != wanted {
        return None;
    }
    match wanted {
        RegType::REG_SZ | RegType::REG_EXPAND_SZ => decode_utf16_nul(&raw.bytes).map(RegistryValue::Str),
        RegType::REG_DWORD => {
            let bytes: [u8; 4] = raw.bytes.get(0..4)?.try_into().ok()?;
            Some(RegistryValue::Uint64(u64::from(u32::from_le_bytes(bytes))))
        }
        RegType::REG_QWORD => {
            let bytes: [u8; 8] = raw.bytes.get(0..8)?.try_into().ok()?;
            Some(RegistryValue::Uint64(u64::from_le_bytes(bytes)))
        }
        RegType::REG_BINARY => Some(RegistryValue::Binary(raw.bytes.clone())),
        RegType::REG_MULTI_SZ => Some(RegistryValue::MultiString(decode_multi_sz(&raw.bytes))),
        _ => None,
    }
}

fn decode_utf16_nul(bytes: &[u8]) -> Option<String> {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    let trimmed = units.split(|&u| u == 0).next().unwrap_or(&[]);
    String::from_utf16(trimmed).ok()
}

fn decode_multi_sz(bytes: &[u8]) -> Vec<String> {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    units
        .split(|&u| u == 0)
        .filter(|segment| !segment.is_empty())
        .filter_map(|segment| String::from_utf16(segment).ok())
        .collect()
}

async fn with_deadline<T, F>(
    operation: &str,
    key: &str,
    value: &str,
    deadline: ReadDeadline,
    work: F,
) -> Result<T, RegistryReadError>
where
    F: FnOnce() -> Result<T, RegistryReadError> + Send + 'static,
    T: Send + 'static,
{
    let duration = deadline.resolve();
    let start = Instant::now();
    let handle = tokio::task::spawn_blocking(work);
    match tokio::time::timeout(duration, handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(make_error(operation, key, value, join_err, false)),
        Err(_elapsed) => {
            let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
            tracing::warn!(operation, key, value, elapsed_ms, "registry read cancelled by deadline");
            Err(timeout_error(operation, key, value, start.elapsed()))
        }
    }
}

#[async_trait]
impl RegistryReader for WinRegistryReader {
    async fn read_string(
        &self,
        root_key: RootKey,
        path: &str,
        value_name: &str,
        deadline: ReadDeadline,
    ) -> Result<String, RegistryReadError> {
        let path = path.to_owned();
        let value_name_owned = value_name.to_owned();
        let key_label = format!("{root_key}\\{path}");
        let started = Instant::now();
        let result = with_deadline("GetStringValue", &key_label, value_name, deadline, move || {
            let key = open_key(root_key, &path).map_err(|e| {
                make_error("OpenKey", &key_label, &value_name_owned, &e, io_error_is_not_found(&e))
            })?;
            let raw = key.get_raw_value(&value_name_owned).map_err(|e| {
                make_error("GetStringValue", &key_label, &value_name_owned, &e, io_error_is_not_found(&e))
            })?;
            decode_as(&raw, RegType::REG_SZ)
                .or_else(|| decode_as(&raw, RegType::REG_EXPAND_SZ))
                .map(|v| match v {
                    RegistryValue::Str(s) => s,
                    _ => unreachable!("decode_as only returns Str for REG_SZ/REG_EXPAND_SZ"),
                })
                .ok_or_else(|| {
                    make_error(
                        "GetStringValue",
                        &key_label,
                        &value_name_owned,
                        "value is not a string type",
                        false,
                    )
                })
        })
        .await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracing::debug!(operation = "read_string", path = %key_label, value = value_name, elapsed_ms, "registry read");
        result
    }

    async fn read_uint64(
        &self,
        root_key: RootKey,
        path: &str,
        value_name: &str,
        deadline: ReadDeadline,
    ) -> Result<u64, RegistryReadError> {
        let path = path.to_owned();
        let value_name_owned = value_name.to_owned();
        let key_label = format!("{root_key}\\{path}");
        with_deadline("GetIntegerValue", &key_label, value_name, deadline, move || {
            let key = open_key(root_key, &path)
                .map_err(|e| make_error("OpenKey", &key_label, &value_name_owned, &e, io_error_is_not_found(&e)))?;
            let raw = key
                .get_raw_value(&value_name_owned)
                .map_err(|e| make_error("GetIntegerValue", &key_label, &value_name_owned, &e, io_error_is_not_found(&e)))?;
            decode_as(&raw, RegType::REG_DWORD)
                .or_else(|| decode_as(&raw, RegType::REG_QWORD))
                .map(|v| match v {
                    RegistryValue::Uint64(n) => n,
                    _ => unreachable!("decode_as only returns Uint64 for REG_DWORD/REG_QWORD"),
                })
                .ok_or_else(|| {
                    make_error(
                        "GetIntegerValue",
                        &key_label,
                        &value_name_owned,
                        "value is not an integer type",
                        false,
                    )
                })
        })
        .await
    }

    async fn read_binary(
        &self,
        root_key: RootKey,
        path: &str,
        value_name: &str,
        deadline: ReadDeadline,
    ) -> Result<Vec<u8>, RegistryReadError> {
        let path = path.to_owned();
        let value_name_owned = value_name.to_owned();
        let key_label = format!("{root_key}\\{path}");
        with_deadline("GetBinaryValue", &key_label, value_name, deadline, move || {
            let key = open_key(root_key, &path)
                .map_err(|e| make_error("OpenKey", &key_label, &value_name_owned, &e, io_error_is_not_found(&e)))?;
            let raw = key
                .get_raw_value(&value_name_owned)
                .map_err(|e| make_error("GetBinaryValue", &key_label, &value_name_owned, &e, io_error_is_not_found(&e)))?;
            decode_as(&raw, RegType::REG_BINARY)
                .map(|v| match v {
                    RegistryValue::Binary(b) => b,
                    _ => unreachable!("decode_as only returns Binary for REG_BINARY"),
                })
                .ok_or_else(|| {
                    make_error(
                        "GetBinaryValue",
                        &key_label,
                        &value_name_owned,
                        "value is not binary",
                        false,
                    )
                })
        })
        .await
    }

    async fn read_multi_string(
        &self,
        root_key: RootKey,
        path: &str,
        value_name: &str,
        deadline: ReadDeadline,
    ) -> Result<Vec<String>, RegistryReadError> {
        let path = path.to_owned();
        let value_name_owned = value_name.to_owned();
        let key_label = format!("{root_key}\\{path}");
        with_deadline("GetMultiStringValue", &key_label, value_name, deadline, move || {
            let key = open_key(root_key, &path)
                .map_err(|e| make_error("OpenKey", &key_label, &value_name_owned, &e, io_error_is_not_found(&e)))?;
            let raw = key
                .get_raw_value(&value_name_owned)
                .map_err(|e| make_error("GetMultiStringValue", &key_label, &value_name_owned, &e, io_error_is_not_found(&e)))?;
            decode_as(&raw, RegType::REG_MULTI_SZ)
                .map(|v| match v {
                    RegistryValue::MultiString(items) => items,
                    _ => unreachable!("decode_as only returns MultiString for REG_MULTI_SZ"),
                })
                .ok_or_else(|| {
                    make_error(
                        "GetMultiStringValue",
                        &key_label,
                        &value_name_owned,
                        "value is not multi-string",
                        false,
                    )
                })
        })
        .await
    }

    async fn read_auto(
        &self,
        root_key: RootKey,
        path: &str,
        value_name: &str,
        deadline: ReadDeadline,
    ) -> Result<RegistryValue, RegistryReadError> {
        let path_owned = path.to_owned();
        let value_name_owned = value_name.to_owned();
        let key_label = format!("{root_key}\\{path}");
        with_deadline("GetValue", &key_label, value_name, deadline, move || {
            let key = open_key(root_key, &path_owned)
                .map_err(|e| make_error("OpenKey", &key_label, &value_name_owned, &e, io_error_is_not_found(&e)))?;
            let raw = key
                .get_raw_value(&value_name_owned)
                .map_err(|e| make_error("GetValue", &key_label, &value_name_owned, &e, io_error_is_not_found(&e)))?;
            decode_as(&raw, RegType::REG_SZ)
                .or_else(|| decode_as(&raw, RegType::REG_EXPAND_SZ))
                .or_else(|| decode_as(&raw, RegType::REG_MULTI_SZ))
                .or_else(|| decode_as(&raw, RegType::REG_DWORD))
                .or_else(|| decode_as(&raw, RegType::REG_QWORD))
                .or_else(|| decode_as(&raw, RegType::REG_BINARY))
                .ok_or_else(|| {
                    make_error(
                        "GetValue",
                        &key_label,
                        &value_name_owned,
                        format!("no supported decode for registry type {:?} (tried string, multi-string, integer, binary)", raw.vtype),
                        false,
                    )
                })
        })
        .await
    }

    async fn read_all(
        &self,
        root_key: RootKey,
        path: &str,
        deadline: ReadDeadline,
    ) -> Result<BTreeMap<String, RegistryValue>, RegistryReadError> {
        let path_owned = path.to_owned();
        let key_label = format!("{root_key}\\{path}");
        with_deadline("EnumValues", &key_label, "", deadline, move || {
            let key = open_key(root_key, &path_owned)
                .map_err(|e| make_error("OpenKey", &key_label, "", &e, io_error_is_not_found(&e)))?;
            let mut out = BTreeMap::new();
            for entry in key.enum_values() {
                let Ok((name, raw)) = entry else { continue };
                let decoded = decode_as(&raw, RegType::REG_SZ)
                    .or_else(|| decode_as(&raw, RegType::REG_DWORD))
                    .or_else(|| decode_as(&raw, RegType::REG_QWORD))
                    .or_else(|| decode_as(&raw, RegType::REG_BINARY))
                    .or_else(|| decode_as(&raw, RegType::REG_MULTI_SZ))
                    .or_else(|| decode_as(&raw, RegType::REG_EXPAND_SZ));
                if let Some(value) = decoded {
                    out.insert(name, value);
                }
            }
            Ok(out)
        })
        .await
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn utf16_nul(s: &str) -> Vec<u8> {
        let mut bytes = Vec::new();
        for unit in s.encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes
    }

    #[test]
    fn decodes_utf16_string_with_trailing_nul() {
        let bytes = utf16_nul("hello");
        assert_eq!(decode_utf16_nul(&bytes).as_deref(), Some("hello"));
    }

    #[test]
    fn decodes_multi_sz_into_distinct_strings() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&utf16_nul("one")[..utf16_nul("one").len() - 2]);
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(&utf16_nul("two")[..utf16_nul("two").len() - 2]);
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());
        assert_eq!(decode_multi_sz(&bytes), vec!["one".to_owned(), "two".to_owned()]);
    }

    #[test]
    fn decode_as_rejects_mismatched_type() {
        let raw = winreg::RegValue {
            bytes: 42u32.to_le_bytes().to_vec(),
            vtype: RegType::REG_DWORD,
        };
        assert!(decode_as(&raw, RegType::REG_SZ).is_none());
        assert_eq!(decode_as(&raw, RegType::REG_DWORD), Some(RegistryValue::Uint64(42)));
    }
}
