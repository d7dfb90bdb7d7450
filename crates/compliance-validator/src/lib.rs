// crates/compliance-validator/src/lib.rs
// ============================================================================
// Module: Compliance Validator
// Description: Syntactic and policy validation of registry paths, value
//              names, root keys, and file paths, plus best-effort sanitizers.
// Purpose: One crate every other component calls before touching the
//          registry or the file system with untrusted config input.
// Dependencies: compliance-core, thiserror
// ============================================================================

//! ## Overview
//! Every validation failure carries a structured [`ValidationError`] rather
//! than a string — the scan executor, config loader, and HTTP layer all
//! branch on `code`, not on message text.
//!
//! Security posture: all inputs here originate from report config files or
//! HTTP submissions and must be treated as untrusted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use compliance_core::ReportConfig;
use compliance_core::RootKey;
use thiserror::Error;

// ============================================================================
// SECTION: Error
// ============================================================================

/// A stable, programmatically matchable validation failure code.
///
/// # Invariants
/// - Variants correspond 1:1 with the error-kind taxonomy of the Input /
///   Validation category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationCode {
    /// `invalid_root_key`.
    InvalidRootKey,
    /// `invalid_path`.
    InvalidPath,
    /// `invalid_value_name`.
    InvalidValueName,
    /// `path_traversal`.
    PathTraversal,
    /// `injection`.
    Injection,
    /// `disallowed_by_policy`.
    DisallowedByPolicy,
    /// `too_long`.
    TooLong,
    /// `empty_field`.
    EmptyField,
}

impl ValidationCode {
    /// Returns the snake_case wire name of this code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidRootKey => "invalid_root_key",
            Self::InvalidPath => "invalid_path",
            Self::InvalidValueName => "invalid_value_name",
            Self::PathTraversal => "path_traversal",
            Self::Injection => "injection",
            Self::DisallowedByPolicy => "disallowed_by_policy",
            Self::TooLong => "too_long",
            Self::EmptyField => "empty_field",
        }
    }

    /// Returns the numeric code surfaced to API consumers.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        match self {
            Self::InvalidRootKey => 1001,
            Self::InvalidPath => 1002,
            Self::InvalidValueName => 1003,
            Self::PathTraversal => 1004,
            Self::Injection => 1005,
            Self::DisallowedByPolicy => 1006,
            Self::TooLong => 1007,
            Self::EmptyField => 1008,
        }
    }
}

/// A structured validation failure.
///
/// # Invariants
/// - Fatal to the offending query or field only; never fatal to a whole
///   scan or request.
#[derive(Debug, Clone, Error)]
#[error("validation failed for {field} ({code:?}): {message}")]
pub struct ValidationError {
    /// The field that failed validation.
    pub field: String,
    /// The offending value, truncated by the caller if sensitive.
    pub value: String,
    /// Human-readable message.
    pub message: String,
    /// Stable programmatic code.
    pub code: ValidationCode,
}

impl ValidationError {
    fn new(field: &str, value: impl Into<String>, code: ValidationCode, message: impl Into<String>) -> Self {
        Self {
            field: field.to_owned(),
            value: value.into(),
            code,
            message: message.into(),
        }
    }
}

// ============================================================================
// SECTION: Constants
// ============================================================================

const MAX_PATH_LEN: usize = 255;
const MAX_PATH_DEPTH: usize = 512;
const MAX_VALUE_NAME_LEN: usize = 16383;

const PATH_ALLOWED_EXTRA: &[char] = &[' ', '-', '_', '.', '(', ')', '\\'];
const VALUE_NAME_ALLOWED_EXTRA: &[char] = &[
    ' ', '-', '_', '.', '(', ')', '\\', '[', ']', '{', '}', ',', ':', ';', '!', '@', '#', '$',
    '%', '^', '&', '*', '+', '=', '~', '`', '\'', '"',
];

// ============================================================================
// SECTION: Root Key
// ============================================================================

/// Validates and parses a root key alias.
///
/// # Errors
///
/// Returns [`ValidationError`] with [`ValidationCode::InvalidRootKey`] when
/// `raw` is not one of the enumerated aliases.
pub fn validate_root_key(raw: &str) -> Result<RootKey, ValidationError> {
    RootKey::parse(raw).ok_or_else(|| {
        ValidationError::new(
            "root_key",
            raw,
            ValidationCode::InvalidRootKey,
            format!("unrecognized root key alias: {raw}"),
        )
    })
}

// ============================================================================
// SECTION: Registry Path
// ============================================================================

/// Validates a registry path per the rules in the component design: non-empty,
/// length <= 255, segment depth <= 512, restricted character set, no leading
/// or trailing backslash.
///
/// # Errors
///
/// Returns [`ValidationError`] with the appropriate code on the first rule
/// violated.
pub fn validate_registry_path(path: &str) -> Result<(), ValidationError> {
    if path.is_empty() {
        return Err(ValidationError::new(
            "path",
            path,
            ValidationCode::EmptyField,
            "registry path must not be empty",
        ));
    }
    if path.len() > MAX_PATH_LEN {
        return Err(ValidationError::new(
            "path",
            path,
            ValidationCode::TooLong,
            format!("registry path exceeds {MAX_PATH_LEN} characters"),
        ));
    }
    if path.starts_with('\\') || path.ends_with('\\') {
        return Err(ValidationError::new(
            "path",
            path,
            ValidationCode::InvalidPath,
            "registry path must not start or end with a backslash",
        ));
    }
    let depth = path.split('\\').count();
    if depth > MAX_PATH_DEPTH {
        return Err(ValidationError::new(
            "path",
            path,
            ValidationCode::TooLong,
            format!("registry path nesting depth exceeds {MAX_PATH_DEPTH}"),
        ));
    }
    if !path
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || PATH_ALLOWED_EXTRA.contains(&c))
    {
        return Err(ValidationError::new(
            "path",
            path,
            ValidationCode::InvalidPath,
            "registry path contains a disallowed character",
        ));
    }
    validate_no_path_traversal(path)?;
    validate_no_injection(path)?;
    Ok(())
}

// ============================================================================
// SECTION: Value Name
// ============================================================================

/// Validates a value name. An empty value name is valid (it denotes the
/// default value).
///
/// # Errors
///
/// Returns [`ValidationError`] when the name is too long or contains a
/// disallowed character.
pub fn validate_value_name(value_name: &str) -> Result<(), ValidationError> {
    if value_name.len() > MAX_VALUE_NAME_LEN {
        return Err(ValidationError::new(
            "value_name",
            value_name,
            ValidationCode::TooLong,
            format!("value name exceeds {MAX_VALUE_NAME_LEN} characters"),
        ));
    }
    if !value_name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || VALUE_NAME_ALLOWED_EXTRA.contains(&c))
    {
        return Err(ValidationError::new(
            "value_name",
            value_name,
            ValidationCode::InvalidValueName,
            "value name contains a disallowed character",
        ));
    }
    validate_no_injection(value_name)?;
    Ok(())
}

// ============================================================================
// SECTION: Operation
// ============================================================================

/// Validates that a declared operation is the only one ever executed: `read`.
///
/// # Errors
///
/// Returns [`ValidationError`] when `raw` is anything other than `"read"`.
pub fn validate_operation(raw: &str) -> Result<(), ValidationError> {
    if raw == "read" {
        Ok(())
    } else {
        Err(ValidationError::new(
            "operation",
            raw,
            ValidationCode::InvalidPath,
            format!("unsupported operation: {raw}"),
        ))
    }
}

// ============================================================================
// SECTION: Path Traversal
// ============================================================================

/// Rejects any input containing `..\` or `../`, or whose lexical
/// normalization differs from the input while still containing `..`.
///
/// # Errors
///
/// Returns [`ValidationError`] with [`ValidationCode::PathTraversal`].
pub fn validate_no_path_traversal(input: &str) -> Result<(), ValidationError> {
    if input.contains("..\\") || input.contains("../") {
        return Err(ValidationError::new(
            "path",
            input,
            ValidationCode::PathTraversal,
            "path contains a traversal sequence",
        ));
    }
    if input.contains("..") && normalize_segments(input) != input {
        return Err(ValidationError::new(
            "path",
            input,
            ValidationCode::PathTraversal,
            "path normalization reveals a traversal sequence",
        ));
    }
    Ok(())
}

fn normalize_segments(input: &str) -> String {
    let mut stack: Vec<&str> = Vec::new();
    for segment in input.split(['\\', '/']) {
        match segment {
            ".." => {
                stack.pop();
            }
            "." | "" => {}
            other => stack.push(other),
        }
    }
    stack.join("\\")
}

// ============================================================================
// SECTION: Injection
// ============================================================================

/// Rejects control characters (`0x00`-`0x1F`, `0x7F`) and the Unicode C1
/// control range (`128`-`159`).
///
/// # Errors
///
/// Returns [`ValidationError`] with [`ValidationCode::Injection`].
pub fn validate_no_injection(input: &str) -> Result<(), ValidationError> {
    for c in input.chars() {
        let code = u32::from(c);
        let is_c0_or_del = code <= 0x1F || code == 0x7F;
        let is_c1 = (128..=159).contains(&code);
        if is_c0_or_del || is_c1 {
            return Err(ValidationError::new(
                "input",
                input,
                ValidationCode::Injection,
                format!("input contains a disallowed control character U+{code:04X}"),
            ));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Deny / Allow Lists
// ============================================================================

/// Enforces a deny list: case-insensitive exact match or proper
/// backslash-delimited prefix match blocks access.
///
/// # Errors
///
/// Returns [`ValidationError`] with [`ValidationCode::DisallowedByPolicy`]
/// when `path` matches a deny entry.
pub fn validate_against_deny_list(path: &str, deny_list: &[String]) -> Result<(), ValidationError> {
    let lowered = path.to_ascii_lowercase();
    for entry in deny_list {
        let entry_lower = entry.to_ascii_lowercase();
        if lowered == entry_lower || lowered.starts_with(&format!("{entry_lower}\\")) {
            return Err(ValidationError::new(
                "path",
                path,
                ValidationCode::DisallowedByPolicy,
                format!("path is blocked by deny list entry: {entry}"),
            ));
        }
    }
    Ok(())
}

/// Enforces an allow list: an empty list permits everything; a non-empty
/// list requires a case-insensitive exact match.
///
/// # Errors
///
/// Returns [`ValidationError`] with [`ValidationCode::DisallowedByPolicy`]
/// when `allow_list` is non-empty and `path` does not exactly match an
/// entry.
pub fn validate_against_allow_list(path: &str, allow_list: &[String]) -> Result<(), ValidationError> {
    if allow_list.is_empty() {
        return Ok(());
    }
    let lowered = path.to_ascii_lowercase();
    let allowed = allow_list
        .iter()
        .any(|entry| entry.to_ascii_lowercase() == lowered);
    if allowed {
        Ok(())
    } else {
        Err(ValidationError::new(
            "path",
            path,
            ValidationCode::DisallowedByPolicy,
            "path is not present in the allow list",
        ))
    }
}

/// Applies deny-list-then-allow-list policy, matching the precedence
/// testable property: a deny-list hit rejects regardless of allow-list
/// contents.
///
/// # Errors
///
/// Returns [`ValidationError`] from whichever list rejects the path first.
pub fn validate_against_policy(
    path: &str,
    deny_list: &[String],
    allow_list: &[String],
) -> Result<(), ValidationError> {
    validate_against_deny_list(path, deny_list)?;
    validate_against_allow_list(path, allow_list)
}

// ============================================================================
// SECTION: File Path
// ============================================================================

/// Validates a file-system path used for artifact output: rejects `..` and
/// null bytes, and checks the lowercased extension against an allow list
/// when one is provided.
///
/// # Errors
///
/// Returns [`ValidationError`] when the path is unsafe or its extension is
/// not permitted.
pub fn validate_file_path(path: &str, allowed_extensions: &[String]) -> Result<(), ValidationError> {
    if path.contains("..") {
        return Err(ValidationError::new(
            "file_path",
            path,
            ValidationCode::PathTraversal,
            "file path must not contain '..'",
        ));
    }
    if path.contains('\0') {
        return Err(ValidationError::new(
            "file_path",
            path,
            ValidationCode::Injection,
            "file path must not contain a null byte",
        ));
    }
    if allowed_extensions.is_empty() {
        return Ok(());
    }
    let ext = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    let matches = ext
        .as_deref()
        .is_some_and(|ext| allowed_extensions.iter().any(|allowed| allowed.to_ascii_lowercase() == ext));
    if matches {
        Ok(())
    } else {
        Err(ValidationError::new(
            "file_path",
            path,
            ValidationCode::InvalidPath,
            "file extension is not permitted",
        ))
    }
}

// ============================================================================
// SECTION: Sanitizers
// ============================================================================

/// Best-effort hygiene pass over a registry path: strips null/control
/// characters, collapses consecutive backslashes, and trims leading,
/// trailing backslashes and whitespace. Does **not** substitute for
/// [`validate_registry_path`].
#[must_use]
pub fn sanitize_registry_path(path: &str) -> String {
    let stripped: String = path.chars().filter(|c| !is_control_char(*c)).collect();
    let mut collapsed = String::with_capacity(stripped.len());
    let mut last_was_backslash = false;
    for c in stripped.chars() {
        if c == '\\' {
            if last_was_backslash {
                continue;
            }
            last_was_backslash = true;
        } else {
            last_was_backslash = false;
        }
        collapsed.push(c);
    }
    collapsed.trim_matches(|c: char| c == '\\' || c.is_whitespace()).to_owned()
}

/// Best-effort hygiene pass over a value name: strips null/control
/// characters and trims surrounding whitespace. Does **not** substitute for
/// [`validate_value_name`].
#[must_use]
pub fn sanitize_value_name(name: &str) -> String {
    let stripped: String = name.chars().filter(|c| !is_control_char(*c)).collect();
    stripped.trim().to_owned()
}

fn is_control_char(c: char) -> bool {
    let code = u32::from(c);
    code <= 0x1F || code == 0x7F || (128..=159).contains(&code)
}

// ============================================================================
// SECTION: Config
// ============================================================================

/// Validates a whole report config: non-empty version, and every query
/// independently valid.
///
/// # Errors
///
/// Returns the first [`ValidationError`] encountered, with `field` prefixed
/// `queries[i] (name): …` for query-level failures.
pub fn validate_config(config: &ReportConfig) -> Result<(), ValidationError> {
    if config.version.is_empty() {
        return Err(ValidationError::new(
            "version",
            "",
            ValidationCode::EmptyField,
            "config version must not be empty",
        ));
    }
    for (index, query) in config.queries.iter().enumerate() {
        validate_query(query).map_err(|err| ValidationError {
            field: format!("queries[{index}] ({}): {}", query.name, err.field),
            ..err
        })?;
    }
    Ok(())
}

fn validate_query(query: &compliance_core::RegistryQuery) -> Result<(), ValidationError> {
    validate_root_key(&query.root_key)?;
    validate_registry_path(&query.path)?;
    validate_value_name(&query.value_name)?;
    if query.value_name.is_empty() && !query.read_all {
        // A single default-value read is permitted: empty name, read_all
        // false. Anything requiring all values must set read_all.
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_at_255_is_accepted_and_256_is_rejected() {
        let ok = "A".repeat(255);
        assert!(validate_registry_path(&ok).is_ok());
        let too_long = "A".repeat(256);
        assert!(matches!(
            validate_registry_path(&too_long),
            Err(ValidationError {
                code: ValidationCode::TooLong,
                ..
            })
        ));
    }

    #[test]
    fn value_name_boundary() {
        let ok = "A".repeat(16383);
        assert!(validate_value_name(&ok).is_ok());
        let too_long = "A".repeat(16384);
        assert!(validate_value_name(&too_long).is_err());
    }

    #[test]
    fn depth_boundary() {
        let ok = (0..512).map(|_| "a").collect::<Vec<_>>().join("\\");
        assert!(validate_registry_path(&ok).is_ok());
        let too_deep = (0..513).map(|_| "a").collect::<Vec<_>>().join("\\");
        assert!(matches!(
            validate_registry_path(&too_deep),
            Err(ValidationError {
                code: ValidationCode::TooLong,
                ..
            })
        ));
    }

    #[test]
    fn rejects_path_traversal() {
        assert!(validate_no_path_traversal("SOFTWARE\\..\\SAM").is_err());
        assert!(validate_no_path_traversal("SOFTWARE/../SAM").is_err());
    }

    #[test]
    fn rejects_injection_characters() {
        assert!(validate_no_injection("abc\u{0007}def").is_err());
        assert!(validate_no_injection("abc\u{0090}def").is_err());
        assert!(validate_no_injection("harmless").is_ok());
    }

    #[test]
    fn deny_list_takes_precedence_over_allow_list() {
        let deny = vec!["SECURITY\\Policy\\Secrets".to_owned()];
        let allow = vec!["SECURITY\\Policy\\Secrets".to_owned()];
        let result = validate_against_policy("SECURITY\\Policy\\Secrets", &deny, &allow);
        assert!(result.is_err());
    }

    #[test]
    fn empty_allow_list_permits_all() {
        assert!(validate_against_allow_list("ANY\\PATH", &[]).is_ok());
    }

    #[test]
    fn sanitize_collapses_backslashes_and_trims() {
        assert_eq!(
            sanitize_registry_path("\\\\SOFTWARE\\\\\\Vendor\\\\"),
            "SOFTWARE\\Vendor"
        );
    }

    #[test]
    fn root_key_case_sensitive() {
        assert!(validate_root_key("hklm").is_err());
        assert!(validate_root_key("HKLM").is_ok());
    }
}
