// crates/compliance-registry/src/lib.rs
// ============================================================================
// Module: Compliance Registry Read Engine
// Description: Cancellation-aware, type-probing, batched reader over the
//              Windows Registry.
// Purpose: The only crate in the workspace that opens a registry key.
// Dependencies: compliance-core, winreg (Windows only), tokio, tracing
// ============================================================================

//! ## Overview
//! Every operation here is read-only: the access mask requested is always
//! `KEY_QUERY_VALUE`, never a write mode. On non-Windows targets this crate
//! still compiles (the workspace's test suite runs there) but every call
//! returns a structured "unsupported platform" error — the engine is a
//! Windows-only substrate by design, not an oversight.

#[cfg(windows)]
mod windows_engine;
#[cfg(not(windows))]
mod unsupported_engine;

#[cfg(windows)]
pub use windows_engine::WinRegistryReader;
#[cfg(not(windows))]
pub use unsupported_engine::WinRegistryReader;

pub use compliance_core::interfaces::ReadDeadline;
pub use compliance_core::interfaces::RegistryReadError;
pub use compliance_core::interfaces::RegistryReader;
